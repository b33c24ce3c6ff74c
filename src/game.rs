use crate::protocol::{CellIndex, Event, EventKind};

const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won(Mark),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Play(CellIndex),
    Restart,
}

impl Move {
    pub fn from_event(event: &Event) -> Option<Self> {
        match event.kind {
            EventKind::Played { cell_index } => Some(Move::Play(cell_index)),
            EventKind::Restart => Some(Move::Restart),
            EventKind::MessagesRequest | EventKind::MessagesAnswer(_) | EventKind::GotMessages => {
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameState {
    cells: [Option<Mark>; CellIndex::COUNT],
    current_player: Mark,
    outcome: Option<Outcome>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            cells: [None; CellIndex::COUNT],
            current_player: Mark::X,
            outcome: None,
        }
    }

    /// Rebuilds a board from an ordered log, starting from the empty grid.
    /// Control events in the log are skipped.
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        events
            .into_iter()
            .filter_map(Move::from_event)
            .fold(Self::new(), |state, mv| state.apply(mv))
    }

    pub fn cells(&self) -> &[Option<Mark>; CellIndex::COUNT] {
        &self.cells
    }

    pub fn cell(&self, index: CellIndex) -> Option<Mark> {
        self.cells[index.get()]
    }

    pub fn current_player(&self) -> Mark {
        self.current_player
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_active(&self) -> bool {
        self.outcome.is_none()
    }

    pub fn accepts(&self, index: CellIndex) -> bool {
        self.is_active() && self.cell(index).is_none()
    }

    /// Successor state. Illegal plays (occupied cell, finished round) leave
    /// the state untouched.
    pub fn apply(&self, mv: Move) -> Self {
        match mv {
            Move::Restart => Self::new(),
            Move::Play(index) if !self.accepts(index) => *self,
            Move::Play(index) => {
                let mut next = *self;
                next.cells[index.get()] = Some(self.current_player);
                if let Some(winner) = next.winning_mark() {
                    next.outcome = Some(Outcome::Won(winner));
                } else if next.cells.iter().all(Option::is_some) {
                    next.outcome = Some(Outcome::Draw);
                } else {
                    next.current_player = self.current_player.other();
                }
                next
            }
        }
    }

    fn winning_mark(&self) -> Option<Mark> {
        WINNING_LINES.iter().find_map(|&[a, b, c]| match self.cells[a] {
            Some(mark) if self.cells[b] == Some(mark) && self.cells[c] == Some(mark) => {
                Some(mark)
            }
            _ => None,
        })
    }
}
