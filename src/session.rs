use crate::event_log::EventLog;
use crate::game::{GameState, Mark, Move, Outcome};
use crate::protocol::{CellIndex, Event, EventKind, History, MatchId, PeerId};
use crate::timer::CatchUpTimer;
use std::time::Duration;
use tokio::time::Instant;

pub const ROOM_FULL_NOTICE: &str = "Room is full, entering as a spectator.";
pub const HOST_UNREACHABLE_NOTICE: &str =
    "Could not contact the other player. Creating a match, instead...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
    Spectator,
}

impl Role {
    pub fn mark(self) -> Option<Mark> {
        match self {
            Role::Host => Some(Mark::X),
            Role::Guest => Some(Mark::O),
            Role::Spectator => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub match_id: MatchId,
    pub role: Option<Role>,
    pub state: GameState,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Broadcast(Event),
    Render(View),
    Notice(String),
    /// No host answered in time; drop this session and found a new match.
    Abandon,
}

#[derive(Debug)]
pub struct Session {
    match_id: MatchId,
    peer_id: Option<PeerId>,
    role: Option<Role>,
    state: GameState,
    second_player_loaded: bool,
    // Joiners answered with a free slot that have not acknowledged yet.
    offered_guests: Vec<PeerId>,
    log: Option<EventLog>,
    catch_up: CatchUpTimer,
    // Board events seen while waiting for the host's history.
    pending: Vec<Move>,
}

impl Session {
    pub fn found(match_id: MatchId, catch_up_timeout: Duration) -> Self {
        Self {
            match_id,
            peer_id: None,
            role: Some(Role::Host),
            state: GameState::new(),
            second_player_loaded: false,
            offered_guests: Vec::new(),
            log: Some(EventLog::new()),
            catch_up: CatchUpTimer::new(catch_up_timeout),
            pending: Vec::new(),
        }
    }

    pub fn join(match_id: MatchId, catch_up_timeout: Duration) -> Self {
        Self {
            role: None,
            log: None,
            ..Self::found(match_id, catch_up_timeout)
        }
    }

    pub fn abandon(&mut self) {
        let next = MatchId::generate();
        log::info!("abandoning match {} for new match {}", self.match_id, next);
        *self = Self::found(next, self.catch_up.timeout());
    }

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub fn peer_id(&self) -> Option<&PeerId> {
        self.peer_id.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn second_player_loaded(&self) -> bool {
        self.second_player_loaded
    }

    pub fn event_log(&self) -> Option<&EventLog> {
        self.log.as_ref()
    }

    pub fn catch_up_deadline(&self) -> Option<Instant> {
        self.catch_up.deadline()
    }

    fn is_host(&self) -> bool {
        self.role == Some(Role::Host)
    }

    fn waiting_for_guest(&self) -> bool {
        self.is_host() && !self.second_player_loaded
    }

    pub fn on_connected(&mut self, peer_id: PeerId, now: Instant) -> Vec<Effect> {
        log::debug!("connected to match {} as {}", self.match_id, peer_id);
        self.peer_id = Some(peer_id.clone());

        if self.is_host() {
            return vec![Effect::Render(self.view())];
        }

        self.role = None;
        self.pending.clear();
        self.catch_up.arm(now);
        log::info!("requesting history for match {}", self.match_id);
        vec![
            Effect::Broadcast(Event::new(peer_id, EventKind::MessagesRequest)),
            Effect::Render(self.view()),
        ]
    }

    pub fn on_event(&mut self, event: Event) -> Vec<Effect> {
        if self.peer_id.as_ref() == Some(&event.from) {
            return Vec::new();
        }

        match event.kind {
            EventKind::MessagesRequest => self.answer_request(event.from),
            EventKind::MessagesAnswer(ref history) => {
                if event.interested.is_none() || event.interested != self.peer_id {
                    return Vec::new();
                }
                self.catch_up_from(history)
            }
            EventKind::GotMessages => self.guest_loaded(&event.from),
            EventKind::Played { .. } | EventKind::Restart => self.apply_remote(event),
        }
    }

    pub fn on_catch_up_timeout(&mut self, now: Instant) -> Vec<Effect> {
        if !self.catch_up.fire(now) {
            return Vec::new();
        }
        log::warn!("no host answered for match {}", self.match_id);
        vec![
            Effect::Notice(HOST_UNREACHABLE_NOTICE.to_string()),
            Effect::Abandon,
        ]
    }

    pub fn play(&mut self, cell: CellIndex) -> Vec<Effect> {
        let Some(peer_id) = self.peer_id.clone() else {
            return Vec::new();
        };
        let Some(mark) = self.role.and_then(Role::mark) else {
            return Vec::new();
        };
        if self.waiting_for_guest()
            || mark != self.state.current_player()
            || !self.state.accepts(cell)
        {
            return Vec::new();
        }

        let event = Event::new(peer_id, EventKind::Played { cell_index: cell });
        self.record(&event);
        self.state = self.state.apply(Move::Play(cell));
        vec![Effect::Broadcast(event), Effect::Render(self.view())]
    }

    pub fn restart(&mut self) -> Vec<Effect> {
        if !self.is_host() {
            return Vec::new();
        }
        let Some(peer_id) = self.peer_id.clone() else {
            return Vec::new();
        };

        let event = Event::new(peer_id, EventKind::Restart);
        self.record(&event);
        self.state = self.state.apply(Move::Restart);
        vec![Effect::Broadcast(event), Effect::Render(self.view())]
    }

    fn answer_request(&mut self, requester: PeerId) -> Vec<Effect> {
        let Some(log) = self.log.as_ref().filter(|_| self.is_host()) else {
            return Vec::new();
        };
        let Some(host) = self.peer_id.clone() else {
            return Vec::new();
        };

        let is_full = self.second_player_loaded;
        let history = History {
            messages: log.snapshot(),
            is_full,
        };
        if !is_full && !self.offered_guests.contains(&requester) {
            self.offered_guests.push(requester.clone());
        }

        log::info!(
            "answering {} with {} events (full: {})",
            requester,
            history.messages.len(),
            is_full
        );
        vec![Effect::Broadcast(Event::addressed_to(
            host,
            requester,
            EventKind::MessagesAnswer(history),
        ))]
    }

    fn catch_up_from(&mut self, history: &History) -> Vec<Effect> {
        if !self.catch_up.cancel() {
            return Vec::new();
        }
        let Some(peer_id) = self.peer_id.clone() else {
            return Vec::new();
        };

        self.state = std::mem::take(&mut self.pending)
            .into_iter()
            .fold(GameState::replay(&history.messages), |state, mv| {
                state.apply(mv)
            });

        let mut effects = Vec::new();
        if history.is_full {
            self.role = Some(Role::Spectator);
            effects.push(Effect::Notice(ROOM_FULL_NOTICE.to_string()));
        } else {
            self.role = Some(Role::Guest);
        }
        log::info!(
            "caught up on match {} with {} events as {:?}",
            self.match_id,
            history.messages.len(),
            self.role
        );

        effects.push(Effect::Broadcast(Event::new(
            peer_id,
            EventKind::GotMessages,
        )));
        effects.push(Effect::Render(self.view()));
        effects
    }

    fn guest_loaded(&mut self, from: &PeerId) -> Vec<Effect> {
        if !self.is_host()
            || self.second_player_loaded
            || !self.offered_guests.contains(from)
        {
            return Vec::new();
        }
        log::info!("guest {} loaded match {}", from, self.match_id);
        self.second_player_loaded = true;
        self.offered_guests.clear();
        vec![Effect::Render(self.view())]
    }

    fn apply_remote(&mut self, event: Event) -> Vec<Effect> {
        let Some(mv) = Move::from_event(&event) else {
            return Vec::new();
        };
        if self.catch_up.is_armed() {
            self.pending.push(mv);
            return Vec::new();
        }

        self.record(&event);
        let next = self.state.apply(mv);
        if next == self.state {
            log::debug!("ignoring stale {:?} from {}", mv, event.from);
        }
        self.state = next;
        vec![Effect::Render(self.view())]
    }

    fn record(&mut self, event: &Event) {
        if let Some(log) = self.log.as_mut() {
            if let Err(err) = log.append(event.clone()) {
                log::warn!("not logging event: {}", err);
            }
        }
    }

    pub fn view(&self) -> View {
        View {
            match_id: self.match_id.clone(),
            role: self.role,
            state: self.state,
            status: self.status(),
        }
    }

    pub fn status(&self) -> String {
        match self.state.outcome() {
            Some(Outcome::Won(mark)) => format!("Player {} has won!", mark.symbol()),
            Some(Outcome::Draw) => "Game ended in a draw!".to_string(),
            None if self.waiting_for_guest() => "Waiting for another player".to_string(),
            None if self.role.is_none() => "Joining match...".to_string(),
            None => {
                let current = self.state.current_player();
                if self.role.and_then(Role::mark) == Some(current) {
                    "It's your turn".to_string()
                } else {
                    format!("It's {}'s turn", current.symbol())
                }
            }
        }
    }
}
