use crate::protocol::{Event, EventKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventLogError {
    #[error("only played and restart events are logged, got {0:?}")]
    NotGameAffecting(EventKind),
}

#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `Restart` empties the log instead of being stored, so joiners
    /// always replay from the empty board.
    pub fn append(&mut self, event: Event) -> Result<(), EventLogError> {
        match event.kind {
            EventKind::Played { .. } => {
                self.events.push(event);
                Ok(())
            }
            EventKind::Restart => {
                self.events.clear();
                Ok(())
            }
            other => Err(EventLogError::NotGameAffecting(other)),
        }
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.clone()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
