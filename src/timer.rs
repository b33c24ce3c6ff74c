use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed { deadline: Instant },
    Cancelled,
    Fired,
}

/// One-shot deadline for a join attempt. Cancel and fire are mutually
/// exclusive: whichever happens first wins, the other becomes a no-op.
#[derive(Debug, Clone)]
pub struct CatchUpTimer {
    timeout: Duration,
    state: TimerState,
}

impl CatchUpTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: TimerState::Idle,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn arm(&mut self, now: Instant) {
        self.state = TimerState::Armed {
            deadline: now + self.timeout,
        };
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed { .. })
    }

    pub fn cancel(&mut self) -> bool {
        if self.is_armed() {
            self.state = TimerState::Cancelled;
            true
        } else {
            false
        }
    }

    pub fn fire(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Armed { deadline } if now >= deadline => {
                self.state = TimerState::Fired;
                true
            }
            _ => false,
        }
    }
}
