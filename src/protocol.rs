use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

const MATCH_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MATCH_ID_LEN: usize = 9;

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut id = String::with_capacity(MATCH_ID_LEN + 1);
        id.push('_');
        for _ in 0..MATCH_ID_LEN {
            let pick = rng.gen_range(0..MATCH_ID_ALPHABET.len());
            id.push(MATCH_ID_ALPHABET[pick] as char);
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cell index {0} is outside the board (0-8)")]
pub struct InvalidCell(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CellIndex(u8);

impl CellIndex {
    pub const COUNT: usize = 9;

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for CellIndex {
    type Error = InvalidCell;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (value as usize) < Self::COUNT {
            Ok(Self(value))
        } else {
            Err(InvalidCell(value))
        }
    }
}

impl From<CellIndex> for u8 {
    fn from(cell: CellIndex) -> Self {
        cell.0
    }
}

/// Game event as exchanged between peers through the relay:
/// `{"event": "...", "from": "...", "interested"?: "...", "data"?: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub from: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interested: Option<PeerId>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    MessagesRequest,
    MessagesAnswer(History),
    GotMessages,
    Played {
        #[serde(rename = "cellIndex")]
        cell_index: CellIndex,
    },
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub messages: Vec<Event>,
    #[serde(rename = "isFull")]
    pub is_full: bool,
}

impl Event {
    pub fn new(from: PeerId, kind: EventKind) -> Self {
        Self {
            from,
            interested: None,
            kind,
        }
    }

    pub fn addressed_to(from: PeerId, interested: PeerId, kind: EventKind) -> Self {
        Self {
            from,
            interested: Some(interested),
            kind,
        }
    }

    pub fn is_game_affecting(&self) -> bool {
        matches!(self.kind, EventKind::Played { .. } | EventKind::Restart)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    JoinGroup {
        match_id: MatchId,
    },
    LeaveGroup {
        match_id: MatchId,
    },
    Broadcast {
        match_id: MatchId,
        event: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    Welcome {
        peer_id: PeerId,
    },
    ConnectedToGroup {
        match_id: MatchId,
    },
    Event {
        match_id: MatchId,
        event: serde_json::Value,
    },
}
