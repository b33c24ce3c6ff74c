use crate::protocol::{ClientMessage, MatchId, PeerId, ServerMessage};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::mpsc};

#[derive(Default)]
struct RelayState {
    peers: HashMap<PeerId, mpsc::UnboundedSender<ServerMessage>>,
    groups: HashMap<MatchId, HashSet<PeerId>>,
}

impl RelayState {
    fn join(&mut self, match_id: MatchId, peer_id: &PeerId) {
        self.groups
            .entry(match_id)
            .or_default()
            .insert(peer_id.clone());
    }

    fn leave(&mut self, match_id: &MatchId, peer_id: &PeerId) {
        if let Some(members) = self.groups.get_mut(match_id) {
            members.remove(peer_id);
            if members.is_empty() {
                self.groups.remove(match_id);
            }
        }
    }

    fn leave_all(&mut self, peer_id: &PeerId) {
        self.groups.retain(|_, members| {
            members.remove(peer_id);
            !members.is_empty()
        });
        self.peers.remove(peer_id);
    }

    /// Sends to every member of `match_id` except `sender`. Senders outside
    /// the group still reach its members.
    fn broadcast(&self, match_id: &MatchId, sender: &PeerId, event: serde_json::Value) {
        let Some(members) = self.groups.get(match_id) else {
            return;
        };
        let msg = ServerMessage::Event {
            match_id: match_id.clone(),
            event,
        };
        for member in members.iter().filter(|m| *m != sender) {
            if let Some(tx) = self.peers.get(member) {
                let _ = tx.send(msg.clone());
            }
        }
    }
}

type SharedState = Arc<Mutex<RelayState>>;

pub async fn run_server(bind_addr: String) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&bind_addr).await?;
    log::info!("relay listening on ws://{}/ws", bind_addr);
    serve(listener).await
}

pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    let shared: SharedState = Arc::new(Mutex::new(RelayState::default()));

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(shared);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(shared): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, shared))
}

async fn handle_socket(socket: WebSocket, shared: SharedState) {
    if let Err(err) = handle_socket_inner(socket, shared).await {
        log::warn!("websocket connection ended: {}", err);
    }
}

async fn handle_socket_inner(socket: WebSocket, shared: SharedState) -> anyhow::Result<()> {
    let (mut ws_write, mut ws_read) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let peer_id = PeerId::random();
    {
        let mut state = shared
            .lock()
            .map_err(|_| anyhow::anyhow!("relay state mutex poisoned"))?;
        state.peers.insert(peer_id.clone(), out_tx.clone());
    }
    let _ = out_tx.send(ServerMessage::Welcome {
        peer_id: peer_id.clone(),
    });
    log::debug!("peer {} connected", peer_id);

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let encoded = match serde_json::to_string(&msg) {
                Ok(s) => s,
                Err(e) => {
                    log::error!("failed encoding relay message: {}", e);
                    continue;
                }
            };
            if ws_write.send(Message::Text(encoded.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg_result) = ws_read.next().await {
        let msg = match msg_result {
            Ok(m) => m,
            Err(e) => {
                log::warn!("websocket read error: {}", e);
                break;
            }
        };

        let payload = match msg {
            Message::Text(text) => text.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        let client_msg: ClientMessage = match serde_json::from_str(&payload) {
            Ok(m) => m,
            Err(err) => {
                log::warn!("bad client message from {}: {}", peer_id, err);
                continue;
            }
        };

        let mut state = shared
            .lock()
            .map_err(|_| anyhow::anyhow!("relay state mutex poisoned"))?;

        match client_msg {
            ClientMessage::JoinGroup { match_id } => {
                log::debug!("peer {} joined group {}", peer_id, match_id);
                state.join(match_id.clone(), &peer_id);
                let _ = out_tx.send(ServerMessage::ConnectedToGroup { match_id });
            }
            ClientMessage::LeaveGroup { match_id } => {
                log::debug!("peer {} left group {}", peer_id, match_id);
                state.leave(&match_id, &peer_id);
            }
            ClientMessage::Broadcast { match_id, event } => {
                state.broadcast(&match_id, &peer_id, event);
            }
        }
    }

    {
        let mut state = shared
            .lock()
            .map_err(|_| anyhow::anyhow!("relay state mutex poisoned"))?;
        state.leave_all(&peer_id);
    }
    log::debug!("peer {} disconnected", peer_id);

    writer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn peer(state: &mut RelayState, id: &str) -> (PeerId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer_id = PeerId::new(id);
        state.peers.insert(peer_id.clone(), tx);
        (peer_id, rx)
    }

    fn forwarded(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Option<serde_json::Value> {
        match rx.try_recv().ok()? {
            ServerMessage::Event { event, .. } => Some(event),
            _ => None,
        }
    }

    #[test]
    fn broadcast_skips_sender_and_other_groups() {
        let mut state = RelayState::default();
        let (a, mut rx_a) = peer(&mut state, "a");
        let (b, mut rx_b) = peer(&mut state, "b");
        let (c, mut rx_c) = peer(&mut state, "c");
        let m1 = MatchId::new("m1");
        state.join(m1.clone(), &a);
        state.join(m1.clone(), &b);
        state.join(MatchId::new("m2"), &c);

        state.broadcast(&m1, &a, json!({"event": "restart", "from": "a"}));

        assert_eq!(forwarded(&mut rx_b), Some(json!({"event": "restart", "from": "a"})));
        assert_eq!(forwarded(&mut rx_a), None);
        assert_eq!(forwarded(&mut rx_c), None);
    }

    #[test]
    fn leaving_stops_delivery_and_drops_empty_groups() {
        let mut state = RelayState::default();
        let (a, _rx_a) = peer(&mut state, "a");
        let (b, mut rx_b) = peer(&mut state, "b");
        let m1 = MatchId::new("m1");
        state.join(m1.clone(), &a);
        state.join(m1.clone(), &b);

        state.leave(&m1, &b);
        state.broadcast(&m1, &a, json!({}));
        assert_eq!(forwarded(&mut rx_b), None);

        state.leave_all(&a);
        assert!(state.groups.is_empty());
        assert!(!state.peers.contains_key(&a));
    }
}
