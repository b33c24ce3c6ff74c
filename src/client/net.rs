use crate::config::ClientConfig;
use crate::protocol::{CellIndex, ClientMessage, Event, PeerId, ServerMessage};
use crate::session::{Effect, Session, View};
use anyhow::Context;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play(CellIndex),
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    View(View),
    Notice(String),
}

/// Drives one peer until the command channel closes. A dropped or refused
/// relay connection is retried after `reconnect_delay`; the session
/// survives the reconnect.
pub async fn run_peer(
    config: ClientConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
) -> anyhow::Result<()> {
    let location = &config.location;
    let mut session = if location.is_founder {
        Session::found(location.match_id.clone(), config.catch_up_timeout)
    } else {
        Session::join(location.match_id.clone(), config.catch_up_timeout)
    };

    loop {
        match network_task(&config.relay_url, &mut session, &mut commands, &ui_tx).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                log::warn!(
                    "relay connection lost: {:#}; retrying in {:?}",
                    err,
                    config.reconnect_delay
                );
                time::sleep(config.reconnect_delay).await;
            }
        }
    }
}

async fn network_task(
    relay_url: &str,
    session: &mut Session,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    ui_tx: &mpsc::UnboundedSender<UiEvent>,
) -> anyhow::Result<()> {
    let (ws_stream, _) = connect_async(relay_url)
        .await
        .with_context(|| format!("failed connecting to {}", relay_url))?;
    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut peer_id: Option<PeerId> = None;

    loop {
        let deadline = session.catch_up_deadline();
        let effects = tokio::select! {
            incoming = ws_read.next() => {
                let Some(msg_result) = incoming else {
                    anyhow::bail!("relay closed the connection");
                };
                let msg = msg_result?;
                if !msg.is_text() {
                    continue;
                }
                let text = msg.into_text()?;
                let server_msg: ServerMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(err) => {
                        log::warn!("bad relay message: {}", err);
                        continue;
                    }
                };
                match server_msg {
                    ServerMessage::Welcome { peer_id: id } => {
                        log::debug!("relay assigned peer id {}", id);
                        peer_id = Some(id);
                        let join = ClientMessage::JoinGroup {
                            match_id: session.match_id().clone(),
                        };
                        send(&mut ws_write, &join).await?;
                        Vec::new()
                    }
                    ServerMessage::ConnectedToGroup { match_id } => {
                        match peer_id.clone() {
                            Some(id) if &match_id == session.match_id() => {
                                session.on_connected(id, Instant::now())
                            }
                            _ => Vec::new(),
                        }
                    }
                    ServerMessage::Event { match_id, event } => {
                        if &match_id != session.match_id() {
                            continue;
                        }
                        match serde_json::from_value::<Event>(event) {
                            Ok(event) => session.on_event(event),
                            Err(err) => {
                                log::warn!("bad game event: {}", err);
                                Vec::new()
                            }
                        }
                    }
                }
            }
            command = commands.recv() => match command {
                Some(Command::Play(cell)) => session.play(cell),
                Some(Command::Restart) => session.restart(),
                None => return Ok(()),
            },
            _ = wait_for(deadline) => session.on_catch_up_timeout(Instant::now()),
        };

        for effect in effects {
            match effect {
                Effect::Broadcast(event) => {
                    let msg = ClientMessage::Broadcast {
                        match_id: session.match_id().clone(),
                        event: serde_json::to_value(&event)?,
                    };
                    send(&mut ws_write, &msg).await?;
                }
                Effect::Render(view) => {
                    let _ = ui_tx.send(UiEvent::View(view));
                }
                Effect::Notice(text) => {
                    let _ = ui_tx.send(UiEvent::Notice(text));
                }
                Effect::Abandon => {
                    let leave = ClientMessage::LeaveGroup {
                        match_id: session.match_id().clone(),
                    };
                    send(&mut ws_write, &leave).await?;
                    session.abandon();
                    let join = ClientMessage::JoinGroup {
                        match_id: session.match_id().clone(),
                    };
                    send(&mut ws_write, &join).await?;
                }
            }
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn send<S>(sink: &mut S, msg: &ClientMessage) -> anyhow::Result<()>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let payload = serde_json::to_string(msg)?;
    sink.send(Message::Text(payload)).await?;
    Ok(())
}
