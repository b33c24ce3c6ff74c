use std::time::Duration;
use tic_tac_party::client::net::{run_peer, Command, UiEvent};
use tic_tac_party::config::{ClientConfig, Location};
use tic_tac_party::game::Mark;
use tic_tac_party::protocol::{CellIndex, MatchId};
use tic_tac_party::server;
use tic_tac_party::session::{Role, View, HOST_UNREACHABLE_NOTICE};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

struct Peer {
    commands: mpsc::UnboundedSender<Command>,
    ui: mpsc::UnboundedReceiver<UiEvent>,
}

impl Peer {
    fn spawn(relay_url: &str, match_id: &str, is_founder: bool) -> Self {
        let config = ClientConfig {
            relay_url: relay_url.to_string(),
            location: Location {
                match_id: MatchId::new(match_id),
                is_founder,
            },
            catch_up_timeout: Duration::from_millis(300),
            reconnect_delay: Duration::from_millis(100),
        };
        let (commands, cmd_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui) = mpsc::unbounded_channel();
        tokio::spawn(run_peer(config, cmd_rx, ui_tx));
        Self { commands, ui }
    }

    async fn next_event(&mut self) -> UiEvent {
        timeout(Duration::from_secs(5), self.ui.recv())
            .await
            .expect("peer went quiet")
            .expect("peer stopped")
    }

    async fn view_where(&mut self, pred: impl Fn(&View) -> bool) -> View {
        loop {
            if let UiEvent::View(view) = self.next_event().await {
                if pred(&view) {
                    return view;
                }
            }
        }
    }

    fn play(&self, i: u8) {
        let cell = CellIndex::try_from(i).unwrap();
        self.commands.send(Command::Play(cell)).unwrap();
    }
}

async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener));
    format!("ws://{addr}/ws")
}

#[tokio::test]
async fn guest_catches_up_and_both_see_moves() {
    let url = start_relay().await;

    let mut host = Peer::spawn(&url, "_sync", true);
    let waiting = host.view_where(|_| true).await;
    assert_eq!(waiting.role, Some(Role::Host));
    assert_eq!(waiting.status, "Waiting for another player");

    let mut guest = Peer::spawn(&url, "_sync", false);
    let joined = guest.view_where(|v| v.role.is_some()).await;
    assert_eq!(joined.role, Some(Role::Guest));
    host.view_where(|v| v.status == "It's your turn").await;

    host.play(0);
    let seen = guest
        .view_where(|v| v.state.cells()[0] == Some(Mark::X))
        .await;
    assert_eq!(seen.status, "It's your turn");

    guest.play(4);
    host.view_where(|v| v.state.cells()[4] == Some(Mark::O))
        .await;

    let mut spectator = Peer::spawn(&url, "_sync", false);
    let caught_up = spectator.view_where(|v| v.role.is_some()).await;
    assert_eq!(caught_up.role, Some(Role::Spectator));
    assert_eq!(caught_up.state.cells()[0], Some(Mark::X));
    assert_eq!(caught_up.state.cells()[4], Some(Mark::O));
    assert_eq!(caught_up.state.current_player(), Mark::X);
}

#[tokio::test]
async fn joiner_without_host_founds_a_new_match() {
    let url = start_relay().await;

    let mut lonely = Peer::spawn(&url, "_nobody", false);
    let mut noticed = false;
    let view = loop {
        match lonely.next_event().await {
            UiEvent::Notice(text) => {
                assert_eq!(text, HOST_UNREACHABLE_NOTICE);
                noticed = true;
            }
            UiEvent::View(view) if view.role == Some(Role::Host) => break view,
            UiEvent::View(_) => {}
        }
    };
    assert!(noticed);
    assert_ne!(view.match_id, MatchId::new("_nobody"));
    assert_eq!(view.status, "Waiting for another player");
}

#[tokio::test]
async fn peer_keeps_retrying_until_the_relay_is_up() {
    let placeholder = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = placeholder.local_addr().unwrap();
    drop(placeholder);
    let url = format!("ws://{addr}/ws");

    let mut host = Peer::spawn(&url, "_late", true);
    // Long enough for at least one refused connect and one retry delay.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(server::serve(listener));

    let waiting = host.view_where(|_| true).await;
    assert_eq!(waiting.role, Some(Role::Host));
    assert_eq!(waiting.match_id, MatchId::new("_late"));
    assert_eq!(waiting.status, "Waiting for another player");

    let mut guest = Peer::spawn(&url, "_late", false);
    let joined = guest.view_where(|v| v.role.is_some()).await;
    assert_eq!(joined.role, Some(Role::Guest));
    host.view_where(|v| v.status == "It's your turn").await;
}
