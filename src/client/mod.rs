mod hud;
pub mod net;

use crate::config::ClientConfig;
use crate::protocol::CellIndex;
use net::{run_peer, Command, UiEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "type a cell number 0-8 to play, `r` to restart (host), `q` to quit";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    match line.trim() {
        "q" | "quit" => Some(Input::Quit),
        "r" | "restart" => Some(Input::Command(Command::Restart)),
        other => {
            let index: u8 = other.parse().ok()?;
            let cell = CellIndex::try_from(index).ok()?;
            Some(Input::Command(Command::Play(cell)))
        }
    }
}

pub async fn run_client(config: ClientConfig) -> anyhow::Result<()> {
    if config.location.is_founder {
        println!(
            "Share this match with the other player: --match {}",
            config.location.match_id
        );
    }
    println!("{}", HELP);

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let peer = tokio::spawn(run_peer(config, cmd_rx, ui_tx));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break; };
                match parse_input(&line) {
                    Some(Input::Command(command)) => {
                        let _ = cmd_tx.send(command);
                    }
                    Some(Input::Quit) => break,
                    None => println!("{}", HELP),
                }
            }
            event = ui_rx.recv() => {
                let Some(event) = event else { break; };
                match event {
                    UiEvent::View(view) => print!("{}", hud::render_view(&view)),
                    UiEvent::Notice(text) => println!("** {} **", text),
                }
            }
        }
    }

    peer.abort();
    Ok(())
}
