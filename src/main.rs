use clap::Parser;
use std::time::Duration;
use tic_tac_party::config::{Cli, ClientConfig, Command, Location};
use tic_tac_party::{client, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Relay { bind } => {
            println!("Relay listening on ws://{bind}/ws");
            server::run_server(bind).await
        }
        Command::Play {
            relay,
            match_id,
            founder,
            catch_up_timeout_ms,
            reconnect_delay_ms,
        } => {
            let config = ClientConfig {
                relay_url: relay,
                location: Location::resolve(match_id, founder),
                catch_up_timeout: Duration::from_millis(catch_up_timeout_ms),
                reconnect_delay: Duration::from_millis(reconnect_delay_ms),
            };
            client::run_client(config).await
        }
    }
}
