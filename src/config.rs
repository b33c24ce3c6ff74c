use crate::protocol::MatchId;
use clap::{Parser, Subcommand};
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9002";
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:9002/ws";
pub const DEFAULT_CATCH_UP_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;

#[derive(Debug, Parser)]
#[command(name = "tic-tac-party", about = "Serverless tic-tac-toe over a broadcast relay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the group relay
    Relay {
        #[arg(default_value = DEFAULT_BIND_ADDR)]
        bind: String,
    },
    /// Join or create a match
    Play {
        #[arg(long, default_value = DEFAULT_RELAY_URL)]
        relay: String,
        /// Match to enter; a new one is created when omitted
        #[arg(long = "match")]
        match_id: Option<String>,
        /// Act as the creator of `--match`
        #[arg(long)]
        founder: bool,
        #[arg(long, default_value_t = DEFAULT_CATCH_UP_TIMEOUT_MS)]
        catch_up_timeout_ms: u64,
        #[arg(long, default_value_t = DEFAULT_RECONNECT_DELAY_MS)]
        reconnect_delay_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub match_id: MatchId,
    pub is_founder: bool,
}

impl Location {
    pub fn resolve(match_id: Option<String>, founder: bool) -> Self {
        match match_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => Self {
                match_id: MatchId::new(id.trim()),
                is_founder: founder,
            },
            None => Self {
                match_id: MatchId::generate(),
                is_founder: true,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_url: String,
    pub location: Location,
    pub catch_up_timeout: Duration,
    pub reconnect_delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_match_creates_a_founded_one() {
        let location = Location::resolve(None, false);
        assert!(location.is_founder);
        assert!(location.match_id.as_str().starts_with('_'));

        let blank = Location::resolve(Some("  ".to_string()), false);
        assert!(blank.is_founder);
    }

    #[test]
    fn given_match_keeps_founder_flag() {
        let joiner = Location::resolve(Some("_abc".to_string()), false);
        assert_eq!(joiner.match_id, MatchId::new("_abc"));
        assert!(!joiner.is_founder);

        let founder = Location::resolve(Some("_abc".to_string()), true);
        assert!(founder.is_founder);
    }

    #[test]
    fn play_defaults() {
        let cli = Cli::try_parse_from(["tic-tac-party", "play", "--match", "_m"]).unwrap();
        let Command::Play {
            relay,
            match_id,
            founder,
            catch_up_timeout_ms,
            reconnect_delay_ms,
        } = cli.command
        else {
            panic!("expected play");
        };
        assert_eq!(relay, DEFAULT_RELAY_URL);
        assert_eq!(match_id.as_deref(), Some("_m"));
        assert!(!founder);
        assert_eq!(catch_up_timeout_ms, 2000);
        assert_eq!(reconnect_delay_ms, 5000);
    }

    #[test]
    fn relay_bind_defaults() {
        let cli = Cli::try_parse_from(["tic-tac-party", "relay"]).unwrap();
        assert!(matches!(cli.command, Command::Relay { bind } if bind == DEFAULT_BIND_ADDR));
    }
}
