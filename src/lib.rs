pub mod client;
pub mod config;
pub mod event_log;
pub mod game;
pub mod protocol;
pub mod server;
pub mod session;
pub mod timer;
