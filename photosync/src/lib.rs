pub mod auth_flow;
pub mod cli;
pub mod config;
pub mod logging;
pub mod progress;
pub mod prompt;
pub mod remote;
pub mod sync;
