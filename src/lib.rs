pub mod assistant;
pub mod cli;
pub mod config;
pub mod countdown;
pub mod error;
pub mod report;
pub mod session;
pub mod severity;
pub mod shell;
pub mod suggest;
