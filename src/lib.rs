pub mod cli;
pub mod config;
pub mod deck;
pub mod errors;
pub mod exec;
pub mod log;
pub mod prompt;
pub mod provider;
pub mod report;
pub mod session;
pub mod teller;
pub mod ux;
pub mod vocab;
pub mod wire;
