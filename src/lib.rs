pub mod cli;
pub mod config;
pub mod error;
pub mod parser;
pub mod poller;
pub mod server;
pub mod source;
pub mod storage;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;
