pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod server;
pub mod storage;

#[cfg(test)]
pub mod testing;
