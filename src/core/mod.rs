//! Core translation engine module

pub mod cache;
pub mod candidates;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod language;
pub mod models;
pub mod render;
pub mod usage;

#[cfg(test)]
pub(crate) mod testing;
