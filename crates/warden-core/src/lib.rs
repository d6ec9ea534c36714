//! Core domain + decision logic for the warden group moderation bot.
//!
//! This crate is platform-agnostic. The chat platform (Telegram today)
//! lives behind the transport port (trait) implemented in adapter crates;
//! the engine consumes canonical events from a channel and never touches
//! the wire.

pub mod audit;
pub mod authz;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod event;
pub mod logging;
pub mod policy;
pub mod store;
pub mod transport;

pub use errors::{Error, Result};
