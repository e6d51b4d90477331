//! Core domain + application logic for chat sweeping.
//!
//! Bulk purges, member removal, mention broadcasts and the undo-window
//! scheduler live here. The chat backend, the operator notifier and the chat
//! metadata cache are ports (traits) implemented in adapter crates.

pub mod actions;
pub mod broadcast;
pub mod config;
pub mod deferred;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod notify;
pub mod permission;
pub mod purge;
pub mod remote;
pub mod security;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
