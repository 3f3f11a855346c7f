//! Access Relay: chat-triggered gate access control.

pub mod access;
pub mod channels;
pub mod config;
pub mod error;
pub mod panel;
pub mod routes;
pub mod store;
