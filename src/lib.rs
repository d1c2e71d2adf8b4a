//! Tug contest server
//!
//! A server-authoritative two-player reaction contest. Clients stream button
//! edges as Controls frames over a WebSocket; the server ticks the match and
//! answers every tick with a full State snapshot.

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
