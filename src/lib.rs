//! Long-polling chat relay.
//!
//! Clients post messages over HTTP; every client blocked in a
//! `GET /messages` long-poll is woken with the next one. History is kept in
//! SQLite. The [`relay`] module holds the coordination core, [`server`] the
//! axum front end, and [`client`] a console client.

pub mod client;
pub mod common;
pub mod config;
pub mod filter;
pub mod relay;
pub mod server;
pub mod storage;
