//! Upstream sale feed transport
//!
//! A socket.io v4 client (msgpack parser) over a plain websocket:
//! `protocol` turns frames into packets, `client` owns the connection
//! lifecycle.

pub mod client;
pub mod protocol;

pub use client::FeedClient;
