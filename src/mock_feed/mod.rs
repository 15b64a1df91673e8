// src/mock_feed/mod.rs

//! In-process stand-in for the upstream bookTicker stream.

pub mod hot_cache;
pub mod ws_server;
