// src/lib.rs
#![doc = include_str!("../README.md")]

#[doc = include_str!("../doc/ws.md")]
pub mod ws;

#[doc = include_str!("../doc/parse.md")]
pub mod parse;

pub mod config;
pub mod dedup;

#[doc = include_str!("../doc/latency.md")]
pub mod latency;

pub mod reader;

#[doc = include_str!("../doc/sink.md")]
pub mod sink;

pub mod supervisor;
pub mod mock_feed;

#[cfg(test)]
mod log_capture;
