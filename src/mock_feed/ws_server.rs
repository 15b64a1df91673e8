// src/mock_feed/ws_server.rs

use std::sync::Arc;

use tokio::{net::{TcpListener, TcpStream}, time::{sleep, Duration}};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::SinkExt;
use tracing::{debug, info, warn};

use super::hot_cache::HotCache;


/// How the mock server paces and ends each session.
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    /// Pause between two rounds of sends.
    pub interval_ms: u64,
    /// Close the session after this many frames; `None` streams forever.
    pub max_frames: Option<usize>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            max_frames: None,
        }
    }
}

/// Accepts WebSocket clients on `listener` and streams the cache to each of them.
///
/// Every client receives the same current payloads, so concurrent clients see
/// the same update ids, and a slow cache makes a client see an id repeatedly.
pub async fn run(listener: TcpListener, cache: HotCache, options: ServeOptions) {
    if let Ok(addr) = listener.local_addr() {
        info!("Mock WebSocket feed on ws://{}", addr);
    }
    while let Ok((stream, _)) = listener.accept().await {
        let cache = Arc::clone(&cache);
        tokio::spawn(handle_connection(stream, cache, options));
    }
}

async fn handle_connection(stream: TcpStream, cache: HotCache, options: ServeOptions) {
    let mut ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Mock feed handshake failed: {e}");
            return;
        }
    };
    debug!("Mock feed client connected");

    let mut sent = 0usize;
    loop {
        let payloads: Vec<String> = cache.read().await.values().cloned().collect();

        for payload in payloads {
            if options.max_frames.is_some_and(|max| sent >= max) {
                let _ = ws_stream.close(None).await;
                debug!("Mock feed closed session after {sent} frames");
                return;
            }
            if ws_stream.send(Message::text(payload)).await.is_err() {
                debug!("Mock feed client disconnected");
                return;
            }
            sent += 1;
        }

        sleep(Duration::from_millis(options.interval_ms)).await;
    }
}
