// src/mock_feed/hot_cache.rs

use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration
};

use serde_json::json;
use tokio::sync::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

use crate::reader::now_ms;

/// A shared, concurrent map of symbol → pre-serialized bookTicker messages.
pub type HotCache = Arc<RwLock<HashMap<String, String>>>;

/// Spawns the background task that refreshes every symbol's tick each `interval_ms`.
///
/// Update ids come from one counter shared by all symbols, so `u` is unique
/// across the whole cache, and `T` is the wall clock at refresh time.
pub fn start_hot_cache_updater(symbols: Vec<String>, interval_ms: u64) -> HotCache {
    let cache: HotCache = Arc::new(RwLock::new(HashMap::new()));
    let cache_clone = Arc::clone(&cache);

    tokio::spawn(async move {
        let mut rng = ChaCha12Rng::from_entropy();
        let interval = Duration::from_millis(interval_ms);
        let mut next_id: u64 = 1;

        loop {
            {
                let mut guard = cache_clone.write().await;

                for symbol in &symbols {
                    let u = next_id;
                    next_id += 1;
                    let ts = now_ms();
                    let bid = rng.gen_range(10000.0..30000.0);
                    let ask = bid + rng.gen_range(0.01..0.05);
                    let tick = json!({
                        "e": "bookTicker",
                        "u": u,
                        "s": symbol,
                        "b": format!("{:.8}", bid),
                        "B": format!("{:.8}", rng.gen_range(1.0..100.0)),
                        "a": format!("{:.8}", ask),
                        "A": format!("{:.8}", rng.gen_range(1.0..100.0)),
                        "T": ts,
                        "E": ts,
                    });

                    guard.insert(symbol.clone(), tick.to_string());
                }
            }
            tokio::time::sleep(interval).await;
        }
    });
    cache
}
