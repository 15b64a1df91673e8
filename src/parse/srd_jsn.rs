// src/parse/srd_jsn.rs
use serde::Deserialize;

use super::{FeedUpdate, ParseError, UpdateParser};

pub struct SerdeJsonParser;

/// Simple serde_json parser implementation
impl UpdateParser for SerdeJsonParser {
    fn parse(&self, raw: &str) -> Result<FeedUpdate, ParseError> {
        let parsed: UpdateWs = serde_json::from_str(raw)?;
        Ok(FeedUpdate {
            msg_id: parsed.u,
            server_ts_ms: parsed.t,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UpdateWs {
    pub u: u64,
    #[serde(rename = "T")]
    pub t: i64,
}
