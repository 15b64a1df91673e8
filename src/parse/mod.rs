// src/parse/mod.rs

pub mod srd_jsn;
pub mod man_scan;

use std::sync::Arc;
use thiserror::Error;


/// The two fields the aggregator consumes from an upstream payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedUpdate {
    /// Update identifier (`u`), the dedup key.
    pub msg_id: u64,
    /// Server timestamp (`T`) in milliseconds since epoch.
    pub server_ts_ms: i64,
}


#[derive(Debug, Error)]
pub enum ParseError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("payload is not a single JSON object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}


pub trait UpdateParser {
    fn parse(&self, raw: &str) -> Result<FeedUpdate, ParseError>;
}

pub fn create_parser() -> Arc<dyn UpdateParser + Send + Sync> {
    #[cfg(all(feature = "serde_parser", not(feature = "manual_parser")))]
    {
        return Arc::new(srd_jsn::SerdeJsonParser);
    }

    #[cfg(all(feature = "manual_parser", not(feature = "serde_parser")))]
    {
        return Arc::new(man_scan::ManualScanParser);
    }

    #[cfg(not(any(feature = "serde_parser", feature = "manual_parser")))]
    compile_error!("At least one parser feature (`serde_parser` or `manual_parser`) must be enabled.");

    #[cfg(all(feature = "serde_parser", feature = "manual_parser"))]
    compile_error!("Cannot enable both `serde_parser` and `manual_parser` features at the same time.");
}


#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MSG: &str = r#"{"e":"bookTicker","u":400900217,"s":"BTCUSDT","b":"25.35190000","B":"31.21000000","a":"25.36520000","A":"40.66000000","T":1568014460891,"E":1568014460893}"#;

    fn parsers() -> Vec<(&'static str, Box<dyn UpdateParser>)> {
        vec![
            ("serde_json", Box::new(srd_jsn::SerdeJsonParser)),
            ("manual_scan", Box::new(man_scan::ManualScanParser)),
        ]
    }

    #[test]
    fn test_serde_json_parser() {
        let parser = srd_jsn::SerdeJsonParser;
        let result = parser.parse(SAMPLE_MSG).expect("Serde parser failed");

        assert_eq!(result.msg_id, 400900217);
        assert_eq!(result.server_ts_ms, 1568014460891);
    }

    #[test]
    fn test_manual_scan_parser() {
        let parser = man_scan::ManualScanParser;
        let result = parser.parse(SAMPLE_MSG).expect("Manual parser failed");

        assert_eq!(result.msg_id, 400900217);
        assert_eq!(result.server_ts_ms, 1568014460891);
    }

    #[test]
    fn test_parsers_consistency() {
        let serde_result = srd_jsn::SerdeJsonParser.parse(SAMPLE_MSG).expect("Serde parser failed");
        let manual_result = man_scan::ManualScanParser.parse(SAMPLE_MSG).expect("Manual parser failed");

        assert_eq!(serde_result, manual_result, "Parsers disagree");

        let nested = r#"{"d":{"u":5,"T":1},"l":[{"u":6}],"u":3,"T":9}"#;
        let serde_nested = srd_jsn::SerdeJsonParser.parse(nested).expect("Serde parser failed");
        let manual_nested = man_scan::ManualScanParser.parse(nested).expect("Manual parser failed");

        assert_eq!(manual_nested, FeedUpdate { msg_id: 3, server_ts_ms: 9 });
        assert_eq!(serde_nested, manual_nested, "Parsers disagree on nested keys");
    }

    #[test]
    fn test_missing_fields_rejected() {
        for (name, parser) in parsers() {
            assert!(parser.parse(r#"{"T":1000,"x":"a"}"#).is_err(), "{name} accepted missing u");
            assert!(parser.parse(r#"{"u":1,"x":"a"}"#).is_err(), "{name} accepted missing T");
        }
    }

    #[test]
    fn test_wrong_types_rejected() {
        for (name, parser) in parsers() {
            assert!(parser.parse(r#"{"u":"1","T":1000}"#).is_err(), "{name} accepted string u");
            assert!(parser.parse(r#"{"u":-1,"T":1000}"#).is_err(), "{name} accepted negative u");
            assert!(parser.parse(r#"{"u":1.5,"T":1000}"#).is_err(), "{name} accepted float u");
            assert!(parser.parse(r#"{"u":1,"T":true}"#).is_err(), "{name} accepted bool T");
        }
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        let malformed = [
            r#""u":1,"T":2"#,
            r#"{"u":1,"T":2"#,
            r#"garbage{"u":1,"T":2}"#,
            r#"{"u":1,"T":2}garbage"#,
            r#"{"u":1,"T":2}}"#,
            r#"{"u":01,"T":2}"#,
            r#"{"u":1,"T":-02}"#,
            r#"{"u":1,"T":2,"u":3}"#,
            r#"{"u":1,"T":2,"s":"open}"#,
            r#"[{"u":1,"T":2}]"#,
        ];
        for (name, parser) in parsers() {
            for payload in malformed {
                assert!(parser.parse(payload).is_err(), "{name} accepted {payload}");
            }
        }
    }

    #[test]
    fn test_escaped_quotes_and_nested_strings() {
        for (name, parser) in parsers() {
            let update = parser
                .parse(r#"{"s":"a\"u\":1","n":{"x":"}"},"u":4,"T":8}"#)
                .unwrap_or_else(|e| panic!("{name} failed: {e}"));
            assert_eq!(update, FeedUpdate { msg_id: 4, server_ts_ms: 8 });
        }
    }

    #[test]
    fn test_negative_timestamp_and_whitespace() {
        for (name, parser) in parsers() {
            let update = parser
                .parse(r#"{ "u" : 7 , "T" : -25 }"#)
                .unwrap_or_else(|e| panic!("{name} failed: {e}"));
            assert_eq!(update, FeedUpdate { msg_id: 7, server_ts_ms: -25 });
        }
    }

    #[test]
    fn test_manual_scan_skips_string_values_named_like_keys() {
        let update = man_scan::ManualScanParser
            .parse(r#"{"s":"u","x":"T","u":3,"T":9}"#)
            .expect("Manual parser failed");
        assert_eq!(update, FeedUpdate { msg_id: 3, server_ts_ms: 9 });
    }
}
