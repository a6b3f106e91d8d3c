//! Recovery cascade for model-authored JSON arrays.
//!
//! The response is cleaned once, then each strategy runs on the cleaned
//! text in turn until one yields at least one record. Nothing here fails:
//! an unrecoverable response is an empty result.

mod clean;
mod strategies;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::Record;

pub use clean::{clean_response, fix_common_issues, normalize_python_literals};
pub use strategies::{
    direct_parse, line_repair, object_extraction, split_repair, streaming_truncation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    Direct,
    LineRepair,
    ObjectExtraction,
    SplitRepair,
    StreamingTruncation,
}

impl RecoveryStrategy {
    /// Cascade order.
    pub const ALL: [RecoveryStrategy; 5] = [
        RecoveryStrategy::Direct,
        RecoveryStrategy::LineRepair,
        RecoveryStrategy::ObjectExtraction,
        RecoveryStrategy::SplitRepair,
        RecoveryStrategy::StreamingTruncation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStrategy::Direct => "direct",
            RecoveryStrategy::LineRepair => "line_repair",
            RecoveryStrategy::ObjectExtraction => "object_extraction",
            RecoveryStrategy::SplitRepair => "split_repair",
            RecoveryStrategy::StreamingTruncation => "streaming_truncation",
        }
    }

    pub fn apply(&self, content: &str) -> Option<Vec<Record>> {
        match self {
            RecoveryStrategy::Direct => direct_parse(content),
            RecoveryStrategy::LineRepair => line_repair(content),
            RecoveryStrategy::ObjectExtraction => object_extraction(content),
            RecoveryStrategy::SplitRepair => split_repair(content),
            RecoveryStrategy::StreamingTruncation => streaming_truncation(content),
        }
    }
}

/// Records recovered from one response.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub records: Vec<Record>,
    pub strategy: RecoveryStrategy,
}

/// Run the cascade; `None` when every strategy comes back empty.
pub fn recover_records(content: &str) -> Option<Recovered> {
    let cleaned = clean_response(content);

    for strategy in RecoveryStrategy::ALL {
        match strategy.apply(&cleaned) {
            Some(records) if !records.is_empty() => {
                debug!(strategy = strategy.as_str(), records = records.len(), "recovered records");
                return Some(Recovered { records, strategy });
            }
            _ => debug!(strategy = strategy.as_str(), "strategy yielded nothing"),
        }
    }

    None
}

/// First `max` characters of `text`, for log previews.
pub(crate) fn preview(text: &str, max: usize) -> &str {
    crate::request::truncate_chars(text, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_array_uses_direct_strategy() {
        let recovered = recover_records("```json\n[{\"id\": 1}, {\"id\": 2},]\n```").expect("records");
        assert_eq!(recovered.strategy, RecoveryStrategy::Direct);
        assert_eq!(recovered.records.len(), 2);
    }

    #[test]
    fn truncated_array_still_yields_complete_objects() {
        let recovered = recover_records(r#"[{"id":1,"name":"A"},{"id":2,"name""#).expect("records");
        assert_eq!(recovered.records.len(), 1);
        assert_eq!(recovered.records[0]["name"], "A");
    }

    #[test]
    fn bracket_inside_earlier_record_does_not_cut_truncated_reply() {
        let mut raw = String::from(r#"[{"id":1,"note":"see [ref]"}"#);
        for id in 2..=40 {
            raw.push_str(&format!(r#",{{"id":{id},"note":"plain"}}"#));
        }
        raw.push_str(r#",{"id":41,"no"#);

        let recovered = recover_records(&raw).expect("records");
        assert_eq!(recovered.records.len(), 40);
        assert_eq!(recovered.records[0]["note"], "see [ref]");
        assert_eq!(recovered.records[39]["id"], 40);
    }

    #[test]
    fn nested_arrays_in_truncated_reply_are_kept() {
        let recovered =
            recover_records(r#"[{"id":1,"tags":["a","b"]},{"id":2,"tags":["c"]},{"id":3,"na"#)
                .expect("records");
        let ids: Vec<_> = recovered.records.iter().map(|record| record["id"].clone()).collect();
        assert_eq!(ids, vec![serde_json::json!(1), serde_json::json!(2)]);
    }

    #[test]
    fn prose_refusal_yields_nothing() {
        assert!(recover_records("I'm sorry, I can't help with that.").is_none());
        assert!(recover_records("[]").is_none());
    }
}
