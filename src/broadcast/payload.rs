use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::analyzer::AnalysisResult;
use crate::types::PublishOutcome;

/// One outbound push: either the enriched candle array or a tagged error.
///
/// Serialises untagged, so subscribers see a bare JSON array for data and a
/// `{ "error": "..." }` object otherwise.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FeedPayload {
    Analysis(AnalysisResult),
    Error { error: String },
}

impl FeedPayload {
    /// Convert the outcome of an analysis pass into a payload.
    ///
    /// A failed fetch and an empty result both become error payloads, with
    /// distinct messages, so clients never receive an empty array.
    pub fn from_outcome(outcome: Result<AnalysisResult>) -> Self {
        match outcome {
            Ok(result) if result.is_empty() => Self::Error {
                error: "no candle data available".to_string(),
            },
            Ok(result) => Self::Analysis(result),
            Err(e) => Self::Error {
                error: format!("failed to fetch market data: {e:#}"),
            },
        }
    }

    pub fn outcome(&self) -> PublishOutcome {
        match self {
            Self::Analysis(_) => PublishOutcome::Data,
            Self::Error { .. } => PublishOutcome::Error,
        }
    }

    /// Number of candles carried (zero for error payloads).
    pub fn candle_count(&self) -> usize {
        match self {
            Self::Analysis(result) => result.len(),
            Self::Error { .. } => 0,
        }
    }

    /// Serialise once for fan-out; the shared string is cloned per subscriber.
    pub fn to_json(&self) -> Arc<str> {
        match serde_json::to_string(self) {
            Ok(json) => json.into(),
            Err(e) => serde_json::json!({ "error": format!("failed to serialise analysis: {e}") })
                .to_string()
                .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SeriesAnalyzer;
    use crate::market_data::Candle;

    #[test]
    fn data_payload_is_a_bare_array() {
        let candles = vec![Candle::new(1, 1.0, 2.0, 0.5, 1.5, 3.0)];
        let payload = FeedPayload::from_outcome(Ok(SeriesAnalyzer::new().analyze(&candles)));
        assert_eq!(payload.outcome(), PublishOutcome::Data);
        assert_eq!(payload.candle_count(), 1);

        let json: serde_json::Value = serde_json::from_str(&payload.to_json()).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["close"], 1.5);
    }

    #[test]
    fn empty_result_becomes_error_object() {
        let payload = FeedPayload::from_outcome(Ok(Vec::new()));
        assert_eq!(payload.outcome(), PublishOutcome::Error);

        let json: serde_json::Value = serde_json::from_str(&payload.to_json()).unwrap();
        assert_eq!(json["error"], "no candle data available");
    }

    #[test]
    fn fetch_failure_becomes_error_object() {
        let payload = FeedPayload::from_outcome(Err(anyhow::anyhow!("timeout")));
        let json: serde_json::Value = serde_json::from_str(&payload.to_json()).unwrap();
        let message = json["error"].as_str().unwrap();
        assert!(message.starts_with("failed to fetch market data"));
        assert!(message.contains("timeout"));
        assert_eq!(payload.candle_count(), 0);
    }
}
