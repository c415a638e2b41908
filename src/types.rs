use serde::{Deserialize, Serialize};

use crate::report::{ResultRow, SentimentSummary};

fn default_clean() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_clean")]
    pub clean: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub texts: Vec<String>,
    /// Newline separated texts, appended after `texts`.
    #[serde(default)]
    pub lines: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_clean")]
    pub clean: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsRequest {
    pub text: String,
}

/// Body sent to the inference endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InferencePayload<'a> {
    pub inputs: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f64,
}

/// Outcome of a single analysis. Exactly one of `sentiment` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub sentiment: Option<String>,
    pub confidence: f64,
    pub all_scores: Vec<ScoredLabel>,
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn success(sentiment: String, confidence: f64, all_scores: Vec<ScoredLabel>) -> Self {
        Self {
            sentiment: Some(sentiment),
            confidence,
            all_scores,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            sentiment: None,
            confidence: 0.0,
            all_scores: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextStats {
    pub character_count: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_word_length: f64,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub model_id: String,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub default_endpoint: String,
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: Option<String>,
    pub text: String,
    pub stats: TextStats,
    pub emoji: Option<&'static str>,
    pub result: AnalysisResult,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: Option<String>,
    pub summary: SentimentSummary,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
