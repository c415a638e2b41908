//! Client for the hosted sentiment models.
//!
//! Validation failures, transport errors and unexpected payloads become
//! [`AnalysisResult::failure`] values. Only a missing credential is returned as
//! an [`AnalyzerError`].

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

use crate::backend::{BackendReply, InferenceBackend};
use crate::config::{ClientConfig, ModelCatalog};
use crate::error::AnalyzerError;
use crate::types::{AnalysisResult, InferencePayload, ScoredLabel};

const EMPTY_TEXT: &str = "Please enter some text to analyze";
const REQUEST_FAILED: &str = "Failed to get response from API. Please try again.";
const UNEXPECTED_FORMAT: &str = "Unexpected API response format";

static STAR_RATING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([1-5])\s*stars?\s*$").expect("valid star pattern"));

pub struct SentimentClient {
    config: ClientConfig,
    backend: Arc<dyn InferenceBackend>,
}

impl SentimentClient {
    pub fn new(config: ClientConfig, backend: Arc<dyn InferenceBackend>) -> Self {
        Self { config, backend }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.config.catalog
    }

    pub fn default_endpoint(&self) -> &str {
        &self.config.api_url
    }

    pub fn max_text_length(&self) -> usize {
        self.config.max_text_length
    }

    /// Endpoint for `model`, or the default endpoint when it is absent or unknown.
    pub fn endpoint_for(&self, model: Option<&str>) -> (String, bool) {
        match model.and_then(|name| self.config.catalog.resolve(name)) {
            Some(id) => (format!("{}/{}", self.config.model_base_url, id), false),
            None => (self.config.api_url.clone(), true),
        }
    }

    /// Sends `text` to the selected model and returns the decoded JSON body.
    ///
    /// `Ok(None)` is a soft failure: non-success status, transport error or a
    /// body that is not JSON. A model that is still loading (503) is retried once
    /// after the configured delay.
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn query(&self, text: &str, model: Option<&str>) -> Result<Option<Value>, AnalyzerError> {
        let token = self
            .config
            .api_token
            .as_deref()
            .ok_or(AnalyzerError::MissingToken)?;

        let (url, is_default) = self.endpoint_for(model);
        let payload = InferencePayload { inputs: text };

        if let Some(body) = self.send(&url, token, &payload).await {
            return Ok(Some(body));
        }

        if is_default {
            if let Some(backup) = &self.config.backup_api_url {
                tracing::info!(%backup, "Default endpoint failed, trying backup endpoint");
                return Ok(self.send(backup, token, &payload).await);
            }
        }

        Ok(None)
    }

    async fn send(&self, url: &str, token: &str, payload: &InferencePayload<'_>) -> Option<Value> {
        let mut reply = self.backend.post(url, token, payload).await;

        if matches!(&reply, Ok(r) if r.is_loading()) {
            counter!("sentiment_backend_retries_total").increment(1);
            tracing::info!(
                delay_secs = self.config.retry_delay.as_secs_f64(),
                "Model is loading, retrying once"
            );
            tokio::time::sleep(self.config.retry_delay).await;
            reply = self.backend.post(url, token, payload).await;
        }

        match reply {
            Ok(BackendReply { status: 200, body }) => match serde_json::from_str(&body) {
                Ok(value) => Some(value),
                Err(e) => {
                    counter!("sentiment_backend_failures_total").increment(1);
                    tracing::warn!(error = %e, "Inference response is not valid JSON");
                    None
                }
            },
            Ok(BackendReply { status, body }) => {
                counter!("sentiment_backend_failures_total").increment(1);
                tracing::warn!(status, %body, "API error");
                None
            }
            Err(e) => {
                counter!("sentiment_backend_failures_total").increment(1);
                tracing::warn!(error = %e, "Request failed");
                None
            }
        }
    }

    /// Validates `text`, queries the model and turns the scores into a result.
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn analyze(&self, text: &str, model: Option<&str>) -> Result<AnalysisResult, AnalyzerError> {
        counter!("sentiment_requests_total").increment(1);

        if text.trim().is_empty() {
            return Ok(AnalysisResult::failure(EMPTY_TEXT));
        }

        let max = self.config.max_text_length;
        if text.chars().count() > max {
            return Ok(AnalysisResult::failure(format!(
                "Text too long. Maximum {max} characters allowed."
            )));
        }

        let Some(body) = self.query(text, model).await? else {
            return Ok(AnalysisResult::failure(REQUEST_FAILED));
        };

        let result = match parse_scores(body) {
            Ok(scores) => {
                let sentiment = normalize_label(&scores[0].label);
                let confidence = scores[0].score;
                AnalysisResult::success(sentiment, confidence, scores)
            }
            Err(message) => {
                tracing::warn!(%message, "Could not interpret inference response");
                AnalysisResult::failure(message)
            }
        };
        Ok(result)
    }

    /// Analyzes `texts` one after another, pausing between requests.
    ///
    /// Returns one result per input in input order; only a missing credential
    /// aborts the batch.
    #[tracing::instrument(skip(self, texts), fields(batch_size = texts.len()))]
    pub async fn analyze_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        model: Option<&str>,
    ) -> Result<Vec<AnalysisResult>, AnalyzerError> {
        let mut results = Vec::with_capacity(texts.len());

        for (index, text) in texts.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.pacing).await;
            }
            results.push(self.analyze(text.as_ref(), model).await?);
            counter!("sentiment_batch_items_total").increment(1);

            let done = index + 1;
            if done % self.config.progress_every.max(1) == 0 || done == texts.len() {
                tracing::debug!(done, total = texts.len(), "Batch progress");
            }
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(total = results.len(), failed, "Batch analyzed");
        Ok(results)
    }
}

/// Extracts the score list from `[[{label, score}, ...]]` and sorts it by score, highest first.
fn parse_scores(body: Value) -> Result<Vec<ScoredLabel>, String> {
    let first = match body {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        _ => return Err(UNEXPECTED_FORMAT.to_string()),
    };

    let mut scores: Vec<ScoredLabel> = serde_json::from_value(first)
        .map_err(|e| format!("Error processing API response: {e}"))?;
    if scores.is_empty() {
        return Err("Error processing API response: empty score list".to_string());
    }

    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(scores)
}

/// Maps the label vocabularies of the supported models onto Positive, Negative
/// and Neutral. Unknown labels are title-cased.
pub fn normalize_label(label: &str) -> String {
    let lower = label.to_lowercase();
    let stars = STAR_RATING
        .captures(&lower)
        .and_then(|caps| caps[1].parse::<u8>().ok());

    if lower.contains("pos") || matches!(stars, Some(4 | 5)) {
        "Positive".to_string()
    } else if lower.contains("neg") || matches!(stars, Some(1 | 2)) {
        "Negative".to_string()
    } else if lower.contains("neu") || stars == Some(3) {
        "Neutral".to_string()
    } else {
        title_case(label)
    }
}

// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

pub fn emoji_for(sentiment: &str) -> &'static str {
    match sentiment {
        "Positive" => "😊",
        "Negative" => "😞",
        "Neutral" => "😐",
        "Joy" => "😄",
        "Sadness" => "😢",
        "Anger" => "😠",
        "Fear" => "😨",
        "Surprise" => "😮",
        _ => "🤔",
    }
}
