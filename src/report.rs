//! Tabular view of batch results and CSV export.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::ReportError;
use crate::types::{AnalysisResult, ScoredLabel};

pub const CSV_FILE_NAME: &str = "sentiment_analysis_results.csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub text: String,
    pub sentiment: Option<String>,
    pub confidence: f64,
    pub error: Option<String>,
    /// Raw backend label and score pairs, highest score first.
    pub scores: Vec<ScoredLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentCount {
    pub sentiment: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub total: usize,
    pub failed: usize,
    pub distribution: Vec<SentimentCount>,
}

/// Pairs each result with the text it was computed for. Missing texts are named `Text N`.
pub fn rows<S: AsRef<str>>(results: &[AnalysisResult], texts: &[S]) -> Vec<ResultRow> {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| ResultRow {
            text: texts
                .get(i)
                .map(|t| t.as_ref().to_string())
                .unwrap_or_else(|| format!("Text {}", i + 1)),
            sentiment: result.sentiment.clone(),
            confidence: result.confidence,
            error: result.error.clone(),
            scores: result.all_scores.clone(),
        })
        .collect()
}

/// Counts sentiments over successful results, most frequent first.
pub fn summarize(results: &[AnalysisResult]) -> SentimentSummary {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for sentiment in results.iter().filter_map(|r| r.sentiment.as_deref()) {
        *counts.entry(sentiment).or_default() += 1;
    }

    let mut distribution: Vec<SentimentCount> = counts
        .into_iter()
        .map(|(sentiment, count)| SentimentCount {
            sentiment: sentiment.to_string(),
            count,
        })
        .collect();
    distribution.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.sentiment.cmp(&b.sentiment)));

    SentimentSummary {
        total: results.len(),
        failed: results.iter().filter(|r| !r.is_success()).count(),
        distribution,
    }
}

/// Renders rows as CSV with one `<label>_Score` column per label, in first-seen order.
pub fn to_csv(rows: &[ResultRow]) -> Result<String, ReportError> {
    let mut labels: Vec<&str> = Vec::new();
    for scored in rows.iter().flat_map(|r| r.scores.iter()) {
        if !labels.contains(&scored.label.as_str()) {
            labels.push(&scored.label);
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "Text".to_string(),
        "Sentiment".to_string(),
        "Confidence".to_string(),
        "Error".to_string(),
    ];
    header.extend(labels.iter().map(|label| format!("{label}_Score")));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.text.clone(),
            row.sentiment.clone().unwrap_or_default(),
            row.confidence.to_string(),
            row.error.clone().unwrap_or_default(),
        ];
        record.extend(labels.iter().map(|label| {
            row.scores
                .iter()
                .find(|s| s.label == *label)
                .map(|s| s.score.to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Writer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReportError::Writer(e.to_string()))
}
