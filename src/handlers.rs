use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::analyzer::{SentimentClient, emoji_for};
use crate::error::{AnalyzerError, IngestError};
use crate::ingest::{self, IngestOptions, Upload, UploadKind};
use crate::report::{self, CSV_FILE_NAME};
use crate::text;
use crate::types::{
    AnalysisRequest, AnalysisResponse, AnalysisResult, BatchRequest, BatchResponse,
    ErrorResponse, ModelInfo, ModelsResponse, StatsRequest, TextStats,
};

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<SentimentClient>,
    pub csv_row_limit: usize,
}

impl AppState {
    pub fn new(client: Arc<SentimentClient>, csv_row_limit: usize) -> Self {
        Self {
            client,
            csv_row_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchParams {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Deserialize)]
pub struct FileParams {
    pub model: Option<String>,
    pub column: Option<String>,
    #[serde(default = "default_true")]
    pub clean: bool,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_true() -> bool {
    true
}

/// Errors that abort a request instead of being reported per item.
pub enum ApiError {
    Analyzer(AnalyzerError),
    Ingest(IngestError),
    Invalid(String),
    Internal(String),
}

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        Self::Analyzer(err)
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        Self::Ingest(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Analyzer(e) => {
                tracing::error!(error = %e, "Analysis unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Ingest(e) => {
                tracing::warn!(error = %e, "Error processing file");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("Error processing file: {e}"),
                )
            }
            ApiError::Invalid(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Internal(message) => {
                tracing::error!(%message, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

pub async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models = state
        .client
        .catalog()
        .entries()
        .map(|(name, id)| ModelInfo {
            name: name.to_string(),
            model_id: id.to_string(),
        })
        .collect();
    Json(ModelsResponse {
        default_endpoint: state.client.default_endpoint().to_string(),
        models,
    })
}

pub async fn stats_handler(Json(request): Json<StatsRequest>) -> Json<TextStats> {
    Json(text::stats(&request.text))
}

#[tracing::instrument(skip(state, request), fields(model = ?request.model, clean = request.clean))]
pub async fn analyze_handler(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let input = if request.clean {
        text::clean(&request.text)
    } else {
        request.text
    };

    let stats = text::stats(&input);
    let result = state.client.analyze(&input, request.model.as_deref()).await?;
    Ok(Json(single_response(request.model, input, stats, result)))
}

#[tracing::instrument(skip(state, request), fields(model = ?request.model, clean = request.clean))]
pub async fn batch_handler(
    State(state): State<AppState>,
    Query(params): Query<BatchParams>,
    Json(request): Json<BatchRequest>,
) -> Result<Response, ApiError> {
    let mut texts = request.texts;
    if let Some(lines) = &request.lines {
        texts.extend(text::split_lines(lines));
    }
    if texts.is_empty() {
        return Err(ApiError::Invalid(
            "Please enter at least one text to analyze.".to_string(),
        ));
    }
    if request.clean {
        texts = texts.iter().map(|t| text::clean(t)).collect();
    }

    let results = state
        .client
        .analyze_batch(&texts, request.model.as_deref())
        .await?;
    batch_response(request.model, &texts, &results, params.format)
}

#[tracing::instrument(skip(state, params, headers, body), fields(body_len = body.len(), model = ?params.model))]
pub async fn file_handler(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/plain");
    let kind = UploadKind::from_content_type(content_type)?;

    let options = IngestOptions {
        clean: params.clean,
        max_text_length: state.client.max_text_length(),
        csv_row_limit: state.csv_row_limit,
        column: params.column.clone(),
    };
    let model = params.model.as_deref();

    match ingest::ingest(kind, body.to_vec(), &options)? {
        Upload::Single(content) => {
            let stats = text::stats(&content);
            let result = state.client.analyze(&content, model).await?;
            if params.format == OutputFormat::Csv {
                return batch_response(params.model, &[content], &[result], OutputFormat::Csv);
            }
            Ok(Json(single_response(params.model, content, stats, result)).into_response())
        }
        Upload::Batch(texts) => {
            let results = state.client.analyze_batch(&texts, model).await?;
            batch_response(params.model, &texts, &results, params.format)
        }
    }
}

fn single_response(
    model: Option<String>,
    text: String,
    stats: TextStats,
    result: AnalysisResult,
) -> AnalysisResponse {
    AnalysisResponse {
        id: format!("sentiment-{}", uuid::Uuid::new_v4().simple()),
        object: "analysis".to_string(),
        created: chrono::Utc::now().timestamp(),
        model,
        text,
        stats,
        emoji: result.sentiment.as_deref().map(emoji_for),
        result,
    }
}

fn batch_response(
    model: Option<String>,
    texts: &[String],
    results: &[AnalysisResult],
    format: OutputFormat,
) -> Result<Response, ApiError> {
    let rows = report::rows(results, texts);

    if format == OutputFormat::Csv {
        let csv = report::to_csv(&rows).map_err(|e| ApiError::Internal(e.to_string()))?;
        let disposition = format!("attachment; filename=\"{CSV_FILE_NAME}\"");
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv,
        )
            .into_response());
    }

    Ok(Json(BatchResponse {
        id: format!("sentiment-batch-{}", uuid::Uuid::new_v4().simple()),
        object: "list".to_string(),
        created: chrono::Utc::now().timestamp(),
        model,
        summary: report::summarize(results),
        rows,
    })
    .into_response())
}
