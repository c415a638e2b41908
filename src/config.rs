use clap::Parser;
use std::time::Duration;

const DEFAULT_MODELS: &[(&str, &str)] = &[
    (
        "Twitter RoBERTa",
        "cardiffnlp/twitter-roberta-base-sentiment-latest",
    ),
    (
        "BERT Multilingual",
        "nlptown/bert-base-multilingual-uncased-sentiment",
    ),
    ("DistilBERT", "distilbert-base-uncased-finetuned-sst-2-english"),
    ("RoBERTa", "roberta-base-openai-detector"),
];

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Hugging Face API token used as bearer credential
    #[arg(long, env = "HUGGINGFACE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Default inference endpoint, used when no catalog model is selected
    #[arg(
        long,
        env = "API_URL",
        default_value = "https://api-inference.huggingface.co/models/cardiffnlp/twitter-roberta-base-sentiment-latest"
    )]
    pub api_url: String,

    /// Secondary endpoint tried when the default one fails
    #[arg(
        long,
        env = "BACKUP_API_URL",
        default_value = "https://api-inference.huggingface.co/models/nlptown/bert-base-multilingual-uncased-sentiment"
    )]
    pub backup_api_url: String,

    /// Retry failed default-endpoint requests against the backup endpoint
    #[arg(long, env = "FALLBACK_TO_BACKUP")]
    pub fallback_to_backup: bool,

    /// Base URL that catalog model ids are appended to
    #[arg(
        long,
        env = "MODEL_BASE_URL",
        default_value = "https://api-inference.huggingface.co/models"
    )]
    pub model_base_url: String,

    /// Model catalog override in format "Name=org/model,Other=org/model2"
    #[arg(long, env = "MODELS")]
    pub models: Option<String>,

    /// Maximum text length in characters for a single analysis
    #[arg(long, env = "MAX_TEXT_LENGTH", default_value = "5000")]
    pub max_text_length: usize,

    /// Number of batch items between progress log lines
    #[arg(long, env = "BATCH_SIZE", default_value = "10")]
    pub batch_size: usize,

    /// Maximum number of CSV rows analyzed per upload
    #[arg(long, env = "CSV_ROW_LIMIT", default_value = "50")]
    pub csv_row_limit: usize,

    /// Wait before retrying a request to a model that is still loading
    #[arg(long, env = "RETRY_DELAY_SECS", default_value = "10")]
    pub retry_delay_secs: u64,

    /// Pause between successive batch requests in milliseconds
    #[arg(long, env = "BATCH_PACING_MS", default_value = "100")]
    pub batch_pacing_ms: u64,

    /// HTTP timeout for a single inference request
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Log output format: "text" or "json"
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

/// Display name to backend model id, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCatalog {
    entries: Vec<(String, String)>,
}

impl ModelCatalog {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Parses `Name=org/model` pairs separated by commas. Malformed pairs are skipped.
    pub fn parse(pairs: &str) -> Self {
        let entries = pairs
            .split(',')
            .filter_map(|pair| {
                let (name, id) = pair.split_once('=')?;
                let (name, id) = (name.trim(), id.trim());
                if name.is_empty() || id.is_empty() {
                    return None;
                }
                Some((name.to_string(), id.to_string()))
            })
            .collect();
        Self { entries }
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, id)| (n.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(
            DEFAULT_MODELS
                .iter()
                .map(|(name, id)| (name.to_string(), id.to_string()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_token: Option<String>,
    pub api_url: String,
    pub backup_api_url: Option<String>,
    pub model_base_url: String,
    pub catalog: ModelCatalog,
    pub max_text_length: usize,
    pub progress_every: usize,
    pub retry_delay: Duration,
    pub pacing: Duration,
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            api_token: config
                .api_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
            api_url: config.api_url.clone(),
            backup_api_url: config
                .fallback_to_backup
                .then(|| config.backup_api_url.clone()),
            model_base_url: config.model_base_url.trim_end_matches('/').to_string(),
            catalog: config.catalog(),
            max_text_length: config.max_text_length,
            progress_every: config.batch_size.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            pacing: Duration::from_millis(config.batch_pacing_ms),
        }
    }
}

impl Config {
    pub fn catalog(&self) -> ModelCatalog {
        match &self.models {
            Some(pairs) => {
                let catalog = ModelCatalog::parse(pairs);
                if catalog.is_empty() {
                    tracing::warn!("MODELS did not contain any valid pairs, using built-in catalog");
                    ModelCatalog::default()
                } else {
                    catalog
                }
            }
            None => ModelCatalog::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_keeps_declaration_order() {
        let catalog = ModelCatalog::default();
        let names: Vec<_> = catalog.entries().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            ["Twitter RoBERTa", "BERT Multilingual", "DistilBERT", "RoBERTa"]
        );
        assert_eq!(
            catalog.resolve("DistilBERT"),
            Some("distilbert-base-uncased-finetuned-sst-2-english")
        );
        assert_eq!(catalog.resolve("distilbert"), None);
    }

    #[test]
    fn parse_skips_malformed_pairs() {
        let catalog = ModelCatalog::parse("Fast=org/fast, broken ,=x,Slow = org/slow");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.resolve("Fast"), Some("org/fast"));
        assert_eq!(catalog.resolve("Slow"), Some("org/slow"));
    }

    #[test]
    fn client_config_from_cli_args() {
        let config = Config::try_parse_from([
            "sentiment-dash",
            "--api-token",
            "hf_test",
            "--model-base-url",
            "http://localhost:9000/models/",
            "--fallback-to-backup",
            "--retry-delay-secs",
            "2",
            "--models",
            "Only=org/only",
        ])
        .unwrap();

        let client = ClientConfig::from(&config);
        assert_eq!(client.api_token.as_deref(), Some("hf_test"));
        assert_eq!(client.model_base_url, "http://localhost:9000/models");
        assert!(client.backup_api_url.is_some());
        assert_eq!(client.retry_delay, Duration::from_secs(2));
        assert_eq!(client.catalog.resolve("Only"), Some("org/only"));
        assert_eq!(client.catalog.len(), 1);
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let config =
            Config::try_parse_from(["sentiment-dash", "--api-token", "  "]).unwrap();
        assert!(ClientConfig::from(&config).api_token.is_none());
    }
}
