//! Configuration management for Axiotome
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values
//!
//! Every section carries serde defaults, so a file may supply any subset.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Tokenizer / index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Query processing configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Query result cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Prompt context configuration
    #[serde(default)]
    pub context: ContextConfig,

    /// External model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Answer request concurrency configuration
    #[serde(default)]
    pub ask: AskConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Drop common English function words while tokenizing
    #[serde(default = "default_true")]
    pub remove_stopwords: bool,

    /// Split CJK runs into overlapping character bigrams
    #[serde(default = "default_true")]
    pub cjk_bigrams: bool,

    /// Minimum token length in characters (non-CJK tokens only)
    #[serde(default = "default_min_token_chars")]
    pub min_token_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Results returned when the caller does not ask for a specific count
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Hard upper bound on results per query
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Adjacent lines included on each side of a matching line
    #[serde(default = "default_snippet_radius")]
    pub snippet_radius: usize,

    /// Maximum snippet length in characters (0 = unlimited)
    #[serde(default = "default_max_snippet_chars")]
    pub max_snippet_chars: usize,

    /// Maximum accepted query length in characters
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum cached queries (0 disables caching)
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContextConfig {
    /// Character budget used when assembling context from search results
    #[serde(default = "default_budget_chars")]
    pub budget_chars: usize,

    /// Caller-supplied context longer than this is truncated before prompting
    #[serde(default = "default_prompt_ceiling")]
    pub prompt_ceiling_chars: usize,

    /// Run a search with the question when the caller supplies no context
    #[serde(default = "default_true")]
    pub retrieve_when_empty: bool,

    /// Results considered when retrieving context for a question
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,

    /// Maximum accepted question length in characters
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Model provider: openai (any compatible endpoint), offline
    #[serde(default = "default_model_provider")]
    pub provider: String,

    /// API key for the model endpoint
    pub api_key: Option<String>,

    /// Chat completions endpoint
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,

    /// Model to use
    #[serde(default = "default_model_name")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Per-call timeout in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first failed call
    #[serde(default = "default_model_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Backoff delay ceiling in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Deadline for a whole answer request, retries included (unset = none)
    pub request_deadline_secs: Option<u64>,
}

/// What happens to answer requests beyond the concurrency ceiling
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait in a bounded queue
    Queue,
    /// Fail immediately with `Busy`
    Reject,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AskConfig {
    /// Maximum concurrent answer requests
    #[serde(default = "default_max_concurrent_asks")]
    pub max_concurrent: usize,

    /// Overflow policy
    #[serde(default = "default_overflow")]
    pub overflow: OverflowPolicy,

    /// Waiting requests allowed when overflow is `queue`
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level / filter directive (debug, info, axiotome_search=debug, ...)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Prometheus metrics port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8787 }
fn default_shutdown_timeout() -> u64 { 10 }
fn default_true() -> bool { true }
fn default_min_token_chars() -> usize { 1 }
fn default_top_k() -> usize { 20 }
fn default_max_top_k() -> usize { 200 }
fn default_snippet_radius() -> usize { 1 }
fn default_max_snippet_chars() -> usize { 400 }
fn default_max_query_chars() -> usize { 1000 }
fn default_cache_capacity() -> usize { 256 }
fn default_cache_ttl() -> u64 { 300 }
fn default_budget_chars() -> usize { 6000 }
fn default_prompt_ceiling() -> usize { 12000 }
fn default_retrieval_top_k() -> usize { 10 }
fn default_max_question_chars() -> usize { 2000 }
fn default_model_provider() -> String { "offline".to_string() }
fn default_model_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_model_name() -> String { "gpt-4o-mini".to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_max_tokens() -> usize { 800 }
fn default_model_timeout() -> u64 { 30 }
fn default_model_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 200 }
fn default_max_backoff() -> u64 { 5000 }
fn default_max_concurrent_asks() -> usize { 4 }
fn default_overflow() -> OverflowPolicy { OverflowPolicy::Queue }
fn default_queue_capacity() -> usize { 16 }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "axiotome".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            remove_stopwords: true,
            cjk_bigrams: true,
            min_token_chars: default_min_token_chars(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            snippet_radius: default_snippet_radius(),
            max_snippet_chars: default_max_snippet_chars(),
            max_query_chars: default_max_query_chars(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            budget_chars: default_budget_chars(),
            prompt_ceiling_chars: default_prompt_ceiling(),
            retrieve_when_empty: true,
            retrieval_top_k: default_retrieval_top_k(),
            max_question_chars: default_max_question_chars(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            api_key: None,
            endpoint: default_model_endpoint(),
            model: default_model_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout(),
            max_retries: default_model_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            request_deadline_secs: None,
        }
    }
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent_asks(),
            overflow: default_overflow(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            metrics_port: 0,
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__CACHE__TTL_SECS=60
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl ModelConfig {
    /// Per-call timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whole-request deadline, if configured
    pub fn request_deadline(&self) -> Option<Duration> {
        self.request_deadline_secs.map(Duration::from_secs)
    }
}
