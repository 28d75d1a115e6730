use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub stage: StageConfig,
    pub anti_repetition: AntiRepetitionConfig,
    pub director: DirectorConfig,
    pub generation: GenerationConfig,
    pub request: RequestConfig,
    pub omnilink: OmniLinkConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Thresholds for the fast-track stage engine.
///
/// `stuck_threshold` and `repeat_similarity` are empirical and meant to be tuned.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Questions asked before synthesis is forced
    pub max_questions: u32,
    /// Prior "I don't know" turns that mark the user as stuck
    pub stuck_threshold: usize,
    /// Word-overlap ratio between the last two turns treated as repetition
    pub repeat_similarity: f64,
    /// Pattern confidence strictly above which asking stops
    pub pattern_stop_confidence: f64,
    /// Word ceiling handed to the question generator
    pub question_max_words: usize,
}

/// Anti-repetition window sizes
#[derive(Debug, Clone)]
pub struct AntiRepetitionConfig {
    pub history_size: usize,
    pub compare_window: usize,
}

/// Breakthrough director tuning
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    /// Rolling average below this engages safe mode
    pub fps_threshold: f64,
    /// Number of samples kept in the rolling window
    pub fps_window: usize,
    /// Samples required before the average is trusted
    pub fps_min_samples: usize,
    /// Broadcast buffer for director events
    pub event_capacity: usize,
}

/// Question/synthesis generation backend configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// `None` selects the offline scripted generator
    pub langbase: Option<LangbaseConfig>,
    pub question_pipe: String,
    pub breakthrough_pipe: String,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// OmniLink outbound webhook configuration
#[derive(Debug, Clone)]
pub struct OmniLinkConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub queue_capacity: usize,
    pub circuit_breaker: CircuitBreakerConfig,
}

/// Circuit breaker thresholds
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Consecutive successes in half-open before closing
    pub success_threshold: u32,
    /// Seconds to wait before a half-open probe
    pub recovery_timeout_secs: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let stage_defaults = StageConfig::default();
        let stage = StageConfig {
            max_questions: env_or("STAGE_MAX_QUESTIONS", stage_defaults.max_questions),
            stuck_threshold: env_or("STAGE_STUCK_THRESHOLD", stage_defaults.stuck_threshold),
            repeat_similarity: env_or("STAGE_REPEAT_SIMILARITY", stage_defaults.repeat_similarity),
            pattern_stop_confidence: env_or(
                "STAGE_PATTERN_STOP_CONFIDENCE",
                stage_defaults.pattern_stop_confidence,
            ),
            question_max_words: env_or("QUESTION_MAX_WORDS", stage_defaults.question_max_words),
        };

        if !(0.0..=1.0).contains(&stage.repeat_similarity) {
            return Err(AppError::Config {
                message: format!(
                    "STAGE_REPEAT_SIMILARITY must be within 0.0-1.0, got {}",
                    stage.repeat_similarity
                ),
            });
        }

        let anti_repetition = AntiRepetitionConfig {
            history_size: env_or("ANTI_REPETITION_HISTORY", 10),
            compare_window: env_or("ANTI_REPETITION_WINDOW", 5),
        };

        if anti_repetition.history_size == 0 {
            return Err(AppError::Config {
                message: "ANTI_REPETITION_HISTORY must be at least 1".to_string(),
            });
        }

        let director_defaults = DirectorConfig::default();
        let director = DirectorConfig {
            fps_threshold: env_or("DIRECTOR_FPS_THRESHOLD", director_defaults.fps_threshold),
            fps_window: env_or("DIRECTOR_FPS_WINDOW", director_defaults.fps_window),
            fps_min_samples: env_or("DIRECTOR_FPS_MIN_SAMPLES", director_defaults.fps_min_samples),
            event_capacity: env_or("DIRECTOR_EVENT_CAPACITY", director_defaults.event_capacity),
        };

        let generation = GenerationConfig {
            langbase: env::var("LANGBASE_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(|api_key| LangbaseConfig {
                    api_key,
                    base_url: env::var("LANGBASE_BASE_URL")
                        .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
                }),
            question_pipe: env::var("PIPE_QUESTION")
                .unwrap_or_else(|_| "aspiral-question-v1".to_string()),
            breakthrough_pipe: env::var("PIPE_BREAKTHROUGH")
                .unwrap_or_else(|_| "aspiral-breakthrough-v1".to_string()),
        };

        let request = RequestConfig {
            timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30000),
            max_retries: env_or("MAX_RETRIES", 3),
            retry_delay_ms: env_or("RETRY_DELAY_MS", 1000),
        };

        let omnilink = OmniLinkConfig {
            enabled: env::var("OMNILINK_ENABLED")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            webhook_url: env::var("OMNILINK_WEBHOOK_URL").ok(),
            queue_capacity: env_or("OMNILINK_QUEUE_CAPACITY", 100),
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: env_or("OMNILINK_FAILURE_THRESHOLD", 3),
                success_threshold: env_or("OMNILINK_SUCCESS_THRESHOLD", 2),
                recovery_timeout_secs: env_or("OMNILINK_RECOVERY_SECS", 60),
            },
        };

        if omnilink.enabled && omnilink.webhook_url.is_none() {
            return Err(AppError::Config {
                message: "OMNILINK_WEBHOOK_URL is required when OMNILINK_ENABLED=true"
                    .to_string(),
            });
        }

        Ok(Config {
            logging,
            stage,
            anti_repetition,
            director,
            generation,
            request,
            omnilink,
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            max_questions: 3,
            stuck_threshold: 2,
            repeat_similarity: 0.6,
            pattern_stop_confidence: 0.8,
            question_max_words: 15,
        }
    }
}

impl Default for AntiRepetitionConfig {
    fn default() -> Self {
        Self {
            history_size: 10,
            compare_window: 5,
        }
    }
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            fps_threshold: 30.0,
            fps_window: 30,
            fps_min_samples: 10,
            event_capacity: 64,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            langbase: None,
            question_pipe: "aspiral-question-v1".to_string(),
            breakthrough_pipe: "aspiral-breakthrough-v1".to_string(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for OmniLinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            queue_capacity: 100,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            recovery_timeout_secs: 60,
        }
    }
}
