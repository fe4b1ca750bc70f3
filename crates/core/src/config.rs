use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PRODUCTS_FILE: &str = "products.jsonl";
const APRIORI_FILE: &str = "apriori_recommendations.json";
const POPULARITY_FILE: &str = "popularity_recommendation.csv";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub data: DataConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub completion_model: String,
    pub embedding_model: String,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub products_path: PathBuf,
    pub apriori_path: PathBuf,
    pub popularity_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// How many trailing turns the guard/classification/recommendation
    /// prompts see. The order-taking stage always receives full history.
    pub history_window: usize,
    pub recommendation_top_k: usize,
    pub retrieval_top_k: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub gemini_api_key: Option<String>,
    pub completion_model: Option<String>,
    pub embedding_model: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                completion_model: "gemini-2.0-flash".to_string(),
                embedding_model: "gemini-embedding-001".to_string(),
            },
            data: DataConfig::rooted_at(Path::new("data")),
            pipeline: PipelineConfig {
                history_window: 3,
                recommendation_top_k: 5,
                retrieval_top_k: 2,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl DataConfig {
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            products_path: dir.join(PRODUCTS_FILE),
            apriori_path: dir.join(APRIORI_FILE),
            popularity_path: dir.join(POPULARITY_FILE),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("barista.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key_value));
            }
            if let Some(completion_model) = llm.completion_model {
                self.llm.completion_model = completion_model;
            }
            if let Some(embedding_model) = llm.embedding_model {
                self.llm.embedding_model = embedding_model;
            }
        }

        if let Some(data) = patch.data {
            if let Some(dir) = data.dir {
                self.data = DataConfig::rooted_at(&dir);
            }
            if let Some(products_path) = data.products_path {
                self.data.products_path = products_path;
            }
            if let Some(apriori_path) = data.apriori_path {
                self.data.apriori_path = apriori_path;
            }
            if let Some(popularity_path) = data.popularity_path {
                self.data.popularity_path = popularity_path;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(history_window) = pipeline.history_window {
                self.pipeline.history_window = history_window;
            }
            if let Some(recommendation_top_k) = pipeline.recommendation_top_k {
                self.pipeline.recommendation_top_k = recommendation_top_k;
            }
            if let Some(retrieval_top_k) = pipeline.retrieval_top_k {
                self.pipeline.retrieval_top_k = retrieval_top_k;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BARISTA_GEMINI_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("BARISTA_COMPLETION_MODEL") {
            self.llm.completion_model = value;
        }
        if let Some(value) = read_env("BARISTA_EMBEDDING_MODEL") {
            self.llm.embedding_model = value;
        }

        if let Some(value) = read_env("BARISTA_DATA_DIR") {
            self.data = DataConfig::rooted_at(Path::new(&value));
        }

        if let Some(value) = read_env("BARISTA_HISTORY_WINDOW") {
            self.pipeline.history_window = parse_usize("BARISTA_HISTORY_WINDOW", &value)?;
        }
        if let Some(value) = read_env("BARISTA_TOP_K") {
            self.pipeline.recommendation_top_k = parse_usize("BARISTA_TOP_K", &value)?;
        }
        if let Some(value) = read_env("BARISTA_RETRIEVAL_TOP_K") {
            self.pipeline.retrieval_top_k = parse_usize("BARISTA_RETRIEVAL_TOP_K", &value)?;
        }

        let log_level = read_env("BARISTA_LOGGING_LEVEL").or_else(|| read_env("BARISTA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BARISTA_LOGGING_FORMAT").or_else(|| read_env("BARISTA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(gemini_api_key) = overrides.gemini_api_key {
            self.llm.api_key = Some(secret_value(gemini_api_key));
        }
        if let Some(completion_model) = overrides.completion_model {
            self.llm.completion_model = completion_model;
        }
        if let Some(embedding_model) = overrides.embedding_model {
            self.llm.embedding_model = embedding_model;
        }
        if let Some(data_dir) = overrides.data_dir {
            self.data = DataConfig::rooted_at(&data_dir);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_data(&self.data)?;
        validate_pipeline(&self.pipeline)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// True when an API key is configured and non-blank. The key is not
    /// required at load time so inspection commands work offline; callers
    /// that talk to the completion service check this first.
    pub fn has_api_key(&self) -> bool {
        self.llm
            .api_key
            .as_ref()
            .map(|key| !key.expose_secret().trim().is_empty())
            .unwrap_or(false)
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("barista.toml"), PathBuf::from("config/barista.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.completion_model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.completion_model must not be empty (e.g. `gemini-2.0-flash`)".to_string(),
        ));
    }

    if llm.embedding_model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.embedding_model must not be empty (e.g. `gemini-embedding-001`)".to_string(),
        ));
    }

    Ok(())
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    for (field, path) in [
        ("data.products_path", &data.products_path),
        ("data.apriori_path", &data.apriori_path),
        ("data.popularity_path", &data.popularity_path),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{field} must not be empty")));
        }
    }

    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.history_window == 0 {
        return Err(ConfigError::Validation(
            "pipeline.history_window must be greater than zero".to_string(),
        ));
    }

    if pipeline.recommendation_top_k == 0 {
        return Err(ConfigError::Validation(
            "pipeline.recommendation_top_k must be greater than zero".to_string(),
        ));
    }

    if pipeline.retrieval_top_k == 0 {
        return Err(ConfigError::Validation(
            "pipeline.retrieval_top_k must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    data: Option<DataPatch>,
    pipeline: Option<PipelinePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    completion_model: Option<String>,
    embedding_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    dir: Option<PathBuf>,
    products_path: Option<PathBuf>,
    apriori_path: Option<PathBuf>,
    popularity_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    history_window: Option<usize>,
    recommendation_top_k: Option<usize>,
    retrieval_top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
