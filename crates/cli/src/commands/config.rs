use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use barista_core::config::AppConfig;
use toml::Value;

pub fn run(config_path: Option<&Path>) -> String {
    let config = match AppConfig::load(super::load_options(config_path)) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |env_keys: &[&str], file_keys: &[&str]| {
        field_source(env_keys, file_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "llm.completion_model",
        &config.llm.completion_model,
        source(&["BARISTA_COMPLETION_MODEL"], &["llm.completion_model"]),
    ));
    lines.push(render_line(
        "llm.embedding_model",
        &config.llm.embedding_model,
        source(&["BARISTA_EMBEDDING_MODEL"], &["llm.embedding_model"]),
    ));

    let api_key = if config.has_api_key() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "llm.api_key",
        api_key,
        source(&["BARISTA_GEMINI_API_KEY"], &["llm.api_key"]),
    ));

    lines.push(render_line(
        "data.products_path",
        &config.data.products_path.display().to_string(),
        source(&["BARISTA_DATA_DIR"], &["data.products_path", "data.dir"]),
    ));
    lines.push(render_line(
        "data.apriori_path",
        &config.data.apriori_path.display().to_string(),
        source(&["BARISTA_DATA_DIR"], &["data.apriori_path", "data.dir"]),
    ));
    lines.push(render_line(
        "data.popularity_path",
        &config.data.popularity_path.display().to_string(),
        source(&["BARISTA_DATA_DIR"], &["data.popularity_path", "data.dir"]),
    ));

    lines.push(render_line(
        "pipeline.history_window",
        &config.pipeline.history_window.to_string(),
        source(&["BARISTA_HISTORY_WINDOW"], &["pipeline.history_window"]),
    ));
    lines.push(render_line(
        "pipeline.recommendation_top_k",
        &config.pipeline.recommendation_top_k.to_string(),
        source(&["BARISTA_TOP_K"], &["pipeline.recommendation_top_k"]),
    ));
    lines.push(render_line(
        "pipeline.retrieval_top_k",
        &config.pipeline.retrieval_top_k.to_string(),
        source(&["BARISTA_RETRIEVAL_TOP_K"], &["pipeline.retrieval_top_k"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source(&["BARISTA_LOGGING_LEVEL", "BARISTA_LOG_LEVEL"], &["logging.level"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source(&["BARISTA_LOGGING_FORMAT", "BARISTA_LOG_FORMAT"], &["logging.format"]),
    ));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("barista.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/barista.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

/// Attribute a field to the first matching source. Blank environment values
/// are ignored, matching the loader.
fn field_source(
    env_keys: &[&str],
    file_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        let is_set = env::var(env_key).map(|value| !value.trim().is_empty()).unwrap_or(false);
        if is_set {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if file_keys.iter().any(|key_path| contains_path(doc, key_path)) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::contains_path;

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: Value = "[pipeline]\nhistory_window = 4\n".parse().expect("valid toml");

        assert!(contains_path(&doc, "pipeline.history_window"));
        assert!(!contains_path(&doc, "pipeline.recommendation_top_k"));
        assert!(!contains_path(&doc, "llm.api_key"));
    }

    #[test]
    fn contains_path_distinguishes_dir_from_explicit_paths() {
        let doc: Value = "[data]\ndir = \"fixtures\"\n".parse().expect("valid toml");

        assert!(contains_path(&doc, "data.dir"));
        assert!(!contains_path(&doc, "data.products_path"));
    }
}
