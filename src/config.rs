use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL_NAME: &str = "gemma3";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 8_000;
pub const DEFAULT_INFERENCE_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 6_000;
pub const DEFAULT_USER_AGENT: &str = "SmartSourcesBot/1.0";
pub const DEFAULT_STRIP_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "iframe",
];

/// Process-wide settings, read once at start-up and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ollama_url: String,
    pub model_name: String,
    pub bind_addr: String,
    pub port: u16,
    pub fetch_timeout: Duration,
    pub inference_timeout: Duration,
    pub max_content_chars: usize,
    pub user_agent: String,
    pub strip_tags: Vec<String>,
    pub prompt_template: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            inference_timeout: Duration::from_millis(DEFAULT_INFERENCE_TIMEOUT_MS),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            strip_tags: DEFAULT_STRIP_TAGS.iter().map(|t| t.to_string()).collect(),
            prompt_template: None,
        }
    }
}

impl Settings {
    /// Load from the process environment on top of the built-in defaults.
    pub fn load() -> Result<Self> {
        Self::from_vars(None)
    }

    /// `vars` replaces the real environment when given (used by tests).
    fn from_vars(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let d = Settings::default();
        let cfg = Config::builder()
            .set_default("ollama_url", d.ollama_url)?
            .set_default("model_name", d.model_name)?
            .set_default("bind_addr", d.bind_addr)?
            .set_default("port", i64::from(d.port))?
            .set_default("fetch_timeout_ms", DEFAULT_FETCH_TIMEOUT_MS as i64)?
            .set_default("inference_timeout_ms", DEFAULT_INFERENCE_TIMEOUT_MS as i64)?
            .set_default("max_content_chars", DEFAULT_MAX_CONTENT_CHARS as i64)?
            .set_default("user_agent", d.user_agent)?
            .set_default("strip_tags", DEFAULT_STRIP_TAGS.join(","))?
            .add_source(Environment::default().try_parsing(true).source(vars))
            .build()
            .context("Failed to read configuration")?;

        let port = cfg.get_int("port").context("PORT must be an integer")?;
        let port = u16::try_from(port).with_context(|| format!("PORT out of range: {}", port))?;

        let fetch_ms = positive(&cfg, "fetch_timeout_ms")?;
        let inference_ms = positive(&cfg, "inference_timeout_ms")?;
        let max_chars = positive(&cfg, "max_content_chars")?;

        let strip_tags = parse_tag_list(&cfg.get_string("strip_tags")?);

        let prompt_template = cfg
            .get_string("prompt_template_path")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            ollama_url: cfg.get_string("ollama_url")?,
            model_name: cfg.get_string("model_name")?,
            bind_addr: cfg.get_string("bind_addr")?,
            port,
            fetch_timeout: Duration::from_millis(fetch_ms),
            inference_timeout: Duration::from_millis(inference_ms),
            max_content_chars: max_chars as usize,
            user_agent: cfg.get_string("user_agent")?,
            strip_tags,
            prompt_template,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn positive(cfg: &Config, key: &str) -> Result<u64> {
    let v = cfg
        .get_int(key)
        .with_context(|| format!("{} must be an integer", key.to_uppercase()))?;
    if v <= 0 {
        anyhow::bail!("{} must be positive, got {}", key.to_uppercase(), v);
    }
    Ok(v as u64)
}

/// Comma or whitespace separated, lower-cased, empties dropped.
fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_without_env() {
        let s = Settings::from_vars(vars(&[])).unwrap();
        assert_eq!(s.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(s.model_name, "gemma3");
        assert_eq!(s.port, 3000);
        assert_eq!(s.fetch_timeout, Duration::from_millis(8000));
        assert_eq!(s.max_content_chars, 6000);
        assert_eq!(s.strip_tags.len(), DEFAULT_STRIP_TAGS.len());
        assert!(s.prompt_template.is_none());
    }

    #[test]
    fn env_overrides_defaults() {
        let s = Settings::from_vars(vars(&[
            ("OLLAMA_URL", "http://gpu-box:11434/api/generate"),
            ("MODEL_NAME", "llama3"),
            ("PORT", "8080"),
            ("MAX_CONTENT_CHARS", "1200"),
            ("STRIP_TAGS", "script, style,FORM"),
            ("PROMPT_TEMPLATE_PATH", "/etc/smart-sources/prompt.txt"),
        ]))
        .unwrap();
        assert_eq!(s.ollama_url, "http://gpu-box:11434/api/generate");
        assert_eq!(s.model_name, "llama3");
        assert_eq!(s.port, 8080);
        assert_eq!(s.max_content_chars, 1200);
        assert_eq!(s.strip_tags, vec!["script", "style", "form"]);
        assert_eq!(
            s.prompt_template,
            Some(PathBuf::from("/etc/smart-sources/prompt.txt"))
        );
        assert_eq!(s.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(Settings::from_vars(vars(&[("PORT", "http")])).is_err());
        assert!(Settings::from_vars(vars(&[("PORT", "70000")])).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Settings::from_vars(vars(&[("FETCH_TIMEOUT_MS", "0")])).is_err());
    }
}
