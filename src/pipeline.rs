use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, error, info, info_span, Instrument};

use crate::config::Settings;
use crate::error::AnalysisError;
use crate::fetcher::{HttpFetcher, PageSource};
use crate::inference::{CompletionClient, OllamaClient};
use crate::interpreter::interpret;
use crate::prompt::PromptTemplate;
use crate::sanitizer::Sanitizer;
use crate::types::{AnalysisRequest, AnalysisResult, ResponseEnvelope};

/// Where a request currently is. Every path ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Sanitizing,
    Prompting,
    Inferring,
    Interpreting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Fetching => "fetching",
            Stage::Sanitizing => "sanitizing",
            Stage::Prompting => "prompting",
            Stage::Inferring => "inferring",
            Stage::Interpreting => "interpreting",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// fetch → sanitize → prompt → infer → interpret. Immutable once built,
/// so one instance serves every request concurrently.
#[derive(Clone)]
pub struct Analyzer {
    source: Arc<dyn PageSource>,
    sanitizer: Sanitizer,
    template: PromptTemplate,
    model: Arc<dyn CompletionClient>,
}

impl Analyzer {
    pub fn new(
        source: Arc<dyn PageSource>,
        sanitizer: Sanitizer,
        template: PromptTemplate,
        model: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            source,
            sanitizer,
            template,
            model,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let fetcher = HttpFetcher::new(settings.fetch_timeout, &settings.user_agent)?;
        let model = OllamaClient::new(
            settings.ollama_url.clone(),
            settings.model_name.clone(),
            settings.inference_timeout,
        )?;
        let template = match &settings.prompt_template {
            Some(path) => PromptTemplate::from_file(path)?,
            None => PromptTemplate::default(),
        };
        let sanitizer = Sanitizer::new(&settings.strip_tags, settings.max_content_chars);

        Ok(Self::new(
            Arc::new(fetcher),
            sanitizer,
            template,
            Arc::new(model),
        ))
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Never fails: every error becomes the same opaque envelope, with the
    /// detail logged here. Everything logged while the request runs sits in
    /// an `analyze` span carrying the url.
    pub async fn analyze(&self, req: &AnalysisRequest) -> ResponseEnvelope {
        let span = info_span!("analyze", url = %req.url);
        async {
            info!("Analyzing");
            let start = Instant::now();

            match self.run(req).await {
                Ok(result) => {
                    debug!(
                        stage = %Stage::Done,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        kind = ?result.kind,
                        "Analysis finished"
                    );
                    ResponseEnvelope::ok(result)
                }
                Err(e) => {
                    error!(stage = e.stage(), "{}", e);
                    ResponseEnvelope::failure()
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn run(&self, req: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let prompt = self.build_prompt(req).await?;

        debug!(stage = %Stage::Inferring, model = self.model.model_name());
        let raw = self.model.complete(&prompt).await?;

        debug!(stage = %Stage::Interpreting, raw_len = raw.len());
        let interpretation = interpret(&raw);
        if interpretation.is_fallback() {
            info!("Model output unusable, answering with fallback");
        }
        Ok(interpretation.into_result())
    }

    /// The first three stages, also used to preview prompts from the CLI.
    pub async fn build_prompt(&self, req: &AnalysisRequest) -> Result<String, AnalysisError> {
        if req.url.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest("url is required".into()));
        }

        debug!(stage = %Stage::Fetching);
        let page = self.source.fetch(&req.url).await?;

        debug!(
            stage = %Stage::Sanitizing,
            final_url = %page.url,
            status = page.status,
            content_type = ?page.content_type,
            fetch_ms = page.latency_ms,
            bytes = page.body.len()
        );
        let content = self.sanitizer.sanitize(&page.body);

        debug!(stage = %Stage::Prompting, content_chars = content.chars().count());
        Ok(self.template.render(&content, &req.context))
    }
}

// ── Tests ──
