use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::types::{AnalysisResult, ResultKind};

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap());

/// Shape the model is asked for. `type` outside the enum fails the parse.
#[derive(Debug, Deserialize)]
struct Completion {
    quote: String,
    #[serde(rename = "type")]
    kind: CompletionKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CompletionKind {
    Quote,
    Summary,
}

impl From<CompletionKind> for ResultKind {
    fn from(k: CompletionKind) -> Self {
        match k {
            CompletionKind::Quote => ResultKind::Quote,
            CompletionKind::Summary => ResultKind::Summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    Parsed(AnalysisResult),
    Fallback { reason: String },
}

impl Interpretation {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Interpretation::Fallback { .. })
    }

    pub fn into_result(self) -> AnalysisResult {
        match self {
            Interpretation::Parsed(r) => r,
            Interpretation::Fallback { .. } => AnalysisResult::fallback(),
        }
    }
}

/// Accept the completion only if it is exactly `{quote: string, type: quote|summary}`
/// (extra keys ignored); everything else becomes a fallback.
pub fn interpret(raw: &str) -> Interpretation {
    let trimmed = raw.trim();
    let body = FENCE_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    match serde_json::from_str::<Completion>(body) {
        Ok(c) => Interpretation::Parsed(AnalysisResult {
            quote: c.quote,
            kind: c.kind.into(),
        }),
        Err(e) => {
            let reason = e.to_string();
            warn!(reason = %reason, sample = %sample(trimmed), "Model output rejected, using fallback");
            Interpretation::Fallback { reason }
        }
    }
}

fn sample(s: &str) -> String {
    s.chars().take(120).collect()
}

// ── Tests ──
