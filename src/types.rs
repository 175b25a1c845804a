use serde::{Deserialize, Serialize};

/// Message returned to callers for every pipeline failure, whatever the stage.
pub const FAILURE_MESSAGE: &str = "Could not analyze content.";

/// Quote substituted when the model output cannot be used.
pub const FALLBACK_QUOTE: &str = "Content analyzed";

/// Body of `POST /api/analyze-context`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub context: String,
}

impl AnalysisRequest {
    pub fn new(url: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            context: context.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    #[serde(rename = "quote")]
    Quote,
    #[serde(rename = "summary")]
    Summary,
    /// Marker for the fallback result, never produced by the model.
    #[serde(rename = "Info")]
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub quote: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
}

impl AnalysisResult {
    pub fn fallback() -> Self {
        Self {
            quote: FALLBACK_QUOTE.to_string(),
            kind: ResultKind::Info,
        }
    }
}

/// `{success, data}` or `{success, error}`, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok(data: AnalysisResult) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            data: None,
            error: Some(FAILURE_MESSAGE.to_string()),
        }
    }
}

// ── Tests ──
