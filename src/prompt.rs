use std::path::Path;

use anyhow::{Context, Result};

const WEBSITE_SLOT: &str = "{website}";
const CONTEXT_SLOT: &str = "{context}";

/// Task instructions. Tunable by deployers, must keep both slots.
pub const DEFAULT_TASK_TEMPLATE: &str = r#"<website>{website}</website>.

<context>{context}</context>.

TASK:
1. Analyze <WEBSITE> and understand its subjects. For instance, website talks about A, B and C.
2. Analyze <CONTEXT> and understand references to <WEBSITE>. For instance, context talks about X, B', Y, C' and Z, so the relevant references are B and C.
3. Write a concise statement based exclusively on <WEBSITE> that addresses the intersecting topics (B and C). Constraint: Do not explicitly mention the <CONTEXT>, "the article", or "the user's text". Do not explain why it is relevant. Simply present the facts, data, or arguments found in the <WEBSITE> that relates to the <CONTEXT>.
4. Don't be verbose. Keep your explanation or quote short (ideally less than 25 words). If you include a quote, you can use '[...]' to replace irrelevant parts.
5. Always use the original language of the <WEBSITE>.
"#;

/// Output contract and worked examples. Always appended, whatever the task text.
pub const RESPONSE_FORMAT: &str = r#"
Respond ONLY in JSON format:
{
  "quote": "extracted text or summary",
  "type": "quote" or "summary"
}

Examples:
{
  "quote": "The reference defines B and show its usages.",
  "type": "summary"
}
{
  "quote": "The website explains the creation of A and its importance to B",
  "type": "summary"
}
{
  "quote": "B and C",
  "type": "quote"
}
{
  "quote": "B [...] C",
  "type": "quote"
}
"#;

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    task: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            task: DEFAULT_TASK_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(task: impl Into<String>) -> Result<Self> {
        let task = task.into();
        for slot in [WEBSITE_SLOT, CONTEXT_SLOT] {
            if !task.contains(slot) {
                anyhow::bail!("prompt template is missing the {} placeholder", slot);
            }
        }
        Ok(Self { task })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template {}", path.display()))?;
        Self::new(raw).with_context(|| format!("Invalid prompt template {}", path.display()))
    }

    /// Fill both slots and append the response contract. Pure: the same
    /// inputs always give byte-identical output.
    pub fn render(&self, content: &str, context: &str) -> String {
        let mut out = String::with_capacity(
            self.task.len() + content.len() + context.len() + RESPONSE_FORMAT.len(),
        );

        // Single pass, so slot text inside content/context stays literal.
        let mut rest = self.task.as_str();
        while let Some((idx, slot)) = next_slot(rest) {
            out.push_str(&rest[..idx]);
            out.push_str(if slot == WEBSITE_SLOT { content } else { context });
            rest = &rest[idx + slot.len()..];
        }
        out.push_str(rest);

        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(RESPONSE_FORMAT);
        out
    }
}

fn next_slot(s: &str) -> Option<(usize, &'static str)> {
    [WEBSITE_SLOT, CONTEXT_SLOT]
        .into_iter()
        .filter_map(|slot| s.find(slot).map(|idx| (idx, slot)))
        .min_by_key(|(idx, _)| *idx)
}

// ── Tests ──
