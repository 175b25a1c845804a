use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::config::{DEFAULT_MAX_CONTENT_CHARS, DEFAULT_STRIP_TAGS};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Turns fetched markup into a bounded run of prose.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    strip_tags: HashSet<String>,
    max_chars: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_STRIP_TAGS.iter().copied(), DEFAULT_MAX_CONTENT_CHARS)
    }
}

impl Sanitizer {
    pub fn new<I, S>(strip_tags: I, max_chars: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            strip_tags: strip_tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            max_chars,
        }
    }

    /// Body text minus stripped elements, whitespace collapsed, cut to
    /// `max_chars`. Never fails: html5ever recovers from any input, and
    /// input that is not markup at all ends up as body text.
    pub fn sanitize(&self, html: &str) -> String {
        let document = Html::parse_document(html);

        let mut pieces: Vec<&str> = Vec::new();
        if let Some(body) = body_element(&document) {
            for node in body.descendants() {
                let Some(text) = node.value().as_text() else {
                    continue;
                };
                let stripped = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| self.strip_tags.contains(e.name()))
                });
                if !stripped {
                    pieces.push(text);
                }
            }
        }

        let joined = pieces.join(" ");
        let collapsed = WHITESPACE_RE.replace_all(&joined, " ");
        truncate_chars(collapsed.trim(), self.max_chars)
            .trim_end()
            .to_string()
    }
}

fn body_element(document: &Html) -> Option<ElementRef<'_>> {
    document
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "body")
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<!doctype html>
<html>
  <head><title>Study</title><style>p { color: red; }</style></head>
  <body>
    <header><h1>Site Header</h1></header>
    <nav><a href="/">Home</a> | <a href="/about">About</a></nav>
    <main>
      <p>The study found   X increases
         Y by 30%.</p>
      <script>window.tracking = "secret";</script>
      <iframe src="https://ads.example.com"></iframe>
    </main>
    <aside>Related posts</aside>
    <footer>Copyright 2024</footer>
  </body>
</html>"#;

    #[test]
    fn strips_noise_elements() {
        let out = Sanitizer::default().sanitize(ARTICLE);
        assert_eq!(out, "The study found X increases Y by 30%.");
    }

    #[test]
    fn script_and_style_bodies_never_leak() {
        let html = "<body><p>a</p><script>var x = 1;</script><style>.c{}</style><p>b</p></body>";
        let out = Sanitizer::default().sanitize(html);
        assert!(!out.contains("var x"));
        assert!(!out.contains(".c{}"));
        assert_eq!(out, "a b");
    }

    #[test]
    fn output_respects_char_cap() {
        let html = format!("<body><p>{}</p></body>", "word ".repeat(5000));
        let s = Sanitizer::new(["script"], 100);
        let out = s.sanitize(&html);
        assert_eq!(out.chars().count(), 99);
        assert!(out.ends_with("word"));
    }

    #[test]
    fn cut_after_a_word_leaves_no_trailing_space() {
        let out = Sanitizer::new(["script"], 4).sanitize("<body><p>abc def</p></body>");
        assert_eq!(out, "abc");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        let html = format!("<body>{}</body>", "é".repeat(50));
        let out = Sanitizer::new(Vec::<String>::new(), 10).sanitize(&html);
        assert_eq!(out, "é".repeat(10));
    }

    #[test]
    fn plain_text_and_garbage_do_not_fail() {
        let s = Sanitizer::default();
        assert_eq!(s.sanitize("just some\n\tplain text"), "just some plain text");
        assert_eq!(s.sanitize(""), "");
        let out = s.sanitize("<<<>>> <div <p>unclosed <b>tags");
        assert!(out.contains("tags"));
    }

    #[test]
    fn strip_list_is_configurable() {
        let html = "<body><form>Subscribe now</form><p>Kept</p><nav>Also kept</nav></body>";
        let out = Sanitizer::new(["FORM"], 6000).sanitize(html);
        assert_eq!(out, "Kept Also kept");
    }

    #[test]
    fn nested_content_inside_stripped_element_is_dropped() {
        let html = "<body><aside><div><p>deep <em>sidebar</em></p></div></aside><p>body</p></body>";
        assert_eq!(Sanitizer::default().sanitize(html), "body");
    }
}
