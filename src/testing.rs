//! In-process stand-ins for the page source and the model.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::{FetchError, InferenceError};
use crate::fetcher::{FetchedPage, PageSource};
use crate::inference::CompletionClient;

pub const ARTICLE_HTML: &str = "<html><body>\
    <nav>Home About Contact</nav>\
    <p>The study found X increases Y by 30%.</p>\
    </body></html>";

/// Serves fixed pages after a per-page delay; unknown URLs time out.
pub struct FakeSource {
    pages: HashMap<String, (Duration, String)>,
}

impl FakeSource {
    pub fn with(pages: &[(&str, u64, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .iter()
                .map(|(u, ms, body)| {
                    (u.to_string(), (Duration::from_millis(*ms), body.to_string()))
                })
                .collect(),
        })
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let Some((delay, body)) = self.pages.get(url) else {
            return Err(FetchError::Timeout(url.to_string()));
        };
        tokio::time::sleep(*delay).await;
        Ok(FetchedPage {
            url: url.to_string(),
            status: 200,
            content_type: Some("text/html".into()),
            body: body.clone(),
            latency_ms: delay.as_millis() as u64,
        })
    }
}

/// Answers by applying `reply` to the prompt and records every prompt seen.
pub struct FakeModel {
    reply: fn(&str) -> Result<String, InferenceError>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new(reply: fn(&str) -> Result<String, InferenceError>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for FakeModel {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.reply)(prompt)
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

/// Shared sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Plain-text debug logs for the current thread while the guard lives.
pub fn capture_logs() -> (DefaultGuard, LogBuffer) {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (tracing::subscriber::set_default(subscriber), logs)
}
