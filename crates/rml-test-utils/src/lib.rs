//! Fakes and fixtures shared by the rml-runner test suites.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;

use rml_core::error::{Result, RmlError};
use rml_core::traits::{ArtifactDownloader, DocumentFetcher, EngineRunner};
use rml_core::types::EngineExit;

pub mod fixtures;

/// In-memory document transport that counts fetches per location.
///
/// Unknown locations fail with `NotFound` but are still counted.
#[derive(Default)]
pub struct CountingFetcher {
    documents: HashMap<String, String>,
    counts: Mutex<HashMap<String, usize>>,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &str, body: &str) -> Self {
        self.documents.insert(location.to_string(), body.to_string());
        self
    }

    pub fn count(&self, location: &str) -> usize {
        self.counts
            .lock()
            .unwrap()
            .get(location)
            .copied()
            .unwrap_or(0)
    }
}

impl DocumentFetcher for CountingFetcher {
    fn fetch(&self, location: &str) -> BoxFuture<'_, Result<Vec<u8>>> {
        let location = location.to_string();
        Box::pin(async move {
            *self
                .counts
                .lock()
                .unwrap()
                .entry(location.clone())
                .or_default() += 1;
            self.documents
                .get(&location)
                .map(|body| body.clone().into_bytes())
                .ok_or_else(|| {
                    RmlError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("no fixture for {location}"),
                    ))
                })
        })
    }
}

/// Slow fake downloader that writes a placeholder artifact and counts calls.
pub struct CountingDownloader {
    calls: AtomicUsize,
    delay: Duration,
    fail_next: AtomicBool,
}

impl CountingDownloader {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next download fail after its delay.
    pub fn failing_once(self) -> Self {
        self.fail_next.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArtifactDownloader for CountingDownloader {
    fn download(&self, url: &str, dest: &Path) -> BoxFuture<'_, Result<()>> {
        let url = url.to_string();
        let dest = dest.to_path_buf();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(RmlError::Download(format!("{url}: simulated failure")));
            }
            tokio::fs::write(&dest, format!("artifact from {url}")).await?;
            Ok(())
        })
    }
}

/// Fake engine: copies a fixed input file to the `-o` target with a prefix.
///
/// Tracks how many runs overlap so tests can assert serialization.
pub struct CopyEngine {
    input: PathBuf,
    prefix: String,
    delay: Duration,
    runs: Mutex<Vec<Vec<String>>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    fail_on: Option<String>,
    silent_on: Option<String>,
}

impl CopyEngine {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            prefix: "mapped:".to_string(),
            delay: Duration::from_millis(0),
            runs: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            fail_on: None,
            silent_on: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Exit non-zero whenever the input equals `content`.
    pub fn failing_on(mut self, content: &str) -> Self {
        self.fail_on = Some(content.to_string());
        self
    }

    /// Exit zero without writing any output whenever the input equals `content`.
    pub fn silent_on(mut self, content: &str) -> Self {
        self.silent_on = Some(content.to_string());
        self
    }

    /// Flags of every run so far.
    pub fn runs(&self) -> Vec<Vec<String>> {
        self.runs.lock().unwrap().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl EngineRunner for CopyEngine {
    fn run(&self, _artifact: &Path, flags: &[String]) -> BoxFuture<'_, Result<EngineExit>> {
        let flags = flags.to_vec();
        Box::pin(async move {
            self.runs.lock().unwrap().push(flags.clone());
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            let result = self.copy(&flags).await;

            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

impl CopyEngine {
    async fn copy(&self, flags: &[String]) -> Result<EngineExit> {
        let output = flag_value(flags, "-o")
            .ok_or_else(|| RmlError::Config("fake engine needs -o".into()))?;
        let input = tokio::fs::read_to_string(&self.input).await?;
        if self.fail_on.as_deref() == Some(input.as_str()) {
            return Err(RmlError::EngineExecution {
                status: Some(1),
                stderr: format!("cannot map {input}"),
            });
        }
        if self.silent_on.as_deref() != Some(input.as_str()) {
            tokio::fs::write(output, format!("{}{}", self.prefix, input)).await?;
        }
        Ok(EngineExit {
            status: Some(0),
            stderr: String::new(),
        })
    }
}

/// Value following `flag` in an argv list.
pub fn flag_value<'a>(flags: &'a [String], flag: &str) -> Option<&'a str> {
    flags
        .iter()
        .position(|f| f == flag)
        .and_then(|i| flags.get(i + 1))
        .map(String::as_str)
}
