//! Recursive mapping document loading with `owl:imports` following.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use oxigraph::model::NamedNode;
use reqwest::Url;
use tracing::{debug, warn};

use rml_core::error::{Result, RmlError};
use rml_core::traits::DocumentFetcher;

use crate::store::GraphStore;
use crate::vocab;

/// Fetches `http`/`https` documents over the network and everything else from disk.
pub struct HttpFileFetcher {
    client: reqwest::Client,
}

impl HttpFileFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("rml-runner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RmlError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl DocumentFetcher for HttpFileFetcher {
    fn fetch(&self, location: &str) -> BoxFuture<'_, Result<Vec<u8>>> {
        let location = location.to_string();
        Box::pin(async move {
            let url = Url::parse(&location)
                .map_err(|e| RmlError::Graph(format!("invalid location {location}: {e}")))?;

            match url.scheme() {
                "http" | "https" => {
                    let resp = self.client.get(url).send().await.map_err(|e| {
                        RmlError::Graph(format!("request for {location} failed: {e}"))
                    })?;
                    if !resp.status().is_success() {
                        return Err(RmlError::Graph(format!(
                            "{location} returned HTTP {}",
                            resp.status()
                        )));
                    }
                    let body = resp.bytes().await.map_err(|e| {
                        RmlError::Graph(format!("reading {location} failed: {e}"))
                    })?;
                    Ok(body.to_vec())
                }
                _ => {
                    let path = url.to_file_path().map_err(|_| {
                        RmlError::Graph(format!("{location} is not a local file"))
                    })?;
                    Ok(tokio::fs::read(path).await?)
                }
            }
        })
    }
}

/// Populates stores from documents and everything they import.
///
/// The loader remembers every location it has visited; a location is fetched
/// at most once until [`DocumentLoader::reset`] is called.
pub struct DocumentLoader {
    fetcher: Arc<dyn DocumentFetcher>,
    visited: HashSet<String>,
}

impl DocumentLoader {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self {
            fetcher,
            visited: HashSet::new(),
        }
    }

    /// Forget every visited location.
    pub fn reset(&mut self) {
        self.visited.clear();
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Load `location` into `store`, then (if `recursive`) every document it
    /// imports, depth-first.
    ///
    /// Documents that cannot be fetched or parsed are logged and skipped.
    pub fn load<'a>(
        &'a mut self,
        location: &'a str,
        store: &'a GraphStore,
        recursive: bool,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let iri = match normalize_location(location) {
                Ok(iri) => iri,
                Err(e) => {
                    warn!(location = %location, error = %e, "Skipping unresolvable document");
                    return;
                }
            };

            if !self.visited.insert(iri.clone()) {
                debug!(location = %iri, "Document already loaded");
                return;
            }

            let bytes = match self.fetcher.fetch(&iri).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(location = %iri, error = %e, "Failed to fetch document");
                    return;
                }
            };

            match store.load_turtle(&bytes, Some(&iri)) {
                Ok(count) => debug!(location = %iri, statements = count, "Loaded document"),
                Err(e) => {
                    warn!(location = %iri, error = %e, "Failed to parse document");
                    return;
                }
            }

            if !recursive {
                return;
            }

            for target in imports_of(store, &iri) {
                self.load(&target, store, true).await;
            }
        })
    }
}

/// Targets of `<location> owl:imports ?target`.
fn imports_of(store: &GraphStore, location: &str) -> Vec<String> {
    let Ok(subject) = NamedNode::new(location) else {
        return Vec::new();
    };
    match store.objects(subject.as_ref().into(), vocab::owl::IMPORTS) {
        Ok(objects) => objects
            .into_iter()
            .filter_map(|o| match o {
                oxigraph::model::Term::NamedNode(n) => Some(n.into_string()),
                _ => None,
            })
            .collect(),
        Err(e) => {
            warn!(location = %location, error = %e, "Failed to read imports");
            Vec::new()
        }
    }
}

/// Turn a URL or filesystem path into the absolute IRI documents are keyed by.
pub fn normalize_location(location: &str) -> Result<String> {
    if let Ok(url) = Url::parse(location) {
        // Single-letter schemes are Windows drive letters, not URLs.
        if url.scheme().len() > 1 {
            return Ok(url.to_string());
        }
    }

    let path = Path::new(location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map(|u| u.to_string())
        .map_err(|_| RmlError::Graph(format!("cannot turn {} into a file URL", absolute.display())))
}
