use std::path::Path;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::EngineExit;

/// Turns a document location IRI into bytes.
pub trait DocumentFetcher: Send + Sync + 'static {
    /// Fetch the raw bytes behind `location` (an absolute `http`, `https`, or `file` IRI).
    fn fetch(&self, location: &str) -> BoxFuture<'_, Result<Vec<u8>>>;
}

/// Places a release artifact at a local path.
pub trait ArtifactDownloader: Send + Sync + 'static {
    /// Download `url` to `dest`. `dest` must only exist once the download is complete.
    fn download(&self, url: &str, dest: &Path) -> BoxFuture<'_, Result<()>>;
}

/// Runs the mapping engine to completion.
pub trait EngineRunner: Send + Sync + 'static {
    /// Run the artifact with the given flags.
    ///
    /// Non-zero exits are returned as `RmlError::EngineExecution`.
    fn run(&self, artifact: &Path, flags: &[String]) -> BoxFuture<'_, Result<EngineExit>>;
}
