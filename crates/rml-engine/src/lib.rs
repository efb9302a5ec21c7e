pub mod artifact;
pub mod orchestrator;
pub mod process;
pub mod streaming;

pub use artifact::{EngineArtifactResolver, ReleaseDownloader};
pub use orchestrator::{target_flags, BindingOutcome, Orchestrator};
pub use process::ProcessRunner;
pub use streaming::StreamingAdapter;
