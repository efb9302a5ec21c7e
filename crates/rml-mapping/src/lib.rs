pub mod channels;
pub mod discovery;
pub mod loader;
pub mod rewrite;
pub mod store;
pub mod vocab;

pub use channels::resolve_channel;
pub use discovery::{discover_bindings, Binding};
pub use loader::{DocumentLoader, HttpFileFetcher};
pub use rewrite::{rewrite_logical_source, SourceShape};
pub use store::GraphStore;
