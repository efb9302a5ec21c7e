//! Continuous mapping: one engine run per incoming data chunk.
//!
//! The adapter owns three fixed files: the working mapping document, the
//! input staging file the mapping reads from, and the output staging file
//! the engine writes to. Mapping updates and chunk runs share one lock, so a
//! mapping can never change under a running chunk and chunks never race on
//! the staging files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use rml_core::error::{Result, RmlError};
use rml_core::traits::EngineRunner;
use rml_core::types::{ChannelConfig, SourceOverrides, StagingPaths};
use rml_mapping::loader::normalize_location;
use rml_mapping::vocab::ql;
use rml_mapping::{rewrite_logical_source, GraphStore};

#[derive(Debug, Default)]
struct AdapterState {
    mapping_applied: bool,
    chunks: u64,
}

pub struct StreamingAdapter {
    paths: StagingPaths,
    artifact: PathBuf,
    overrides: SourceOverrides,
    runner: Arc<dyn EngineRunner>,
    state: Mutex<AdapterState>,
}

impl StreamingAdapter {
    /// Create an adapter with fresh staging files under `temp_dir`.
    pub fn new(
        temp_dir: &Path,
        artifact: PathBuf,
        runner: Arc<dyn EngineRunner>,
        overrides: SourceOverrides,
    ) -> Self {
        let id = Uuid::new_v4();
        let paths = StagingPaths {
            mapping: temp_dir.join(format!("rml-{id}.ttl")),
            input: temp_dir.join(format!("rml-input-{id}.{}", input_extension(&overrides))),
            output: temp_dir.join(format!("rml-output-{id}.ttl")),
        };
        Self::with_paths(paths, artifact, runner, overrides)
    }

    pub fn with_paths(
        paths: StagingPaths,
        artifact: PathBuf,
        runner: Arc<dyn EngineRunner>,
        overrides: SourceOverrides,
    ) -> Self {
        Self {
            paths,
            artifact,
            overrides,
            runner,
            state: Mutex::new(AdapterState::default()),
        }
    }

    pub fn paths(&self) -> &StagingPaths {
        &self.paths
    }

    /// Install a new mapping document, pointed at the input staging file.
    ///
    /// Relative IRIs resolve against the working mapping file.
    pub async fn apply_mapping(&self, contents: &str) -> Result<()> {
        let base = normalize_location(&self.paths.mapping.display().to_string())?;
        self.apply_mapping_at(contents, &base).await
    }

    /// Install a new mapping document whose relative IRIs resolve against `base`.
    pub async fn apply_mapping_at(&self, contents: &str, base: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        let store = GraphStore::new()?;
        store.load_turtle(contents.as_bytes(), Some(base))?;

        let input = ChannelConfig::file(self.paths.input.display().to_string());
        rewrite_logical_source(&store, &input, &self.overrides)?;

        tokio::fs::write(&self.paths.mapping, store.to_turtle()?).await?;
        state.mapping_applied = true;

        info!(path = %self.paths.mapping.display(), "Mapping updated");
        Ok(())
    }

    /// Map one chunk: write it, run the engine to completion, read the result.
    pub async fn process_chunk(&self, chunk: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        if !state.mapping_applied {
            return Err(RmlError::Binding(
                "data chunk received before any mapping was applied".into(),
            ));
        }

        tokio::fs::write(&self.paths.input, chunk).await?;
        match tokio::fs::remove_file(&self.paths.output).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let flags = vec![
            "-m".to_string(),
            self.paths.mapping.display().to_string(),
            "-o".to_string(),
            self.paths.output.display().to_string(),
        ];
        self.runner.run(&self.artifact, &flags).await?;

        // A successful run that writes nothing mapped the chunk to nothing.
        let output = match tokio::fs::read_to_string(&self.paths.output).await {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        state.chunks += 1;
        debug!(chunk = state.chunks, bytes = output.len(), "Chunk mapped");
        Ok(output)
    }

    /// Serve mapping updates and data chunks until the data stream ends or
    /// the consumer goes away.
    ///
    /// Values already buffered in either channel when this starts are handled
    /// like any other, so a final mapping or chunk sent before subscription is
    /// not lost. Chunks wait until the first mapping has been applied, and
    /// mapping updates are always taken before pending chunks.
    pub async fn run(
        &self,
        mut mappings: mpsc::Receiver<String>,
        mut chunks: mpsc::Receiver<String>,
        out: mpsc::Sender<String>,
    ) -> Result<()> {
        let mut mapping_ready = self.state.lock().await.mapping_applied;
        let mut mappings_open = true;

        loop {
            tokio::select! {
                biased;

                update = mappings.recv(), if mappings_open => match update {
                    Some(contents) => match self.apply_mapping(&contents).await {
                        Ok(()) => mapping_ready = true,
                        Err(e) => error!(error = %e, "Failed to apply mapping update"),
                    },
                    None => {
                        mappings_open = false;
                        if !mapping_ready {
                            warn!("Mapping stream closed before any mapping arrived");
                            return Ok(());
                        }
                    }
                },

                chunk = chunks.recv(), if mapping_ready => match chunk {
                    Some(chunk) => match self.process_chunk(&chunk).await {
                        Ok(mapped) => {
                            if out.send(mapped).await.is_err() {
                                info!("Downstream consumer closed");
                                break;
                            }
                        }
                        Err(e) => error!(error = %e, "Failed to map chunk, skipping"),
                    },
                    None => break,
                },

                else => break,
            }
        }

        info!("Streaming adapter finished");
        Ok(())
    }

    /// Serve chunks with the mapping read once from `mapping_path`.
    ///
    /// Relative IRIs in the mapping resolve against `mapping_path` itself.
    pub async fn run_with_mapping_file(
        &self,
        mapping_path: &Path,
        chunks: mpsc::Receiver<String>,
        out: mpsc::Sender<String>,
    ) -> Result<()> {
        let contents = tokio::fs::read_to_string(mapping_path).await?;
        let base = normalize_location(&mapping_path.display().to_string())?;
        self.apply_mapping_at(&contents, &base).await?;

        let (_, no_updates) = mpsc::channel(1);
        self.run(no_updates, chunks, out).await
    }
}

/// Extension of the input staging file. The rewrite infers the source shape
/// from it unless a reference formulation is forced.
fn input_extension(overrides: &SourceOverrides) -> &'static str {
    match overrides.reference_formulation.as_deref() {
        Some(f) if f == ql::XPATH.as_str() => "xml",
        Some(f) if f == ql::CSV.as_str() => "csv",
        _ => "json",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rml_mapping::store::term_value;
    use rml_mapping::vocab::rml;
    use rml_test_utils::{fixtures, flag_value, CopyEngine};
    use std::time::Duration;

    fn staging(dir: &Path) -> StagingPaths {
        StagingPaths {
            mapping: dir.join("mapping.ttl"),
            input: dir.join("input.json"),
            output: dir.join("output.nt"),
        }
    }

    fn adapter(dir: &Path, engine: Arc<CopyEngine>) -> StreamingAdapter {
        StreamingAdapter::with_paths(
            staging(dir),
            dir.join("engine.jar"),
            engine,
            SourceOverrides::default(),
        )
    }

    #[tokio::test]
    async fn one_output_chunk_per_input_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CopyEngine::new(staging(dir.path()).input));
        let adapter = adapter(dir.path(), engine.clone());

        let (map_tx, map_rx) = mpsc::channel(4);
        let (data_tx, data_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);

        // Everything is buffered before the adapter starts.
        map_tx.send(fixtures::MAPPING_WITH_CSV_SOURCE.to_string()).await.unwrap();
        data_tx.send("{\"a\":1}".to_string()).await.unwrap();
        data_tx.send("{\"a\":2}".to_string()).await.unwrap();
        drop(map_tx);
        drop(data_tx);

        adapter.run(map_rx, data_rx, out_tx).await.unwrap();

        assert_eq!(out_rx.recv().await.unwrap(), "mapped:{\"a\":1}");
        assert_eq!(out_rx.recv().await.unwrap(), "mapped:{\"a\":2}");
        assert!(out_rx.recv().await.is_none());

        let runs = engine.runs();
        assert_eq!(runs.len(), 2);
        let paths = adapter.paths();
        assert_eq!(flag_value(&runs[0], "-m"), Some(paths.mapping.to_str().unwrap()));
        assert_eq!(flag_value(&runs[0], "-o"), Some(paths.output.to_str().unwrap()));
    }

    #[tokio::test]
    async fn mapping_points_at_input_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CopyEngine::new(staging(dir.path()).input));
        let adapter = adapter(dir.path(), engine);

        adapter.apply_mapping(fixtures::MAPPING_WITH_CSV_SOURCE).await.unwrap();

        let written = std::fs::read_to_string(&adapter.paths().mapping).unwrap();
        let store = GraphStore::new().unwrap();
        store.load_turtle(written.as_bytes(), None).unwrap();
        let sources: Vec<String> = store
            .quads(None, Some(rml::SOURCE), None)
            .unwrap()
            .iter()
            .filter_map(|q| term_value(&q.object))
            .collect();
        assert_eq!(sources, vec![adapter.paths().input.display().to_string()]);
    }

    #[tokio::test]
    async fn relative_iris_resolve_against_mapping_file() {
        let dir = tempfile::tempdir().unwrap();
        let mapping_file = dir.path().join("people-mapping.ttl");
        std::fs::write(&mapping_file, fixtures::MAPPING_WITH_RELATIVE_IRIS).unwrap();

        let engine = Arc::new(CopyEngine::new(staging(dir.path()).input));
        let adapter = adapter(dir.path(), engine.clone());

        let (data_tx, data_rx) = mpsc::channel(1);
        let (out_tx, mut out_rx) = mpsc::channel(1);
        data_tx.send("{\"people\":[]}".to_string()).await.unwrap();
        drop(data_tx);

        adapter
            .run_with_mapping_file(&mapping_file, data_rx, out_tx)
            .await
            .unwrap();
        assert_eq!(out_rx.recv().await.unwrap(), "mapped:{\"people\":[]}");
        assert_eq!(engine.runs().len(), 1);

        let written = std::fs::read_to_string(&adapter.paths().mapping).unwrap();
        let base = normalize_location(&mapping_file.display().to_string()).unwrap();
        assert!(written.contains(&format!("{base}#PersonMap")));
        assert!(!written.contains("people.json\""));
    }

    #[tokio::test]
    async fn relative_iris_in_streamed_mapping_updates() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CopyEngine::new(staging(dir.path()).input));
        let adapter = adapter(dir.path(), engine);

        let (map_tx, map_rx) = mpsc::channel(1);
        let (data_tx, data_rx) = mpsc::channel(1);
        let (out_tx, mut out_rx) = mpsc::channel(1);
        map_tx.send(fixtures::MAPPING_WITH_RELATIVE_IRIS.to_string()).await.unwrap();
        drop(map_tx);
        data_tx.send("{}".to_string()).await.unwrap();
        drop(data_tx);

        adapter.run(map_rx, data_rx, out_tx).await.unwrap();
        assert_eq!(out_rx.recv().await.unwrap(), "mapped:{}");

        let written = std::fs::read_to_string(&adapter.paths().mapping).unwrap();
        let base = normalize_location(&adapter.paths().mapping.display().to_string()).unwrap();
        assert!(written.contains(&format!("{base}#PersonMap")));
    }

    #[tokio::test]
    async fn empty_engine_output_is_not_replaced_by_the_previous_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CopyEngine::new(staging(dir.path()).input).silent_on("quiet"));
        let adapter = adapter(dir.path(), engine.clone());
        adapter.apply_mapping(fixtures::MAPPING_WITH_CSV_SOURCE).await.unwrap();

        assert_eq!(adapter.process_chunk("loud").await.unwrap(), "mapped:loud");
        assert_eq!(adapter.process_chunk("quiet").await.unwrap(), "");
        assert!(!adapter.paths().output.exists());
        assert_eq!(adapter.process_chunk("again").await.unwrap(), "mapped:again");
        assert_eq!(engine.runs().len(), 3);
    }

    #[tokio::test]
    async fn chunk_before_mapping_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CopyEngine::new(staging(dir.path()).input));
        let adapter = adapter(dir.path(), engine.clone());

        assert!(matches!(
            adapter.process_chunk("{}").await,
            Err(RmlError::Binding(_))
        ));
        assert!(engine.runs().is_empty());
    }

    #[tokio::test]
    async fn failed_chunk_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CopyEngine::new(staging(dir.path()).input).failing_on("bad"));
        let adapter = adapter(dir.path(), engine);

        let (map_tx, map_rx) = mpsc::channel(1);
        let (data_tx, data_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        map_tx.send(fixtures::MAPPING_WITH_CSV_SOURCE.to_string()).await.unwrap();
        drop(map_tx);
        for chunk in ["first", "bad", "last"] {
            data_tx.send(chunk.to_string()).await.unwrap();
        }
        drop(data_tx);

        adapter.run(map_rx, data_rx, out_tx).await.unwrap();
        assert_eq!(out_rx.recv().await.unwrap(), "mapped:first");
        assert_eq!(out_rx.recv().await.unwrap(), "mapped:last");
        assert!(out_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_mapping_stream_without_mapping_stops() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CopyEngine::new(staging(dir.path()).input));
        let adapter = adapter(dir.path(), engine.clone());

        let (map_tx, map_rx) = mpsc::channel::<String>(1);
        let (data_tx, data_rx) = mpsc::channel(1);
        let (out_tx, _out_rx) = mpsc::channel(1);
        drop(map_tx);
        data_tx.send("{}".to_string()).await.unwrap();

        adapter.run(map_rx, data_rx, out_tx).await.unwrap();
        assert!(engine.runs().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_chunks_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            CopyEngine::new(staging(dir.path()).input).with_delay(Duration::from_millis(20)),
        );
        let adapter = Arc::new(adapter(dir.path(), engine.clone()));
        adapter.apply_mapping(fixtures::MAPPING_WITH_CSV_SOURCE).await.unwrap();

        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let adapter = adapter.clone();
                tokio::spawn(async move {
                    let chunk = format!("chunk-{i}");
                    let mapped = adapter.process_chunk(&chunk).await.unwrap();
                    (chunk, mapped)
                })
            })
            .collect();

        for task in tasks {
            let (chunk, mapped) = task.await.unwrap();
            assert_eq!(mapped, format!("mapped:{chunk}"));
        }
        assert_eq!(engine.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn seeded_from_mapping_file() {
        let dir = tempfile::tempdir().unwrap();
        let mapping_file = dir.path().join("seed.ttl");
        std::fs::write(&mapping_file, fixtures::MAPPING_WITHOUT_SOURCE).unwrap();

        let engine = Arc::new(CopyEngine::new(staging(dir.path()).input));
        let adapter = adapter(dir.path(), engine);

        let (data_tx, data_rx) = mpsc::channel(1);
        let (out_tx, mut out_rx) = mpsc::channel(1);
        data_tx.send("<x>".to_string()).await.unwrap();
        drop(data_tx);

        let run = tokio::spawn(async move {
            adapter.run_with_mapping_file(&mapping_file, data_rx, out_tx).await
        });
        assert_eq!(out_rx.recv().await.unwrap(), "mapped:<x>");
        run.await.unwrap().unwrap();
    }

    #[test]
    fn new_uses_distinct_staging_names() {
        let dir = Path::new("/tmp");
        let engine: Arc<dyn EngineRunner> = Arc::new(CopyEngine::new("/tmp/x"));
        let adapter = StreamingAdapter::new(
            dir,
            PathBuf::from("engine.jar"),
            engine,
            SourceOverrides::default(),
        );
        let paths = adapter.paths();
        assert_ne!(paths.mapping, paths.output);
        assert!(paths.input.starts_with(dir));
        assert_eq!(paths.input.extension().unwrap(), "json");
    }

    #[test]
    fn input_extension_follows_forced_formulation() {
        let xml = SourceOverrides {
            reference_formulation: Some(ql::XPATH.as_str().into()),
            iterator: None,
        };
        assert_eq!(input_extension(&xml), "xml");
        let csv = SourceOverrides {
            reference_formulation: Some(ql::CSV.as_str().into()),
            iterator: None,
        };
        assert_eq!(input_extension(&csv), "csv");
        assert_eq!(input_extension(&SourceOverrides::default()), "json");
    }
}
