//! One-shot pipeline execution.
//!
//! A pipeline document declares any number of `rmlc:ExecRML` bindings. Each
//! binding gets its own mapping store and temp file and runs the streaming
//! engine once. Bindings run concurrently and share only the artifact
//! resolver.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use rml_core::error::{Result, RmlError};
use rml_core::traits::{DocumentFetcher, EngineRunner};
use rml_core::types::ChannelConfig;
use rml_mapping::{
    discover_bindings, resolve_channel, rewrite_logical_source, Binding, DocumentLoader,
    GraphStore,
};

use crate::artifact::EngineArtifactResolver;

/// Result of running a single binding.
#[derive(Debug)]
pub struct BindingOutcome {
    pub binding: Binding,
    /// Path of the rewritten mapping the engine ran with.
    pub result: Result<PathBuf>,
}

impl BindingOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct Orchestrator {
    temp_dir: PathBuf,
    fetcher: Arc<dyn DocumentFetcher>,
    resolver: Arc<EngineArtifactResolver>,
    runner: Arc<dyn EngineRunner>,
    offline: bool,
}

impl Orchestrator {
    pub fn new(
        temp_dir: PathBuf,
        fetcher: Arc<dyn DocumentFetcher>,
        resolver: Arc<EngineArtifactResolver>,
        runner: Arc<dyn EngineRunner>,
    ) -> Self {
        Self {
            temp_dir,
            fetcher,
            resolver,
            runner,
            offline: false,
        }
    }

    /// Never download the engine; fail bindings whose artifact is missing.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Load the pipeline at `location`, then run every binding it declares.
    ///
    /// Fails only when the pipeline itself yields nothing. Per-binding
    /// failures are reported in the returned outcomes.
    pub async fn run_pipeline(&self, location: &str) -> Result<Vec<BindingOutcome>> {
        let store = GraphStore::new()?;
        let mut loader = DocumentLoader::new(self.fetcher.clone());
        loader.load(location, &store, true).await;

        if store.is_empty()? {
            return Err(RmlError::Graph(format!("no statements loaded from {location}")));
        }

        let bindings = discover_bindings(&store)?;
        if bindings.is_empty() {
            warn!(pipeline = %location, "Pipeline declares no mapping executions");
            return Ok(Vec::new());
        }
        info!(pipeline = %location, bindings = bindings.len(), "Starting mapping executions");

        let runs = bindings.into_iter().map(|binding| {
            let span = info_span!("binding", id = %binding.label());
            let store = &store;
            async move {
                let result = self.run_binding(store, &binding).await;
                match &result {
                    Ok(mapping) => info!(mapping = %mapping.display(), "Binding finished"),
                    Err(e) => error!(error = %e, "Binding failed"),
                }
                BindingOutcome { binding, result }
            }
            .instrument(span)
        });

        Ok(join_all(runs).await)
    }

    /// Run the streaming engine once for `binding`.
    pub async fn run_binding(&self, pipeline: &GraphStore, binding: &Binding) -> Result<PathBuf> {
        let input = resolve_channel(pipeline, binding.input.as_ref())?;
        let output = resolve_channel(pipeline, binding.output.as_ref())?;
        let mut flags = target_flags(&output)?;

        let mapping = GraphStore::new()?;
        DocumentLoader::new(self.fetcher.clone())
            .load(&binding.mapping, &mapping, true)
            .await;
        rewrite_logical_source(&mapping, &input, &binding.overrides)?;

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let mapping_path = self.temp_dir.join(format!("rml-{}.ttl", Uuid::new_v4()));
        tokio::fs::write(&mapping_path, mapping.to_turtle()?).await?;
        flags.push("-m".into());
        flags.push(mapping_path.display().to_string());

        let explicit = binding.jar_file.as_ref().map(PathBuf::from);
        let artifact = self
            .resolver
            .resolve(explicit.as_deref(), self.offline)
            .await?;

        info!(input = %input, output = %output, "Running mapping");
        self.runner.run(&artifact, &flags).await?;
        Ok(mapping_path)
    }
}

/// Engine flags selecting where mapped output is written.
pub fn target_flags(output: &ChannelConfig) -> Result<Vec<String>> {
    match output {
        ChannelConfig::File { path, .. } => Ok(vec!["toFile".into(), "-o".into(), path.clone()]),
        ChannelConfig::Topic {
            broker, topic_name, ..
        } => Ok(vec![
            "toKafka".into(),
            "-b".into(),
            broker.clone(),
            "-t".into(),
            topic_name.clone(),
        ]),
        other => Err(RmlError::UnsupportedChannel(format!(
            "the streaming engine cannot write to a {} channel ({other})",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rml_test_utils::{fixtures, flag_value, CopyEngine, CountingDownloader, CountingFetcher};
    use std::path::Path;
    use std::time::Duration;

    const PIPELINE: &str = "http://example.org/pipeline.ttl";
    const MAPPING: &str = "http://example.org/mapping.ttl";

    fn pipeline_doc(input: &Path, output: &Path) -> String {
        format!(
            r#"
            @prefix rmlc: <https://w3id.org/conn/rml#> .
            @prefix : <https://w3id.org/conn#> .

            <#ok> a rmlc:ExecRML ;
                rmlc:input <#in> ;
                rmlc:output <#out> ;
                rmlc:mappingFile <mapping.ttl> .

            <#socket> a rmlc:ExecRML ;
                rmlc:input <#in> ;
                rmlc:output <#ws> ;
                rmlc:mappingFile <mapping.ttl> .

            <#in> a :FileReaderChannel ; :filePath "{}" .
            <#out> a :FileWriterChannel ; :filePath "{}" .
            <#ws> a :WsWriterChannel ; :wsUri "ws://localhost:8123" .
            "#,
            input.display(),
            output.display()
        )
    }

    struct Harness {
        dir: tempfile::TempDir,
        engine: Arc<CopyEngine>,
        downloader: Arc<CountingDownloader>,
        orchestrator: Orchestrator,
    }

    fn harness(mapping: &str) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("people.json");
        let output = dir.path().join("people.nt");
        std::fs::write(&input, "{\"people\":[]}").unwrap();

        let fetcher = Arc::new(
            CountingFetcher::new()
                .with(PIPELINE, &pipeline_doc(&input, &output))
                .with(MAPPING, mapping),
        );
        let downloader = Arc::new(CountingDownloader::new(Duration::from_millis(20)));
        let resolver = Arc::new(EngineArtifactResolver::new(
            "https://example.org/streamer.jar",
            dir.path(),
            downloader.clone(),
        ));
        let engine = Arc::new(CopyEngine::new(input));
        let orchestrator =
            Orchestrator::new(dir.path().to_path_buf(), fetcher, resolver, engine.clone());

        Harness {
            dir,
            engine,
            downloader,
            orchestrator,
        }
    }

    fn outcome<'a>(outcomes: &'a [BindingOutcome], fragment: &str) -> &'a BindingOutcome {
        outcomes
            .iter()
            .find(|o| o.binding.label().ends_with(&format!("#{fragment}>")))
            .unwrap()
    }

    #[test]
    fn file_and_topic_targets() {
        assert_eq!(
            target_flags(&ChannelConfig::file("out.nt")).unwrap(),
            vec!["toFile", "-o", "out.nt"]
        );

        let topic = ChannelConfig::Topic {
            broker: "kafka:9092".into(),
            topic_name: "people".into(),
            consumer_group_id: String::new(),
        };
        assert_eq!(
            target_flags(&topic).unwrap(),
            vec!["toKafka", "-b", "kafka:9092", "-t", "people"]
        );

        let ws = ChannelConfig::WebSocket {
            url: "ws://localhost".into(),
        };
        assert!(matches!(target_flags(&ws), Err(RmlError::UnsupportedChannel(_))));
    }

    #[tokio::test]
    async fn bindings_fail_independently() {
        let h = harness(fixtures::MAPPING_WITH_CSV_SOURCE);
        let outcomes = h.orchestrator.run_pipeline(PIPELINE).await.unwrap();
        assert_eq!(outcomes.len(), 2);

        let ok = outcome(&outcomes, "ok");
        let mapping_path = ok.result.as_ref().unwrap();
        assert!(mapping_path.starts_with(h.dir.path()));

        let socket = outcome(&outcomes, "socket");
        assert!(matches!(socket.result, Err(RmlError::UnsupportedChannel(_))));

        // Only the good binding reached the engine.
        let runs = h.engine.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0][0], "toFile");
        assert_eq!(flag_value(&runs[0], "-m"), Some(mapping_path.to_str().unwrap()));
        assert_eq!(h.downloader.calls(), 1);

        let mapped = std::fs::read_to_string(h.dir.path().join("people.nt")).unwrap();
        assert_eq!(mapped, "mapped:{\"people\":[]}");
    }

    #[tokio::test]
    async fn rewritten_mapping_reads_the_input_channel() {
        let h = harness(fixtures::MAPPING_WITH_CSV_SOURCE);
        let outcomes = h.orchestrator.run_pipeline(PIPELINE).await.unwrap();
        let written = std::fs::read_to_string(outcome(&outcomes, "ok").result.as_ref().unwrap())
            .unwrap();

        let input = h.dir.path().join("people.json");
        assert!(written.contains(&input.display().to_string()));
        assert!(!written.contains("old.csv"));
    }

    #[tokio::test]
    async fn mapping_with_two_triples_maps_never_runs() {
        let h = harness(fixtures::TWO_TRIPLES_MAPS);
        let outcomes = h.orchestrator.run_pipeline(PIPELINE).await.unwrap();

        assert!(matches!(
            outcome(&outcomes, "ok").result,
            Err(RmlError::Cardinality { found: 2, .. })
        ));
        assert!(h.engine.runs().is_empty());
        assert_eq!(h.downloader.calls(), 0);
    }

    #[tokio::test]
    async fn offline_without_artifact_fails_each_binding() {
        let Harness {
            dir: _dir,
            engine,
            downloader,
            orchestrator,
        } = harness(fixtures::MAPPING_WITH_CSV_SOURCE);
        let orchestrator = orchestrator.offline(true);

        let outcomes = orchestrator.run_pipeline(PIPELINE).await.unwrap();
        assert!(matches!(
            outcome(&outcomes, "ok").result,
            Err(RmlError::ArtifactUnavailable(_))
        ));
        assert!(engine.runs().is_empty());
        assert_eq!(downloader.calls(), 0);
    }

    #[tokio::test]
    async fn unreadable_pipeline_is_an_error() {
        let h = harness(fixtures::MAPPING_WITH_CSV_SOURCE);
        let err = h
            .orchestrator
            .run_pipeline("http://example.org/missing.ttl")
            .await
            .unwrap_err();
        assert!(matches!(err, RmlError::Graph(_)));
    }

    #[tokio::test]
    async fn pipeline_without_bindings_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new().with(PIPELINE, fixtures::NO_TRIPLES_MAP));
        let downloader = Arc::new(CountingDownloader::new(Duration::ZERO));
        let resolver = Arc::new(EngineArtifactResolver::new(
            "https://example.org/streamer.jar",
            dir.path(),
            downloader,
        ));
        let engine = Arc::new(CopyEngine::new(dir.path().join("in.json")));
        let orchestrator = Orchestrator::new(dir.path().to_path_buf(), fetcher, resolver, engine);

        assert!(orchestrator.run_pipeline(PIPELINE).await.unwrap().is_empty());
    }
}
