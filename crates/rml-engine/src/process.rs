//! Engine subprocess execution.

use std::path::Path;
use std::process::Stdio;

use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use rml_core::config::EngineConfig;
use rml_core::error::{Result, RmlError};
use rml_core::traits::EngineRunner;
use rml_core::types::{EngineExit, EngineOutput, OutputStream};

/// Runs the engine as `launcher... <artifact> flags...`.
///
/// Output lines are forwarded as they arrive: stdout at `info`, stderr at
/// `warn`, and both to the optional observer channel.
pub struct ProcessRunner {
    launcher: Vec<String>,
    label: String,
    stderr_tail_bytes: usize,
    observer: Option<mpsc::UnboundedSender<EngineOutput>>,
}

impl ProcessRunner {
    pub fn new(launcher: Vec<String>) -> Self {
        Self {
            launcher,
            label: "engine".to_string(),
            stderr_tail_bytes: 8192,
            observer: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.launcher.clone()).with_stderr_tail(config.stderr_tail_bytes)
    }

    /// Name shown on every forwarded output line.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_stderr_tail(mut self, bytes: usize) -> Self {
        self.stderr_tail_bytes = bytes;
        self
    }

    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<EngineOutput>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Full argv for one invocation.
    pub fn command_line(&self, artifact: &Path, flags: &[String]) -> Vec<String> {
        let mut argv = self.launcher.clone();
        argv.push(artifact.display().to_string());
        argv.extend(flags.iter().cloned());
        argv
    }
}

impl EngineRunner for ProcessRunner {
    fn run(&self, artifact: &Path, flags: &[String]) -> BoxFuture<'_, Result<EngineExit>> {
        let argv = self.command_line(artifact, flags);
        Box::pin(async move {
            let (program, args) = argv
                .split_first()
                .ok_or_else(|| RmlError::Config("engine launcher is empty".into()))?;

            info!(engine = %self.label, command = %argv.join(" "), "Executing engine");

            let mut child = tokio::process::Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()?;

            let stdout = child.stdout.take().map(|out| {
                tokio::spawn(forward_lines(
                    out,
                    OutputStream::Stdout,
                    self.label.clone(),
                    self.observer.clone(),
                    0,
                ))
            });
            let stderr = child.stderr.take().map(|err| {
                tokio::spawn(forward_lines(
                    err,
                    OutputStream::Stderr,
                    self.label.clone(),
                    self.observer.clone(),
                    self.stderr_tail_bytes,
                ))
            });

            let status = child.wait().await?;

            if let Some(task) = stdout {
                task.await.ok();
            }
            let stderr = match stderr {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };

            if status.success() {
                info!(engine = %self.label, "Engine finished");
                Ok(EngineExit {
                    status: status.code(),
                    stderr,
                })
            } else {
                warn!(engine = %self.label, code = status.code(), "Engine exited non-zero");
                Err(RmlError::EngineExecution {
                    status: status.code(),
                    stderr,
                })
            }
        })
    }
}

/// Forward every line of `stream` to the log and observer, keeping the last
/// `tail_bytes` of output.
async fn forward_lines(
    stream: impl AsyncRead + Unpin,
    kind: OutputStream,
    label: String,
    observer: Option<mpsc::UnboundedSender<EngineOutput>>,
    tail_bytes: usize,
) -> String {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut tail = String::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(engine = %label, error = %e, "Failed to read engine output");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\n', '\r'])
            .to_string();

        match kind {
            OutputStream::Stdout => info!(engine = %label, "{}", line),
            OutputStream::Stderr => warn!(engine = %label, "{}", line),
        }

        if tail_bytes > 0 {
            tail.push_str(&line);
            tail.push('\n');
            truncate_front(&mut tail, tail_bytes);
        }

        if let Some(tx) = &observer {
            tx.send(EngineOutput { stream: kind, line }).ok();
        }
    }

    tail
}

/// Drop leading bytes so at most `max` remain, on a char boundary.
fn truncate_front(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = s.len() - max;
    while !s.is_char_boundary(cut) {
        cut += 1;
    }
    s.drain(..cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_places_artifact_after_launcher() {
        let runner = ProcessRunner::new(vec!["java".into(), "-jar".into()]);
        let argv = runner.command_line(
            Path::new("/tmp/engine.jar"),
            &["toFile".into(), "-o".into(), "out.nt".into()],
        );
        assert_eq!(argv, vec!["java", "-jar", "/tmp/engine.jar", "toFile", "-o", "out.nt"]);
    }

    #[test]
    fn truncate_front_respects_char_boundaries() {
        let mut s = "ééé".to_string();
        truncate_front(&mut s, 3);
        assert_eq!(s, "é");

        let mut s = "abc".to_string();
        truncate_front(&mut s, 10);
        assert_eq!(s, "abc");
    }

    #[cfg(unix)]
    fn script(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("engine.sh");
        std::fs::write(
            &path,
            "echo \"out $1\"\necho \"err $1\" >&2\nexit $2\n",
        )
        .unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streams_output_to_observer() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = ProcessRunner::new(vec!["sh".into()]).with_observer(tx);

        let exit = runner
            .run(&script(dir.path()), &["a".into(), "0".into()])
            .await
            .unwrap();
        assert_eq!(exit.status, Some(0));
        assert_eq!(exit.stderr, "err a\n");

        drop(runner);
        let mut seen = Vec::new();
        while let Some(out) = rx.recv().await {
            seen.push(out);
        }
        assert!(seen.contains(&EngineOutput {
            stream: OutputStream::Stdout,
            line: "out a".into()
        }));
        assert!(seen.contains(&EngineOutput {
            stream: OutputStream::Stderr,
            line: "err a".into()
        }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(vec!["sh".into()]);

        let err = runner
            .run(&script(dir.path()), &["b".into(), "3".into()])
            .await
            .unwrap_err();
        match err {
            RmlError::EngineExecution { status, stderr } => {
                assert_eq!(status, Some(3));
                assert!(stderr.contains("err b"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let runner = ProcessRunner::new(vec!["rml-runner-no-such-program".into()]);
        let err = runner.run(Path::new("engine.jar"), &[]).await.unwrap_err();
        assert!(matches!(err, RmlError::Io(_)));
    }

    #[test]
    fn empty_launcher_runs_artifact_directly() {
        let runner = ProcessRunner::new(Vec::new());
        let argv = runner.command_line(Path::new("/usr/bin/engine"), &["-m".into(), "m.ttl".into()]);
        assert_eq!(argv, vec!["/usr/bin/engine", "-m", "m.ttl"]);
    }
}
