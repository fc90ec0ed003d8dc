//! Agent CLI runtime
//!
//! Drives the agent CLI in print mode with JSON streaming output: one
//! subprocess per turn, one JSON event per stdout line. The child is killed
//! once the turn reaches a terminal event or the consumer stops listening.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::event::AgentEvent;
use crate::normalize::normalize;
use crate::AgentRuntime;

/// Configuration for the CLI runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Agent binary to invoke
    pub command: String,
    /// Model identifier passed through to the runtime
    pub model: Option<String>,
    /// Tool allow-list for the turn
    pub allowed_tools: Vec<String>,
    /// System prompt override
    pub system_prompt: Option<String>,
    /// Working directory for the agent process
    pub cwd: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            model: None,
            allowed_tools: Vec::new(),
            system_prompt: None,
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Agent runtime backed by a CLI subprocess
pub struct CliAgentRuntime {
    config: RuntimeConfig,
}

impl CliAgentRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Argument list for one turn
    fn build_args(config: &RuntimeConfig, prompt: &str, resume: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];
        if let Some(model) = &config.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if !config.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(config.allowed_tools.join(","));
        }
        if let Some(system_prompt) = &config.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(system_prompt.clone());
        }
        if let Some(token) = resume {
            args.push("--resume".to_string());
            args.push(token.to_string());
        }
        args.push(prompt.to_string());
        args
    }
}

#[async_trait]
impl AgentRuntime for CliAgentRuntime {
    async fn stream_query(
        &self,
        prompt: &str,
        resume: Option<&str>,
    ) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(64);

        let command = self.config.command.clone();
        let args = Self::build_args(&self.config, prompt, resume);
        let cwd = self.config.cwd.clone();

        debug!("Starting agent turn: {} (resume: {:?})", command, resume);
        tokio::spawn(async move {
            run_turn(command, args, cwd, tx).await;
        });

        rx
    }
}

/// Spawn the agent process and pump normalized events into `tx`
async fn run_turn(command: String, args: Vec<String>, cwd: PathBuf, tx: mpsc::Sender<AgentEvent>) {
    let mut cmd = Command::new(&command);
    cmd.args(&args)
        .current_dir(&cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            warn!("Failed to spawn agent `{}`: {}", command, source);
            let err = AgentError::SpawnFailed { command, source };
            let _ = tx.send(err.into_event()).await;
            return;
        }
    };

    // Drain stderr so the child never blocks on a full pipe.
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("agent stderr: {}", line);
            }
        });
    }

    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => {
            let _ = tx.send(AgentError::NoStdout.into_event()).await;
            return;
        }
    };

    let mut lines = BufReader::new(stdout).lines();
    let mut terminated = false;

    'stream: loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let raw: serde_json::Value = match serde_json::from_str(line) {
                    Ok(raw) => raw,
                    Err(e) => {
                        debug!("Skipping unparseable agent output line: {}", e);
                        continue;
                    }
                };
                for event in normalize(&raw) {
                    let terminal = event.is_terminal();
                    if tx.send(event).await.is_err() {
                        // Consumer went away; stop driving the turn.
                        terminated = true;
                        break 'stream;
                    }
                    if terminal {
                        terminated = true;
                        break 'stream;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(AgentError::Io(e).into_event()).await;
                terminated = true;
                break;
            }
        }
    }

    if !terminated {
        // The process ended without a result event; surface that in-band.
        let _ = tx
            .send(AgentEvent::Error {
                error: "Agent stream ended without a result".to_string(),
                details: String::new(),
            })
            .await;
    }

    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_without_resume_starts_fresh() {
        let config = RuntimeConfig {
            model: Some("opus".to_string()),
            allowed_tools: vec!["search_inbox".to_string(), "read_emails".to_string()],
            ..RuntimeConfig::default()
        };
        let args = CliAgentRuntime::build_args(&config, "hi", None);

        assert!(!args.contains(&"--resume".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("hi"));
        let model_at = args.iter().position(|a| a == "--model").unwrap();
        assert_eq!(args[model_at + 1], "opus");
        let tools_at = args.iter().position(|a| a == "--allowedTools").unwrap();
        assert_eq!(args[tools_at + 1], "search_inbox,read_emails");
    }

    #[test]
    fn build_args_with_resume_passes_token() {
        let config = RuntimeConfig::default();
        let args = CliAgentRuntime::build_args(&config, "hi", Some("tok-9"));
        let resume_at = args.iter().position(|a| a == "--resume").unwrap();
        assert_eq!(args[resume_at + 1], "tok-9");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::AgentRuntime;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        fn fake_agent(dir: &tempfile::TempDir, body: &str) -> String {
            let path = dir.path().join("fake-agent");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "#!/bin/sh").unwrap();
            file.write_all(body.as_bytes()).unwrap();
            drop(file);
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().to_string()
        }

        #[tokio::test]
        async fn streams_normalized_events_until_result() {
            let dir = tempfile::tempdir().unwrap();
            let command = fake_agent(
                &dir,
                concat!(
                    "echo '{\"type\":\"system\",\"subtype\":\"init\",\"session_id\":\"tok-1\"}'\n",
                    "echo '{\"type\":\"assistant\",\"message\":{\"content\":\"hi there\"}}'\n",
                    "echo 'not json at all'\n",
                    "echo '{\"type\":\"result\",\"subtype\":\"success\",\"result\":\"done\"}'\n",
                ),
            );

            let runtime = CliAgentRuntime::new(RuntimeConfig {
                command,
                cwd: dir.path().to_path_buf(),
                ..RuntimeConfig::default()
            });

            let mut rx = runtime.stream_query("hello", None).await;
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }

            assert_eq!(events.len(), 3);
            assert!(matches!(&events[0], AgentEvent::SystemInit { session_id }
                if session_id == "tok-1"));
            assert!(matches!(&events[1], AgentEvent::AssistantText { text }
                if text == "hi there"));
            assert!(matches!(&events[2], AgentEvent::ResultSuccess { result: Some(r), .. }
                if r == "done"));
        }

        #[tokio::test]
        async fn missing_binary_yields_single_error_event() {
            let runtime = CliAgentRuntime::new(RuntimeConfig {
                command: "/nonexistent/agent-binary".to_string(),
                ..RuntimeConfig::default()
            });

            let mut rx = runtime.stream_query("hello", None).await;
            let first = rx.recv().await;
            assert!(matches!(first, Some(AgentEvent::Error { .. })));
            assert!(rx.recv().await.is_none(), "stream must end after the error");
        }

        #[tokio::test]
        async fn stream_ending_without_result_reports_error() {
            let dir = tempfile::tempdir().unwrap();
            let command = fake_agent(
                &dir,
                "echo '{\"type\":\"assistant\",\"message\":{\"content\":\"partial\"}}'\n",
            );

            let runtime = CliAgentRuntime::new(RuntimeConfig {
                command,
                cwd: dir.path().to_path_buf(),
                ..RuntimeConfig::default()
            });

            let mut rx = runtime.stream_query("hello", None).await;
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }

            assert_eq!(events.len(), 2);
            assert!(matches!(&events[0], AgentEvent::AssistantText { .. }));
            assert!(matches!(&events[1], AgentEvent::Error { .. }));
        }
    }
}
