//! Training engine that runs each trial as a child process.
//!
//! The child receives the resolved run configuration as JSON on stdin and
//! reports progress as JSON lines on stdout:
//!
//! ```text
//! {"event": "train_iter", "iter": 12, "epoch": 0, "logs": {"loss": 0.41}}
//! {"event": "train_epoch", "epoch": 0}
//! {"event": "val_epoch", "epoch": 0, "metrics": {"accuracy": 0.87}}
//! ```
//!
//! Lines that do not start with `{` are treated as plain output and logged.
//! The bare `NaN`, `Infinity` and `-Infinity` tokens Python's `json` module
//! emits are accepted as metric values, and a `null` metric counts as not
//! reported. Once the observer requests a stop the child is killed.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};

use ht_types::score::serde_metric_map;
use ht_types::{TrainError, TrainResult};

use crate::engine::{TrainingEngine, TrainingRun};
use crate::observer::{LoopContext, MetricMap, TrainingObserver};

/// How to launch the training program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CommandEngine {
    spec: CommandSpec,
}

impl CommandEngine {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }
}

impl TrainingEngine for CommandEngine {
    fn build(&self, config: &serde_json::Value) -> TrainResult<Box<dyn TrainingRun>> {
        let payload = serde_json::to_vec(config)
            .map_err(|e| TrainError::build(format!("config is not serialisable: {e}")))?;
        Ok(Box::new(CommandRun {
            spec: self.spec.clone(),
            payload,
        }))
    }

    fn name(&self) -> &str {
        &self.spec.program
    }
}

#[derive(Debug, Default, Deserialize)]
struct Metrics(#[serde(with = "serde_metric_map")] MetricMap);

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum TrainEvent {
    TrainIter {
        iter: u64,
        #[serde(default)]
        epoch: u64,
        #[serde(default)]
        logs: Metrics,
    },
    TrainEpoch {
        epoch: u64,
    },
    ValEpoch {
        #[serde(default)]
        epoch: u64,
        #[serde(default)]
        metrics: Option<Metrics>,
    },
}

/// One spawned trial.
struct CommandRun {
    spec: CommandSpec,
    payload: Vec<u8>,
}

impl CommandRun {
    fn spawn(&self) -> TrainResult<Child> {
        let mut command = Command::new(&self.spec.program);
        command
            .args(&self.spec.args)
            .envs(&self.spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.spec.working_dir {
            command.current_dir(dir);
        }
        command.spawn().map_err(|e| {
            TrainError::execution(format!("failed to spawn `{}`: {e}", self.spec.program))
        })
    }
}

impl TrainingRun for CommandRun {
    fn train(&mut self, observer: &mut dyn TrainingObserver) -> TrainResult<()> {
        let mut child = self.spawn()?;
        info!(program = %self.spec.program, pid = child.id(), "training process started");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TrainError::execution("child stdin was not captured"))?;
        let payload = std::mem::take(&mut self.payload);
        // The child may exit without reading its config; a broken pipe is not a failure.
        let writer = thread::spawn(move || match stdin.write_all(&payload) {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            other => other,
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TrainError::execution("child stdout was not captured"))?;

        let outcome = forward_events(BufReader::new(stdout), observer);
        let stopped = match outcome {
            Ok(stopped) => stopped,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        if stopped {
            debug!(pid = child.id(), "stop requested, killing training process");
            // The child may already have exited on its own.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(());
        }

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to send config to training process"),
            Err(_) => warn!("config writer thread panicked"),
        }

        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(TrainError::Exit {
                code: status.code(),
            })
        }
    }
}

/// Feed every event line to the observer. Returns `true` when the observer
/// asked to stop before the stream ended.
fn forward_events<R: BufRead>(reader: R, observer: &mut dyn TrainingObserver) -> TrainResult<bool> {
    let mut ctx = LoopContext::new();
    // An epoch-end stop still lets the validation pass of that epoch through.
    let mut closing_epoch: Option<u64> = None;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !trimmed.starts_with('{') {
            debug!(output = trimmed, "training process output");
            continue;
        }

        let event: TrainEvent =
            serde_json::from_str(&quote_non_finite(trimmed)).map_err(|e| TrainError::Protocol {
                line: trimmed.to_string(),
                message: e.to_string(),
            })?;

        if let Some(closing) = closing_epoch {
            if let TrainEvent::ValEpoch { epoch, metrics } = event {
                if epoch == closing {
                    ctx.epoch = epoch;
                    observer.after_val_epoch(&mut ctx, metrics.as_ref().map(|m| &m.0));
                }
            }
            return Ok(true);
        }

        match event {
            TrainEvent::TrainIter { iter, epoch, logs } => {
                ctx.iter = iter;
                ctx.epoch = epoch;
                observer.after_train_iter(&mut ctx, &logs.0);
                if ctx.stop_requested() {
                    return Ok(true);
                }
            }
            TrainEvent::TrainEpoch { epoch } => {
                ctx.epoch = epoch;
                observer.after_train_epoch(&mut ctx);
                if ctx.stop_requested() {
                    closing_epoch = Some(epoch);
                }
            }
            TrainEvent::ValEpoch { epoch, metrics } => {
                ctx.epoch = epoch;
                observer.after_val_epoch(&mut ctx, metrics.as_ref().map(|m| &m.0));
                if ctx.stop_requested() {
                    return Ok(true);
                }
            }
        }
    }

    Ok(closing_epoch.is_some())
}

const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Quote the non-standard `NaN`/`Infinity`/`-Infinity` literals that appear
/// outside JSON strings, so the score codec can read them.
fn quote_non_finite(line: &str) -> Cow<'_, str> {
    if !line.contains("NaN") && !line.contains("Infinity") {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len() + 8);
    let mut rest = line;
    let mut in_string = false;
    let mut escaped = false;
    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if let Some(token) = NON_FINITE_TOKENS.iter().find(|t| rest.starts_with(*t)) {
            out.push('"');
            out.push_str(token);
            out.push('"');
            rest = &rest[token.len()..];
            continue;
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Cow::Owned(out)
}
