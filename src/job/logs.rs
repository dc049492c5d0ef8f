// src/job/logs.rs

//! Following a unit's journal as a stream of log lines.
//!
//! Each [`JobLogStream`] owns one follower subprocess (`journalctl -u <unit>
//! -f -o json` by default). A background Tokio task reads its stdout line by
//! line, decodes the `MESSAGE` field of each JSON record and pushes the result
//! into a bounded channel; the consumer pulls from the other end.
//!
//! The follower task is the only place that releases the subprocess. Whatever
//! ends the stream (the consumer closing or dropping it, a malformed record, a
//! read error, the follower exiting) falls through to a single
//! [`release`] call before the task returns.

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::task::{Context, Poll};

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

use crate::errors::{Result, UnitJobError};

/// Default channel capacity between the follower task and the consumer.
pub const DEFAULT_LOG_BUFFER: usize = 64;

/// One decoded journal message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine(String);

impl LogLine {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for LogLine {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// How to invoke the log follower for a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCommand {
    program: PathBuf,
    extra_args: Vec<String>,
    buffer: usize,
}

impl Default for LogCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from("journalctl"),
            extra_args: Vec::new(),
            buffer: DEFAULT_LOG_BUFFER,
        }
    }
}

impl LogCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Arguments appended after the follow/format flags.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Channel capacity; values below 1 are raised to 1.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    pub fn buffer(&self) -> usize {
        self.buffer
    }

    /// Arguments passed to the follower for `unit`.
    pub fn args_for(&self, unit: &str) -> Vec<String> {
        let mut args = vec![
            "-u".to_string(),
            unit.to_string(),
            "-f".to_string(),
            "-o".to_string(),
            "json".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn command_for(&self, unit: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(unit))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Live, pull-based sequence of a unit's log lines.
///
/// Not restartable. Dropping the stream stops the follower in the
/// background; [`JobLogStream::close`] stops it and waits until the
/// subprocess has been reaped.
pub struct JobLogStream {
    unit: String,
    rx: mpsc::Receiver<Result<LogLine>>,
    follower: Option<JoinHandle<()>>,
}

impl JobLogStream {
    /// Spawn a follower for `unit`. Must be called inside a Tokio runtime.
    pub(crate) fn spawn(command: &LogCommand, unit: &str) -> Self {
        let (tx, rx) = mpsc::channel(command.buffer());
        let cmd = command.command_for(unit);
        let follower = tokio::spawn(follow(unit.to_string(), cmd, tx));

        Self {
            unit: unit.to_string(),
            rx,
            follower: Some(follower),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Wait for the next line.
    ///
    /// `None` means the follower exited cleanly. An `Err` is always the last
    /// item.
    pub async fn next_line(&mut self) -> Option<Result<LogLine>> {
        self.rx.recv().await
    }

    /// Stop following and wait for the subprocess to be released.
    pub async fn close(mut self) {
        self.rx.close();
        if let Some(follower) = self.follower.take() {
            if let Err(e) = follower.await {
                warn!(unit = %self.unit, error = %e, "log follower task failed");
            }
        }
    }
}

impl Stream for JobLogStream {
    type Item = Result<LogLine>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl fmt::Debug for JobLogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobLogStream")
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

/// Why the read loop stopped.
enum FollowEnd {
    /// Follower closed its stdout.
    Exhausted,
    /// The consumer went away.
    Cancelled,
    Failed(UnitJobError),
}

async fn follow(unit: String, mut cmd: Command, tx: mpsc::Sender<Result<LogLine>>) {
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let _ = tx
                .send(Err(UnitJobError::log_stream(
                    &unit,
                    format!("failed to spawn log follower: {e}"),
                )))
                .await;
            return;
        }
    };

    info!(unit = %unit, pid = ?child.id(), "log follower started");

    drain_stderr(&unit, child.stderr.take());

    let end = match child.stdout.take() {
        Some(stdout) => pump(&unit, stdout, &tx).await,
        None => FollowEnd::Failed(UnitJobError::log_stream(
            &unit,
            "log follower has no stdout pipe",
        )),
    };

    let status = release(&unit, &mut child, &end, &tx).await;

    let terminal = match end {
        FollowEnd::Cancelled => None,
        FollowEnd::Failed(err) => Some(err),
        FollowEnd::Exhausted => match status {
            Some(status) if !status.success() => Some(UnitJobError::log_stream(
                &unit,
                format!("log follower exited with {status}"),
            )),
            _ => None,
        },
    };

    if let Some(err) = terminal {
        warn!(unit = %unit, error = %err, "log stream terminated with error");
        let _ = tx.send(Err(err)).await;
    }

    debug!(unit = %unit, "log follower task finished");
}

async fn pump(unit: &str, stdout: ChildStdout, tx: &mpsc::Sender<Result<LogLine>>) -> FollowEnd {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let next = tokio::select! {
            _ = tx.closed() => return FollowEnd::Cancelled,
            next = lines.next_line() => next,
        };

        match next {
            Ok(Some(raw)) => match decode_record(unit, &raw) {
                Ok(line) => {
                    if tx.send(Ok(line)).await.is_err() {
                        return FollowEnd::Cancelled;
                    }
                }
                Err(err) => return FollowEnd::Failed(err),
            },
            Ok(None) => return FollowEnd::Exhausted,
            Err(e) => {
                return FollowEnd::Failed(UnitJobError::log_stream(
                    unit,
                    format!("reading log follower output: {e}"),
                ));
            }
        }
    }
}

/// Release the follower subprocess. Called exactly once per stream.
///
/// After EOF the follower is normally exiting on its own and is only reaped,
/// unless the consumer goes away first. In every other case it is killed
/// (unless it already exited) and reaped.
async fn release(
    unit: &str,
    child: &mut Child,
    end: &FollowEnd,
    tx: &mpsc::Sender<Result<LogLine>>,
) -> Option<ExitStatus> {
    if matches!(end, FollowEnd::Exhausted) {
        let waited = tokio::select! {
            waited = child.wait() => Some(waited),
            _ = tx.closed() => None,
        };

        match waited {
            Some(Ok(status)) => {
                debug!(unit, %status, "log follower exited");
                return Some(status);
            }
            Some(Err(e)) => warn!(unit, error = %e, "failed to wait for log follower"),
            None => debug!(unit, "consumer left while log follower was still running"),
        }
    }

    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(unit, %status, "log follower already exited");
            Some(status)
        }
        _ => {
            match child.kill().await {
                Ok(()) => debug!(unit, "log follower killed"),
                Err(e) => warn!(unit, error = %e, "failed to kill log follower"),
            }
            None
        }
    }
}

/// Consume stderr so the pipe never fills; log at debug.
fn drain_stderr(unit: &str, stderr: Option<ChildStderr>) {
    let Some(stderr) = stderr else {
        return;
    };

    let unit = unit.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(unit = %unit, "log follower stderr: {}", line);
        }
    });
}

/// The journal emits non-UTF-8 messages as byte arrays.
#[derive(Deserialize)]
#[serde(untagged)]
enum JournalMessage {
    Text(String),
    Bytes(Vec<u8>),
}

/// Decode one `journalctl -o json` line into its message.
///
/// A record must be a JSON object with a string or byte-array `MESSAGE`.
pub fn decode_record(unit: &str, raw: &str) -> Result<LogLine> {
    let record: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| UnitJobError::log_stream(unit, format!("malformed journal record: {e}")))?;

    let Some(fields) = record.as_object() else {
        return Err(UnitJobError::log_stream(
            unit,
            "malformed journal record: not a JSON object",
        ));
    };

    let message = match fields.get("MESSAGE") {
        None | Some(serde_json::Value::Null) => {
            return Err(UnitJobError::log_stream(
                unit,
                "journal record has no MESSAGE field",
            ));
        }
        Some(value) => JournalMessage::deserialize(value).map_err(|e| {
            UnitJobError::log_stream(unit, format!("unreadable MESSAGE field: {e}"))
        })?,
    };

    Ok(match message {
        JournalMessage::Text(text) => LogLine::new(text),
        JournalMessage::Bytes(bytes) => LogLine::new(String::from_utf8_lossy(&bytes).into_owned()),
    })
}
