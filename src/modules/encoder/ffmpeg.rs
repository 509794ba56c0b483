use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use super::error::EncodeError;
use super::events::{EncodeEvent, EventSink, TracingSink};
use super::profile::EncodeProfile;
use super::{EncodeResult, Encoder};

const STDERR_TAIL_LINES: usize = 20;
const STDERR_TAIL_BYTES: usize = 4096;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid duration regex")
});

/// Runs ffmpeg as a child process under a wall-clock timeout.
pub struct FfmpegEncoder {
    program: PathBuf,
    timeout: Duration,
    sink: Arc<dyn EventSink>,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            sink: Arc::new(TracingSink),
        }
    }

    #[cfg(test)]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    async fn fail(&self, output: &Path, err: EncodeError) -> EncodeError {
        discard_output(output).await;
        self.sink.emit(EncodeEvent::Error {
            message: err.to_string(),
        });
        err
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        profile: &EncodeProfile,
    ) -> Result<EncodeResult, EncodeError> {
        let args = profile.build_args(input, output);
        let started = Instant::now();

        let spawned = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                let err = EncodeError::Launch {
                    program: self.program.clone(),
                    source,
                };
                return Err(self.fail(output, err).await);
            }
        };

        self.sink.emit(EncodeEvent::Start {
            command: render_command(&self.program, &args),
        });

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill().await;
            let err = EncodeError::Io(std::io::Error::other("encoder pipes were not captured"));
            return Err(self.fail(output, err).await);
        };

        let mut progress = ProgressTracker::default();
        let mut tail = StderrTail::default();

        let run = timeout(self.timeout, async {
            let mut out_lines = BufReader::new(stdout).split(b'\n');
            let mut err_lines = BufReader::new(stderr).split(b'\n');
            let (mut out_open, mut err_open) = (true, true);

            while out_open || err_open {
                tokio::select! {
                    line = out_lines.next_segment(), if out_open => match line? {
                        Some(raw) => {
                            if let Some(percent) = progress.on_progress_line(&decode_line(&raw)) {
                                self.sink.emit(EncodeEvent::Progress { percent });
                            }
                        }
                        None => out_open = false,
                    },
                    line = err_lines.next_segment(), if err_open => match line? {
                        Some(raw) => {
                            let line = decode_line(&raw);
                            if let Some(percent) = progress.on_log_line(&line) {
                                self.sink.emit(EncodeEvent::Progress { percent });
                            }
                            tail.push(line);
                        }
                        None => err_open = false,
                    },
                }
            }

            Ok::<_, std::io::Error>(child.wait().await?)
        })
        .await;

        let status = match run {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(self.fail(output, EncodeError::Io(e)).await);
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out encoder");
                }
                let err = EncodeError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                };
                return Err(self.fail(output, err).await);
            }
        };

        if !status.success() {
            let err = EncodeError::Failed {
                exit_code: status.code(),
                stderr_tail: tail.render(),
            };
            return Err(self.fail(output, err).await);
        }

        let output_bytes = match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => {
                let err = EncodeError::MissingOutput(output.to_path_buf());
                return Err(self.fail(output, err).await);
            }
        };

        self.sink.emit(EncodeEvent::End);

        Ok(EncodeResult {
            output_path: output.to_path_buf(),
            output_bytes,
            elapsed: started.elapsed(),
        })
    }
}

async fn discard_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %output.display(), error = %e, "Failed to remove partial output"),
    }
}

fn render_command(program: &Path, args: &[OsString]) -> String {
    let mut command = program.to_string_lossy().into_owned();
    for arg in args {
        command.push(' ');
        command.push_str(&arg.to_string_lossy());
    }
    command
}

/// ffmpeg echoes container metadata verbatim, so lines need not be UTF-8.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Turns ffmpeg's `-progress` output into whole-percent steps.
///
/// stdout and stderr are read concurrently, so a position may arrive before
/// the source duration. The latest position is kept and reported as soon as
/// the duration is known.
#[derive(Debug, Default)]
struct ProgressTracker {
    duration_us: Option<u64>,
    position_us: Option<u64>,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    fn on_log_line(&mut self, line: &str) -> Option<u8> {
        if self.duration_us.is_some() {
            return None;
        }
        self.duration_us = parse_duration_us(line);
        self.report()
    }

    /// Returns a percent only when it moved past the last reported one.
    fn on_progress_line(&mut self, line: &str) -> Option<u8> {
        if line.trim() == "progress=end" {
            return self.advance(100);
        }
        self.position_us = Some(parse_out_time_us(line)?);
        self.report()
    }

    fn report(&mut self) -> Option<u8> {
        let position = self.position_us?;
        let duration = self.duration_us.filter(|d| *d > 0)?;
        self.advance((position.saturating_mul(100) / duration).min(100) as u8)
    }

    fn advance(&mut self, percent: u8) -> Option<u8> {
        if self.last_percent.is_some_and(|last| percent <= last) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(percent)
    }
}

fn parse_duration_us(line: &str) -> Option<u64> {
    let caps = DURATION_RE.captures(line)?;
    let hours: u64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    let whole = (hours * 3600 + minutes * 60) * 1_000_000;
    Some(whole + (seconds * 1_000_000.0).round() as u64)
}

/// `out_time_ms` is reported in microseconds, same as `out_time_us`.
fn parse_out_time_us(line: &str) -> Option<u64> {
    let line = line.trim();
    let value = line
        .strip_prefix("out_time_us=")
        .or_else(|| line.strip_prefix("out_time_ms="))?;
    value.parse().ok()
}

#[derive(Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
}

impl StderrTail {
    fn push(&mut self, line: String) {
        if self.lines.len() == STDERR_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn render(&self) -> String {
        let joined = self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n");
        if joined.len() <= STDERR_TAIL_BYTES {
            return joined;
        }
        let mut start = joined.len() - STDERR_TAIL_BYTES;
        while !joined.is_char_boundary(start) {
            start += 1;
        }
        joined[start..].to_string()
    }
}
