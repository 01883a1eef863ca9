//! FFmpeg-based engine implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::EngineConfig;
use super::error::EngineError;
use super::traits::Engine;
use super::types::{ConvertRequest, EngineProgress};

/// Number of trailing non-progress stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg-based engine.
///
/// The working area is `config.work_dir`. Each conversion stages its input
/// under a generated name there, lets ffmpeg stream-copy it into the target
/// container next to it, reads the result back and removes both files.
pub struct FfmpegEngine {
    config: EngineConfig,
    init: OnceCell<Result<(), String>>,
}

impl FfmpegEngine {
    /// Creates a new FFmpeg engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            init: OnceCell::new(),
        }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn initialize(&self) -> Result<(), String> {
        Self::check_binary(&self.config.ffmpeg_path).await?;
        Self::check_binary(&self.config.ffprobe_path).await?;

        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(|e| {
                format!(
                    "Failed to create working area {}: {}",
                    self.config.work_dir.display(),
                    e
                )
            })
    }

    async fn check_binary(path: &Path) -> Result<(), String> {
        let status = Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(format!(
                "{} -version exited with code {:?}",
                path.display(),
                status.code()
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(format!("Binary not found at path: {}", path.display()))
            }
            Err(e) => Err(format!("Failed to run {}: {}", path.display(), e)),
        }
    }

    /// Builds ffmpeg arguments for a stream-copy conversion.
    fn build_args(&self, input_path: &Path, output_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            // Repackage streams, never re-encode
            "-c".to_string(),
            "copy".to_string(),
            "-loglevel".to_string(),
            self.config.log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ];

        args.extend(self.config.extra_args.iter().cloned());
        args.push(output_path.to_string_lossy().to_string());

        args
    }

    /// Probes the staged input for its duration in seconds.
    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        let output = Command::new(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            debug!(path = %path.display(), "ffprobe could not read input, progress unavailable");
            return None;
        }

        Self::parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }

    /// Extracts `format.duration` from ffprobe JSON output.
    fn parse_probe_duration(output: &str) -> Option<f64> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output).ok()?;
        probe
            .format
            .duration?
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    async fn run_staged(
        &self,
        staged: &StagedFiles,
        input_bytes: Vec<u8>,
        progress_tx: mpsc::Sender<EngineProgress>,
    ) -> Result<Vec<u8>, EngineError> {
        tokio::fs::write(&staged.input, &input_bytes)
            .await
            .map_err(|e| EngineError::staging(format!("Failed to stage input: {}", e)))?;
        drop(input_bytes);

        let duration_secs = self.probe_duration(&staged.input).await;
        let args = self.build_args(&staged.input, &staged.output);

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::conversion_failed(format!("Failed to spawn ffmpeg: {}", e), None))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::conversion_failed("ffmpeg stderr was not captured", None))?;
        let mut lines = BufReader::new(stderr).lines();

        let mut tracker = ProgressTracker::new(duration_secs);
        let mut stderr_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read ffmpeg output");
                    break;
                }
            };

            match tracker.observe(&line) {
                LineKind::Progress(ratio) => {
                    // Non-blocking send
                    let _ = progress_tx.try_send(EngineProgress::new(ratio));
                }
                LineKind::ProgressField => {}
                LineKind::Message => push_tail(&mut stderr_tail, line),
            }
        }

        let status = child.wait().await.map_err(|e| {
            EngineError::conversion_failed(format!("Failed to wait for ffmpeg: {}", e), None)
        })?;

        if !status.success() {
            let stderr = if stderr_tail.is_empty() {
                None
            } else {
                Some(Vec::from(stderr_tail).join("\n"))
            };
            return Err(EngineError::conversion_failed(
                format!("ffmpeg exited with code {:?}", status.code()),
                stderr,
            ));
        }

        tokio::fs::read(&staged.output)
            .await
            .map_err(|e| EngineError::staging(format!("Failed to read output: {}", e)))
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn ensure_ready(&self) -> Result<(), EngineError> {
        let outcome = self
            .init
            .get_or_init(|| async {
                let result = self.initialize().await;
                match &result {
                    Ok(()) => info!(
                        ffmpeg = %self.config.ffmpeg_path.display(),
                        work_dir = %self.config.work_dir.display(),
                        "FFmpeg engine ready"
                    ),
                    Err(reason) => error!("FFmpeg engine initialization failed: {}", reason),
                }
                result
            })
            .await;

        outcome
            .clone()
            .map_err(|reason| EngineError::init_failed(reason))
    }

    async fn convert(
        &self,
        request: ConvertRequest,
        progress_tx: mpsc::Sender<EngineProgress>,
    ) -> Result<Vec<u8>, EngineError> {
        match self.init.get() {
            Some(Ok(())) => {}
            Some(Err(reason)) => return Err(EngineError::init_failed(reason.clone())),
            None => return Err(EngineError::NotReady),
        }

        let staged = StagedFiles::new(&self.config.work_dir, &request);
        debug!(
            input = %request.input_name,
            output = %request.output_name,
            staged_input = %staged.input.display(),
            "Staging conversion"
        );

        let result = self
            .run_staged(&staged, request.input_bytes, progress_tx)
            .await;
        staged.cleanup().await;

        result
    }
}

/// Classification of one line of ffmpeg stderr.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LineKind {
    /// A `-progress` line that moved the completion ratio.
    Progress(f64),
    /// Any other `key=value` line of the `-progress` block.
    ProgressField,
    /// A log message.
    Message,
}

/// Turns `-progress` output into completion ratios.
struct ProgressTracker {
    duration_secs: Option<f64>,
    time_regex: Option<Regex>,
    field_regex: Option<Regex>,
}

impl ProgressTracker {
    fn new(duration_secs: Option<f64>) -> Self {
        Self {
            duration_secs,
            // out_time_ms is in microseconds as well, despite its name
            time_regex: Regex::new(r"^out_time_(?:us|ms)=(\d+)$").ok(),
            field_regex: Regex::new(r"^[a-z0-9_]+=\S*$").ok(),
        }
    }

    fn observe(&mut self, line: &str) -> LineKind {
        let line = line.trim();

        if line == "progress=end" {
            return LineKind::Progress(1.0);
        }

        if let Some(ref re) = self.time_regex {
            if let Some(caps) = re.captures(line) {
                let micros = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
                return match (micros, self.duration_secs) {
                    (Some(us), Some(duration)) => LineKind::Progress(us / 1_000_000.0 / duration),
                    _ => LineKind::ProgressField,
                };
            }
        }

        match self.field_regex {
            Some(ref re) if re.is_match(line) => LineKind::ProgressField,
            _ => LineKind::Message,
        }
    }
}

/// Input and output paths of one conversion inside the working area.
///
/// Removed explicitly after the conversion settles; dropping the value
/// without cleanup (the conversion future was cancelled) removes them
/// synchronously.
struct StagedFiles {
    input: PathBuf,
    output: PathBuf,
    cleaned: bool,
}

impl StagedFiles {
    fn new(work_dir: &Path, request: &ConvertRequest) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self {
            input: work_dir.join(format!(
                "{}-input{}",
                token,
                extension_suffix(&request.input_name)
            )),
            output: work_dir.join(format!(
                "{}-output{}",
                token,
                extension_suffix(&request.output_name)
            )),
            cleaned: false,
        }
    }

    async fn cleanup(mut self) {
        for path in [&self.input, &self.output] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged file"),
            }
        }
        self.cleaned = true;
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        if !self.cleaned {
            let _ = std::fs::remove_file(&self.input);
            let _ = std::fs::remove_file(&self.output);
        }
    }
}

/// Keeps the last `STDERR_TAIL_LINES` lines.
fn push_tail(tail: &mut VecDeque<String>, line: String) {
    if tail.len() == STDERR_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

/// `.ext` of a caller supplied file name, lowercased, or an empty string
/// when the name has no plain alphanumeric extension.
fn extension_suffix(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}
