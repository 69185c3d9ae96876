//! Invocation of the external transcode engine.
//!
//! The engine is ffmpeg run as an isolated subprocess with a fixed argument
//! vector; nothing user-controlled is ever interpolated into a shell
//! string. The adapter reports a structured outcome plus bounded
//! diagnostics and leaves all policy (state transitions, retries) to the
//! caller.

use crate::store::MANIFEST_FILE;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command as TokioCommand};

/// Cap on captured engine diagnostics. The stream keeps being drained past
/// this point so a chatty subprocess never blocks on a full pipe.
pub const MAX_DIAGNOSTIC_BYTES: u64 = 64 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// Zero exit status and a non-empty manifest on disk.
    Succeeded,
    Failed { exit_code: Option<i32> },
    /// The wall-clock limit elapsed; the subprocess was killed.
    TimedOut,
}

impl TranscodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranscodeOutcome::Succeeded)
    }
}

/// Result of one engine run: the outcome plus captured diagnostics, which
/// are for server-side logging only and never reach a client.
#[derive(Debug)]
pub struct TranscodeReport {
    pub outcome: TranscodeOutcome,
    pub diagnostics: String,
}

/// Seam between the orchestrator and the external engine. `Err` means the
/// subprocess could not be launched at all; every completed run, however
/// it went, comes back as a report.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    async fn transcode(&self, input: &Path, output_dir: &Path) -> io::Result<TranscodeReport>;
}

/// The real engine: single-rendition H.264/AAC HLS via ffmpeg.
#[derive(Clone, Debug)]
pub struct FfmpegEngine {
    ffmpeg_path: String,
    segment_seconds: u32,
    timeout: Duration,
}

impl FfmpegEngine {
    pub fn new(ffmpeg_path: String, segment_seconds: u32, timeout: Duration) -> Self {
        Self {
            ffmpeg_path,
            segment_seconds,
            timeout,
        }
    }

    /// The fixed argument vector. Input and output paths are discrete
    /// arguments, so a crafted filename can never become an option or a
    /// shell fragment.
    fn args(&self, input: &Path, output_dir: &Path) -> Vec<OsString> {
        vec![
            OsString::from("-y"),
            OsString::from("-i"),
            input.into(),
            OsString::from("-codec:v"),
            OsString::from("libx264"),
            OsString::from("-codec:a"),
            OsString::from("aac"),
            OsString::from("-hls_time"),
            self.segment_seconds.to_string().into(),
            OsString::from("-hls_playlist_type"),
            OsString::from("vod"),
            OsString::from("-hls_list_size"),
            OsString::from("0"),
            OsString::from("-hls_segment_filename"),
            output_dir.join("segment_%03d.ts").into(),
            OsString::from("-f"),
            OsString::from("hls"),
            output_dir.join(MANIFEST_FILE).into(),
        ]
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn transcode(&self, input: &Path, output_dir: &Path) -> io::Result<TranscodeReport> {
        let mut command = TokioCommand::new(&self.ffmpeg_path);
        command
            .args(self.args(input, output_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;

        let capture = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(capture_bounded(stderr)));

        let outcome = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                let manifest_ok = tokio::fs::metadata(output_dir.join(MANIFEST_FILE))
                    .await
                    .map(|m| m.len() > 0)
                    .unwrap_or(false);
                if status.success() && manifest_ok {
                    TranscodeOutcome::Succeeded
                } else {
                    TranscodeOutcome::Failed {
                        exit_code: status.code(),
                    }
                }
            }
            Err(_) => {
                // Kill and reap; an orphaned encoder would keep burning CPU.
                let _ = child.kill().await;
                TranscodeOutcome::TimedOut
            }
        };

        let diagnostics = match capture {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        Ok(TranscodeReport {
            outcome,
            diagnostics,
        })
    }
}

async fn capture_bounded(mut stderr: ChildStderr) -> String {
    let mut buf = Vec::with_capacity(8 * 1024);
    let mut limited = (&mut stderr).take(MAX_DIAGNOSTIC_BYTES);
    let _ = limited.read_to_end(&mut buf).await;
    let _ = tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await;
    String::from_utf8_lossy(&buf).into_owned()
}
