//! Firmware and filesystem flashing.
//!
//! The harness does not flash anything itself; it drives an external
//! toolchain (PlatformIO by default) once per configured step and streams the
//! tool's output as progress lines.

use crate::config::{UploadConfig, UploadStep};
use crate::progress::ProgressSink;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Errors that can occur while uploading.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The project directory does not exist.
    #[error("Project directory not found: {}", .0.display())]
    MissingProjectDir(PathBuf),

    /// The upload program could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A step exited unsuccessfully.
    #[error("Uploading {step} failed ({})", describe_exit(.status))]
    StepFailed { step: String, status: Option<i32> },

    /// Reading the program's output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// `None` means the tool was killed by a signal.
fn describe_exit(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Puts firmware on the device under test.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        project_dir: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), UploadError>;
}

/// Runs an external program once per step, inside the project directory.
#[derive(Debug, Clone)]
pub struct CommandUploader {
    program: String,
    steps: Vec<UploadStep>,
}

impl CommandUploader {
    pub fn new(program: impl Into<String>, steps: Vec<UploadStep>) -> Self {
        Self {
            program: program.into(),
            steps,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.program.clone(), config.steps.clone())
    }

    async fn run_step(
        &self,
        project_dir: &Path,
        step: &UploadStep,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), UploadError> {
        debug!(program = %self.program, args = ?step.args, "Starting upload step");

        let mut child = Command::new(&self.program)
            .args(&step.args)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| UploadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr not captured"))?;

        // Drain both pipes together so a chatty stderr cannot stall the tool.
        let stream_stdout = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                progress.emit(line);
            }
            Ok::<_, std::io::Error>(())
        };
        let collect_stderr = async {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Some(line) = lines.next_line().await? {
                collected.push(line);
            }
            Ok::<_, std::io::Error>(collected)
        };
        let (streamed, collected) = tokio::join!(stream_stdout, collect_stderr);
        streamed?;
        let stderr_lines = collected?;

        let status = child.wait().await?;
        if !status.success() {
            warn!(step = %step.name, ?status, "Upload step failed");
            progress.emit(format!("Error during upload of {}:", step.name));
            for line in stderr_lines {
                progress.emit(line);
            }
            return Err(UploadError::StepFailed {
                step: step.name.clone(),
                status: status.code(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Uploader for CommandUploader {
    async fn upload(
        &self,
        project_dir: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), UploadError> {
        if !project_dir.is_dir() {
            return Err(UploadError::MissingProjectDir(project_dir.to_path_buf()));
        }

        for step in &self.steps {
            progress.emit(format!("Uploading {}...", step.name));
            self.run_step(project_dir, step, progress).await?;
        }

        let names: Vec<&str> = self.steps.iter().map(|s| s.name.as_str()).collect();
        info!(steps = ?names, "Upload finished");
        progress.emit(format!("Uploaded successfully: {}", names.join(", ")));
        Ok(())
    }
}
