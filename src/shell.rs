//! Glue between the command line and the library.
//!
//! The protocol is blocking, so runs go through `spawn_blocking` while a
//! printer task drains the progress channel as lines arrive.

use crate::progress::ProgressSink;
use crate::protocol::{FailureReason, RunError, RunReport, TestProtocol, TestRequest, TestResponse};
use crate::upload::{UploadError, Uploader};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};

/// Printed in place of a test when flashing fails.
pub const UPLOAD_ABORTED: &str = "Upload failed. Aborting test...";

/// Machine-readable outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub request: TestRequest,
    pub port: Option<String>,
    pub response: TestResponse,
    pub pwm_pass: bool,
    pub measurement_pass: bool,
    pub passed: bool,
    pub failure: Option<FailureReason>,
    /// Human-readable detail for failures without a verdict.
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl From<&RunReport> for RunSummary {
    fn from(report: &RunReport) -> Self {
        let (pwm_pass, measurement_pass, failure, message) = match &report.result {
            Ok(verdict) => (verdict.pwm_pass, verdict.measurement_pass, verdict.failure, None),
            Err(e) => (false, false, Some(e.reason()), Some(e.to_string())),
        };

        Self {
            request: report.request,
            port: report.port.clone(),
            response: report.response(),
            pwm_pass,
            measurement_pass,
            passed: report.passed(),
            failure,
            message,
            started_at: report.started_at,
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// The closing lines an operator sees after a run.
pub fn render_report(report: &RunReport) -> Vec<String> {
    match &report.result {
        Ok(verdict) => vec![
            format!("PWM input value: {}", verdict.pwm_read),
            format!("Probe measurement value: {}", verdict.measurement),
            if verdict.pwm_pass {
                "PWM input test finished successfully!".to_string()
            } else {
                "PWM input test failed!".to_string()
            },
            if verdict.measurement_pass {
                "Measurement test finished successfully!".to_string()
            } else {
                "Measurement test failed!".to_string()
            },
        ],
        Err(RunError::Timeout { .. }) => vec!["Measurement failed: Timeout reached.".to_string()],
        Err(RunError::MalformedResponse { line, reason, .. }) => {
            vec![format!("Measurement failed: unusable response {line:?} ({reason}).")]
        }
        Err(RunError::NoPortAvailable { tried }) => vec![format!(
            "Measurement failed: no serial port could be opened ({} tried).",
            tried.len()
        )],
        Err(RunError::LinkLost { port, source }) => {
            vec![format!("Measurement failed: connection to {port} lost ({source}).")]
        }
    }
}

/// Where the printer task writes progress lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Stdout,
    Stderr,
}

/// Print every line received until all senders are dropped.
pub fn spawn_printer(mut lines: UnboundedReceiver<String>, output: Output) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            match output {
                Output::Stdout => println!("{line}"),
                Output::Stderr => eprintln!("{line}"),
            }
        }
    })
}

/// Run one test on the blocking pool.
pub async fn run_test(
    protocol: Arc<TestProtocol>,
    request: TestRequest,
    port: Option<String>,
    mut progress: UnboundedSender<String>,
) -> Result<RunReport, JoinError> {
    tokio::task::spawn_blocking(move || protocol.run(request, port.as_deref(), &mut progress)).await
}

/// Result of an upload followed by a test.
#[derive(Debug)]
pub enum SessionOutcome {
    /// Flashing failed; no test was attempted.
    UploadFailed(UploadError),
    Tested(RunReport),
}

impl SessionOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Tested(report) if report.passed())
    }
}

/// Flash the project, then test it. The test only runs if every upload step
/// succeeded.
pub async fn upload_and_test(
    uploader: &dyn Uploader,
    project_dir: &Path,
    protocol: Arc<TestProtocol>,
    request: TestRequest,
    port: Option<String>,
    mut progress: UnboundedSender<String>,
) -> Result<SessionOutcome, JoinError> {
    if let Err(e) = uploader.upload(project_dir, &mut progress).await {
        tracing::error!("Upload failed: {}", e);
        progress.emit(UPLOAD_ABORTED.to_string());
        return Ok(SessionOutcome::UploadFailed(e));
    }

    run_test(protocol, request, port, progress)
        .await
        .map(SessionOutcome::Tested)
}
