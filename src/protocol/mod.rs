//! The PWM readback test.
//!
//! One run acquires a port, sends the PWM width, waits for the firmware to
//! report what it measured and what position it derived, and compares both
//! against the request's tolerance windows.
//!
//! # Sequence
//!
//! ```text
//! Idle ─resolve─> PortAcquired ─settle, send─> Sent
//!      ─pre-flush, flush─> AwaitingPwmLine ─"pwmRead:"─> AwaitingPositionLine
//!      ─next line─> Evaluated
//!      └─deadline─> TimedOut
//! ```
//!
//! The line after `pwmRead:` is read against the deadline of the whole read
//! loop, not a fresh one. Firmware that prints the two lines far apart can
//! run out of budget between them; the protocol assumes they arrive
//! back-to-back.

pub mod parse;
pub mod types;

pub use parse::{field_after, marker_value, POSITION_MARKER, PWM_MARKER};
pub use types::{FailureReason, TestRequest, TestResponse, TestVerdict, Tolerance};

use crate::config::ProtocolConfig;
use crate::link::{DeviceLink, LinkError};
use crate::port::PortError;
use crate::progress::ProgressSink;
use crate::resolver::{PortResolver, ResolveError};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Ways a run can end without a verdict.
#[derive(Debug, Error)]
pub enum RunError {
    /// No candidate port could be opened.
    #[error("No serial port available ({} candidates tried)", .tried.len())]
    NoPortAvailable { tried: Vec<String> },

    /// The transport failed mid-run.
    #[error("Link to {port} lost: {source}")]
    LinkLost {
        port: String,
        #[source]
        source: PortError,
    },

    /// The deadline passed before both response lines arrived.
    #[error("Timeout reached after {waited:?}")]
    Timeout {
        response: TestResponse,
        waited: Duration,
    },

    /// A marker was found but its line could not be used.
    #[error("Malformed response {line:?}: {reason}")]
    MalformedResponse {
        line: String,
        reason: String,
        response: TestResponse,
    },
}

impl RunError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::NoPortAvailable { .. } => FailureReason::NoPortAvailable,
            Self::LinkLost { .. } => FailureReason::LinkLost,
            Self::Timeout { .. } => FailureReason::Timeout,
            Self::MalformedResponse { .. } => FailureReason::MalformedResponse,
        }
    }

    /// Whatever was parsed before the run failed.
    pub fn response(&self) -> Option<&TestResponse> {
        match self {
            Self::Timeout { response, .. } | Self::MalformedResponse { response, .. } => {
                Some(response)
            }
            _ => None,
        }
    }
}

impl From<ResolveError> for RunError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoPortAvailable { tried } => Self::NoPortAvailable { tried },
        }
    }
}

impl From<LinkError> for RunError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::LinkLost { port, source } => Self::LinkLost { port, source },
        }
    }
}

/// Where a run is in the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    PortAcquired,
    Sent,
    AwaitingPwmLine,
    AwaitingPositionLine,
    Evaluated,
    TimedOut,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Everything known about a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub request: TestRequest,
    /// Port the run talked to, if one was acquired.
    pub port: Option<String>,
    /// Last state reached.
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub result: Result<TestVerdict, RunError>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        matches!(&self.result, Ok(verdict) if verdict.passed())
    }

    /// Fields parsed from the device, complete or not.
    pub fn response(&self) -> TestResponse {
        match &self.result {
            Ok(verdict) => TestResponse {
                pwm_read: Some(verdict.pwm_read),
                measurement: Some(verdict.measurement),
            },
            Err(e) => e.response().copied().unwrap_or_default(),
        }
    }
}

/// Mutable bookkeeping for one run.
struct RunContext {
    port: Option<String>,
    state: RunState,
}

impl RunContext {
    fn advance(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Run state");
        self.state = next;
    }
}

/// Runs PWM readback tests.
#[derive(Debug)]
pub struct TestProtocol {
    resolver: PortResolver,
    timing: ProtocolConfig,
}

impl TestProtocol {
    pub fn new(resolver: PortResolver, timing: ProtocolConfig) -> Self {
        Self { resolver, timing }
    }

    pub fn resolver(&self) -> &PortResolver {
        &self.resolver
    }

    /// Run one exchange on a freshly acquired port.
    ///
    /// Never panics on device misbehaviour and never retries; every failure is
    /// in the report's `result`. The port is closed before this returns.
    pub fn run(
        &self,
        request: TestRequest,
        port: Option<&str>,
        progress: &mut dyn ProgressSink,
    ) -> RunReport {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut ctx = RunContext {
            port: None,
            state: RunState::Idle,
        };

        let result = self.execute(&request, port, progress, &mut ctx);

        match &result {
            Ok(verdict) => info!(
                pwm_read = verdict.pwm_read,
                measurement = verdict.measurement,
                pwm_pass = verdict.pwm_pass,
                measurement_pass = verdict.measurement_pass,
                "Test evaluated"
            ),
            Err(e) => warn!(reason = %e.reason(), "Test failed: {}", e),
        }

        RunReport {
            request,
            port: ctx.port,
            state: ctx.state,
            started_at,
            elapsed: started.elapsed(),
            result,
        }
    }

    fn execute(
        &self,
        request: &TestRequest,
        port: Option<&str>,
        progress: &mut dyn ProgressSink,
        ctx: &mut RunContext,
    ) -> Result<TestVerdict, RunError> {
        let mut link = self.resolver.resolve(port)?;
        progress.emit(format!("Serial port {} is open.", link.port_name()));
        ctx.port = Some(link.port_name().to_string());
        ctx.advance(RunState::PortAcquired);

        pause(self.timing.settle());

        link.send(request.command().as_bytes())?;
        progress.emit(format!("Start test with: {}us PWM value", request.pwm_value()));
        ctx.advance(RunState::Sent);

        pause(self.timing.pre_flush());
        link.flush_input()?;
        ctx.advance(RunState::AwaitingPwmLine);

        let (pwm_read, measurement) = self.await_response(&mut link, progress, ctx)?;

        ctx.advance(RunState::Evaluated);
        Ok(TestVerdict::evaluate(request, pwm_read, measurement))
    }

    /// Read until `pwmRead:` shows up, then take the very next line as the
    /// position line.
    fn await_response(
        &self,
        link: &mut DeviceLink,
        progress: &mut dyn ProgressSink,
        ctx: &mut RunContext,
    ) -> Result<(i64, i64), RunError> {
        let started = Instant::now();
        let deadline = started + self.timing.read_deadline();
        let mut response = TestResponse::default();

        let (pwm_line, pwm) = loop {
            let Some(line) = next_line(link, deadline, progress)? else {
                ctx.advance(RunState::TimedOut);
                return Err(RunError::Timeout {
                    response,
                    waited: started.elapsed(),
                });
            };
            if let Some(pwm) = marker_value(&line, PWM_MARKER) {
                break (line, pwm);
            }
        };

        ctx.advance(RunState::AwaitingPositionLine);
        response.pwm_read = pwm.as_ref().ok().copied();

        // Same deadline as the loop above.
        let Some(position_line) = next_line(link, deadline, progress)? else {
            ctx.advance(RunState::TimedOut);
            return Err(RunError::Timeout {
                response,
                waited: started.elapsed(),
            });
        };
        let measurement = marker_value(&position_line, POSITION_MARKER)
            .unwrap_or_else(|| Err(format!("expected {} after {}", POSITION_MARKER, PWM_MARKER)));
        response.measurement = measurement.as_ref().ok().copied();

        let pwm_read = pwm.map_err(|reason| RunError::MalformedResponse {
            line: pwm_line,
            reason,
            response,
        })?;
        let measurement = measurement.map_err(|reason| RunError::MalformedResponse {
            line: position_line,
            reason,
            response,
        })?;

        Ok((pwm_read, measurement))
    }
}

fn next_line(
    link: &mut DeviceLink,
    deadline: Instant,
    progress: &mut dyn ProgressSink,
) -> Result<Option<String>, RunError> {
    let Some(raw) = link.read_line(deadline)? else {
        return Ok(None);
    };
    let line = raw.trim().to_string();
    debug!("Received response: {}", line);
    progress.emit(format!("Received response: {}", line));
    Ok(Some(line))
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
