//! Request, response and verdict types for a single test run.

use crate::config::ProtocolConfig;
use serde::{Deserialize, Serialize};

/// An open acceptance window `(expected - window, expected + window)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tolerance {
    pub expected: i64,
    pub window: i64,
}

impl Tolerance {
    pub fn new(expected: i64, window: i64) -> Self {
        Self { expected, window }
    }

    /// Both bounds are exclusive: a reading exactly `window` away fails.
    pub fn accepts(&self, reading: i64) -> bool {
        self.expected.saturating_sub(self.window) < reading
            && reading < self.expected.saturating_add(self.window)
    }
}

/// What the device is asked to do, and what it should answer.
///
/// Built once from validated caller input and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRequest {
    pwm_value: i64,
    probe_value: i64,
    pwm_tolerance: i64,
    probe_tolerance: i64,
}

impl TestRequest {
    pub const DEFAULT_PWM_TOLERANCE: i64 = 50;
    pub const DEFAULT_PROBE_TOLERANCE: i64 = 100;

    /// A request with the default tolerances (±50 PWM, ±100 position).
    pub fn new(pwm_value: i64, probe_value: i64) -> Self {
        Self {
            pwm_value,
            probe_value,
            pwm_tolerance: Self::DEFAULT_PWM_TOLERANCE,
            probe_tolerance: Self::DEFAULT_PROBE_TOLERANCE,
        }
    }

    /// A request using the tolerances from the `[protocol]` section.
    pub fn from_config(pwm_value: i64, probe_value: i64, config: &ProtocolConfig) -> Self {
        Self::new(pwm_value, probe_value)
            .with_tolerances(config.pwm_tolerance, config.probe_tolerance)
    }

    pub fn with_tolerances(mut self, pwm_tolerance: i64, probe_tolerance: i64) -> Self {
        self.pwm_tolerance = pwm_tolerance;
        self.probe_tolerance = probe_tolerance;
        self
    }

    /// PWM pulse width in microseconds.
    pub fn pwm_value(&self) -> i64 {
        self.pwm_value
    }

    /// Position the probe is expected to report.
    pub fn probe_value(&self) -> i64 {
        self.probe_value
    }

    pub fn pwm_window(&self) -> Tolerance {
        Tolerance::new(self.pwm_value, self.pwm_tolerance)
    }

    pub fn probe_window(&self) -> Tolerance {
        Tolerance::new(self.probe_value, self.probe_tolerance)
    }

    /// The line sent to the device.
    pub fn command(&self) -> String {
        format!("{}\n", self.pwm_value)
    }
}

/// Fields parsed from the device output so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResponse {
    pub pwm_read: Option<i64>,
    pub measurement: Option<i64>,
}

/// Why a run did not pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoPortAvailable,
    LinkLost,
    Timeout,
    MalformedResponse,
    OutOfTolerance,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NoPortAvailable => "no port available",
            Self::LinkLost => "link lost",
            Self::Timeout => "timeout",
            Self::MalformedResponse => "malformed response",
            Self::OutOfTolerance => "out of tolerance",
        };
        f.write_str(text)
    }
}

/// Outcome of comparing a complete response against the request.
///
/// The two checks are independent; a run can pass one and fail the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVerdict {
    pub pwm_read: i64,
    pub measurement: i64,
    pub pwm_pass: bool,
    pub measurement_pass: bool,
    /// `Some(OutOfTolerance)` when either check failed.
    pub failure: Option<FailureReason>,
}

impl TestVerdict {
    pub fn evaluate(request: &TestRequest, pwm_read: i64, measurement: i64) -> Self {
        let pwm_pass = request.pwm_window().accepts(pwm_read);
        let measurement_pass = request.probe_window().accepts(measurement);
        let failure = (!(pwm_pass && measurement_pass)).then_some(FailureReason::OutOfTolerance);

        Self {
            pwm_read,
            measurement,
            pwm_pass,
            measurement_pass,
            failure,
        }
    }

    /// Both checks passed.
    pub fn passed(&self) -> bool {
        self.pwm_pass && self.measurement_pass
    }
}
