//! End-to-end runs of the readback test against scripted probes.

mod common;

use common::{protocol_with, responding_probe};
use pretty_assertions::assert_eq;
use probe_harness::shell::render_report;
use probe_harness::{FailureReason, MockSerialPort, RunError, RunState, TestRequest};
use std::time::Duration;

#[test]
fn test_readings_inside_both_windows_pass() {
    let mock = responding_probe("MOCK0", &["pwmRead:2010", "position:1490"]);

    let report = protocol_with(&mock, 500).run(TestRequest::new(2000, 1500), None, &mut Vec::new());

    let verdict = report.result.as_ref().unwrap();
    assert!(verdict.pwm_pass);
    assert!(verdict.measurement_pass);
    assert_eq!(verdict.failure, None);
    assert!(report.passed());
}

#[test]
fn test_pwm_outside_window_fails_only_pwm() {
    let mock = responding_probe("MOCK0", &["pwmRead:2100", "position:1490"]);

    let report = protocol_with(&mock, 500).run(TestRequest::new(2000, 1500), None, &mut Vec::new());

    let verdict = report.result.as_ref().unwrap();
    assert!(!verdict.pwm_pass);
    assert!(verdict.measurement_pass);
    assert_eq!(verdict.failure, Some(FailureReason::OutOfTolerance));
    assert_eq!(
        render_report(&report),
        vec![
            "PWM input value: 2100",
            "Probe measurement value: 1490",
            "PWM input test failed!",
            "Measurement test finished successfully!",
        ]
    );
}

#[test]
fn test_window_edges_are_exclusive() {
    let mock = responding_probe("MOCK0", &["pwmRead:2050", "position:1401"]);

    let report = protocol_with(&mock, 500).run(TestRequest::new(2000, 1500), None, &mut Vec::new());

    let verdict = report.result.as_ref().unwrap();
    assert!(!verdict.pwm_pass);
    assert!(verdict.measurement_pass);
}

#[test]
fn test_silent_device_times_out() {
    let mock = responding_probe("MOCK0", &["booting", "waiting for input"]);

    let report = protocol_with(&mock, 80).run(TestRequest::new(2000, 1500), None, &mut Vec::new());

    match &report.result {
        Err(RunError::Timeout { waited, .. }) => assert!(*waited >= Duration::from_millis(80)),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(report.state, RunState::TimedOut);
    assert_eq!(render_report(&report), vec!["Measurement failed: Timeout reached."]);
}

#[test]
fn test_boot_noise_before_flush_is_discarded() {
    let mut mock = MockSerialPort::new("MOCK0");
    mock.enqueue_read(b"pwmRead:1000\nposition:1000\n");
    mock.enqueue_after_clear(b"pwmRead:1995\nposition:1510\n");

    let report = protocol_with(&mock, 500).run(TestRequest::new(2000, 1500), None, &mut Vec::new());

    let response = report.response();
    assert_eq!(response.pwm_read, Some(1995));
    assert_eq!(response.measurement, Some(1510));
}

#[test]
fn test_command_and_control_lines() {
    let mock = responding_probe("MOCK0", &["pwmRead:1500", "position:1000"]);

    protocol_with(&mock, 500).run(TestRequest::new(1500, 1000), None, &mut Vec::new());

    assert_eq!(mock.get_write_log(), vec![b"1500\n".to_vec()]);
    assert_eq!(mock.control_lines(), Some((false, false)));
}

#[test]
fn test_progress_lines_in_order() {
    let mock = responding_probe("MOCK0", &["hello", "pwmRead:2000", "position:1500"]);
    let mut lines = Vec::new();

    protocol_with(&mock, 500).run(TestRequest::new(2000, 1500), None, &mut lines);

    assert_eq!(
        lines,
        vec![
            "Serial port MOCK0 is open.",
            "Start test with: 2000us PWM value",
            "Received response: hello",
            "Received response: pwmRead:2000",
            "Received response: position:1500",
        ]
    );
}

#[test]
fn test_text_between_lines_is_malformed() {
    let mock = responding_probe("MOCK0", &["pwmRead:2000", "debug: adc=511", "position:1500"]);

    let report = protocol_with(&mock, 500).run(TestRequest::new(2000, 1500), None, &mut Vec::new());

    let err = report.result.as_ref().unwrap_err();
    assert_eq!(err.reason(), FailureReason::MalformedResponse);
}

#[test]
fn test_unplugged_probe_reports_link_lost() {
    let mut mock = MockSerialPort::new("MOCK0");
    mock.disconnect();

    let report = protocol_with(&mock, 500).run(TestRequest::new(2000, 1500), None, &mut Vec::new());

    match &report.result {
        Err(RunError::LinkLost { port, .. }) => assert_eq!(port, "MOCK0"),
        other => panic!("expected link lost, got {:?}", other),
    }
}
