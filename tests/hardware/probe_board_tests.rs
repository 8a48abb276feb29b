//! Readback tests against a real probe board.

use crate::require_board;
use probe_harness::shell::render_report;
use probe_harness::{FailureReason, TestRequest};

#[test]
#[ignore = "requires a flashed probe board on TEST_PORT"]
fn board_passes_default_request() {
    let board = require_board!();
    let mut lines = Vec::new();

    let report = board.protocol().run(board.request(), None, &mut lines);

    for line in lines.iter().chain(render_report(&report).iter()) {
        println!("{line}");
    }
    assert!(report.passed(), "board failed: {:?}", report.result);
}

#[test]
#[ignore = "requires a flashed probe board on TEST_PORT"]
fn impossible_expectation_is_out_of_tolerance() {
    let board = require_board!();
    let request = TestRequest::new(board.pwm_value, board.probe_value + 10_000);

    let report = board.protocol().run(request, None, &mut Vec::new());

    let verdict = report.result.expect("board should answer");
    assert!(!verdict.measurement_pass);
    assert_eq!(verdict.failure, Some(FailureReason::OutOfTolerance));
}

#[test]
#[ignore = "requires serial hardware"]
fn list_usb_ports() {
    super::utils::print_usb_ports();
}
