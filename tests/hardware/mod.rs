//! Hardware-specific tests requiring a real probe board.
//!
//! Set `TEST_PORT` to the board's serial device. `TEST_PWM` and
//! `TEST_PROBE` override the request (defaults 2000 and 1500).

pub mod probe_board_tests;
pub mod utils;
