//! Human-readable progress lines streamed to whoever started a run.

use tokio::sync::mpsc::UnboundedSender;

/// Receives progress lines as they happen.
pub trait ProgressSink: Send {
    fn emit(&mut self, line: String);
}

/// Forwards to a channel; a closed receiver just drops the line.
impl ProgressSink for UnboundedSender<String> {
    fn emit(&mut self, line: String) {
        let _ = self.send(line);
    }
}

/// Collects lines, handy in tests.
impl ProgressSink for Vec<String> {
    fn emit(&mut self, line: String) {
        self.push(line);
    }
}
