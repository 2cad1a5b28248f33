//! JSON output adapter.

use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::Result;
use drowsy_watch_core::{FrameReport, ReportOutput};
use serde::Serialize;

/// Frame reports still waiting to be written as one array.
struct PendingArray {
    pretty: bool,
    reports: Mutex<Option<Vec<FrameReport>>>,
}

/// JSON output adapter.
///
/// Writes one report per line by default. After [`JsonOutput::as_array`]
/// reports are held back and written as a single array on flush.
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    array: Option<PendingArray>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            array: None,
        }
    }

    /// Collects reports into one JSON array written by the first flush.
    #[must_use]
    pub fn as_array(mut self, pretty: bool) -> Self {
        self.array = Some(PendingArray {
            pretty,
            reports: Mutex::new(Some(Vec::new())),
        });
        self
    }

    /// Writes one value as a single JSON line.
    pub fn write_line<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.emit(&json)
    }

    /// Writes a batch of values as a JSON array.
    pub fn write_array<T: Serialize>(&self, values: &[T], pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(values)?
        } else {
            serde_json::to_string(values)?
        };
        self.emit(&json)
    }

    #[allow(clippy::significant_drop_tightening)]
    fn emit(&self, json: &str) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        Ok(())
    }
}

impl ReportOutput for JsonOutput {
    fn write(&self, report: &FrameReport) -> Result<()> {
        let Some(array) = &self.array else {
            return self.write_line(report);
        };
        array
            .reports
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?
            .get_or_insert_with(Vec::new)
            .push(report.clone());
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        if let Some(array) = &self.array {
            let pending = array
                .reports
                .lock()
                .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?
                .take();
            if let Some(reports) = pending {
                self.write_array(&reports, array.pretty)?;
            }
        }
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use drowsy_watch_core::{AlertLevel, DetectionState, FrameSignal, OutcomeKind};

    use super::*;

    /// Writer that keeps everything in a shared buffer.
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn report(index: usize) -> FrameReport {
        let state = DetectionState {
            frame_counter: 3,
            alert_level: AlertLevel::Low,
        };
        FrameReport::new(
            index,
            format!("frame_{index}.png"),
            OutcomeKind::Analyzed,
            Some(FrameSignal::new(0.4, 0.1)),
            state,
        )
    }

    #[test]
    fn test_reports_are_json_lines() {
        let buffer = Shared::default();
        let output = JsonOutput::new(Box::new(buffer.clone()));
        output.write(&report(0)).unwrap();
        output.write(&report(1)).unwrap();
        output.flush().unwrap();

        let text = buffer.text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["outcome"], "analyzed");
        assert_eq!(first["alert_level"], "low");
        assert_eq!(first["frame_counter"], 3);
        assert!(first.get("error").is_none());
    }

    #[test]
    fn test_array_output() {
        let buffer = Shared::default();
        let output = JsonOutput::new(Box::new(buffer.clone()));
        output.write_array(&[report(0), report(1)], true).unwrap();

        let parsed: Vec<FrameReport> = serde_json::from_str(&buffer.text()).unwrap();
        assert_eq!(parsed, vec![report(0), report(1)]);
    }

    #[test]
    fn test_array_layout_waits_for_flush() {
        let buffer = Shared::default();
        let output = JsonOutput::new(Box::new(buffer.clone())).as_array(false);
        output.write(&report(0)).unwrap();
        output.write(&report(1)).unwrap();
        assert!(buffer.text().is_empty());

        output.flush().unwrap();
        let text = buffer.text();
        assert_eq!(text.lines().count(), 1);
        let parsed: Vec<FrameReport> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, vec![report(0), report(1)]);

        output.flush().unwrap();
        assert_eq!(buffer.text(), text);
    }

    #[test]
    fn test_empty_array_is_still_written() {
        let buffer = Shared::default();
        let output = JsonOutput::new(Box::new(buffer.clone())).as_array(true);
        output.flush().unwrap();
        assert_eq!(buffer.text().trim(), "[]");
    }
}
