//! Progress bar adapter using indicatif.

use drowsy_watch_core::{AlertLevel, MonitorEvent, OutcomeKind, ProgressSink};
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// Progress bar adapter for CLI output.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show a bar; otherwise print alert changes only
    #[must_use]
    pub fn new(quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = show_bar.then(|| {
            let bar = IndicatifBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self { bar, quiet }
    }

    fn say(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl ProgressSink for ProgressBar {
    fn on_event(&self, event: MonitorEvent) {
        if self.quiet {
            return;
        }

        match event {
            MonitorEvent::Started { total } => {
                if let (Some(bar), Some(t)) = (&self.bar, total) {
                    bar.set_length(t as u64);
                }
            }
            MonitorEvent::Frame { report } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                    bar.set_message(report.alert_level.to_string());
                }
                if report.outcome == OutcomeKind::DetectorFailed
                    || report.outcome == OutcomeKind::ClassifierFailed
                {
                    let reason = report.error.as_deref().unwrap_or("unknown error");
                    self.say(&format!("WARN: Frame {} skipped: {reason}", report.path));
                }
            }
            MonitorEvent::AlertChanged { index, from, to } => {
                let marker = if to == AlertLevel::Critical { "!!" } else { "--" };
                self.say(&format!("{marker} frame {index}: alert {from} -> {to}"));
            }
            MonitorEvent::Finished { summary } => {
                let line = format!(
                    "Done: {} frames, {} analyzed, {} throttled, {} failed, peak {}",
                    summary.submitted,
                    summary.analyzed,
                    summary.throttled,
                    summary.failed,
                    summary.peak_level
                );
                match &self.bar {
                    Some(bar) => bar.finish_with_message(line),
                    None => eprintln!("{line}"),
                }
            }
        }
    }
}
