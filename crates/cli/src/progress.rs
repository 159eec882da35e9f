//! Terminal progress bar
//!
//! Wraps the core accounting state and mirrors it onto an indicatif bar.

use indicatif::{ProgressBar, ProgressStyle};
use oget_core::{Error, ProgressSink, ProgressSnapshot, ProgressState};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} {binary_bytes_per_sec} {msg}";

pub struct ProgressBarSink {
    state: ProgressState,
    bar: ProgressBar,
}

impl ProgressBarSink {
    pub fn new(colors: bool) -> Self {
        Self::with_bar(ProgressBar::new(0), colors)
    }

    /// A sink that keeps accounting but draws nothing
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden(), false)
    }

    fn with_bar(bar: ProgressBar, colors: bool) -> Self {
        let template = if colors {
            TEMPLATE.to_string()
        } else {
            TEMPLATE.replace(":.green", "").replace(":.cyan/blue", "")
        };
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message("0 objects");
        Self {
            state: ProgressState::new(),
            bar,
        }
    }

    fn redraw(&self) {
        let snap = self.state.snapshot();
        self.bar.set_length(snap.total_bytes.max(snap.displayed_bytes()));
        self.bar.set_position(snap.displayed_bytes());
        self.bar.set_message(objects_label(snap.objects));
    }
}

fn objects_label(objects: u64) -> String {
    if objects == 1 {
        "1 object".to_string()
    } else {
        format!("{objects} objects")
    }
}

impl ProgressSink for ProgressBarSink {
    fn add_total(&mut self, bytes: u64) {
        self.state.add_total(bytes);
        self.redraw();
    }

    fn update(&mut self, delta_bytes: u64, delta_objects: u64) {
        self.state.apply(delta_bytes, delta_objects);
        self.redraw();
    }

    fn snapshot(&self) -> ProgressSnapshot {
        self.state.snapshot()
    }

    fn render_final(&mut self, error: Option<&Error>) {
        self.state.abandon_in_flight();
        self.redraw();
        match error {
            None => self.bar.finish(),
            // Leave the terminal to the error message
            Some(_) => self.bar.finish_and_clear(),
        }
    }
}
