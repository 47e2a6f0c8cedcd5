//! Progress display for scenario runs

use acctest::{CaseReport, RunObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::ui;

/// Progress bar over the cases of a run. Each finished case is printed
/// above the bar; details are printed once the run is over.
pub struct CaseProgress {
    bar: ProgressBar,
}

impl CaseProgress {
    pub fn new(total: usize, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl RunObserver for CaseProgress {
    fn case_started(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn case_finished(&self, report: &CaseReport) {
        self.bar.println(ui::case_line(report));
        self.bar.inc(1);
    }
}
