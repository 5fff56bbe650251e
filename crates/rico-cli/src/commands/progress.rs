//! Terminal progress bar for conversion runs.

use indicatif::{ProgressBar, ProgressStyle};
use rico_convert::Progress;

const TEMPLATE: &str = "{msg:>18} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// indicatif-backed [`Progress`]; one bar reused across dataset roots.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        Self { bar }
    }
}

impl Progress for BarProgress {
    fn start(&self, label: &str, total: u64) {
        self.bar.reset();
        self.bar.set_length(total);
        self.bar.set_message(label.to_owned());
    }

    fn advance(&self, n: u64) {
        self.bar.inc(n);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}
