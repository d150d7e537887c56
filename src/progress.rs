use indicatif::{ProgressBar, ProgressStyle};

/// Installations with fewer clients load fast enough without a bar.
const PROGRESS_THRESHOLD: usize = 10;

/// Progress over the clients of an installation; a no-op when hidden.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(clients: usize, enabled: bool) -> Self {
        if !enabled || clients < PROGRESS_THRESHOLD {
            return Self { bar: None };
        }

        let bar = ProgressBar::new(clients as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} clients {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        Self { bar: Some(bar) }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    pub fn start_client(&self, id: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(id.to_string());
        }
    }

    pub fn finish_client(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Print a line above the bar without tearing it.
    pub fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.suspend(|| eprint!("{line}")),
            None => eprint!("{line}"),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
