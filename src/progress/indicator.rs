use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos}/{len} [{elapsed_precise}<{eta_precise}]";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} {pos} steps [{elapsed_precise}]";

/// Step-level progress display.
pub trait ProgressIndicator {
    fn update(&mut self, n: u64);
    fn close(&mut self);
    fn set_description(&mut self, description: &str);
}

/// Used on every non-coordinating process.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressIndicator for NoopProgress {
    fn update(&mut self, _n: u64) {}

    fn close(&mut self) {}

    fn set_description(&mut self, _description: &str) {}
}

/// Whether console bars are drawn to stderr or kept invisible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawTarget {
    #[default]
    Stderr,
    Hidden,
}

pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// A bounded bar when `total` is known, a spinner otherwise.
    pub fn new(total: Option<u64>, target: DrawTarget) -> Self {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        if target == DrawTarget::Hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl ProgressIndicator for ConsoleProgress {
    fn update(&mut self, n: u64) {
        self.bar.inc(n);
    }

    fn close(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish();
        }
    }

    fn set_description(&mut self, description: &str) {
        self.bar.set_message(description.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sized_bar_tracks_position() {
        let mut progress = ConsoleProgress::new(Some(5), DrawTarget::Hidden);
        progress.update(1);
        progress.update(2);
        assert_eq!(progress.position(), 3);
        assert_eq!(progress.length(), Some(5));
        progress.close();
        progress.close();
    }

    #[test]
    fn unsized_spinner_accepts_updates() {
        let mut progress = ConsoleProgress::new(None, DrawTarget::Hidden);
        progress.update(10);
        progress.set_description("Epoch 1/1");
        assert_eq!(progress.position(), 10);
        progress.close();
    }
}
