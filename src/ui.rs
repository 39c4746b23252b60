//! Console rendering of evaluation results.
//!
//! `ConsoleSink` is an `AlertSink` for terminals: a spinner banner showing
//! `INTRUSION` / `SECURE` when stderr is a TTY, plain lines otherwise.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::monitor::{AlertSink, Classification, FrameEvaluation};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        }
    }
}

/// Whether a spinner banner should be drawn for this mode and terminal.
pub fn use_pretty(mode: UiMode, is_tty: bool, disable_pretty: bool) -> bool {
    is_tty
        && match mode {
            UiMode::Pretty => true,
            UiMode::Auto => !disable_pretty,
            UiMode::Plain => false,
        }
}

pub fn banner_text(intrusion: bool) -> &'static str {
    if intrusion {
        "INTRUSION"
    } else {
        "SECURE"
    }
}

/// Per-box label, as drawn next to each box.
pub fn box_label(classification: &Classification) -> &'static str {
    if classification.intersecting {
        "ALERT!"
    } else {
        "Safe"
    }
}

/// One line per classified box.
pub fn render_lines(evaluation: &FrameEvaluation) -> Vec<String> {
    evaluation
        .classifications
        .iter()
        .map(|c| {
            let b = &c.object.bbox;
            format!(
                "  {:<6} {} [{:.0},{:.0} {:.0}x{:.0}] score={:.2}",
                box_label(c),
                c.object.label,
                b.x,
                b.y,
                b.width,
                b.height,
                c.object.score
            )
        })
        .collect()
}

pub struct ConsoleSink {
    banner: Option<ProgressBar>,
    last_intrusion: Option<bool>,
    verbose: bool,
}

impl ConsoleSink {
    /// `disable_pretty` turns `Auto` into plain output; `Pretty` ignores it.
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        let banner = use_pretty(mode, is_tty, disable_pretty).then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message("waiting for camera…");
            spinner
        });
        Self {
            banner,
            last_intrusion: None,
            verbose: false,
        }
    }

    /// Print every frame instead of only state changes (plain mode).
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn summary(evaluation: &FrameEvaluation) -> String {
        format!(
            "{} frame={} {}x{} targets={} inside={}",
            banner_text(evaluation.intrusion),
            evaluation.frame_seq,
            evaluation.width,
            evaluation.height,
            evaluation.classifications.len(),
            evaluation.intersecting_count()
        )
    }
}

impl AlertSink for ConsoleSink {
    fn on_evaluation(&mut self, evaluation: &FrameEvaluation) {
        let changed = self.last_intrusion != Some(evaluation.intrusion);
        self.last_intrusion = Some(evaluation.intrusion);

        match &self.banner {
            Some(spinner) => {
                spinner.set_message(Self::summary(evaluation));
                if changed {
                    for line in render_lines(evaluation) {
                        spinner.println(line);
                    }
                }
            }
            None => {
                if changed || self.verbose {
                    eprintln!("==> {}", Self::summary(evaluation));
                    for line in render_lines(evaluation) {
                        eprintln!("{line}");
                    }
                }
            }
        }
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        if let Some(spinner) = &self.banner {
            let message = match self.last_intrusion {
                Some(intrusion) => format!("✔ stopped ({})", banner_text(intrusion)),
                None => "✔ stopped".to_string(),
            };
            spinner.finish_with_message(message);
        }
    }
}
