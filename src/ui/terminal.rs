//! Line-oriented terminal front end.

use super::summary::summary_lines;
use super::{MessageColor, SessionUi};
use crate::problem::Problem;
use crate::session::Progress;
use crate::stats::ResultStats;
use crossterm::style::{StyledContent, Stylize};
use std::io::Write;
use tracing::warn;

/// Writes session feedback to any writer, with ANSI styling when enabled.
pub struct TerminalUi<W: Write> {
    out: W,
    styled: bool,
    last_minute_shown: Option<u64>,
}

impl<W: Write> TerminalUi<W> {
    pub fn new(out: W, styled: bool) -> Self {
        Self {
            out,
            styled,
            last_minute_shown: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            warn!(error = %e, "failed to write to terminal");
        }
    }

    fn paint(&self, text: &str, color: MessageColor, bold: bool) -> String {
        if !self.styled {
            return text.to_string();
        }
        let content: StyledContent<&str> = match color {
            MessageColor::Green => text.green(),
            MessageColor::Red => text.red(),
            MessageColor::Black => text.stylize(),
        };
        if bold {
            content.bold().to_string()
        } else {
            content.to_string()
        }
    }
}

impl<W: Write> SessionUi for TerminalUi<W> {
    fn inform_user(&mut self, message: &str, color: MessageColor, bold: bool) {
        let text = self.paint(message, color, bold);
        self.line(&text);
    }

    fn update_progress_indicator(&mut self, progress: &Progress) {
        let text = format!(
            "[points {}/{} | attempted {}/{}]",
            progress.points_toward_win,
            progress.points_required_to_win,
            progress.problems_attempted,
            progress.min_problems_attempted_to_win
        );
        let text = if self.styled {
            text.dark_grey().to_string()
        } else {
            text
        };
        self.line(&text);
    }

    /// Called on every tick; only whole-minute changes are printed.
    fn update_session_time_indicator(&mut self, remaining_ms: u64) {
        let minutes_left = remaining_ms.div_ceil(60_000);
        if self.last_minute_shown == Some(minutes_left) {
            return;
        }
        self.last_minute_shown = Some(minutes_left);
        self.line(&format!("({minutes_left} min left)"));
    }

    fn show_prompt(&mut self, problem: &Problem) {
        let text = format!("{} = ?", problem.text);
        let text = if self.styled {
            text.bold().to_string()
        } else {
            text
        };
        self.line(&text);
    }

    fn on_win(&mut self, stats: &ResultStats) {
        for l in summary_lines(stats) {
            self.line(&l);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(ui: TerminalUi<Vec<u8>>) -> String {
        String::from_utf8(ui.into_inner()).unwrap()
    }

    #[test]
    fn plain_output_has_no_escape_codes() {
        let mut ui = TerminalUi::new(Vec::new(), false);
        ui.inform_user("✅ Correct!", MessageColor::Green, true);
        ui.show_prompt(&Problem::new("7 × (-3)", -21, "multiplication.v1:7:-3"));
        let out = output(ui);
        assert_eq!(out, "✅ Correct!\n7 × (-3) = ?\n");
    }

    #[test]
    fn styled_output_colors_messages() {
        let mut ui = TerminalUi::new(Vec::new(), true);
        ui.inform_user("❌ Try again.", MessageColor::Red, false);
        let out = output(ui);
        assert!(out.contains('\u{1b}'));
        assert!(out.contains("❌ Try again."));
    }

    #[test]
    fn time_indicator_prints_on_minute_changes_only() {
        let mut ui = TerminalUi::new(Vec::new(), false);
        ui.update_session_time_indicator(600_000);
        ui.update_session_time_indicator(599_000);
        ui.update_session_time_indicator(540_000);
        ui.update_session_time_indicator(539_000);
        assert_eq!(output(ui), "(10 min left)\n(9 min left)\n");
    }

    #[test]
    fn progress_line() {
        let mut ui = TerminalUi::new(Vec::new(), false);
        ui.update_progress_indicator(&Progress {
            points_toward_win: -2,
            problems_attempted: 3,
            points_required_to_win: 20,
            min_problems_attempted_to_win: 20,
        });
        assert_eq!(output(ui), "[points -2/20 | attempted 3/20]\n");
    }
}
