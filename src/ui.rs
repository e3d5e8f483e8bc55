//! The presentation boundary of the drill engine.
//!
//! A [`crate::session::GameSession`] never renders anything itself: it calls
//! back into a [`SessionUi`] supplied by the host. The terminal front end lives
//! in [`terminal`]; [`RecordingUi`] keeps every call for tests and headless
//! hosts.

pub mod summary;
pub mod terminal;

use crate::problem::Problem;
use crate::session::Progress;
use crate::stats::ResultStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MessageColor {
    Green,
    Black,
    Red,
}

pub trait SessionUi {
    fn inform_user(&mut self, message: &str, color: MessageColor, bold: bool);
    fn update_progress_indicator(&mut self, progress: &Progress);
    fn update_session_time_indicator(&mut self, remaining_ms: u64);
    fn show_prompt(&mut self, problem: &Problem);
    fn on_win(&mut self, stats: &ResultStats);
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Message {
        text: String,
        color: MessageColor,
        bold: bool,
    },
    Progress(Progress),
    TimeRemaining(u64),
    Prompt(Problem),
    Win(ResultStats),
}

/// Records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingUi {
    pub events: Vec<UiEvent>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            UiEvent::Message { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages().last()
    }

    pub fn prompts(&self) -> impl Iterator<Item = &Problem> {
        self.events.iter().filter_map(|e| match e {
            UiEvent::Prompt(p) => Some(p),
            _ => None,
        })
    }

    pub fn last_progress(&self) -> Option<&Progress> {
        self.events.iter().rev().find_map(|e| match e {
            UiEvent::Progress(p) => Some(p),
            _ => None,
        })
    }

    pub fn win(&self) -> Option<&ResultStats> {
        self.events.iter().find_map(|e| match e {
            UiEvent::Win(s) => Some(s),
            _ => None,
        })
    }
}

impl SessionUi for RecordingUi {
    fn inform_user(&mut self, message: &str, color: MessageColor, bold: bool) {
        self.events.push(UiEvent::Message {
            text: message.to_string(),
            color,
            bold,
        });
    }

    fn update_progress_indicator(&mut self, progress: &Progress) {
        self.events.push(UiEvent::Progress(*progress));
    }

    fn update_session_time_indicator(&mut self, remaining_ms: u64) {
        self.events.push(UiEvent::TimeRemaining(remaining_ms));
    }

    fn show_prompt(&mut self, problem: &Problem) {
        self.events.push(UiEvent::Prompt(problem.clone()));
    }

    fn on_win(&mut self, stats: &ResultStats) {
        self.events.push(UiEvent::Win(stats.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_names() {
        assert_eq!(MessageColor::Green.to_string(), "green");
        assert_eq!(MessageColor::Red.to_string(), "red");
    }

    #[test]
    fn recording_ui_keeps_order() {
        let mut ui = RecordingUi::new();
        ui.inform_user("one", MessageColor::Black, false);
        ui.show_prompt(&Problem::new("1 + 1", 2, "k:1:1"));
        ui.inform_user("two", MessageColor::Green, true);

        assert_eq!(ui.messages().collect::<Vec<_>>(), vec!["one", "two"]);
        assert_eq!(ui.last_message(), Some("two"));
        assert_eq!(ui.prompts().count(), 1);
        assert!(ui.win().is_none());
    }
}
