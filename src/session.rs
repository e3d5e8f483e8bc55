//! One play-through of a drill: scoring, win conditions and timeout.

use crate::generator::ProblemGenerator;
use crate::problem::Problem;
use crate::runtime::{Clock, DrillEvent, SystemClock};
use crate::scheduler::PromptScheduler;
use crate::stats::ResultStats;
use crate::ui::{MessageColor, SessionUi};
use crate::util::percent;
use tracing::{debug, info};

pub const DEFAULT_POINTS_REQUIRED_TO_WIN: i64 = 20;
pub const DEFAULT_MIN_PROBLEMS_ATTEMPTED_TO_WIN: u32 = 20;
pub const DEFAULT_MAX_SESSION_DURATION_MS: u64 = 10 * 60 * 1000;

const CORRECT_MESSAGE: &str = "✅ Correct!";
const TRY_AGAIN_MESSAGE: &str = "❌ Try again.";
const WIN_MESSAGE: &str = "🥳 You win!";
const TIME_UP_MESSAGE: &str = "Time is up, well done! 🙂";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub points_required_to_win: i64,
    pub min_problems_attempted_to_win: u32,
    pub max_session_duration_ms: u64,
    /// Serve follow-up problems through the scheduler (recent window and
    /// postponements) instead of drawing straight from the generator.
    pub route_through_scheduler: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            points_required_to_win: DEFAULT_POINTS_REQUIRED_TO_WIN,
            min_problems_attempted_to_win: DEFAULT_MIN_PROBLEMS_ATTEMPTED_TO_WIN,
            max_session_duration_ms: DEFAULT_MAX_SESSION_DURATION_MS,
            route_through_scheduler: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Active,
    Won,
    TimedOut,
}

/// What the progress indicator shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub points_toward_win: i64,
    pub problems_attempted: u32,
    pub points_required_to_win: i64,
    pub min_problems_attempted_to_win: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    Won,
    /// The session already ended; the answer was ignored.
    Finished,
}

/// What a drill loop should do after feeding an event to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    /// The session ended (won or timed out) with these statistics.
    Finished(ResultStats),
    /// The player left; nothing is recorded.
    Quit,
}

pub struct GameSession<U: SessionUi> {
    config: SessionConfig,
    scheduler: PromptScheduler,
    ui: U,
    clock: Box<dyn Clock>,
    state: SessionState,
    current_problem: Problem,
    points_toward_win: i64,
    max_reached_points_toward_win: i64,
    problems_attempted: u32,
    num_correct_at_first_try: u32,
    num_wrong_at_first_try: u32,
    game_start_timestamp: u64,
    final_stats: Option<ResultStats>,
}

impl<U: SessionUi> GameSession<U> {
    pub fn new(generator: Box<dyn ProblemGenerator>, ui: U, config: SessionConfig) -> Self {
        Self::with_scheduler(
            PromptScheduler::new(generator),
            ui,
            config,
            Box::new(SystemClock),
        )
    }

    /// Start a session on an already built scheduler and clock. The first
    /// problem is pulled from the scheduler and shown right away.
    pub fn with_scheduler(
        mut scheduler: PromptScheduler,
        ui: U,
        config: SessionConfig,
        clock: Box<dyn Clock>,
    ) -> Self {
        let current_problem = scheduler.next_problem();
        let game_start_timestamp = clock.now_ms();
        let mut session = Self {
            config,
            scheduler,
            ui,
            clock,
            state: SessionState::Active,
            current_problem,
            points_toward_win: 0,
            max_reached_points_toward_win: 0,
            problems_attempted: 0,
            num_correct_at_first_try: 0,
            num_wrong_at_first_try: 0,
            game_start_timestamp,
            final_stats: None,
        };
        info!(
            game = session.scheduler.generator().persistency_key(),
            points_required = config.points_required_to_win,
            min_attempted = config.min_problems_attempted_to_win,
            max_ms = config.max_session_duration_ms,
            "session started"
        );
        session.report_progress();
        session.report_time();
        session.show_current_prompt();
        session
    }

    pub fn record_answer(&mut self, answer: i64) -> AnswerOutcome {
        if !self.is_active() {
            return AnswerOutcome::Finished;
        }
        debug!(key = %self.current_problem.key, answer, "answer submitted");
        if self.current_problem.is_correct(answer) {
            self.on_correct()
        } else {
            self.on_wrong();
            AnswerOutcome::Incorrect
        }
    }

    /// Like [`GameSession::record_answer`] for raw input. Text that is not an
    /// integer counts as a wrong answer.
    pub fn record_answer_text(&mut self, text: &str) -> AnswerOutcome {
        if !self.is_active() {
            return AnswerOutcome::Finished;
        }
        match text.trim().parse::<i64>() {
            Ok(answer) => self.record_answer(answer),
            Err(_) => {
                debug!(input = text, "unparseable answer");
                self.on_wrong();
                AnswerOutcome::Incorrect
            }
        }
    }

    /// Give up on the current problem: costs two points, discloses the answer
    /// and postpones the problem. Returns false when the session already ended.
    pub fn request_answer_reveal(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.points_toward_win -= 2;
        self.problems_attempted += 1;
        self.report_progress();

        let message = format!(
            "The answer is {}. Remember it! 😇",
            self.current_problem.answer
        );
        self.ui.inform_user(&message, MessageColor::Red, false);

        // The postponed copy carries the failure, as the problem it stands for would.
        self.current_problem.failed_attempts += 1;
        self.scheduler.postpone(&self.current_problem);
        debug!(key = %self.current_problem.key, "answer revealed");

        self.advance();
        self.report_time();
        self.show_current_prompt();
        true
    }

    pub fn win_conditions_met(&self) -> bool {
        let enough_points = self.points_toward_win >= self.config.points_required_to_win;
        let enough_attempted =
            self.problems_attempted >= self.config.min_problems_attempted_to_win;
        let within_time = self.elapsed_ms() <= self.config.max_session_duration_ms;
        enough_points && enough_attempted && within_time
    }

    /// Poll from the host's one-second tick. Ends the session as timed out the
    /// first time the time budget is exceeded and returns its statistics.
    pub fn check_timeout(&mut self) -> Option<ResultStats> {
        self.report_time();
        if self.is_active() && self.elapsed_ms() > self.config.max_session_duration_ms {
            return Some(self.finish(SessionState::TimedOut));
        }
        None
    }

    /// Statistics computed from the current counters.
    pub fn result_stats(&self) -> ResultStats {
        ResultStats {
            game_type_key: self.scheduler.generator().persistency_key().to_string(),
            time_elapsed_ms: self.elapsed_ms(),
            percent_correct_on_first_try: percent(
                self.num_correct_at_first_try,
                self.num_correct_at_first_try + self.num_wrong_at_first_try,
            ),
            points_toward_win: self.points_toward_win,
            problems_attempted: self.problems_attempted,
            max_reached_points_toward_win: self.max_reached_points_toward_win,
        }
    }

    /// Statistics frozen when the session ended.
    pub fn final_stats(&self) -> Option<&ResultStats> {
        self.final_stats.as_ref()
    }

    pub fn current_problem(&self) -> &Problem {
        &self.current_problem
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn points_toward_win(&self) -> i64 {
        self.points_toward_win
    }

    pub fn max_reached_points_toward_win(&self) -> i64 {
        self.max_reached_points_toward_win
    }

    pub fn problems_attempted(&self) -> u32 {
        self.problems_attempted
    }

    pub fn game_start_timestamp(&self) -> u64 {
        self.game_start_timestamp
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.game_start_timestamp)
    }

    pub fn remaining_ms(&self) -> u64 {
        self.config
            .max_session_duration_ms
            .saturating_sub(self.elapsed_ms())
    }

    pub fn progress(&self) -> Progress {
        Progress {
            points_toward_win: self.points_toward_win,
            problems_attempted: self.problems_attempted,
            points_required_to_win: self.config.points_required_to_win,
            min_problems_attempted_to_win: self.config.min_problems_attempted_to_win,
        }
    }

    pub fn scheduler(&self) -> &PromptScheduler {
        &self.scheduler
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    /// Apply one input or tick event from the host's loop.
    pub fn handle_event(&mut self, event: DrillEvent) -> LoopControl {
        match event {
            DrillEvent::Answer(text) => match self.record_answer_text(&text) {
                AnswerOutcome::Won => self.finished(),
                AnswerOutcome::Finished => LoopControl::Quit,
                AnswerOutcome::Correct | AnswerOutcome::Incorrect => LoopControl::Continue,
            },
            DrillEvent::Reveal => {
                self.request_answer_reveal();
                LoopControl::Continue
            }
            DrillEvent::Tick => match self.check_timeout() {
                Some(stats) => LoopControl::Finished(stats),
                None => LoopControl::Continue,
            },
            DrillEvent::Quit => LoopControl::Quit,
        }
    }

    fn finished(&self) -> LoopControl {
        match &self.final_stats {
            Some(stats) => LoopControl::Finished(stats.clone()),
            None => LoopControl::Quit,
        }
    }

    fn on_correct(&mut self) -> AnswerOutcome {
        self.points_toward_win += 1;
        self.max_reached_points_toward_win = self
            .max_reached_points_toward_win
            .max(self.points_toward_win);
        self.ui
            .inform_user(CORRECT_MESSAGE, MessageColor::Green, false);

        if self.current_problem.is_first_try() {
            self.num_correct_at_first_try += 1;
        }

        // The answer being scored counts toward the attempt threshold.
        self.problems_attempted += 1;
        if self.win_conditions_met() {
            self.report_progress();
            self.finish(SessionState::Won);
            return AnswerOutcome::Won;
        }

        self.advance();
        self.report_progress();
        self.show_current_prompt();
        AnswerOutcome::Correct
    }

    fn on_wrong(&mut self) {
        self.num_wrong_at_first_try += 1;
        self.points_toward_win -= 1;
        self.report_progress();
        self.report_time();
        self.ui
            .inform_user(TRY_AGAIN_MESSAGE, MessageColor::Black, false);
        self.show_current_prompt();
        self.current_problem.failed_attempts += 1;
    }

    fn advance(&mut self) {
        self.current_problem = if self.config.route_through_scheduler {
            self.scheduler.next_problem()
        } else {
            self.scheduler.fresh_problem()
        };
    }

    fn finish(&mut self, state: SessionState) -> ResultStats {
        self.state = state;
        let stats = self.result_stats();
        match state {
            SessionState::Won => {
                self.ui.inform_user(WIN_MESSAGE, MessageColor::Green, true);
                self.ui.on_win(&stats);
            }
            SessionState::TimedOut => {
                self.ui
                    .inform_user(TIME_UP_MESSAGE, MessageColor::Green, true);
            }
            SessionState::Active => {}
        }
        info!(
            game = %stats.game_type_key,
            outcome = %state,
            points = stats.points_toward_win,
            attempted = stats.problems_attempted,
            first_try_pct = stats.percent_correct_on_first_try,
            elapsed_ms = stats.time_elapsed_ms,
            "session finished"
        );
        self.final_stats = Some(stats.clone());
        stats
    }

    fn report_progress(&mut self) {
        let progress = self.progress();
        self.ui.update_progress_indicator(&progress);
    }

    fn report_time(&mut self) {
        let remaining = self.remaining_ms();
        self.ui.update_session_time_indicator(remaining);
    }

    fn show_current_prompt(&mut self) {
        self.ui.show_prompt(&self.current_problem);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MultiplicationGenerator;
    use crate::problem::Range;
    use crate::runtime::ManualClock;
    use crate::scheduler::POSTPONEMENT_TURNS;
    use crate::ui::RecordingUi;
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    const START: u64 = 1_700_000_000_000;

    fn session(config: SessionConfig) -> (GameSession<RecordingUi>, ManualClock) {
        let clock = ManualClock::new(START);
        let scheduler = PromptScheduler::with_rng(
            Box::new(MultiplicationGenerator::new(Range::new(2, 12))),
            StdRng::seed_from_u64(17),
        );
        let session =
            GameSession::with_scheduler(scheduler, RecordingUi::new(), config, Box::new(clock.clone()));
        (session, clock)
    }

    fn answer_correctly(s: &mut GameSession<RecordingUi>) -> AnswerOutcome {
        let answer = s.current_problem().answer;
        s.record_answer(answer)
    }

    fn answer_wrongly(s: &mut GameSession<RecordingUi>) -> AnswerOutcome {
        let answer = s.current_problem().answer;
        s.record_answer(answer + 1)
    }

    #[test]
    fn new_session_is_a_clean_slate() {
        let (s, _) = session(SessionConfig::default());
        assert_eq!(s.state(), SessionState::Active);
        assert_eq!(s.points_toward_win(), 0);
        assert_eq!(s.problems_attempted(), 0);
        assert_eq!(s.game_start_timestamp(), START);
        assert_eq!(s.ui().prompts().count(), 1);
        assert_eq!(s.ui().prompts().next().unwrap(), s.current_problem());
        assert_eq!(s.remaining_ms(), DEFAULT_MAX_SESSION_DURATION_MS);
    }

    #[test]
    fn five_correct_then_three_wrong_nets_two_points() {
        let (mut s, _) = session(SessionConfig::default());
        for _ in 0..5 {
            assert_eq!(answer_correctly(&mut s), AnswerOutcome::Correct);
        }
        for _ in 0..3 {
            assert_eq!(answer_wrongly(&mut s), AnswerOutcome::Incorrect);
        }
        assert_eq!(s.points_toward_win(), 2);
        assert_eq!(s.max_reached_points_toward_win(), 5);
        assert_eq!(s.problems_attempted(), 5);
    }

    #[test]
    fn win_end_to_end() {
        let (mut s, _) = session(SessionConfig {
            points_required_to_win: 1,
            min_problems_attempted_to_win: 1,
            max_session_duration_ms: 60_000,
            route_through_scheduler: false,
        });
        assert_matches!(answer_correctly(&mut s), AnswerOutcome::Won);
        assert_eq!(s.state(), SessionState::Won);
        assert_eq!(s.problems_attempted(), 1);

        let stats = s.final_stats().unwrap();
        assert_eq!(stats.percent_correct_on_first_try, 100);
        assert_eq!(stats.problems_attempted, 1);
        assert_eq!(s.ui().win(), Some(stats));
        assert_eq!(s.ui().last_message(), Some(WIN_MESSAGE));
    }

    #[test]
    fn win_needs_the_minimum_number_of_problems() {
        let (mut s, _) = session(SessionConfig {
            points_required_to_win: 1,
            min_problems_attempted_to_win: 3,
            ..SessionConfig::default()
        });
        assert_eq!(answer_correctly(&mut s), AnswerOutcome::Correct);
        assert_eq!(answer_correctly(&mut s), AnswerOutcome::Correct);
        assert_eq!(answer_correctly(&mut s), AnswerOutcome::Won);
        assert_eq!(s.problems_attempted(), 3);
    }

    #[test]
    fn win_is_not_granted_after_the_time_budget() {
        let (mut s, clock) = session(SessionConfig {
            points_required_to_win: 1,
            min_problems_attempted_to_win: 0,
            max_session_duration_ms: 1_000,
            route_through_scheduler: false,
        });
        clock.advance(Duration::from_millis(1_001));
        assert_eq!(answer_correctly(&mut s), AnswerOutcome::Correct);
        assert!(s.is_active());
    }

    #[test]
    fn reveal_penalty_end_to_end() {
        let (mut s, _) = session(SessionConfig::default());
        let revealed = s.current_problem().clone();
        assert!(s.request_answer_reveal());
        assert_eq!(s.points_toward_win(), -2);
        assert_eq!(s.problems_attempted(), 1);
        assert!(s.scheduler().is_postponed(&revealed.key));
        assert_eq!(
            s.ui().messages().find(|m| m.starts_with("The answer is")),
            Some(format!("The answer is {}. Remember it! 😇", revealed.answer).as_str())
        );
    }

    #[test]
    fn wrong_answer_keeps_the_problem_and_counts_the_failure() {
        let (mut s, _) = session(SessionConfig::default());
        let before = s.current_problem().key.clone();
        answer_wrongly(&mut s);
        assert_eq!(s.current_problem().key, before);
        assert_eq!(s.current_problem().failed_attempts, 1);
        assert_eq!(s.ui().last_message(), Some(TRY_AGAIN_MESSAGE));
        assert_eq!(s.ui().prompts().count(), 2);
    }

    #[test]
    fn unparseable_text_scores_as_wrong() {
        let (mut s, _) = session(SessionConfig::default());
        assert_eq!(s.record_answer_text("abc"), AnswerOutcome::Incorrect);
        assert_eq!(s.points_toward_win(), -1);

        let answer = s.current_problem().answer.to_string();
        assert_eq!(s.record_answer_text(&format!(" {answer} ")), AnswerOutcome::Correct);
    }

    #[test]
    fn first_try_percentage() {
        let (mut s, _) = session(SessionConfig::default());
        answer_wrongly(&mut s);
        answer_correctly(&mut s);
        assert_eq!(s.result_stats().percent_correct_on_first_try, 0);
        answer_correctly(&mut s);
        assert_eq!(s.result_stats().percent_correct_on_first_try, 50);
    }

    #[test]
    fn timeout_with_no_attempts_reports_zero_percent() {
        let (mut s, clock) = session(SessionConfig::default());
        assert!(s.check_timeout().is_none());

        clock.advance(Duration::from_millis(DEFAULT_MAX_SESSION_DURATION_MS + 1));
        let stats = s.check_timeout().expect("should time out");
        assert_eq!(stats.percent_correct_on_first_try, 0);
        assert_eq!(stats.problems_attempted, 0);
        assert_eq!(s.state(), SessionState::TimedOut);

        // Produced exactly once
        assert!(s.check_timeout().is_none());
        assert_eq!(s.final_stats(), Some(&stats));
    }

    #[test]
    fn finished_session_ignores_input() {
        let (mut s, clock) = session(SessionConfig::default());
        clock.advance(Duration::from_millis(DEFAULT_MAX_SESSION_DURATION_MS + 1));
        s.check_timeout();

        assert_eq!(answer_correctly(&mut s), AnswerOutcome::Finished);
        assert_eq!(s.record_answer_text("x"), AnswerOutcome::Finished);
        assert!(!s.request_answer_reveal());
        assert_eq!(s.points_toward_win(), 0);
    }

    #[test]
    fn points_may_go_negative_and_high_water_holds() {
        let (mut s, _) = session(SessionConfig::default());
        answer_correctly(&mut s);
        answer_correctly(&mut s);
        s.request_answer_reveal();
        answer_wrongly(&mut s);
        answer_wrongly(&mut s);
        assert_eq!(s.points_toward_win(), -2);
        assert_eq!(s.max_reached_points_toward_win(), 2);
        assert_eq!(s.result_stats().max_reached_points_toward_win, 2);
    }

    #[test]
    fn progress_is_reported_after_each_scoring_event() {
        let (mut s, _) = session(SessionConfig::default());
        answer_correctly(&mut s);
        assert_eq!(
            s.ui().last_progress(),
            Some(&Progress {
                points_toward_win: 1,
                problems_attempted: 1,
                points_required_to_win: DEFAULT_POINTS_REQUIRED_TO_WIN,
                min_problems_attempted_to_win: DEFAULT_MIN_PROBLEMS_ATTEMPTED_TO_WIN,
            })
        );
    }

    #[test]
    fn scheduled_follow_ups_bring_revealed_problems_back() {
        let (mut s, _) = session(SessionConfig {
            route_through_scheduler: true,
            ..SessionConfig::default()
        });
        let revealed = s.current_problem().key.clone();
        s.request_answer_reveal();
        // The reveal itself used one turn.
        for _ in 1..POSTPONEMENT_TURNS {
            assert_ne!(s.current_problem().key, revealed);
            answer_correctly(&mut s);
        }
        assert_eq!(s.current_problem().key, revealed);
        assert_eq!(s.current_problem().failed_attempts, 1);
    }

    #[test]
    fn handle_event_drives_the_loop() {
        let (mut s, clock) = session(SessionConfig {
            points_required_to_win: 1,
            min_problems_attempted_to_win: 1,
            ..SessionConfig::default()
        });
        assert_eq!(s.handle_event(DrillEvent::Tick), LoopControl::Continue);
        assert_eq!(
            s.handle_event(DrillEvent::Answer("nope".to_string())),
            LoopControl::Continue
        );
        assert_eq!(s.handle_event(DrillEvent::Reveal), LoopControl::Continue);
        assert_eq!(s.points_toward_win(), -3);
        assert_eq!(s.handle_event(DrillEvent::Quit), LoopControl::Quit);

        clock.advance(Duration::from_millis(DEFAULT_MAX_SESSION_DURATION_MS + 1));
        assert_matches!(
            s.handle_event(DrillEvent::Tick),
            LoopControl::Finished(stats) if stats.problems_attempted == 1
        );
        assert_eq!(s.state(), SessionState::TimedOut);
    }

    #[test]
    fn handle_event_reports_a_win() {
        let (mut s, _) = session(SessionConfig {
            points_required_to_win: 1,
            min_problems_attempted_to_win: 1,
            ..SessionConfig::default()
        });
        let answer = s.current_problem().answer.to_string();
        assert_matches!(
            s.handle_event(DrillEvent::Answer(answer)),
            LoopControl::Finished(stats) if stats.percent_correct_on_first_try == 100
        );
        assert_eq!(s.state(), SessionState::Won);
    }
}
