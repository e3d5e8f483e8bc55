//! Decides which problem comes next.
//!
//! The scheduler keeps a short window of recently served identity keys so a
//! problem does not come straight back, and a list of postponed problems that
//! the student gave up on. Each call to [`PromptScheduler::next_problem`] is
//! one turn: postponements count down and the first one to reach zero is
//! served again.

use crate::generator::ProblemGenerator;
use crate::problem::Problem;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

pub const MAX_RECENT_PROBLEMS: usize = 10;
pub const POSTPONEMENT_TURNS: u32 = 10;
/// Draws per exclusion pass before the scheduler relaxes its constraints.
pub const MAX_DRAWS_PER_PASS: usize = 100;

#[derive(Debug, Clone)]
struct Postponement {
    problem: Problem,
    turns_remaining: u32,
}

pub struct PromptScheduler {
    generator: Box<dyn ProblemGenerator>,
    rng: StdRng,
    recent: VecDeque<String>,
    postponed: Vec<Postponement>,
}

impl PromptScheduler {
    pub fn new(generator: Box<dyn ProblemGenerator>) -> Self {
        Self::with_rng(generator, StdRng::from_entropy())
    }

    pub fn with_rng(generator: Box<dyn ProblemGenerator>, rng: StdRng) -> Self {
        Self {
            generator,
            rng,
            recent: VecDeque::with_capacity(MAX_RECENT_PROBLEMS),
            postponed: Vec::new(),
        }
    }

    pub fn generator(&self) -> &dyn ProblemGenerator {
        self.generator.as_ref()
    }

    /// Serve the next problem: a postponed one that just became due, otherwise
    /// a fresh one that is neither recent nor postponed.
    pub fn next_problem(&mut self) -> Problem {
        for p in &mut self.postponed {
            p.turns_remaining = p.turns_remaining.saturating_sub(1);
        }

        if let Some(idx) = self.postponed.iter().position(|p| p.turns_remaining == 0) {
            let due = self.postponed.remove(idx);
            debug!(key = %due.problem.key, "serving postponed problem");
            self.remember(&due.problem);
            return due.problem;
        }

        let problem = self.draw_unrepeated();
        self.remember(&problem);
        problem
    }

    /// Draw straight from the generator, bypassing recent/postponed tracking.
    pub fn fresh_problem(&mut self) -> Problem {
        self.generator.random_problem(&mut self.rng)
    }

    /// Bring `problem` back after [`POSTPONEMENT_TURNS`] turns. Postponing an
    /// already postponed key restarts its countdown.
    pub fn postpone(&mut self, problem: &Problem) {
        match self.postponed.iter_mut().find(|p| p.problem.key == problem.key) {
            Some(existing) => existing.turns_remaining = POSTPONEMENT_TURNS,
            None => self.postponed.push(Postponement {
                problem: problem.clone(),
                turns_remaining: POSTPONEMENT_TURNS,
            }),
        }
        debug!(key = %problem.key, "postponed problem");
    }

    pub fn is_postponed(&self, key: &str) -> bool {
        self.postponed.iter().any(|p| p.problem.key == key)
    }

    pub fn postponed_keys(&self) -> Vec<&str> {
        self.postponed.iter().map(|p| p.problem.key.as_str()).collect()
    }

    /// Turns left before `key` is served again, if it is postponed.
    pub fn turns_remaining(&self, key: &str) -> Option<u32> {
        self.postponed
            .iter()
            .find(|p| p.problem.key == key)
            .map(|p| p.turns_remaining)
    }

    pub fn recent_keys(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }

    fn remember(&mut self, problem: &Problem) {
        if self.recent.len() == MAX_RECENT_PROBLEMS {
            self.recent.pop_front();
        }
        self.recent.push_back(problem.key.clone());
    }

    fn draw_unrepeated(&mut self) -> Problem {
        let postponed: HashSet<String> =
            self.postponed.iter().map(|p| p.problem.key.clone()).collect();

        let mut candidate = self.fresh_problem();
        for _ in 1..MAX_DRAWS_PER_PASS {
            if !postponed.contains(&candidate.key) && !self.recent.contains(&candidate.key) {
                return candidate;
            }
            candidate = self.fresh_problem();
        }
        if !postponed.contains(&candidate.key) && !self.recent.contains(&candidate.key) {
            return candidate;
        }

        warn!(
            generator = self.generator.persistency_key(),
            "problem space exhausted by recent window, allowing repeats"
        );
        for _ in 0..MAX_DRAWS_PER_PASS {
            if !postponed.contains(&candidate.key) {
                return candidate;
            }
            candidate = self.fresh_problem();
        }

        warn!(
            generator = self.generator.persistency_key(),
            "problem space exhausted by postponements, serving a postponed key"
        );
        candidate
    }
}
