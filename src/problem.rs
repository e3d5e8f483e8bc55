use rand::{Rng, RngCore};

/// One generated exercise.
///
/// `key` identifies the exercise by content (domain tag plus operands), so two
/// independently generated `7 × 3` problems share a key even though they are
/// separate values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub text: String,
    pub answer: i64,
    pub key: String,
    pub failed_attempts: u32,
}

impl Problem {
    pub fn new(text: impl Into<String>, answer: i64, key: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            answer,
            key: key.into(),
            failed_attempts: 0,
        }
    }

    pub fn is_correct(&self, answer: i64) -> bool {
        self.answer == answer
    }

    pub fn is_first_try(&self) -> bool {
        self.failed_attempts == 0
    }
}

/// Inclusive range of operands, both ends included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub min: i64,
    pub max: i64,
}

impl Range {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn is_reversed(&self) -> bool {
        self.min > self.max
    }

    /// True when the only value the range can produce is zero.
    pub fn is_only_zero(&self) -> bool {
        self.min == 0 && self.max == 0
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> i64 {
        let (lo, hi) = if self.is_reversed() {
            (self.max, self.min)
        } else {
            (self.min, self.max)
        };
        rng.gen_range(lo..=hi)
    }

    /// Sample until a non-zero value comes up. Callers must reject
    /// [`Range::is_only_zero`] ranges beforehand.
    pub fn sample_nonzero(&self, rng: &mut dyn RngCore) -> i64 {
        loop {
            let value = self.sample(rng);
            if value != 0 {
                return value;
            }
        }
    }
}
