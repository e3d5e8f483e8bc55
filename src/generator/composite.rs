use super::arithmetic::{
    AdditionSixthGradeGenerator, DivisionGenerator, MultiplicationGenerator,
    SubtractionSixthGradeGenerator,
};
use super::ProblemGenerator;
use crate::error::{DrillError, Result};
use crate::problem::{Problem, Range};
use rand::{Rng, RngCore};

pub const SIXTH_GRADE_REVIEW_KEY: &str = "sixthGradeReview.v1";

/// Picks one of its members uniformly for every problem.
pub struct UniformMix {
    key: String,
    label: String,
    members: Vec<Box<dyn ProblemGenerator>>,
}

impl UniformMix {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        members: Vec<Box<dyn ProblemGenerator>>,
    ) -> Result<Self> {
        if members.is_empty() {
            return Err(DrillError::InvalidConfig(
                "a mix needs at least one generator".to_string(),
            ));
        }
        Ok(Self {
            key: key.into(),
            label: label.into(),
            members,
        })
    }

    /// Signed multiplication, division, addition and subtraction in equal parts.
    pub fn sixth_grade_review() -> Self {
        Self {
            key: SIXTH_GRADE_REVIEW_KEY.to_string(),
            label: "Sixth grade review".to_string(),
            members: vec![
                Box::new(MultiplicationGenerator::new(Range::new(-12, 12))),
                Box::new(DivisionGenerator::review()),
                Box::new(AdditionSixthGradeGenerator::new(Range::new(-40, 40))),
                Box::new(SubtractionSixthGradeGenerator::new(Range::new(-40, 40))),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl ProblemGenerator for UniformMix {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        let idx = rng.gen_range(0..self.members.len());
        self.members[idx].random_problem(rng)
    }

    fn persistency_key(&self) -> &str {
        &self.key
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Picks a member with probability proportional to its weight.
pub struct WeightedMix {
    key: String,
    label: String,
    entries: Vec<(Box<dyn ProblemGenerator>, f64)>,
    total_weight: f64,
}

impl std::fmt::Debug for WeightedMix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedMix")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("total_weight", &self.total_weight)
            .finish_non_exhaustive()
    }
}

impl WeightedMix {
    /// Negative (and NaN) weights count as zero. An empty entry list, or
    /// weights whose sum is not finite, is a configuration error.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        entries: Vec<(Box<dyn ProblemGenerator>, f64)>,
    ) -> Result<Self> {
        if entries.is_empty() {
            return Err(DrillError::InvalidConfig(
                "a weighted mix needs at least one generator".to_string(),
            ));
        }
        let entries: Vec<_> = entries
            .into_iter()
            .map(|(g, w)| (g, if w > 0.0 { w } else { 0.0 }))
            .collect();
        let sum: f64 = entries.iter().map(|(_, w)| w).sum();
        if !sum.is_finite() {
            return Err(DrillError::InvalidConfig(format!(
                "weighted mix weights must have a finite sum, got {sum}"
            )));
        }
        Ok(Self {
            key: key.into(),
            label: label.into(),
            entries,
            total_weight: if sum > 0.0 { sum } else { 1.0 },
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the entry chosen for a roll in `[0, total_weight]`: the first
    /// positive-weight entry whose cumulative weight reaches the roll, or the
    /// last entry when none does (all weights zero).
    ///
    /// Zero-weight entries are skipped even on a tie, so with weights `[0, 1]`
    /// a roll of exactly `0.0` selects index 1, not index 0.
    pub fn select_index(&self, roll: f64) -> usize {
        let mut cumulative = 0.0;
        for (idx, (_, weight)) in self.entries.iter().enumerate() {
            cumulative += weight;
            if *weight > 0.0 && cumulative >= roll {
                return idx;
            }
        }
        self.entries.len() - 1
    }
}

impl ProblemGenerator for WeightedMix {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        let roll = rng.gen_range(0.0..=self.total_weight);
        let idx = self.select_index(roll);
        self.entries[idx].0.random_problem(rng)
    }

    fn persistency_key(&self) -> &str {
        &self.key
    }

    fn label(&self) -> &str {
        &self.label
    }
}
