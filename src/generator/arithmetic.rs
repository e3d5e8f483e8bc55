use super::ProblemGenerator;
use crate::error::{DrillError, Result};
use crate::problem::{Problem, Range};
use crate::util::with_parens_if_negative;
use rand::{Rng, RngCore};

pub const MULTIPLICATION_KEY: &str = "multiplication.v1";
pub const DIVISION_KEY: &str = "division.v1";
pub const ADDITION_FIFTH_GRADE_KEY: &str = "additionFifthGrade.v1";
pub const ADDITION_SIXTH_GRADE_KEY: &str = "additionSixthGrade.v1";
pub const SUBTRACTION_FIFTH_GRADE_KEY: &str = "subtractionFifthGrade.v1";
pub const SUBTRACTION_SIXTH_GRADE_KEY: &str = "subtractionSixthGrade.v1";

fn operand_key(tag: &str, a: i64, b: i64) -> String {
    format!("{tag}:{a}:{b}")
}

/// `a × b` with both factors drawn from the same range.
#[derive(Debug, Clone)]
pub struct MultiplicationGenerator {
    range: Range,
}

impl MultiplicationGenerator {
    pub fn new(range: Range) -> Self {
        Self { range }
    }
}

impl ProblemGenerator for MultiplicationGenerator {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        let a = self.range.sample(rng);
        let b = self.range.sample(rng);
        Problem::new(
            format!("{a} × {}", with_parens_if_negative(b)),
            a * b,
            operand_key(MULTIPLICATION_KEY, a, b),
        )
    }

    fn persistency_key(&self) -> &str {
        MULTIPLICATION_KEY
    }

    fn label(&self) -> &str {
        "Multiplication"
    }
}

/// `dividend : divisor` built backwards from a quotient and a non-zero divisor,
/// so the answer is always a whole number.
#[derive(Debug, Clone)]
pub struct DivisionGenerator {
    range: Range,
}

impl DivisionGenerator {
    pub fn new(range: Range) -> Result<Self> {
        if range.is_only_zero() {
            return Err(DrillError::InvalidConfig(
                "division range must contain a non-zero divisor".to_string(),
            ));
        }
        Ok(Self { range })
    }

    /// Signed quotients and divisors in `-10..=10`.
    pub fn review() -> Self {
        Self {
            range: Range::new(-10, 10),
        }
    }
}

impl ProblemGenerator for DivisionGenerator {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        let quotient = self.range.sample(rng);
        let divisor = self.range.sample_nonzero(rng);
        let dividend = quotient * divisor;
        Problem::new(
            format!("{dividend} : {}", with_parens_if_negative(divisor)),
            quotient,
            operand_key(DIVISION_KEY, dividend, divisor),
        )
    }

    fn persistency_key(&self) -> &str {
        DIVISION_KEY
    }

    fn label(&self) -> &str {
        "Division"
    }
}

/// Non-negative `a + b`, both operands in `0..=max`.
#[derive(Debug, Clone)]
pub struct AdditionFifthGradeGenerator {
    max: i64,
}

impl AdditionFifthGradeGenerator {
    pub fn new(max: i64) -> Self {
        Self { max: max.max(0) }
    }
}

impl ProblemGenerator for AdditionFifthGradeGenerator {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        let a = rng.gen_range(0..=self.max);
        let b = rng.gen_range(0..=self.max);
        Problem::new(
            format!("{a} + {b}"),
            a + b,
            operand_key(ADDITION_FIFTH_GRADE_KEY, a, b),
        )
    }

    fn persistency_key(&self) -> &str {
        ADDITION_FIFTH_GRADE_KEY
    }

    fn label(&self) -> &str {
        "Addition (5th grade)"
    }
}

/// Signed `a + b`.
#[derive(Debug, Clone)]
pub struct AdditionSixthGradeGenerator {
    range: Range,
}

impl AdditionSixthGradeGenerator {
    pub fn new(range: Range) -> Self {
        Self { range }
    }
}

impl ProblemGenerator for AdditionSixthGradeGenerator {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        let a = self.range.sample(rng);
        let b = self.range.sample(rng);
        Problem::new(
            format!("{a} + {}", with_parens_if_negative(b)),
            a + b,
            operand_key(ADDITION_SIXTH_GRADE_KEY, a, b),
        )
    }

    fn persistency_key(&self) -> &str {
        ADDITION_SIXTH_GRADE_KEY
    }

    fn label(&self) -> &str {
        "Addition (6th grade)"
    }
}

/// `a - b` that never goes below zero: the subtrahend is drawn from `0..=a`.
#[derive(Debug, Clone)]
pub struct SubtractionFifthGradeGenerator {
    max: i64,
}

impl SubtractionFifthGradeGenerator {
    pub fn new(max: i64) -> Self {
        Self { max: max.max(0) }
    }
}

impl ProblemGenerator for SubtractionFifthGradeGenerator {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        let a = rng.gen_range(0..=self.max);
        let b = rng.gen_range(0..=a);
        Problem::new(
            format!("{a} - {b}"),
            a - b,
            operand_key(SUBTRACTION_FIFTH_GRADE_KEY, a, b),
        )
    }

    fn persistency_key(&self) -> &str {
        SUBTRACTION_FIFTH_GRADE_KEY
    }

    fn label(&self) -> &str {
        "Subtraction (5th grade)"
    }
}

/// Signed `a - b`.
#[derive(Debug, Clone)]
pub struct SubtractionSixthGradeGenerator {
    range: Range,
}

impl SubtractionSixthGradeGenerator {
    pub fn new(range: Range) -> Self {
        Self { range }
    }
}

impl ProblemGenerator for SubtractionSixthGradeGenerator {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        let a = self.range.sample(rng);
        let b = self.range.sample(rng);
        Problem::new(
            format!("{a} - {}", with_parens_if_negative(b)),
            a - b,
            operand_key(SUBTRACTION_SIXTH_GRADE_KEY, a, b),
        )
    }

    fn persistency_key(&self) -> &str {
        SUBTRACTION_SIXTH_GRADE_KEY
    }

    fn label(&self) -> &str {
        "Subtraction (6th grade)"
    }
}
