//! Nested signed sums such as `12 - (3 + (-4 ... ))`.
//!
//! An expression is a list of signed terms. A term is either a positive
//! magnitude or a parenthesised group (itself a signed-term list). The value
//! of a group is its own signed sum and the sign in front of it applies to that
//! total, which is exactly what a student expanding the brackets has to do.

use super::ProblemGenerator;
use crate::error::{DrillError, Result};
use crate::problem::{Problem, Range};
use itertools::Itertools;
use rand::{Rng, RngCore};

pub const BRACKET_EXPANSION_KEY: &str = "bracketExpansion.v1";

/// Deepest nesting [`BracketExpansionGenerator::new`] accepts.
pub const MAX_DEPTH: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Number(i64),
    Group(Vec<SignedTerm>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SignedTerm {
    negative: bool,
    term: Term,
}

impl Term {
    fn value(&self) -> i64 {
        match self {
            Term::Number(n) => *n,
            Term::Group(terms) => sum(terms),
        }
    }

    fn render(&self) -> String {
        match self {
            Term::Number(n) => n.to_string(),
            Term::Group(terms) => format!("({})", render(terms)),
        }
    }
}

fn sum(terms: &[SignedTerm]) -> i64 {
    terms
        .iter()
        .map(|t| {
            let v = t.term.value();
            if t.negative {
                -v
            } else {
                v
            }
        })
        .sum()
}

fn render(terms: &[SignedTerm]) -> String {
    terms
        .iter()
        .enumerate()
        .map(|(i, t)| match (i, t.negative) {
            (0, false) => t.term.render(),
            (0, true) => format!("-{}", t.term.render()),
            (_, false) => format!(" + {}", t.term.render()),
            (_, true) => format!(" - {}", t.term.render()),
        })
        .join("")
}

#[derive(Debug, Clone)]
pub struct BracketExpansionGenerator {
    depth: u32,
    outer: Range,
    inner: Range,
    allow_parens: bool,
}

impl Default for BracketExpansionGenerator {
    fn default() -> Self {
        Self {
            depth: 1,
            outer: Range::new(1, 20),
            inner: Range::new(1, 10),
            allow_parens: true,
        }
    }
}

impl BracketExpansionGenerator {
    pub fn new(depth: u32, outer: Range, inner: Range, allow_parens: bool) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(DrillError::InvalidConfig(format!(
                "bracket depth {depth} exceeds the maximum of {MAX_DEPTH}"
            )));
        }
        if outer.is_only_zero() || inner.is_only_zero() {
            return Err(DrillError::InvalidConfig(
                "bracket ranges must contain a non-zero value".to_string(),
            ));
        }
        Ok(Self {
            depth,
            outer,
            inner,
            allow_parens,
        })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    fn magnitude(range: &Range, rng: &mut dyn RngCore) -> i64 {
        range.sample_nonzero(rng).abs()
    }

    fn flat(&self, range: &Range, rng: &mut dyn RngCore) -> Vec<SignedTerm> {
        let count = rng.gen_range(2..=4);
        (0..count)
            .map(|_| SignedTerm {
                negative: rng.gen_bool(0.5),
                term: Term::Number(Self::magnitude(range, rng)),
            })
            .collect()
    }

    fn build(&self, depth: u32, top_level: bool, rng: &mut dyn RngCore) -> Vec<SignedTerm> {
        let range = if top_level { self.outer } else { self.inner };
        if depth == 0 || !self.allow_parens {
            return self.flat(&range, rng);
        }

        let count = if top_level {
            rng.gen_range(2..=4)
        } else {
            rng.gen_range(1..=3)
        };
        // At least one group per level; since that group is built at depth - 1,
        // a depth-2 request always ends up with nested parentheses.
        let forced = rng.gen_range(0..count);

        (0..count)
            .map(|i| {
                let negative = rng.gen_bool(0.5);
                let term = if i == forced || rng.gen_bool(0.5) {
                    Term::Group(self.build(depth - 1, false, rng))
                } else {
                    Term::Number(Self::magnitude(&range, rng))
                };
                SignedTerm { negative, term }
            })
            .collect()
    }
}

impl ProblemGenerator for BracketExpansionGenerator {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        let terms = self.build(self.depth, true, rng);
        let text = render(&terms);
        let key = format!("{BRACKET_EXPANSION_KEY}:{text}");
        Problem::new(text, sum(&terms), key)
    }

    fn persistency_key(&self) -> &str {
        BRACKET_EXPANSION_KEY
    }

    fn label(&self) -> &str {
        "Expanding brackets"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Independent evaluator for `a + (b - (c)) - d` style text.
    struct Evaluator<'a> {
        chars: std::iter::Peekable<std::str::Chars<'a>>,
    }

    impl<'a> Evaluator<'a> {
        fn eval(text: &'a str) -> i64 {
            let mut e = Evaluator {
                chars: text.chars().peekable(),
            };
            let value = e.expr();
            e.skip_ws();
            assert!(e.chars.peek().is_none(), "trailing input in {text:?}");
            value
        }

        fn skip_ws(&mut self) {
            while matches!(self.chars.peek(), Some(' ')) {
                self.chars.next();
            }
        }

        fn expr(&mut self) -> i64 {
            let mut total = self.signed_operand();
            loop {
                self.skip_ws();
                match self.chars.peek() {
                    Some('+') => {
                        self.chars.next();
                        total += self.operand();
                    }
                    Some('-') => {
                        self.chars.next();
                        total -= self.operand();
                    }
                    _ => return total,
                }
            }
        }

        fn signed_operand(&mut self) -> i64 {
            self.skip_ws();
            if self.chars.peek() == Some(&'-') {
                self.chars.next();
                -self.operand()
            } else {
                self.operand()
            }
        }

        fn operand(&mut self) -> i64 {
            self.skip_ws();
            if self.chars.peek() == Some(&'(') {
                self.chars.next();
                let v = self.expr();
                self.skip_ws();
                assert_eq!(self.chars.next(), Some(')'));
                v
            } else {
                let mut digits = String::new();
                while let Some(c) = self.chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(c);
                    self.chars.next();
                }
                digits.parse().expect("number")
            }
        }
    }

    fn max_nesting(text: &str) -> usize {
        let mut depth = 0usize;
        let mut max = 0usize;
        for c in text.chars() {
            match c {
                '(' => {
                    depth += 1;
                    max = max.max(depth);
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        max
    }

    #[test]
    fn evaluator_sanity() {
        assert_eq!(Evaluator::eval("-1 + 2 - 3"), -2);
        assert_eq!(Evaluator::eval("5 - (2 - (1 + 1))"), 5);
        assert_eq!(Evaluator::eval("-(3 + 4) + 1"), -6);
    }

    #[test]
    fn rendering_of_signed_terms() {
        let terms = vec![
            SignedTerm { negative: true, term: Term::Number(1) },
            SignedTerm { negative: false, term: Term::Number(2) },
            SignedTerm { negative: true, term: Term::Number(3) },
        ];
        assert_eq!(render(&terms), "-1 + 2 - 3");
        assert_eq!(sum(&terms), -2);
    }

    #[test]
    fn sign_applies_to_group_total() {
        let terms = vec![
            SignedTerm { negative: false, term: Term::Number(10) },
            SignedTerm {
                negative: true,
                term: Term::Group(vec![
                    SignedTerm { negative: false, term: Term::Number(4) },
                    SignedTerm { negative: true, term: Term::Number(6) },
                ]),
            },
        ];
        assert_eq!(render(&terms), "10 - (4 - 6)");
        assert_eq!(sum(&terms), 12);
    }

    #[test]
    fn flat_expressions_have_no_parens() {
        let generator = BracketExpansionGenerator::new(0, Range::new(1, 9), Range::new(1, 9), true).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..200 {
            let problem = generator.random_problem(&mut rng);
            assert!(!problem.text.contains('('));
            assert!(!problem.text.starts_with('+'));
            let terms = problem.text.split(' ').filter(|t| t.chars().any(|c| c.is_ascii_digit())).count();
            assert!((2..=4).contains(&terms), "{}", problem.text);
        }
    }

    #[test]
    fn parens_disallowed_flattens_any_depth() {
        let generator = BracketExpansionGenerator::new(3, Range::new(1, 9), Range::new(1, 9), false).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..100 {
            assert!(!generator.random_problem(&mut rng).text.contains('('));
        }
    }

    #[test]
    fn round_trip_value_matches_text() {
        let mut rng = StdRng::seed_from_u64(2025);
        for depth in 0..=MAX_DEPTH {
            let generator =
                BracketExpansionGenerator::new(depth, Range::new(-20, 20), Range::new(-9, 9), true).unwrap();
            for _ in 0..200 {
                let problem = generator.random_problem(&mut rng);
                assert_eq!(Evaluator::eval(&problem.text), problem.answer, "{}", problem.text);
                assert_eq!(problem.key, format!("bracketExpansion.v1:{}", problem.text));
            }
        }
    }

    #[test]
    fn requested_depth_is_always_reached() {
        let mut rng = StdRng::seed_from_u64(31);
        for depth in 1..=3 {
            let generator =
                BracketExpansionGenerator::new(depth, Range::new(1, 20), Range::new(1, 10), true).unwrap();
            for _ in 0..200 {
                let problem = generator.random_problem(&mut rng);
                assert!(max_nesting(&problem.text) >= depth as usize, "{}", problem.text);
            }
        }
    }

    #[test]
    fn leaves_are_never_zero() {
        let mut rng = StdRng::seed_from_u64(12);
        let generator = BracketExpansionGenerator::new(2, Range::new(-1, 1), Range::new(0, 1), true).unwrap();
        for _ in 0..200 {
            let problem = generator.random_problem(&mut rng);
            assert!(!problem.text.split(|c: char| !c.is_ascii_digit()).any(|n| n == "0"));
        }
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(BracketExpansionGenerator::new(MAX_DEPTH + 1, Range::new(1, 2), Range::new(1, 2), true).is_err());
        assert!(BracketExpansionGenerator::new(1, Range::new(0, 0), Range::new(1, 2), true).is_err());
        assert!(BracketExpansionGenerator::new(1, Range::new(1, 2), Range::new(0, 0), true).is_err());
    }
}
