//! Problem generators, one per arithmetic domain.
//!
//! | Module       | Purpose |
//! |--------------|---------|
//! | `arithmetic` | Two-operand generators: multiplication, division, addition, subtraction |
//! | `composite`  | Uniform and weighted mixes that delegate to owned sub-generators |
//! | `brackets`   | Recursive bracket-expansion expressions |
//!
//! Every generator is stateless apart from its configuration; randomness is
//! supplied by the caller on each draw.

pub mod arithmetic;
pub mod brackets;
pub mod composite;

pub use arithmetic::{
    AdditionFifthGradeGenerator, AdditionSixthGradeGenerator, DivisionGenerator,
    MultiplicationGenerator, SubtractionFifthGradeGenerator, SubtractionSixthGradeGenerator,
};
pub use brackets::BracketExpansionGenerator;
pub use composite::{UniformMix, WeightedMix};

use crate::problem::{Problem, Range};
use rand::RngCore;

/// Capability shared by every arithmetic domain.
pub trait ProblemGenerator {
    /// Produce a new random problem. Every call is independently valid.
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem;

    /// Stable domain tag used in identity keys and persisted records.
    fn persistency_key(&self) -> &str;

    /// Human-facing name.
    fn label(&self) -> &str;
}

impl<G: ProblemGenerator + ?Sized> ProblemGenerator for Box<G> {
    fn random_problem(&self, rng: &mut dyn RngCore) -> Problem {
        (**self).random_problem(rng)
    }

    fn persistency_key(&self) -> &str {
        (**self).persistency_key()
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

/// Built-in games offered without an assignment, grouped by grade.
pub struct GameCatalog {
    pub fifth_grade: Vec<Box<dyn ProblemGenerator>>,
    pub sixth_grade: Vec<Box<dyn ProblemGenerator>>,
}

impl GameCatalog {
    pub fn all(&self) -> impl Iterator<Item = &dyn ProblemGenerator> {
        self.fifth_grade
            .iter()
            .chain(self.sixth_grade.iter())
            .map(|g| g.as_ref())
    }
}

pub fn catalog() -> GameCatalog {
    GameCatalog {
        fifth_grade: vec![
            Box::new(AdditionFifthGradeGenerator::new(100)),
            Box::new(SubtractionFifthGradeGenerator::new(100)),
        ],
        sixth_grade: vec![
            Box::new(MultiplicationGenerator::new(Range::new(-12, 12))),
            Box::new(DivisionGenerator::review()),
            Box::new(AdditionSixthGradeGenerator::new(Range::new(-40, 40))),
            Box::new(SubtractionSixthGradeGenerator::new(Range::new(-40, 40))),
            Box::new(UniformMix::sixth_grade_review()),
            Box::new(BracketExpansionGenerator::default()),
        ],
    }
}

/// Look up a built-in game by its persistency key.
pub fn find_builtin(key: &str) -> Option<Box<dyn ProblemGenerator>> {
    let GameCatalog {
        fifth_grade,
        sixth_grade,
    } = catalog();
    fifth_grade
        .into_iter()
        .chain(sixth_grade)
        .find(|g| g.persistency_key() == key)
}
