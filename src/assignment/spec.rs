//! Assignment generator specs: the JSON list an instructor writes, and the
//! factory that turns it into a weighted generator.

use crate::error::{DrillError, Result};
use crate::generator::arithmetic::{
    ADDITION_FIFTH_GRADE_KEY, ADDITION_SIXTH_GRADE_KEY, DIVISION_KEY, MULTIPLICATION_KEY,
    SUBTRACTION_FIFTH_GRADE_KEY, SUBTRACTION_SIXTH_GRADE_KEY,
};
use crate::generator::brackets::BRACKET_EXPANSION_KEY;
use crate::generator::composite::SIXTH_GRADE_REVIEW_KEY;
use crate::generator::{
    AdditionFifthGradeGenerator, AdditionSixthGradeGenerator, BracketExpansionGenerator,
    DivisionGenerator, MultiplicationGenerator, ProblemGenerator, SubtractionFifthGradeGenerator,
    SubtractionSixthGradeGenerator, UniformMix, WeightedMix,
};
use crate::problem::Range;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

fn default_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_probability() -> f64 {
    1.0
}

/// One entry of an assignment's `gameTypesJson`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    pub key: String,
    #[serde(default = "default_params")]
    pub params: serde_json::Value,
    #[serde(default = "default_probability")]
    pub probability: f64,
}

impl GeneratorSpec {
    pub fn new(key: impl Into<String>, params: serde_json::Value, probability: f64) -> Self {
        Self {
            key: key.into(),
            params,
            probability,
        }
    }
}

/// Outcome of parsing stored assignment JSON. A parse failure leaves `specs`
/// empty and describes the problem in `error`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSpecs {
    pub specs: Vec<GeneratorSpec>,
    pub error: Option<String>,
}

impl ParsedSpecs {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub fn parse_assignment_specs(json: &str) -> ParsedSpecs {
    match serde_json::from_str::<Vec<GeneratorSpec>>(json) {
        Ok(specs) => ParsedSpecs { specs, error: None },
        Err(e) => ParsedSpecs {
            specs: Vec::new(),
            error: Some(format!("invalid assignment JSON: {e}")),
        },
    }
}

/// Largest operand magnitude an assignment may ask for. Keeps products and
/// nested bracket sums well inside `i64`.
pub const MAX_OPERAND_MAGNITUDE: i64 = 1_000_000;

fn within_limit(value: i64) -> bool {
    (-MAX_OPERAND_MAGNITUDE..=MAX_OPERAND_MAGNITUDE).contains(&value)
}

#[derive(Debug, Deserialize)]
struct RangeParams {
    min: i64,
    max: i64,
}

fn checked_range(spec: &GeneratorSpec, min: i64, max: i64) -> Option<Range> {
    let range = Range::new(min, max);
    if range.is_reversed() {
        warn!(key = %spec.key, min, max, "omitting generator with reversed range");
        return None;
    }
    if !within_limit(min) || !within_limit(max) {
        warn!(
            key = %spec.key,
            min,
            max,
            limit = MAX_OPERAND_MAGNITUDE,
            "omitting generator with out-of-range operands"
        );
        return None;
    }
    Some(range)
}

#[derive(Debug, Deserialize)]
struct MaxParams {
    max: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BracketParams {
    depth: u32,
    outer_min: i64,
    outer_max: i64,
    inner_min: i64,
    inner_max: i64,
    allow_parens: bool,
}

impl Default for BracketParams {
    fn default() -> Self {
        Self {
            depth: 1,
            outer_min: 1,
            outer_max: 20,
            inner_min: 1,
            inner_max: 10,
            allow_parens: true,
        }
    }
}

fn params<T: DeserializeOwned>(spec: &GeneratorSpec) -> Option<T> {
    match serde_json::from_value(spec.params.clone()) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(key = %spec.key, error = %e, "omitting generator with invalid params");
            None
        }
    }
}

fn range_params(spec: &GeneratorSpec) -> Option<Range> {
    let p = params::<RangeParams>(spec)?;
    checked_range(spec, p.min, p.max)
}

fn max_params(spec: &GeneratorSpec) -> Option<i64> {
    let max = params::<MaxParams>(spec)?.max;
    if max < 0 {
        warn!(key = %spec.key, max, "omitting generator with negative max");
        return None;
    }
    if !within_limit(max) {
        warn!(
            key = %spec.key,
            max,
            limit = MAX_OPERAND_MAGNITUDE,
            "omitting generator with out-of-range max"
        );
        return None;
    }
    Some(max)
}

fn validated<G: ProblemGenerator + 'static>(
    spec: &GeneratorSpec,
    built: Result<G>,
) -> Option<Box<dyn ProblemGenerator>> {
    match built {
        Ok(g) => Some(Box::new(g)),
        Err(e) => {
            warn!(key = %spec.key, error = %e, "omitting generator");
            None
        }
    }
}

/// Build the generator a spec names, or `None` when the tag is unknown or the
/// params do not fit it.
pub fn generator_from_spec(spec: &GeneratorSpec) -> Option<Box<dyn ProblemGenerator>> {
    match spec.key.as_str() {
        MULTIPLICATION_KEY => Some(Box::new(MultiplicationGenerator::new(range_params(spec)?))),
        DIVISION_KEY => {
            let range = range_params(spec)?;
            validated(spec, DivisionGenerator::new(range))
        }
        ADDITION_FIFTH_GRADE_KEY => Some(Box::new(AdditionFifthGradeGenerator::new(
            max_params(spec)?,
        ))),
        SUBTRACTION_FIFTH_GRADE_KEY => Some(Box::new(SubtractionFifthGradeGenerator::new(
            max_params(spec)?,
        ))),
        ADDITION_SIXTH_GRADE_KEY => Some(Box::new(AdditionSixthGradeGenerator::new(
            range_params(spec)?,
        ))),
        SUBTRACTION_SIXTH_GRADE_KEY => Some(Box::new(SubtractionSixthGradeGenerator::new(
            range_params(spec)?,
        ))),
        SIXTH_GRADE_REVIEW_KEY => Some(Box::new(UniformMix::sixth_grade_review())),
        BRACKET_EXPANSION_KEY => {
            let p = params::<BracketParams>(spec)?;
            let outer = checked_range(spec, p.outer_min, p.outer_max)?;
            let inner = checked_range(spec, p.inner_min, p.inner_max)?;
            validated(
                spec,
                BracketExpansionGenerator::new(p.depth, outer, inner, p.allow_parens),
            )
        }
        other => {
            warn!(key = other, "omitting unknown generator key");
            None
        }
    }
}

/// Persistency key of the generator built for an assignment.
pub fn assignment_key(assignment_id: &str) -> String {
    format!("assignment:{assignment_id}")
}

/// Build the weighted mix for an assignment. Unusable specs are skipped; if
/// nothing usable remains the assignment cannot be played.
pub fn create_assignment_generator(
    assignment_id: &str,
    name: &str,
    specs: &[GeneratorSpec],
) -> Result<WeightedMix> {
    let entries: Vec<(Box<dyn ProblemGenerator>, f64)> = specs
        .iter()
        .filter_map(|spec| generator_from_spec(spec).map(|g| (g, spec.probability)))
        .collect();

    if entries.is_empty() {
        return Err(DrillError::InvalidConfig(format!(
            "assignment {assignment_id} has no usable generators"
        )));
    }
    debug!(
        assignment_id,
        usable = entries.len(),
        total = specs.len(),
        "built assignment generator"
    );
    WeightedMix::new(assignment_key(assignment_id), name, entries)
}
