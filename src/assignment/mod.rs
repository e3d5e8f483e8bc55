//! Instructor-defined homework: records, generator specs and their storage.

pub mod spec;
pub mod store;

pub use spec::{
    assignment_key, create_assignment_generator, generator_from_spec, parse_assignment_specs,
    GeneratorSpec, ParsedSpecs,
};

use crate::error::{DrillError, Result};
use crate::generator::WeightedMix;
use serde::{Deserialize, Serialize};

/// Editable fields of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDraft {
    pub name: String,
    pub due_text: String,
    pub is_active: bool,
    pub version: u32,
    pub game_types_json: String,
}

impl Default for AssignmentDraft {
    fn default() -> Self {
        Self {
            name: "New assignment".to_string(),
            due_text: String::new(),
            is_active: true,
            version: 1,
            game_types_json: "[]".to_string(),
        }
    }
}

/// A stored assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub id: String,
    pub name: String,
    pub due_text: String,
    pub is_active: bool,
    pub version: u32,
    pub game_types_json: String,
}

impl AssignmentRecord {
    pub fn from_draft(id: impl Into<String>, draft: AssignmentDraft) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            due_text: draft.due_text,
            is_active: draft.is_active,
            version: draft.version,
            game_types_json: draft.game_types_json,
        }
    }

    pub fn draft(&self) -> AssignmentDraft {
        AssignmentDraft {
            name: self.name.clone(),
            due_text: self.due_text.clone(),
            is_active: self.is_active,
            version: self.version,
            game_types_json: self.game_types_json.clone(),
        }
    }

    pub fn parsed_specs(&self) -> ParsedSpecs {
        parse_assignment_specs(&self.game_types_json)
    }

    /// The weighted generator to play this assignment with. Malformed JSON or
    /// specs with nothing usable are configuration errors.
    pub fn generator(&self) -> Result<WeightedMix> {
        let parsed = self.parsed_specs();
        if let Some(error) = parsed.error {
            return Err(DrillError::InvalidConfig(error));
        }
        create_assignment_generator(&self.id, &self.name, &parsed.specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ProblemGenerator;
    use assert_matches::assert_matches;

    fn record(json: &str) -> AssignmentRecord {
        AssignmentRecord::from_draft(
            "a1",
            AssignmentDraft {
                name: "Week 3".to_string(),
                game_types_json: json.to_string(),
                ..AssignmentDraft::default()
            },
        )
    }

    #[test]
    fn default_draft_is_an_empty_active_assignment() {
        let draft = AssignmentDraft::default();
        assert!(draft.is_active);
        assert_eq!(draft.version, 1);
        assert!(parse_assignment_specs(&draft.game_types_json).specs.is_empty());
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_value(record("[]")).unwrap();
        assert_eq!(json["dueText"], "");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["gameTypesJson"], "[]");
    }

    #[test]
    fn generator_uses_assignment_identity() {
        let r = record(r#"[{"key": "sixthGradeReview.v1"}]"#);
        let g = r.generator().unwrap();
        assert_eq!(g.persistency_key(), "assignment:a1");
        assert_eq!(g.label(), "Week 3");
    }

    #[test]
    fn broken_json_cannot_be_played() {
        assert_matches!(record("not json").generator(), Err(DrillError::InvalidConfig(_)));
        assert_matches!(record("[]").generator(), Err(DrillError::InvalidConfig(_)));
    }
}
