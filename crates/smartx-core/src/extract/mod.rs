//! Field extraction: prompt construction, the completion round-trip, and
//! parsing of the model's JSON answer.

mod extractor;
mod prompt;
mod response;

pub use extractor::{FieldExtractor, TEMPERATURE};
pub use prompt::{PromptBuilder, build_prompt};
pub use response::{ExtractionResult, ResponseParser, parse_response};

use serde::Serialize;

/// Supply-chain stage a document describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transportation,
    Packaging,
    Unknown,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Transportation => write!(f, "transportation"),
            Stage::Packaging => write!(f, "packaging"),
            Stage::Unknown => write!(f, "unknown"),
        }
    }
}

/// Expected JSON kind of an extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    /// A string that must read "yes" or "no".
    YesNo,
}

impl FieldKind {
    /// Label used in the prompt's field list.
    pub fn prompt_label(self) -> &'static str {
        match self {
            FieldKind::String => "<string>",
            FieldKind::Number => "<number>",
            FieldKind::YesNo => "<string> yes or no",
        }
    }

    /// Label used in type-mismatch errors.
    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Number => "a number",
            FieldKind::YesNo => "\"yes\" or \"no\"",
        }
    }
}

/// One field the model is asked to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// The fields expected for one stage.
#[derive(Debug, Clone, Copy)]
pub struct StageContract {
    pub stage: Stage,
    pub fields: &'static [FieldSpec],
}

impl StageContract {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

pub const TRANSPORTATION: StageContract = StageContract {
    stage: Stage::Transportation,
    fields: &[
        field("Fuel Type", FieldKind::String),
        field("Distance Travelled (in km)", FieldKind::Number),
        field("Amount of Fuel Used (in liters)", FieldKind::Number),
    ],
};

pub const PACKAGING: StageContract = StageContract {
    stage: Stage::Packaging,
    fields: &[
        field("fuel type", FieldKind::String),
        field("amount of fuel used", FieldKind::Number),
        field("electricity consumption", FieldKind::Number),
        field("material distributed", FieldKind::Number),
        field("energy used", FieldKind::Number),
        field("transport type", FieldKind::String),
        field("number of transport", FieldKind::Number),
        field("distance travelled", FieldKind::Number),
        field("packaging assembly done", FieldKind::YesNo),
        field("distribution done", FieldKind::YesNo),
    ],
};

/// All stage contracts, in prompt order.
pub const CONTRACTS: &[StageContract] = &[TRANSPORTATION, PACKAGING];

/// Look up a field by exact name across all contracts.
pub fn expected_field(name: &str) -> Option<&'static FieldSpec> {
    CONTRACTS.iter().find_map(|c| c.fields.iter().find(|f| f.name == name))
}
