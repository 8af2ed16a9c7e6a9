//! Form-schema templates and the merge of extraction results into them.
//!
//! Templates use the wire format of the form-schema service
//! (`templateSchemaProp`, `ctrlDisplayName`, `ctrlData`, ...) so merged
//! output can be handed to the same consumers.

mod merge;

pub use merge::{MergeReport, Merged, merge, merge_into};

use std::collections::HashSet;
use std::path::Path;

use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

/// Built-in transport template (~2KB).
static TRANSPORT_JSON: &str = include_str!("transport.json");

lazy_static! {
    static ref TRANSPORT: SchemaTemplate =
        SchemaTemplate::from_json(TRANSPORT_JSON).expect("embedded transport template is valid");
}

/// The built-in transport template.
pub fn transport_template() -> &'static SchemaTemplate {
    &TRANSPORT
}

/// Descriptive grouping of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldCategory {
    /// Identity fields (name, email).
    Normal,
    Stage,
    Confidence,
    /// Measured emission factors.
    Factor,
}

impl FieldCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldCategory::Normal => "normal",
            FieldCategory::Stage => "stage",
            FieldCategory::Confidence => "confidence",
            FieldCategory::Factor => "factor",
        }
    }
}

/// Rendering hint for the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Textbox,
    Dropdown,
}

impl ControlType {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlType::Textbox => "textbox",
            ControlType::Dropdown => "dropdown",
        }
    }
}

/// One `(id, value)` pair of a field's data slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub id: Value,
    /// The value shown in the form.
    #[serde(rename = "name")]
    pub value: Value,
}

impl SlotEntry {
    pub fn empty() -> Self {
        Self {
            id: Value::String(String::new()),
            value: Value::String(String::new()),
        }
    }
}

/// A fillable field of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub category: FieldCategory,

    #[serde(rename = "ctrlName")]
    pub internal_name: String,

    /// Join key for merging.
    #[serde(rename = "ctrlDisplayName")]
    pub display_name: String,

    #[serde(rename = "ctrlType")]
    pub control_type: ControlType,

    /// Never empty once the owning template is validated.
    #[serde(rename = "ctrlData")]
    data: Vec<SlotEntry>,

    /// Lookup path for choice lists; `""` on the wire means none.
    #[serde(
        rename = "ctrlApi",
        default,
        deserialize_with = "empty_as_none",
        serialize_with = "none_as_empty"
    )]
    pub api: Option<String>,

    /// Keys not modelled above, kept for downstream consumers.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDefinition {
    /// A field with one empty slot entry.
    pub fn new(
        category: FieldCategory,
        internal_name: impl Into<String>,
        display_name: impl Into<String>,
        control_type: ControlType,
    ) -> Self {
        Self {
            category,
            internal_name: internal_name.into(),
            display_name: display_name.into(),
            control_type,
            data: vec![SlotEntry::empty()],
            api: None,
            extra: Map::new(),
        }
    }

    /// Replace the data slot. An empty slot fails template validation.
    pub fn with_data(mut self, data: Vec<SlotEntry>) -> Self {
        self.data = data;
        self
    }

    pub fn data(&self) -> &[SlotEntry] {
        &self.data
    }

    /// The value of the first slot entry, `null` for an empty slot.
    pub fn value(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.data.first().map(|entry| &entry.value).unwrap_or(&NULL)
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        match self.data.first_mut() {
            Some(entry) => entry.value = value,
            None => self.data.push(SlotEntry {
                id: Value::String(String::new()),
                value,
            }),
        }
    }
}

/// An ordered set of fields forming one form.
///
/// Deserializing goes through [`SchemaTemplate::new`], so a decoded
/// template always holds its slot and display-name invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchemaTemplate")]
pub struct SchemaTemplate {
    #[serde(rename = "templateSchemaId")]
    pub id: i64,

    #[serde(rename = "templateSchemaName")]
    pub name: String,

    #[serde(rename = "templateSchemaProp")]
    fields: Vec<FieldDefinition>,
}

/// Wire shape of a template before validation.
#[derive(Deserialize)]
struct RawSchemaTemplate {
    #[serde(rename = "templateSchemaId")]
    id: i64,

    #[serde(rename = "templateSchemaName")]
    name: String,

    #[serde(rename = "templateSchemaProp")]
    fields: Vec<FieldDefinition>,
}

impl TryFrom<RawSchemaTemplate> for SchemaTemplate {
    type Error = SchemaError;

    fn try_from(raw: RawSchemaTemplate) -> std::result::Result<Self, Self::Error> {
        Self::new(raw.id, raw.name, raw.fields)
    }
}

impl SchemaTemplate {
    /// Build a template, checking slot and display-name invariants.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        fields: Vec<FieldDefinition>,
    ) -> std::result::Result<Self, SchemaError> {
        let template = Self {
            id,
            name: name.into(),
            fields,
        };
        template.validate()?;
        Ok(template)
    }

    /// Parse and validate a template from its wire JSON.
    pub fn from_json(json: &str) -> std::result::Result<Self, SchemaError> {
        let raw: RawSchemaTemplate = serde_json::from_str(json)?;
        raw.try_into()
    }

    /// Load a template JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    fn validate(&self) -> std::result::Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.data.is_empty() {
                return Err(SchemaError::EmptyDataSlot(field.display_name.clone()));
            }
            if !seen.insert(field.display_name.as_str()) {
                return Err(SchemaError::DuplicateDisplayName(field.display_name.clone()));
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, display_name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.display_name == display_name)
    }

    /// A fresh, owned copy for one request.
    pub fn instantiate(&self) -> SchemaTemplate {
        self.clone()
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [FieldDefinition] {
        &mut self.fields
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn none_as_empty<S>(value: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_builtin_transport_template() {
        let template = transport_template();
        assert_eq!(template.id, 4);
        assert_eq!(template.name, "Transport");

        let names: Vec<&str> = template.fields().iter().map(|f| f.display_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Name",
                "Email",
                "Stage Type",
                "Stage Name",
                "Data Source",
                "Data Frequency",
                "Data Completeness",
                "Data Audited",
                "Distance Travelled (in km)",
                "Fuel Type",
                "Amount of Fuel Used (in liters)",
            ]
        );
    }

    #[test]
    fn test_builtin_field_details() {
        let template = transport_template();

        let fuel = template.field("Fuel Type").unwrap();
        assert_eq!(fuel.category, FieldCategory::Factor);
        assert_eq!(fuel.internal_name, "Fuel");
        assert_eq!(fuel.control_type, ControlType::Dropdown);
        assert_eq!(fuel.value(), &json!(""));
        assert_eq!(
            fuel.api.as_deref(),
            Some("/emissionfactor?emissionFactorType=Transport&emissionFactorSubType=Transport")
        );

        let completeness = template.field("Data Completeness").unwrap();
        assert_eq!(completeness.data()[0].id, json!(111));
        assert_eq!(completeness.value(), &json!("High"));

        assert!(template.field("Email").unwrap().api.is_none());
    }

    #[test]
    fn test_wire_format_preserved() {
        let original: Value = serde_json::from_str(TRANSPORT_JSON).unwrap();
        let serialized = serde_json::to_value(transport_template()).unwrap();
        assert_eq!(serialized, original);
    }

    #[test]
    fn test_empty_data_slot_rejected() {
        let json = r#"{
            "templateSchemaId": 1,
            "templateSchemaName": "Broken",
            "templateSchemaProp": [
                { "category": "normal", "ctrlName": "Name", "ctrlDisplayName": "Name",
                  "ctrlType": "textbox", "ctrlData": [], "ctrlApi": "" }
            ]
        }"#;
        assert!(matches!(
            SchemaTemplate::from_json(json),
            Err(SchemaError::EmptyDataSlot(name)) if name == "Name"
        ));
    }

    #[test]
    fn test_duplicate_display_name_rejected() {
        let field = || FieldDefinition::new(FieldCategory::Normal, "Name", "Name", ControlType::Textbox);
        assert!(matches!(
            SchemaTemplate::new(1, "Dup", vec![field(), field()]),
            Err(SchemaError::DuplicateDisplayName(_))
        ));
    }

    #[test]
    fn test_builder_field_has_placeholder_slot() {
        let field = FieldDefinition::new(FieldCategory::Factor, "Fuel", "Fuel Type", ControlType::Dropdown);
        assert_eq!(field.data().len(), 1);
        assert_eq!(field.value(), &json!(""));

        let empty = field.with_data(vec![]);
        assert!(SchemaTemplate::new(1, "T", vec![empty]).is_err());
    }

    #[test]
    fn test_serde_decode_validates() {
        let empty_slot = r#"{
            "templateSchemaId": 1,
            "templateSchemaName": "Broken",
            "templateSchemaProp": [
                { "category": "normal", "ctrlName": "Name", "ctrlDisplayName": "Name",
                  "ctrlType": "textbox", "ctrlData": [], "ctrlApi": "" }
            ]
        }"#;
        let err = serde_json::from_str::<SchemaTemplate>(empty_slot).unwrap_err();
        assert!(err.to_string().contains("empty data slot"));

        let mut doubled = serde_json::to_value(transport_template()).unwrap();
        let props = doubled["templateSchemaProp"].as_array_mut().unwrap();
        props.push(props[0].clone());
        let err = serde_json::from_value::<SchemaTemplate>(doubled).unwrap_err();
        assert!(err.to_string().contains("Name"));

        let decoded: SchemaTemplate = serde_json::from_str(TRANSPORT_JSON).unwrap();
        assert_eq!(&decoded, transport_template());
    }

    #[test]
    fn test_empty_slot_reads_null_and_accepts_write() {
        let mut field =
            FieldDefinition::new(FieldCategory::Factor, "Fuel", "Fuel Type", ControlType::Dropdown)
                .with_data(vec![]);
        assert_eq!(field.value(), &Value::Null);

        field.set_value(json!("Diesel"));
        assert_eq!(field.data().len(), 1);
        assert_eq!(field.value(), &json!("Diesel"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.json");
        std::fs::write(&path, TRANSPORT_JSON).unwrap();

        let template = SchemaTemplate::from_file(&path).unwrap();
        assert_eq!(&template, transport_template());
    }
}
