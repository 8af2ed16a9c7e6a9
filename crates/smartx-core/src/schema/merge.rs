//! Display-name merge of extraction results into a template copy.

use serde::Serialize;
use tracing::debug;

use super::SchemaTemplate;
use crate::extract::ExtractionResult;

/// What a merge touched. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Template fields written, in template order.
    pub matched: Vec<String>,
    /// Result keys no field carries.
    pub ignored_keys: Vec<String>,
    /// Template fields the result did not mention.
    pub unfilled: Vec<String>,
}

impl MergeReport {
    pub fn is_complete(&self) -> bool {
        self.unfilled.is_empty()
    }
}

/// A filled template together with its report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Merged {
    pub schema: SchemaTemplate,
    pub report: MergeReport,
}

/// Merge into a fresh copy of the template; the template is left as is.
pub fn merge(template: &SchemaTemplate, result: &ExtractionResult) -> Merged {
    let mut schema = template.instantiate();
    let report = merge_into(&mut schema, result);
    Merged { schema, report }
}

/// Write each matching result value into the first slot entry of the field
/// with the same display name. Matching is exact and case-sensitive.
pub fn merge_into(schema: &mut SchemaTemplate, result: &ExtractionResult) -> MergeReport {
    let mut report = MergeReport::default();

    for field in schema.fields_mut() {
        match result.get(&field.display_name) {
            Some(value) => {
                field.set_value(value.clone());
                report.matched.push(field.display_name.clone());
            }
            None => report.unfilled.push(field.display_name.clone()),
        }
    }

    report.ignored_keys = result
        .keys()
        .filter(|key| schema.field(key).is_none())
        .cloned()
        .collect();

    debug!(
        matched = report.matched.len(),
        ignored = ?report.ignored_keys,
        unfilled = report.unfilled.len(),
        "Merged extraction result into {}",
        schema.name
    );
    report
}
