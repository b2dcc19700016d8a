use serde::{Deserialize, Serialize};

use super::document_file::DocumentType;

/// Field-level hints fed into the Smart Mapper's prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldHint {
    pub label: String,
    pub path: String,
    pub required: bool,
    pub format_hint: Option<String>,
    pub notes: Option<String>,
}

impl FieldHint {
    pub fn new(label: &str, path: &str, required: bool) -> Self {
        Self {
            label: label.to_string(),
            path: path.to_string(),
            required,
            format_hint: None,
            notes: None,
        }
    }

    pub fn with_format(mut self, hint: &str) -> Self {
        self.format_hint = Some(hint.to_string());
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }
}

/// Declarative description of one document type's extraction shape: the
/// fields the Smart Mapper should populate and the JSON schema name the
/// output must validate against. Templates are built once at startup and
/// are read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub document_type: DocumentType,
    pub schema_name: String,
    pub fields: Vec<FieldHint>,
}

impl Template {
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldHint> {
        self.fields.iter().filter(|f| f.required)
    }
}
