use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audio clip reference carried by a binding. `object_key` addresses the raw
/// clip in the content store; `file_name` is the path leaf used in exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioRef {
    pub id: Uuid,
    pub object_key: String,
    pub file_name: String,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRef {
    pub id: Uuid,
    pub body: String,
}

/// One audio clip bound to one transcript and (optionally) one category.
/// Immutable snapshot taken at export start; the pipeline never writes it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingRecord {
    pub id: Uuid,
    pub category: Option<CategoryRef>,
    pub audio: AudioRef,
    pub text: TextRef,
}

impl BindingRecord {
    /// Display name of the binding's category, falling back to the configured
    /// uncategorized label.
    pub fn category_name<'a>(&'a self, uncategorized: &'a str) -> &'a str {
        self.category
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or(uncategorized)
    }

    pub fn has_blank_text(&self) -> bool {
        self.text.body.trim().is_empty()
    }
}
