/// A schema-level violation found while validating a parsed catalog document.
///
/// The `field` names the offending field path so the catalog author can fix
/// the source file.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid `{field}`: {message}")]
pub struct SchemaViolation {
    pub field: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
