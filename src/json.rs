use serde_json::{Map, Value};

/// Reusable writer for flat JSON error bodies.
///
/// One writer belongs to one validation context. It is not synchronized;
/// the owning context guards it with its own lock.
///
/// # Examples
///
/// ```
/// use gateway_core::JsonBodyWriter;
///
/// let mut writer = JsonBodyWriter::new();
/// writer.reset_and_get().insert("error".into(), "invalid_request".into());
/// assert_eq!(writer.get_json(), r#"{"error":"invalid_request"}"#);
///
/// // Reuse starts from an empty object.
/// writer.reset_and_get();
/// assert_eq!(writer.get_json(), "{}");
/// ```
#[derive(Debug, Default)]
pub struct JsonBodyWriter {
    object: Map<String, Value>,
}

impl JsonBodyWriter {
    /// Creates a writer holding an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the previous object and returns a fresh one to fill.
    pub fn reset_and_get(&mut self) -> &mut Map<String, Value> {
        self.object.clear();
        &mut self.object
    }

    /// Serializes the current object.
    pub fn get_json(&self) -> String {
        Value::Object(self.object.clone()).to_string()
    }
}
