//! Multipart form payload
//!
//! Encoders build a [`FormPayload`]: an ordered, inspectable list of form
//! parts. It is turned into a `reqwest` multipart form only at submission,
//! so encoders stay pure and testable.

use crate::error::Result;
use crate::types::SourceFile;
use reqwest::multipart::{Form, Part};

/// Value of one form part
#[derive(Debug, Clone)]
pub enum FormValue {
    Text(String),
    File(SourceFile),
}

/// Ordered multipart payload of one conversion request
#[derive(Debug, Clone, Default)]
pub struct FormPayload {
    parts: Vec<(String, FormValue)>,
}

impl FormPayload {
    /// Payload with the two fields every conversion carries: `file` and `convert_to`
    pub fn new(file: &SourceFile, format: &str) -> Self {
        let mut payload = Self::default();
        payload
            .parts
            .push(("file".to_string(), FormValue::File(file.clone())));
        payload.text("convert_to", format);
        payload
    }

    pub fn text(&mut self, name: &str, value: impl ToString) {
        self.parts
            .push((name.to_string(), FormValue::Text(value.to_string())));
    }

    /// Append only when a value is present
    pub fn optional<T: ToString>(&mut self, name: &str, value: Option<T>) {
        if let Some(value) = value {
            self.text(name, value);
        }
    }

    /// First text value of a field
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).into_iter().next()
    }

    /// All text values of a field, in insertion order
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|(n, _)| n == name)
            .filter_map(|(_, v)| match v {
                FormValue::Text(s) => Some(s.as_str()),
                FormValue::File(_) => None,
            })
            .collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.parts.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Dump every part at debug level
    pub fn log_contents(&self) {
        for (name, value) in &self.parts {
            match value {
                FormValue::File(file) => tracing::debug!(
                    field = %name,
                    file_name = %file.name,
                    mime = file.mime.as_deref().unwrap_or("application/octet-stream"),
                    size_kb = format!("{:.2}", file.size() as f64 / 1024.0),
                    "form file part"
                ),
                FormValue::Text(text) => tracing::debug!(field = %name, value = %text, "form field"),
            }
        }
    }

    /// Convert into a `reqwest` multipart form
    pub fn into_multipart(self) -> Result<Form> {
        let mut form = Form::new();
        for (name, value) in self.parts {
            form = match value {
                FormValue::Text(text) => form.text(name, text),
                FormValue::File(file) => {
                    let len = file.size();
                    let mut part = Part::stream_with_length(reqwest::Body::from(file.data), len)
                        .file_name(file.name);
                    if let Some(mime) = file.mime.as_deref() {
                        part = part.mime_str(mime)?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}
