// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Input validation primitives shared by every request payload.
//!
//! Payloads are deserialized first and then checked field by field; every
//! violation is collected so the client sees all of them in one response.

use serde::Serialize;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Collects field errors while a payload is being checked.
#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Trim `value` and check its length in characters.
    ///
    /// Returns the trimmed text, or `None` after recording a violation.
    pub fn trimmed_text(&mut self, field: &str, value: &str, max_chars: usize) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.push(field, format!("{field} must contain visible characters"));
            return None;
        }
        if trimmed.chars().count() > max_chars {
            self.push(field, format!("{field} must be at most {max_chars} characters"));
            return None;
        }
        Some(trimmed.to_string())
    }

    pub fn positive_id(&mut self, field: &str, value: u64) {
        if value == 0 {
            self.push(field, "must be greater than 0");
        }
    }

    pub fn max_chars(&mut self, field: &str, value: Option<&str>, max_chars: usize) {
        if let Some(text) = value {
            if text.chars().count() > max_chars {
                self.push(field, format!("{field} must be at most {max_chars} characters"));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}
