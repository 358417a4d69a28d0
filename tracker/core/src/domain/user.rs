// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::validation::{FieldError, Violations};

const MAX_NAME_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// Payload for `POST /users`
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
}

impl NewUser {
    /// Trim the name and check its bounds.
    pub fn validate(self) -> Result<NewUser, Vec<FieldError>> {
        let mut violations = Violations::new();
        let name = violations.trimmed_text("name", &self.name, MAX_NAME_CHARS);
        violations.finish(NewUser {
            name: name.unwrap_or_default(),
        })
    }
}
