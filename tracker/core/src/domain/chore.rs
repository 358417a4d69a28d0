// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::user::UserId;
use crate::domain::validation::{FieldError, Violations};

const MAX_TITLE_CHARS: usize = 120;
const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoreId(pub u64);

impl fmt::Display for ChoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How often a chore recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoreCadence {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Adhoc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chore {
    pub id: ChoreId,
    pub title: String,
    pub cadence: ChoreCadence,
    pub description: Option<String>,
    pub owner_id: UserId,
}

/// Payload for `POST /chores`
#[derive(Debug, Clone, Deserialize)]
pub struct NewChore {
    pub title: String,
    pub cadence: ChoreCadence,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: u64,
}

impl NewChore {
    pub fn validate(self) -> Result<NewChore, Vec<FieldError>> {
        let mut violations = Violations::new();
        let title = violations.trimmed_text("title", &self.title, MAX_TITLE_CHARS);
        violations.max_chars("description", self.description.as_deref(), MAX_DESCRIPTION_CHARS);
        violations.positive_id("owner_id", self.owner_id);
        violations.finish(NewChore {
            title: title.unwrap_or_default(),
            ..self
        })
    }
}

/// Payload for `PUT /chores/{id}`; only supplied fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChorePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cadence: Option<ChoreCadence>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<u64>,
}

impl ChorePatch {
    pub fn validate(self) -> Result<ChorePatch, Vec<FieldError>> {
        let mut violations = Violations::new();
        let title = self
            .title
            .as_deref()
            .and_then(|t| violations.trimmed_text("title", t, MAX_TITLE_CHARS));
        violations.max_chars("description", self.description.as_deref(), MAX_DESCRIPTION_CHARS);
        if let Some(owner_id) = self.owner_id {
            violations.positive_id("owner_id", owner_id);
        }
        violations.finish(ChorePatch { title, ..self })
    }
}

impl Chore {
    pub fn apply(&mut self, patch: ChorePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(cadence) = patch.cadence {
            self.cadence = cadence;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if let Some(owner_id) = patch.owner_id {
            self.owner_id = UserId(owner_id);
        }
    }
}
