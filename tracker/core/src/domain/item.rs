// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::domain::validation::{FieldError, Violations};

const MAX_NAME_CHARS: usize = 100;

static ITEM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 _\-]+$").expect("static pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
}

/// Payload for `POST /items`
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
}

impl NewItem {
    pub fn validate(self) -> Result<NewItem, Vec<FieldError>> {
        let mut violations = Violations::new();
        let name = violations.trimmed_text("name", &self.name, MAX_NAME_CHARS);
        if let Some(name) = &name {
            if !ITEM_NAME.is_match(name) {
                violations.push("name", "name may only contain letters, digits, spaces, '_' and '-'");
            }
        }
        violations.finish(NewItem {
            name: name.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_name_pattern() {
        assert!(NewItem { name: " Widget-2_b ".into() }.validate().is_ok());
        assert!(NewItem { name: "<script>".into() }.validate().is_err());
        assert!(NewItem { name: "".into() }.validate().is_err());
    }
}
