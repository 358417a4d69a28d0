// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Assignment aggregate and its status state machine.
//!
//! Any status may overwrite any other. The only transition with a side
//! effect is the one *into* [`AssignmentStatus::Completed`] from a status
//! that was not already completed; [`StatusTransition::enters_completed`]
//! is the single place that decision is made.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Assignment entity, partial updates, UTC normalization of `due_at`

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::domain::chore::ChoreId;
use crate::domain::user::UserId;
use crate::domain::validation::{FieldError, Violations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentId(pub u64);

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    Completed,
    Skipped,
}

impl AssignmentStatus {
    pub const ALL: [AssignmentStatus; 3] = [Self::Pending, Self::Completed, Self::Skipped];

    /// Wire representation, as used in payloads and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub user_id: UserId,
    pub chore_id: ChoreId,
    pub due_at: DateTime<Utc>,
    pub status: AssignmentStatus,
}

/// Previous and resulting status of a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub previous: AssignmentStatus,
    pub current: AssignmentStatus,
}

impl StatusTransition {
    pub fn new(previous: AssignmentStatus, current: AssignmentStatus) -> Self {
        Self { previous, current }
    }

    /// True only for `non-completed -> completed`.
    pub fn enters_completed(&self) -> bool {
        self.previous != AssignmentStatus::Completed && self.current == AssignmentStatus::Completed
    }
}

/// Payload for `POST /assignments`
#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    pub user_id: u64,
    pub chore_id: u64,
    #[serde(deserialize_with = "deserialize_utc")]
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub status: AssignmentStatus,
}

impl NewAssignment {
    pub fn validate(self) -> Result<NewAssignment, Vec<FieldError>> {
        let mut violations = Violations::new();
        violations.positive_id("user_id", self.user_id);
        violations.positive_id("chore_id", self.chore_id);
        violations.finish(self)
    }
}

/// Payload for `PATCH /assignments/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentPatch {
    #[serde(default)]
    pub status: Option<AssignmentStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    pub due_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Apply a partial update and report the status transition it caused.
    pub fn apply(&mut self, patch: AssignmentPatch) -> StatusTransition {
        let previous = self.status;
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_at) = patch.due_at {
            self.due_at = due_at;
        }
        StatusTransition::new(previous, self.status)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != AssignmentStatus::Completed && self.due_at < now
    }
}

// ============================================================================
// UTC normalization
// ============================================================================

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO-8601 instant and normalize it to UTC.
///
/// Values with `Z` or a numeric offset are converted; values without any
/// offset are taken to already be UTC. A bare date means midnight UTC.
pub fn parse_utc_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(format!("invalid datetime: '{raw}'"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Text(String),
    Seconds(i64),
    FractionalSeconds(f64),
}

impl RawInstant {
    fn into_utc(self) -> Result<DateTime<Utc>, String> {
        match self {
            RawInstant::Text(text) => parse_utc_instant(&text),
            RawInstant::Seconds(secs) => {
                DateTime::from_timestamp(secs, 0).ok_or_else(|| format!("timestamp out of range: {secs}"))
            }
            RawInstant::FractionalSeconds(secs) => {
                let millis = (secs * 1000.0).round() as i64;
                DateTime::from_timestamp_millis(millis).ok_or_else(|| format!("timestamp out of range: {secs}"))
            }
        }
    }
}

fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    RawInstant::deserialize(deserializer)?
        .into_utc()
        .map_err(serde::de::Error::custom)
}

fn deserialize_optional_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawInstant>::deserialize(deserializer)?
        .map(RawInstant::into_utc)
        .transpose()
        .map_err(serde::de::Error::custom)
}
