// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::TrackerError;
use crate::domain::assignment::{Assignment, AssignmentStatus};
use crate::domain::repository::{AssignmentRepository, ChoreRepository, UserRepository};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentStats {
    pub total: usize,
    /// Every status is present, including those with a zero count.
    pub by_status: BTreeMap<&'static str, usize>,
    pub overdue: usize,
}

impl AssignmentStats {
    pub fn from_assignments(assignments: &[Assignment], now: DateTime<Utc>) -> Self {
        let mut by_status: BTreeMap<&'static str, usize> =
            AssignmentStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        for assignment in assignments {
            *by_status.entry(assignment.status.as_str()).or_default() += 1;
        }
        Self {
            total: assignments.len(),
            by_status,
            overdue: assignments.iter().filter(|a| a.is_overdue(now)).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_users: usize,
    pub total_chores: usize,
    pub assignments: AssignmentStats,
}

pub struct StatsService {
    users: Arc<dyn UserRepository>,
    chores: Arc<dyn ChoreRepository>,
    assignments: Arc<dyn AssignmentRepository>,
}

impl StatsService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        chores: Arc<dyn ChoreRepository>,
        assignments: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            users,
            chores,
            assignments,
        }
    }

    pub async fn snapshot(&self) -> Result<Stats, TrackerError> {
        let assignments = self.assignments.list(None).await?;
        Ok(Stats {
            total_users: self.users.count().await?,
            total_chores: self.chores.count().await?,
            assignments: AssignmentStats::from_assignments(&assignments, Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assignment::AssignmentId;
    use crate::domain::chore::ChoreId;
    use crate::domain::user::UserId;
    use chrono::Duration;

    fn assignment(id: u64, status: AssignmentStatus, due_at: DateTime<Utc>) -> Assignment {
        Assignment {
            id: AssignmentId(id),
            user_id: UserId(1),
            chore_id: ChoreId(1),
            due_at,
            status,
        }
    }

    #[test]
    fn test_overdue_excludes_completed() {
        let now = Utc::now();
        let past = now - Duration::hours(1);
        let future = now + Duration::hours(1);
        let stats = AssignmentStats::from_assignments(
            &[
                assignment(1, AssignmentStatus::Pending, past),
                assignment(2, AssignmentStatus::Completed, past),
                assignment(3, AssignmentStatus::Skipped, past),
                assignment(4, AssignmentStatus::Pending, future),
            ],
            now,
        );
        assert_eq!(stats.total, 4);
        assert_eq!(stats.overdue, 2);
        assert_eq!(stats.by_status["pending"], 2);
        assert_eq!(stats.by_status["completed"], 1);
    }

    #[test]
    fn test_empty_store_lists_every_status() {
        let stats = AssignmentStats::from_assignments(&[], Utc::now());
        let body = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "total": 0,
                "by_status": {"completed": 0, "pending": 0, "skipped": 0},
                "overdue": 0
            })
        );
    }
}
