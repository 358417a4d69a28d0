// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Assignment Service
//!
//! Owns the assignment lifecycle, including the completion webhook.
//!
//! # Concurrency
//!
//! Updates to one assignment are serialized by a per-assignment async
//! mutex held from the read of the previous status until the new state is
//! committed. The completion webhook is delivered inside that window, so a
//! concurrent writer observes the committed status and cannot fire a second
//! notification. Different assignments never share a lock.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::info;

use crate::application::notification_service::NotificationService;
use crate::application::TrackerError;
use crate::domain::assignment::{
    Assignment, AssignmentId, AssignmentPatch, AssignmentStatus, NewAssignment,
};
use crate::domain::chore::ChoreId;
use crate::domain::notification::NotificationError;
use crate::domain::repository::{
    AssignmentDraft, AssignmentRepository, ChoreRepository, RepositoryError, UserRepository,
};
use crate::domain::user::UserId;
use crate::infrastructure::webhook_client::DeliveryReceipt;

/// Per-assignment write locks.
#[derive(Clone, Default)]
pub struct AssignmentLocks {
    locks: Arc<DashMap<AssignmentId, Arc<Mutex<()>>>>,
}

impl AssignmentLocks {
    pub async fn acquire(&self, id: AssignmentId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is released before awaiting.
        let lock = self.locks.entry(id).or_default().value().clone();
        lock.lock_owned().await
    }

    /// Drop the lock for `id` unless another caller still holds or awaits it.
    pub fn release_if_idle(&self, id: AssignmentId) {
        self.locks.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Drop locks of deleted assignments.
    pub fn forget(&self, ids: &[AssignmentId]) {
        for id in ids {
            self.locks.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct AssignmentService {
    assignments: Arc<dyn AssignmentRepository>,
    users: Arc<dyn UserRepository>,
    chores: Arc<dyn ChoreRepository>,
    notifications: NotificationService,
    locks: AssignmentLocks,
}

impl AssignmentService {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        users: Arc<dyn UserRepository>,
        chores: Arc<dyn ChoreRepository>,
        notifications: NotificationService,
        locks: AssignmentLocks,
    ) -> Self {
        Self {
            assignments,
            users,
            chores,
            notifications,
            locks,
        }
    }

    /// Create an assignment; user and chore must exist at this point.
    pub async fn create(&self, payload: NewAssignment) -> Result<Assignment, TrackerError> {
        let payload = payload.validate()?;
        let user_id = UserId(payload.user_id);
        let chore_id = ChoreId(payload.chore_id);

        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(TrackerError::UserNotFound(user_id));
        }
        if self.chores.find_by_id(chore_id).await?.is_none() {
            return Err(TrackerError::ChoreNotFound(chore_id));
        }

        let assignment = self
            .assignments
            .create(AssignmentDraft {
                user_id,
                chore_id,
                due_at: payload.due_at,
                status: payload.status,
            })
            .await?;
        info!(
            assignment_id = %assignment.id,
            %user_id,
            %chore_id,
            status = %assignment.status,
            "Assignment created"
        );
        Ok(assignment)
    }

    pub async fn list(&self, status: Option<AssignmentStatus>) -> Result<Vec<Assignment>, TrackerError> {
        Ok(self.assignments.list(status).await?)
    }

    pub async fn get(&self, id: AssignmentId) -> Result<Assignment, TrackerError> {
        self.assignments
            .find_by_id(id)
            .await?
            .ok_or(TrackerError::AssignmentNotFound(id))
    }

    /// Apply a partial update.
    ///
    /// When the update moves the assignment into `completed` the completion
    /// webhook is delivered before the change is stored; if delivery or
    /// validation fails, nothing is stored and the error is returned.
    pub async fn update(&self, id: AssignmentId, patch: AssignmentPatch) -> Result<Assignment, TrackerError> {
        // Unknown ids never get a lock entry.
        self.get(id).await?;
        let guard = self.locks.acquire(id).await;

        // Re-read under the lock; the assignment may have been deleted meanwhile.
        let mut assignment = match self.get(id).await {
            Ok(assignment) => assignment,
            Err(e) => {
                drop(guard);
                self.locks.release_if_idle(id);
                return Err(e);
            }
        };
        let transition = assignment.apply(patch);

        self.notifications
            .notify_on_completion(&assignment, transition.previous)
            .await
            .map_err(TrackerError::completion)?;

        match self.assignments.update(assignment.clone()).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound(_)) => {
                drop(guard);
                self.locks.release_if_idle(id);
                return Err(TrackerError::AssignmentNotFound(id));
            }
            Err(e) => return Err(e.into()),
        }

        drop(guard);

        if transition.previous != transition.current {
            info!(
                assignment_id = %id,
                from = %transition.previous,
                to = %transition.current,
                "Assignment status changed"
            );
        }
        Ok(assignment)
    }

    /// Queue an on-demand notification for an existing assignment.
    pub async fn notify(
        &self,
        id: AssignmentId,
    ) -> Result<JoinHandle<Result<DeliveryReceipt, NotificationError>>, TrackerError> {
        let assignment = self.get(id).await?;
        self.notifications
            .notify_now(&assignment)
            .map_err(TrackerError::on_demand)
    }
}
