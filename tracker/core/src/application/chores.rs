// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Chore management.
//!
//! Deleting a chore cascades to every assignment that references it.

use std::sync::Arc;
use tracing::info;

use crate::application::assignments::AssignmentLocks;
use crate::application::TrackerError;
use crate::domain::chore::{Chore, ChoreId, ChorePatch, NewChore};
use crate::domain::repository::{
    AssignmentRepository, ChoreDraft, ChoreRepository, RepositoryError, UserRepository,
};
use crate::domain::user::UserId;

pub struct ChoreService {
    chores: Arc<dyn ChoreRepository>,
    users: Arc<dyn UserRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    locks: AssignmentLocks,
}

impl ChoreService {
    pub fn new(
        chores: Arc<dyn ChoreRepository>,
        users: Arc<dyn UserRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        locks: AssignmentLocks,
    ) -> Self {
        Self {
            chores,
            users,
            assignments,
            locks,
        }
    }

    async fn ensure_user(&self, id: UserId) -> Result<(), TrackerError> {
        match self.users.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(TrackerError::UserNotFound(id)),
        }
    }

    pub async fn create(&self, payload: NewChore) -> Result<Chore, TrackerError> {
        let payload = payload.validate()?;
        let owner_id = UserId(payload.owner_id);
        self.ensure_user(owner_id).await?;

        let chore = self
            .chores
            .create(ChoreDraft {
                title: payload.title,
                cadence: payload.cadence,
                description: payload.description,
                owner_id,
            })
            .await?;
        info!(chore_id = %chore.id, owner_id = %owner_id, "Chore created");
        Ok(chore)
    }

    pub async fn list(&self) -> Result<Vec<Chore>, TrackerError> {
        Ok(self.chores.list_all().await?)
    }

    pub async fn get(&self, id: ChoreId) -> Result<Chore, TrackerError> {
        self.chores
            .find_by_id(id)
            .await?
            .ok_or(TrackerError::ChoreNotFound(id))
    }

    /// Apply only the supplied fields; a new owner must exist.
    pub async fn update(&self, id: ChoreId, patch: ChorePatch) -> Result<Chore, TrackerError> {
        let patch = patch.validate()?;
        let mut chore = self.get(id).await?;
        if let Some(owner_id) = patch.owner_id {
            self.ensure_user(UserId(owner_id)).await?;
        }
        chore.apply(patch);

        match self.chores.update(chore.clone()).await {
            Ok(()) => Ok(chore),
            Err(RepositoryError::NotFound(_)) => Err(TrackerError::ChoreNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, id: ChoreId) -> Result<(), TrackerError> {
        match self.chores.delete(id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound(_)) => return Err(TrackerError::ChoreNotFound(id)),
            Err(e) => return Err(e.into()),
        }
        let removed = self.assignments.delete_by_chore(id).await?;
        self.locks.forget(&removed);
        info!(chore_id = %id, removed_assignments = removed.len(), "Chore deleted");
        Ok(())
    }
}
