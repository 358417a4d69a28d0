// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! In-memory implementations of the repository abstractions defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Store and retrieve domain aggregates
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! Every table keeps its rows in id order behind a `parking_lot::RwLock`.
//! Guards are taken and released inside a single method body, so no lock
//! is ever held across an `.await`.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::assignment::{Assignment, AssignmentId, AssignmentStatus};
use crate::domain::chore::{Chore, ChoreId};
use crate::domain::item::{Item, ItemId};
use crate::domain::repository::{
    AssignmentDraft, AssignmentRepository, ChoreDraft, ChoreRepository, ItemRepository,
    RepositoryError, UploadRepository, UserRepository,
};
use crate::domain::upload::UploadRecord;
use crate::domain::user::{User, UserId};

/// Rows plus the id sequence, guarded together so allocation and insert
/// happen atomically.
struct Table<V> {
    rows: BTreeMap<u64, V>,
    last_id: u64,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<V: Clone> Table<V> {
    fn insert_with(&mut self, build: impl FnOnce(u64) -> V) -> V {
        self.last_id += 1;
        let row = build(self.last_id);
        self.rows.insert(self.last_id, row.clone());
        row
    }

    fn replace(&mut self, id: u64, row: V, kind: &str) -> Result<(), RepositoryError> {
        match self.rows.get_mut(&id) {
            Some(slot) => {
                *slot = row;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("{kind} {id}"))),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<Table<User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, name: String) -> Result<User, RepositoryError> {
        let mut users = self.users.write();
        Ok(users.insert_with(|id| User { id: UserId(id), name }))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().rows.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.users.read().rows.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.users.read().rows.len())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryChoreRepository {
    chores: Arc<RwLock<Table<Chore>>>,
}

impl InMemoryChoreRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChoreRepository for InMemoryChoreRepository {
    async fn create(&self, draft: ChoreDraft) -> Result<Chore, RepositoryError> {
        let mut chores = self.chores.write();
        Ok(chores.insert_with(|id| Chore {
            id: ChoreId(id),
            title: draft.title,
            cadence: draft.cadence,
            description: draft.description,
            owner_id: draft.owner_id,
        }))
    }

    async fn find_by_id(&self, id: ChoreId) -> Result<Option<Chore>, RepositoryError> {
        Ok(self.chores.read().rows.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Chore>, RepositoryError> {
        Ok(self.chores.read().rows.values().cloned().collect())
    }

    async fn update(&self, chore: Chore) -> Result<(), RepositoryError> {
        let id = chore.id.0;
        self.chores.write().replace(id, chore, "chore")
    }

    async fn delete(&self, id: ChoreId) -> Result<(), RepositoryError> {
        match self.chores.write().rows.remove(&id.0) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound(format!("chore {id}"))),
        }
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.chores.read().rows.len())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAssignmentRepository {
    assignments: Arc<RwLock<Table<Assignment>>>,
}

impl InMemoryAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn create(&self, draft: AssignmentDraft) -> Result<Assignment, RepositoryError> {
        let mut assignments = self.assignments.write();
        Ok(assignments.insert_with(|id| Assignment {
            id: AssignmentId(id),
            user_id: draft.user_id,
            chore_id: draft.chore_id,
            due_at: draft.due_at,
            status: draft.status,
        }))
    }

    async fn find_by_id(&self, id: AssignmentId) -> Result<Option<Assignment>, RepositoryError> {
        Ok(self.assignments.read().rows.get(&id.0).cloned())
    }

    async fn list(&self, status: Option<AssignmentStatus>) -> Result<Vec<Assignment>, RepositoryError> {
        let assignments = self.assignments.read();
        Ok(assignments
            .rows
            .values()
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect())
    }

    async fn update(&self, assignment: Assignment) -> Result<(), RepositoryError> {
        let id = assignment.id.0;
        self.assignments.write().replace(id, assignment, "assignment")
    }

    async fn delete_by_chore(&self, chore_id: ChoreId) -> Result<Vec<AssignmentId>, RepositoryError> {
        let mut assignments = self.assignments.write();
        let doomed: Vec<u64> = assignments
            .rows
            .values()
            .filter(|a| a.chore_id == chore_id)
            .map(|a| a.id.0)
            .collect();
        for id in &doomed {
            assignments.rows.remove(id);
        }
        Ok(doomed.into_iter().map(AssignmentId).collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryItemRepository {
    items: Arc<RwLock<Table<Item>>>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn create(&self, name: String) -> Result<Item, RepositoryError> {
        let mut items = self.items.write();
        Ok(items.insert_with(|id| Item { id: ItemId(id), name }))
    }

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        Ok(self.items.read().rows.get(&id.0).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUploadRepository {
    uploads: Arc<RwLock<HashMap<String, UploadRecord>>>,
}

impl InMemoryUploadRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UploadRepository for InMemoryUploadRepository {
    async fn save(&self, record: UploadRecord) -> Result<(), RepositoryError> {
        self.uploads.write().insert(record.id.clone(), record);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UploadRecord>, RepositoryError> {
        Ok(self.uploads.read().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chore::ChoreCadence;
    use chrono::Utc;

    fn draft(chore_id: u64, status: AssignmentStatus) -> AssignmentDraft {
        AssignmentDraft {
            user_id: UserId(1),
            chore_id: ChoreId(chore_id),
            due_at: Utc::now(),
            status,
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential_and_never_reused() {
        let repo = InMemoryChoreRepository::new();
        let make = || ChoreDraft {
            title: "Dishes".into(),
            cadence: ChoreCadence::Daily,
            description: None,
            owner_id: UserId(1),
        };
        let first = repo.create(make()).await.unwrap();
        let second = repo.create(make()).await.unwrap();
        assert_eq!((first.id, second.id), (ChoreId(1), ChoreId(2)));

        repo.delete(second.id).await.unwrap();
        let third = repo.create(make()).await.unwrap();
        assert_eq!(third.id, ChoreId(3));
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_of_deleted_row_is_not_found() {
        let repo = InMemoryAssignmentRepository::new();
        let assignment = repo.create(draft(1, AssignmentStatus::Pending)).await.unwrap();
        repo.delete_by_chore(ChoreId(1)).await.unwrap();
        assert!(matches!(repo.update(assignment).await, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_status_and_cascade_removes_only_matching_chore() {
        let repo = InMemoryAssignmentRepository::new();
        repo.create(draft(1, AssignmentStatus::Pending)).await.unwrap();
        repo.create(draft(1, AssignmentStatus::Completed)).await.unwrap();
        repo.create(draft(2, AssignmentStatus::Pending)).await.unwrap();

        let pending = repo.list(Some(AssignmentStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 2);

        let removed = repo.delete_by_chore(ChoreId(1)).await.unwrap();
        assert_eq!(removed, vec![AssignmentId(1), AssignmentId(2)]);
        let remaining = repo.list(None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].chore_id, ChoreId(2));
    }
}
