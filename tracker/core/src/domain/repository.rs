// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root: one repository per
//! aggregate, interface defined here, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `UserRepository` | `User` | `InMemoryUserRepository` |
//! | `ChoreRepository` | `Chore` | `InMemoryChoreRepository` |
//! | `AssignmentRepository` | `Assignment` | `InMemoryAssignmentRepository` |
//! | `ItemRepository` | `Item` | `InMemoryItemRepository` |
//! | `UploadRepository` | `UploadRecord` | `InMemoryUploadRepository` |
//!
//! Ids come from a per-aggregate sequence starting at 1 and are never
//! reused, even after a delete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::assignment::{Assignment, AssignmentId, AssignmentStatus};
use crate::domain::chore::{Chore, ChoreCadence, ChoreId};
use crate::domain::item::{Item, ItemId};
use crate::domain::upload::UploadRecord;
use crate::domain::user::{User, UserId};

/// Repository interface for User aggregates
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Allocate an id and store the user
    async fn create(&self, name: String) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError>;

    async fn count(&self) -> Result<usize, RepositoryError>;
}

/// Fields of a chore before it has an id.
#[derive(Debug, Clone)]
pub struct ChoreDraft {
    pub title: String,
    pub cadence: ChoreCadence,
    pub description: Option<String>,
    pub owner_id: UserId,
}

/// Repository interface for Chore aggregates
#[async_trait]
pub trait ChoreRepository: Send + Sync {
    async fn create(&self, draft: ChoreDraft) -> Result<Chore, RepositoryError>;

    async fn find_by_id(&self, id: ChoreId) -> Result<Option<Chore>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Chore>, RepositoryError>;

    /// Replace an existing chore; `NotFound` if it was deleted meanwhile
    async fn update(&self, chore: Chore) -> Result<(), RepositoryError>;

    async fn delete(&self, id: ChoreId) -> Result<(), RepositoryError>;

    async fn count(&self) -> Result<usize, RepositoryError>;
}

/// Fields of an assignment before it has an id.
#[derive(Debug, Clone)]
pub struct AssignmentDraft {
    pub user_id: UserId,
    pub chore_id: ChoreId,
    pub due_at: DateTime<Utc>,
    pub status: AssignmentStatus,
}

/// Repository interface for Assignment aggregates
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn create(&self, draft: AssignmentDraft) -> Result<Assignment, RepositoryError>;

    async fn find_by_id(&self, id: AssignmentId) -> Result<Option<Assignment>, RepositoryError>;

    /// List assignments in id order, optionally filtered by status
    async fn list(&self, status: Option<AssignmentStatus>) -> Result<Vec<Assignment>, RepositoryError>;

    /// Replace an existing assignment; `NotFound` if it was deleted meanwhile
    async fn update(&self, assignment: Assignment) -> Result<(), RepositoryError>;

    /// Remove every assignment of a chore, returning the removed ids
    async fn delete_by_chore(&self, chore_id: ChoreId) -> Result<Vec<AssignmentId>, RepositoryError>;
}

/// Repository interface for Item aggregates
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn create(&self, name: String) -> Result<Item, RepositoryError>;

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;
}

/// Repository interface for upload records
#[async_trait]
pub trait UploadRepository: Send + Sync {
    async fn save(&self, record: UploadRecord) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UploadRecord>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
