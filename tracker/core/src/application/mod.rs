// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application services.
//!
//! Each service orchestrates domain rules over repository traits and
//! infrastructure adapters. Services return [`TrackerError`]; the HTTP layer
//! maps it to problem documents.

pub mod users;
pub mod chores;
pub mod items;
pub mod assignments;
pub mod notification_service;
pub mod attachments;
pub mod stats;

pub use assignments::{AssignmentLocks, AssignmentService};
pub use attachments::{AttachmentService, UploadService};
pub use chores::ChoreService;
pub use items::ItemService;
pub use notification_service::{NotificationOutcome, NotificationService, SkipReason};
pub use stats::{AssignmentStats, Stats, StatsService};
pub use users::UserService;

use crate::domain::assignment::AssignmentId;
use crate::domain::attachment::AttachmentError;
use crate::domain::chore::ChoreId;
use crate::domain::item::ItemId;
use crate::domain::notification::{NotificationChannel, NotificationError};
use crate::domain::repository::RepositoryError;
use crate::domain::upload::UploadError;
use crate::domain::user::UserId;
use crate::domain::validation::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Request validation failed")]
    Validation(Vec<FieldError>),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Chore {0} not found")]
    ChoreNotFound(ChoreId),

    #[error("Assignment {0} not found")]
    AssignmentNotFound(AssignmentId),

    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    #[error("{channel} notification failed: {source}")]
    Notification {
        channel: NotificationChannel,
        #[source]
        source: NotificationError,
    },

    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<Vec<FieldError>> for TrackerError {
    fn from(errors: Vec<FieldError>) -> Self {
        Self::Validation(errors)
    }
}

impl TrackerError {
    pub fn completion(source: NotificationError) -> Self {
        Self::Notification {
            channel: NotificationChannel::Completion,
            source,
        }
    }

    pub fn on_demand(source: NotificationError) -> Self {
        Self::Notification {
            channel: NotificationChannel::OnDemand,
            source,
        }
    }
}
