// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;
use tracing::info;

use crate::application::TrackerError;
use crate::domain::repository::UserRepository;
use crate::domain::user::{NewUser, User, UserId};

pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn create(&self, payload: NewUser) -> Result<User, TrackerError> {
        let payload = payload.validate()?;
        let user = self.users.create(payload.name).await?;
        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>, TrackerError> {
        Ok(self.users.list_all().await?)
    }

    /// Look up a user, failing with `UserNotFound`.
    pub async fn require(&self, id: UserId) -> Result<User, TrackerError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(TrackerError::UserNotFound(id))
    }
}
