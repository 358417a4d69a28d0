// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use crate::application::TrackerError;
use crate::domain::item::{Item, ItemId, NewItem};
use crate::domain::repository::ItemRepository;

pub struct ItemService {
    items: Arc<dyn ItemRepository>,
}

impl ItemService {
    pub fn new(items: Arc<dyn ItemRepository>) -> Self {
        Self { items }
    }

    pub async fn create(&self, payload: NewItem) -> Result<Item, TrackerError> {
        let payload = payload.validate()?;
        Ok(self.items.create(payload.name).await?)
    }

    pub async fn get(&self, id: ItemId) -> Result<Item, TrackerError> {
        self.items
            .find_by_id(id)
            .await?
            .ok_or(TrackerError::ItemNotFound(id))
    }
}
