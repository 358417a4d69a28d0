// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod repositories;
pub mod webhook_client;
pub mod webhook_config;
pub mod file_store;

pub use webhook_client::{DeliveryClient, DeliveryReceipt, DeliveryRequest};
pub use webhook_config::{EnvWebhookConfigSource, StaticWebhookConfigSource, WebhookConfigSource};
