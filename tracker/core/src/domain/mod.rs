// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Entities, value objects and domain services for the tracker.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure business rules; no I/O lives here

pub mod user;
pub mod chore;
pub mod item;
pub mod assignment;
pub mod destination;
pub mod notification;
pub mod attachment;
pub mod upload;
pub mod repository;
pub mod validation;
pub mod service_config;
