// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chore Tracker Core
//!
//! Users, chores, assignments and attachments behind a small HTTP API, plus
//! the outbound webhook that fires when an assignment is completed.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Hosts the four layers the `chore-tracker` binary wires together

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
