// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod api;
pub mod extract;
pub mod middleware;
pub mod problem;

pub use api::{router, ApiSettings, AppState};
pub use problem::{ApiError, Problem};
