// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the sync engine.

pub mod activity;

pub use activity::{ActivityDetail, ActivityMap, ActivityRecord, ActivitySummary, Gear};
