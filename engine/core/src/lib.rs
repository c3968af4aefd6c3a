// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Kolekta Collection Lifecycle Engine
//!
//! Coordinates the three-party recycling marketplace workflow: a seller
//! accumulates materials into a collection, a field agent validates the
//! physical quantities, and the validated collection is converted into a
//! delivery (agent compensation) and a sale (seller payout).
//!
//! # Architecture
//!
//! - `domain`: aggregates, the state machine, events and ports
//! - `application`: one service per lifecycle component
//! - `infrastructure`: in-memory repositories, event bus, retry
//! - `presentation`: HTTP adapter (axum)

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
