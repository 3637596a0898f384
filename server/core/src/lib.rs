// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SafeRide core: school-transport management.
//!
//! Layered DDD-style crate: `domain` holds the aggregates and repository
//! contracts, `application` the services, `infrastructure` the storage and
//! credential implementations, `presentation` the HTTP surface.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
