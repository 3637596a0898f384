// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod error;
pub mod payment;
pub mod report;
pub mod repository;
pub mod route;
pub mod student;
pub mod user;
