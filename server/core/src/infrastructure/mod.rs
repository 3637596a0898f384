// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod password;
pub mod report;
pub mod repositories;

pub use db::Database;
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use report::{CsvReportExporter, SampleReportDataSource};
