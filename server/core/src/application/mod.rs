// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod dashboard_service;
pub mod payment_service;
pub mod report_service;
pub mod route_service;
pub mod student_service;
pub mod user_service;

pub use dashboard_service::DashboardService;
pub use payment_service::PaymentService;
pub use report_service::ReportService;
pub use route_service::{RouteService, RouteWithOccupancy};
pub use student_service::StudentService;
pub use user_service::{UserService, UserStats};
