// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Per-role dashboard summaries, composed from the entity services.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::application::payment_service::PaymentService;
use crate::application::route_service::{RouteService, RouteWithOccupancy};
use crate::application::student_service::StudentService;
use crate::application::user_service::{UserService, UserStats};
use crate::domain::error::DomainError;
use crate::domain::payment::{Payment, PaymentStats, PaymentStatus};
use crate::domain::route::{Route, RouteStats};
use crate::domain::student::{Student, StudentStats};
use crate::domain::user::UserId;

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub users: UserStats,
    pub routes: RouteStats,
    pub students: StudentStats,
    pub payments: PaymentStats,
    pub route_occupancy: Vec<RouteWithOccupancy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentDashboard {
    pub students: Vec<Student>,
    pub pending_payments: u64,
    pub overdue_payments: u64,
    pub amount_due: Decimal,
    pub recent_payments: Vec<Payment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverDashboard {
    pub routes: Vec<RouteWithOccupancy>,
    pub upcoming: Vec<Route>,
}

pub struct DashboardService {
    users: Arc<UserService>,
    routes: Arc<RouteService>,
    students: Arc<StudentService>,
    payments: Arc<PaymentService>,
}

impl DashboardService {
    pub fn new(
        users: Arc<UserService>,
        routes: Arc<RouteService>,
        students: Arc<StudentService>,
        payments: Arc<PaymentService>,
    ) -> Self {
        Self {
            users,
            routes,
            students,
            payments,
        }
    }

    pub async fn admin_summary(&self) -> Result<AdminDashboard, DomainError> {
        let today = Utc::now().date_naive();
        let mut route_occupancy = Vec::new();
        for route in self.routes.list_active().await? {
            route_occupancy.push(self.routes.occupancy(route.id).await?);
        }
        Ok(AdminDashboard {
            users: self.users.stats().await?,
            routes: self.routes.stats().await?,
            students: self.students.stats().await?,
            payments: self.payments.stats(today).await?,
            route_occupancy,
        })
    }

    pub async fn parent_summary(&self, parent_id: UserId) -> Result<ParentDashboard, DomainError> {
        let students = self.students.list_by_parent(parent_id).await?;
        let pending = self
            .payments
            .list_by_parent_and_status(parent_id, PaymentStatus::Pending)
            .await?;
        let overdue = self
            .payments
            .list_by_parent_and_status(parent_id, PaymentStatus::Overdue)
            .await?;
        let amount_due: Decimal = pending
            .iter()
            .chain(overdue.iter())
            .map(|p| p.amount)
            .sum();
        Ok(ParentDashboard {
            students,
            pending_payments: pending.len() as u64,
            overdue_payments: overdue.len() as u64,
            amount_due,
            recent_payments: self.payments.recent_by_parent(parent_id, 5).await?,
        })
    }

    pub async fn driver_summary(&self, driver_id: UserId) -> Result<DriverDashboard, DomainError> {
        let mut routes = Vec::new();
        for route in self.routes.list_by_driver(driver_id).await? {
            routes.push(self.routes.occupancy(route.id).await?);
        }
        let now = Utc::now().time();
        let upcoming = self.routes.upcoming_for_driver(driver_id, now, 3).await?;
        Ok(DriverDashboard { routes, upcoming })
    }
}
