// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root, following the DDD
//! Repository pattern: one repository per aggregate, interface defined in
//! the domain layer, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `UserRepository` | `User` | `InMemoryUserRepository`, `PostgresUserRepository` |
//! | `RouteRepository` | `Route` | `InMemoryRouteRepository`, `PostgresRouteRepository` |
//! | `StudentRepository` | `Student` | `InMemoryStudentRepository`, `PostgresStudentRepository` |
//! | `PaymentRepository` | `Payment` | `InMemoryPaymentRepository`, `PostgresPaymentRepository` |
//!
//! Every `save` is an insert-or-update keyed on the aggregate id and runs
//! the pre-save timestamp hook (sets `updated_at`, and `created_at` on first
//! insert) before the write; callers never stamp timestamps themselves.
//!
//! `StudentRepository` additionally carries the two capacity-guarded writes:
//! the check against the route's active-student count and the write are one
//! atomic step inside the gateway, so two concurrent assignments near
//! capacity cannot both be admitted.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::route::{Route, RouteId, Shift};
use crate::domain::student::{Student, StudentId};
use crate::domain::user::{Role, User, UserId};

/// Gateway-level failure. Anything surfacing here is unexpected; services
/// pass it through untouched and the presentation layer logs it.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Save user (create or update). Returns the stamped row as persisted.
    async fn save(&self, user: &User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError>;

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError>;

    async fn list_by_role_and_active(
        &self,
        role: Role,
        active: bool,
    ) -> Result<Vec<User>, RepositoryError>;

    /// Case-insensitive partial match on the full name.
    async fn search_by_name(&self, term: &str) -> Result<Vec<User>, RepositoryError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError>;

    async fn count_by_role(&self, role: Role) -> Result<u64, RepositoryError>;

    async fn count_by_role_and_active(
        &self,
        role: Role,
        active: bool,
    ) -> Result<u64, RepositoryError>;

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn save(&self, route: &Route) -> Result<Route, RepositoryError>;

    async fn find_by_id(&self, id: RouteId) -> Result<Option<Route>, RepositoryError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Route>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Route>, RepositoryError>;

    /// Case-insensitive partial match on the code.
    async fn search_by_code(&self, term: &str) -> Result<Vec<Route>, RepositoryError>;

    /// Case-insensitive partial match on the name.
    async fn search_by_name(&self, term: &str) -> Result<Vec<Route>, RepositoryError>;

    async fn list_by_shift(&self, shift: Shift) -> Result<Vec<Route>, RepositoryError>;

    async fn list_by_active(&self, active: bool) -> Result<Vec<Route>, RepositoryError>;

    async fn list_by_driver(&self, driver_id: UserId) -> Result<Vec<Route>, RepositoryError>;

    async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError>;

    async fn count_all(&self) -> Result<u64, RepositoryError>;

    async fn count_by_active(&self, active: bool) -> Result<u64, RepositoryError>;

    async fn count_by_shift(&self, shift: Shift) -> Result<u64, RepositoryError>;

    async fn delete(&self, id: RouteId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn save(&self, student: &Student) -> Result<Student, RepositoryError>;

    /// Insert a student already bound to `student.route_id`, admitting the
    /// row only while the route's active-student count stays below
    /// `max_capacity`. Returns `false` (and writes nothing) when the route
    /// is full. Check and insert are a single atomic step.
    async fn insert_assigned(
        &self,
        student: &Student,
        max_capacity: i32,
    ) -> Result<bool, RepositoryError>;

    /// Move an existing student onto `route_id` under the same capacity
    /// guard as [`insert_assigned`](Self::insert_assigned).
    async fn assign_route(
        &self,
        id: StudentId,
        route_id: RouteId,
        max_capacity: i32,
    ) -> Result<bool, RepositoryError>;

    async fn find_by_id(&self, id: StudentId) -> Result<Option<Student>, RepositoryError>;

    async fn find_by_document(&self, document: &str) -> Result<Option<Student>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Student>, RepositoryError>;

    async fn list_by_active(&self, active: bool) -> Result<Vec<Student>, RepositoryError>;

    async fn list_by_parent(&self, parent_id: UserId) -> Result<Vec<Student>, RepositoryError>;

    async fn list_by_parent_and_active(
        &self,
        parent_id: UserId,
        active: bool,
    ) -> Result<Vec<Student>, RepositoryError>;

    async fn list_by_route(&self, route_id: RouteId) -> Result<Vec<Student>, RepositoryError>;

    async fn list_by_route_and_active(
        &self,
        route_id: RouteId,
        active: bool,
    ) -> Result<Vec<Student>, RepositoryError>;

    /// Case-insensitive partial match on first or last name.
    async fn search_by_name(&self, term: &str) -> Result<Vec<Student>, RepositoryError>;

    async fn exists_by_document(&self, document: &str) -> Result<bool, RepositoryError>;

    async fn count_by_active(&self, active: bool) -> Result<u64, RepositoryError>;

    async fn count_by_parent(&self, parent_id: UserId) -> Result<u64, RepositoryError>;

    /// The capacity-relevant count: active students assigned to the route.
    async fn count_active_by_route(&self, route_id: RouteId) -> Result<u64, RepositoryError>;

    async fn count_all(&self) -> Result<u64, RepositoryError>;

    async fn delete(&self, id: StudentId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn save(&self, payment: &Payment) -> Result<Payment, RepositoryError>;

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Payment>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Payment>, RepositoryError>;

    async fn list_by_student(&self, student_id: StudentId)
        -> Result<Vec<Payment>, RepositoryError>;

    async fn list_by_parent(&self, parent_id: UserId) -> Result<Vec<Payment>, RepositoryError>;

    async fn list_by_status(&self, status: PaymentStatus)
        -> Result<Vec<Payment>, RepositoryError>;

    async fn list_by_parent_and_status(
        &self,
        parent_id: UserId,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>, RepositoryError>;

    /// Rows in `status` whose due date is strictly before `date`.
    async fn list_by_status_due_before(
        &self,
        status: PaymentStatus,
        date: NaiveDate,
    ) -> Result<Vec<Payment>, RepositoryError>;

    async fn list_by_payment_date_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Payment>, RepositoryError>;

    async fn list_by_status_and_payment_date_between(
        &self,
        status: PaymentStatus,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Payment>, RepositoryError>;

    /// Case-insensitive partial match on the code.
    async fn search_by_code(&self, term: &str) -> Result<Vec<Payment>, RepositoryError>;

    async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError>;

    async fn count_all(&self) -> Result<u64, RepositoryError>;

    async fn count_by_status(&self, status: PaymentStatus) -> Result<u64, RepositoryError>;

    async fn count_by_parent_and_status(
        &self,
        parent_id: UserId,
        status: PaymentStatus,
    ) -> Result<u64, RepositoryError>;

    async fn count_by_status_due_before(
        &self,
        status: PaymentStatus,
        date: NaiveDate,
    ) -> Result<u64, RepositoryError>;

    async fn delete(&self, id: PaymentId) -> Result<(), RepositoryError>;
}
