// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory repository implementations, used for local development and
//! tests. Each gateway holds its aggregate map behind one mutex; the
//! capacity-guarded student writes do their check and their write under a
//! single lock acquisition, which is what makes them atomic here.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::repository::{
    PaymentRepository, RepositoryError, RouteRepository, StudentRepository, UserRepository,
};
use crate::domain::route::{Route, RouteId, Shift};
use crate::domain::student::{Student, StudentId};
use crate::domain::user::{Role, User, UserId};

fn poisoned() -> RepositoryError {
    RepositoryError::Unknown("mutex poisoned".to_string())
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: &User) -> Result<User, RepositoryError> {
        let mut row = user.clone();
        row.updated_at = Utc::now();
        let mut users = self.users.lock().map_err(|_| poisoned())?;
        users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.values().cloned().collect())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.values().filter(|u| u.role == role).cloned().collect())
    }

    async fn list_by_role_and_active(
        &self,
        role: Role,
        active: bool,
    ) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users
            .values()
            .filter(|u| u.role == role && u.active == active)
            .cloned()
            .collect())
    }

    async fn search_by_name(&self, term: &str) -> Result<Vec<User>, RepositoryError> {
        let needle = term.to_lowercase();
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users
            .values()
            .filter(|u| u.full_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.values().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.values().any(|u| u.email == email))
    }

    async fn count_by_role(&self, role: Role) -> Result<u64, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.values().filter(|u| u.role == role).count() as u64)
    }

    async fn count_by_role_and_active(
        &self,
        role: Role,
        active: bool,
    ) -> Result<u64, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users
            .values()
            .filter(|u| u.role == role && u.active == active)
            .count() as u64)
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().map_err(|_| poisoned())?;
        users.remove(&id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRouteRepository {
    routes: Arc<Mutex<HashMap<RouteId, Route>>>,
}

impl InMemoryRouteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteRepository for InMemoryRouteRepository {
    async fn save(&self, route: &Route) -> Result<Route, RepositoryError> {
        let mut row = route.clone();
        row.updated_at = Utc::now();
        let mut routes = self.routes.lock().map_err(|_| poisoned())?;
        routes.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: RouteId) -> Result<Option<Route>, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Route>, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes.values().find(|r| r.code == code).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Route>, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes.values().cloned().collect())
    }

    async fn search_by_code(&self, term: &str) -> Result<Vec<Route>, RepositoryError> {
        let needle = term.to_lowercase();
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes
            .values()
            .filter(|r| r.code.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn search_by_name(&self, term: &str) -> Result<Vec<Route>, RepositoryError> {
        let needle = term.to_lowercase();
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes
            .values()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn list_by_shift(&self, shift: Shift) -> Result<Vec<Route>, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes
            .values()
            .filter(|r| r.shift == shift)
            .cloned()
            .collect())
    }

    async fn list_by_active(&self, active: bool) -> Result<Vec<Route>, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes
            .values()
            .filter(|r| r.active == active)
            .cloned()
            .collect())
    }

    async fn list_by_driver(&self, driver_id: UserId) -> Result<Vec<Route>, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes
            .values()
            .filter(|r| r.driver_id == Some(driver_id))
            .cloned()
            .collect())
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes.values().any(|r| r.code == code))
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes.len() as u64)
    }

    async fn count_by_active(&self, active: bool) -> Result<u64, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes.values().filter(|r| r.active == active).count() as u64)
    }

    async fn count_by_shift(&self, shift: Shift) -> Result<u64, RepositoryError> {
        let routes = self.routes.lock().map_err(|_| poisoned())?;
        Ok(routes.values().filter(|r| r.shift == shift).count() as u64)
    }

    async fn delete(&self, id: RouteId) -> Result<(), RepositoryError> {
        let mut routes = self.routes.lock().map_err(|_| poisoned())?;
        routes.remove(&id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStudentRepository {
    students: Arc<Mutex<HashMap<StudentId, Student>>>,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn active_on_route(students: &HashMap<StudentId, Student>, route_id: RouteId) -> u64 {
    students
        .values()
        .filter(|s| s.route_id == Some(route_id) && s.active)
        .count() as u64
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn save(&self, student: &Student) -> Result<Student, RepositoryError> {
        let mut row = student.clone();
        row.updated_at = Utc::now();
        let mut students = self.students.lock().map_err(|_| poisoned())?;
        students.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_assigned(
        &self,
        student: &Student,
        max_capacity: i32,
    ) -> Result<bool, RepositoryError> {
        let route_id = match student.route_id {
            Some(id) => id,
            None => {
                return Err(RepositoryError::Unknown(
                    "insert_assigned requires a route".to_string(),
                ))
            }
        };
        let mut students = self.students.lock().map_err(|_| poisoned())?;
        if active_on_route(&students, route_id) >= max_capacity.max(0) as u64 {
            return Ok(false);
        }
        let mut row = student.clone();
        row.updated_at = Utc::now();
        students.insert(row.id, row);
        Ok(true)
    }

    async fn assign_route(
        &self,
        id: StudentId,
        route_id: RouteId,
        max_capacity: i32,
    ) -> Result<bool, RepositoryError> {
        let mut students = self.students.lock().map_err(|_| poisoned())?;
        let occupied = students
            .values()
            .filter(|s| s.route_id == Some(route_id) && s.active && s.id != id)
            .count() as u64;
        if occupied >= max_capacity.max(0) as u64 {
            return Ok(false);
        }
        match students.get_mut(&id) {
            Some(student) => {
                student.route_id = Some(route_id);
                student.updated_at = Utc::now();
                Ok(true)
            }
            None => Err(RepositoryError::Unknown(format!("student {id} missing"))),
        }
    }

    async fn find_by_id(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students.get(&id).cloned())
    }

    async fn find_by_document(&self, document: &str) -> Result<Option<Student>, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students.values().find(|s| s.document == document).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Student>, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students.values().cloned().collect())
    }

    async fn list_by_active(&self, active: bool) -> Result<Vec<Student>, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students
            .values()
            .filter(|s| s.active == active)
            .cloned()
            .collect())
    }

    async fn list_by_parent(&self, parent_id: UserId) -> Result<Vec<Student>, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students
            .values()
            .filter(|s| s.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn list_by_parent_and_active(
        &self,
        parent_id: UserId,
        active: bool,
    ) -> Result<Vec<Student>, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students
            .values()
            .filter(|s| s.parent_id == parent_id && s.active == active)
            .cloned()
            .collect())
    }

    async fn list_by_route(&self, route_id: RouteId) -> Result<Vec<Student>, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students
            .values()
            .filter(|s| s.route_id == Some(route_id))
            .cloned()
            .collect())
    }

    async fn list_by_route_and_active(
        &self,
        route_id: RouteId,
        active: bool,
    ) -> Result<Vec<Student>, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students
            .values()
            .filter(|s| s.route_id == Some(route_id) && s.active == active)
            .cloned()
            .collect())
    }

    async fn search_by_name(&self, term: &str) -> Result<Vec<Student>, RepositoryError> {
        let needle = term.to_lowercase();
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students
            .values()
            .filter(|s| {
                s.first_name.to_lowercase().contains(&needle)
                    || s.last_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn exists_by_document(&self, document: &str) -> Result<bool, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students.values().any(|s| s.document == document))
    }

    async fn count_by_active(&self, active: bool) -> Result<u64, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students.values().filter(|s| s.active == active).count() as u64)
    }

    async fn count_by_parent(&self, parent_id: UserId) -> Result<u64, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students
            .values()
            .filter(|s| s.parent_id == parent_id)
            .count() as u64)
    }

    async fn count_active_by_route(&self, route_id: RouteId) -> Result<u64, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(active_on_route(&students, route_id))
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        let students = self.students.lock().map_err(|_| poisoned())?;
        Ok(students.len() as u64)
    }

    async fn delete(&self, id: StudentId) -> Result<(), RepositoryError> {
        let mut students = self.students.lock().map_err(|_| poisoned())?;
        students.remove(&id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPaymentRepository {
    payments: Arc<Mutex<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<Payment, RepositoryError> {
        let mut row = payment.clone();
        row.updated_at = Utc::now();
        let mut payments = self.payments.lock().map_err(|_| poisoned())?;
        payments.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments.values().find(|p| p.code == code).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments.values().cloned().collect())
    }

    async fn list_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| p.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_by_parent(&self, parent_id: UserId) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| p.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn list_by_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect())
    }

    async fn list_by_parent_and_status(
        &self,
        parent_id: UserId,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| p.parent_id == parent_id && p.status == status)
            .cloned()
            .collect())
    }

    async fn list_by_status_due_before(
        &self,
        status: PaymentStatus,
        date: NaiveDate,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| p.status == status && p.due_date.map(|d| d < date).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn list_by_payment_date_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| {
                p.payment_date
                    .map(|d| d >= from && d <= to)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn list_by_status_and_payment_date_between(
        &self,
        status: PaymentStatus,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| {
                p.status == status
                    && p.payment_date
                        .map(|d| d >= from && d <= to)
                        .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn search_by_code(&self, term: &str) -> Result<Vec<Payment>, RepositoryError> {
        let needle = term.to_lowercase();
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| p.code.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments.values().any(|p| p.code == code))
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments.len() as u64)
    }

    async fn count_by_status(&self, status: PaymentStatus) -> Result<u64, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments.values().filter(|p| p.status == status).count() as u64)
    }

    async fn count_by_parent_and_status(
        &self,
        parent_id: UserId,
        status: PaymentStatus,
    ) -> Result<u64, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| p.parent_id == parent_id && p.status == status)
            .count() as u64)
    }

    async fn count_by_status_due_before(
        &self,
        status: PaymentStatus,
        date: NaiveDate,
    ) -> Result<u64, RepositoryError> {
        let payments = self.payments.lock().map_err(|_| poisoned())?;
        Ok(payments
            .values()
            .filter(|p| p.status == status && p.due_date.map(|d| d < date).unwrap_or(false))
            .count() as u64)
    }

    async fn delete(&self, id: PaymentId) -> Result<(), RepositoryError> {
        let mut payments = self.payments.lock().map_err(|_| poisoned())?;
        payments.remove(&id);
        Ok(())
    }
}
