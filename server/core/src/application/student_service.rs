// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Student management. Route assignment always travels through the
//! capacity-guarded gateway writes, so a full route can never be
//! over-assigned even under concurrent requests; a failed assignment leaves
//! no partial state behind.

use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::domain::repository::{RouteRepository, StudentRepository, UserRepository};
use crate::domain::route::{Route, RouteId};
use crate::domain::student::{NewStudent, Student, StudentId, StudentStats, StudentUpdate};
use crate::domain::user::{Role, UserId};

pub struct StudentService {
    students: Arc<dyn StudentRepository>,
    routes: Arc<dyn RouteRepository>,
    users: Arc<dyn UserRepository>,
}

impl StudentService {
    pub fn new(
        students: Arc<dyn StudentRepository>,
        routes: Arc<dyn RouteRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            students,
            routes,
            users,
        }
    }

    async fn check_parent_reference(&self, parent_id: UserId) -> Result<(), DomainError> {
        let parent = self
            .users
            .find_by_id(parent_id)
            .await?
            .ok_or_else(|| DomainError::InvalidReference("parent does not exist".into()))?;
        if parent.role != Role::Parent {
            return Err(DomainError::InvalidReference(format!(
                "user '{}' is not a parent account",
                parent.username
            )));
        }
        Ok(())
    }

    /// The route must exist and be active before any assignment attempt.
    async fn assignable_route(&self, route_id: RouteId) -> Result<Route, DomainError> {
        let route = self
            .routes
            .find_by_id(route_id)
            .await?
            .ok_or_else(|| DomainError::InvalidReference("route does not exist".into()))?;
        if !route.active {
            return Err(DomainError::InvalidState(format!(
                "route '{}' is inactive and cannot take assignments",
                route.code
            )));
        }
        Ok(route)
    }

    /// Registers a student. When a route is requested the insert itself is
    /// capacity-guarded, so nothing is written if the route is full.
    pub async fn create_student(&self, candidate: NewStudent) -> Result<Student, DomainError> {
        candidate.validate()?;
        if self
            .students
            .exists_by_document(candidate.document.trim())
            .await?
        {
            return Err(DomainError::DuplicateKey(format!(
                "document '{}' is already registered",
                candidate.document.trim()
            )));
        }
        self.check_parent_reference(candidate.parent_id).await?;

        let mut student = Student::new(&candidate);
        match candidate.route_id {
            Some(route_id) => {
                let route = self.assignable_route(route_id).await?;
                student.route_id = Some(route_id);
                let admitted = self
                    .students
                    .insert_assigned(&student, route.max_capacity)
                    .await?;
                if !admitted {
                    return Err(DomainError::CapacityExceeded(format!(
                        "route '{}' is at its maximum capacity of {}",
                        route.code, route.max_capacity
                    )));
                }
                self.get_student(student.id).await
            }
            None => Ok(self.students.save(&student).await?),
        }
    }

    pub async fn get_student(&self, id: StudentId) -> Result<Student, DomainError> {
        self.students
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("student"))
    }

    pub async fn get_by_document(&self, document: &str) -> Result<Student, DomainError> {
        self.students
            .find_by_document(document)
            .await?
            .ok_or_else(|| DomainError::not_found("student"))
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, DomainError> {
        Ok(self.students.list_all().await?)
    }

    pub async fn list_active(&self) -> Result<Vec<Student>, DomainError> {
        Ok(self.students.list_by_active(true).await?)
    }

    pub async fn list_by_parent(&self, parent_id: UserId) -> Result<Vec<Student>, DomainError> {
        Ok(self.students.list_by_parent(parent_id).await?)
    }

    pub async fn list_by_route(&self, route_id: RouteId) -> Result<Vec<Student>, DomainError> {
        Ok(self.students.list_by_route(route_id).await?)
    }

    pub async fn list_active_by_route(
        &self,
        route_id: RouteId,
    ) -> Result<Vec<Student>, DomainError> {
        Ok(self.students.list_by_route_and_active(route_id, true).await?)
    }

    pub async fn search_by_name(&self, term: &str) -> Result<Vec<Student>, DomainError> {
        Ok(self.students.search_by_name(term).await?)
    }

    /// Puts the student on a route through the capacity-guarded update.
    pub async fn assign_to_route(
        &self,
        id: StudentId,
        route_id: RouteId,
    ) -> Result<Student, DomainError> {
        self.get_student(id).await?;
        let route = self.assignable_route(route_id).await?;
        let admitted = self
            .students
            .assign_route(id, route_id, route.max_capacity)
            .await?;
        if !admitted {
            return Err(DomainError::CapacityExceeded(format!(
                "route '{}' is at its maximum capacity of {}",
                route.code, route.max_capacity
            )));
        }
        self.get_student(id).await
    }

    pub async fn unassign_from_route(&self, id: StudentId) -> Result<Student, DomainError> {
        let mut student = self.get_student(id).await?;
        student.route_id = None;
        Ok(self.students.save(&student).await?)
    }

    /// Applies a partial update. The capacity guard runs only when the
    /// requested route differs from the current one.
    pub async fn update_student(
        &self,
        id: StudentId,
        update: StudentUpdate,
    ) -> Result<Student, DomainError> {
        let current = self.get_student(id).await?;

        if let Some(document) = &update.document {
            let document = document.trim();
            if document != current.document && self.students.exists_by_document(document).await? {
                return Err(DomainError::DuplicateKey(format!(
                    "document '{document}' is already registered"
                )));
            }
        }
        if let Some(parent_id) = update.parent_id {
            if parent_id != current.parent_id {
                self.check_parent_reference(parent_id).await?;
            }
        }
        if let Some(route_id) = update.route_id {
            if current.route_id != Some(route_id) {
                self.assign_to_route(id, route_id).await?;
            }
        }

        let mut student = self.get_student(id).await?;
        student.apply_update(&update);
        Ok(self.students.save(&student).await?)
    }

    pub async fn toggle_active(&self, id: StudentId) -> Result<Student, DomainError> {
        let mut student = self.get_student(id).await?;
        student.toggle_active();
        Ok(self.students.save(&student).await?)
    }

    pub async fn deactivate(&self, id: StudentId) -> Result<Student, DomainError> {
        let mut student = self.get_student(id).await?;
        student.deactivate();
        Ok(self.students.save(&student).await?)
    }

    pub async fn delete_student(&self, id: StudentId) -> Result<(), DomainError> {
        self.get_student(id).await?;
        self.students.delete(id).await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<StudentStats, DomainError> {
        Ok(StudentStats {
            total: self.students.count_all().await?,
            active: self.students.count_by_active(true).await?,
            inactive: self.students.count_by_active(false).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::{NewRoute, Shift};
    use crate::domain::user::{NewUser, User};
    use crate::infrastructure::repositories::{
        InMemoryRouteRepository, InMemoryStudentRepository, InMemoryUserRepository,
    };

    struct Fixture {
        svc: StudentService,
        routes: Arc<InMemoryRouteRepository>,
        users: Arc<InMemoryUserRepository>,
    }

    fn fixture() -> Fixture {
        let students = Arc::new(InMemoryStudentRepository::new());
        let routes = Arc::new(InMemoryRouteRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        Fixture {
            svc: StudentService::new(students, routes.clone(), users.clone()),
            routes,
            users,
        }
    }

    async fn seed_parent(users: &InMemoryUserRepository, username: &str) -> User {
        use crate::domain::repository::UserRepository as _;
        let user = User::new(
            &NewUser {
                username: username.to_string(),
                password: "pw".into(),
                role: Role::Parent,
                full_name: "Parent".into(),
                email: format!("{username}@example.com"),
                phone: None,
                national_id: None,
                address: None,
                city: None,
                birth_date: None,
                license_number: None,
                license_expiry: None,
                license_class: None,
                vehicle_plate: None,
                emergency_contact_name: None,
                emergency_contact_phone: None,
            },
            "hash".into(),
        );
        users.save(&user).await.unwrap()
    }

    async fn seed_route(routes: &InMemoryRouteRepository, code: &str, capacity: i32) -> Route {
        use crate::domain::repository::RouteRepository as _;
        let route = Route::new(&NewRoute {
            code: code.to_string(),
            name: format!("Route {code}"),
            description: None,
            start_time: None,
            end_time: None,
            shift: Shift::Morning,
            max_capacity: capacity,
            driver_id: None,
        });
        routes.save(&route).await.unwrap()
    }

    fn candidate(document: &str, parent_id: UserId, route_id: Option<RouteId>) -> NewStudent {
        NewStudent {
            first_name: "Leo".into(),
            last_name: "Diaz".into(),
            document: document.into(),
            birth_date: None,
            address: None,
            phone: None,
            grade: None,
            institution: None,
            parent_id,
            route_id,
        }
    }

    #[tokio::test]
    async fn duplicate_document_is_rejected() {
        let f = fixture();
        let parent = seed_parent(&f.users, "ana").await;
        f.svc
            .create_student(candidate("D-1", parent.id, None))
            .await
            .unwrap();
        let err = f
            .svc
            .create_student(candidate("D-1", parent.id, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn parent_must_exist_and_be_a_parent_account() {
        let f = fixture();
        let err = f
            .svc
            .create_student(candidate("D-1", UserId::new(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn route_fills_up_to_capacity_and_no_further() {
        let f = fixture();
        let parent = seed_parent(&f.users, "ana").await;
        let route = seed_route(&f.routes, "R-01", 2).await;

        f.svc
            .create_student(candidate("D-1", parent.id, Some(route.id)))
            .await
            .unwrap();
        f.svc
            .create_student(candidate("D-2", parent.id, Some(route.id)))
            .await
            .unwrap();
        let err = f
            .svc
            .create_student(candidate("D-3", parent.id, Some(route.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded(_)));

        // The rejected student was not written at all.
        assert_eq!(f.svc.list_students().await.unwrap().len(), 2);
        assert!(f.svc.search_by_name("Leo").await.unwrap().len() <= 2);
    }

    #[tokio::test]
    async fn inactive_route_rejects_assignment() {
        let f = fixture();
        let parent = seed_parent(&f.users, "ana").await;
        let mut route = seed_route(&f.routes, "R-01", 5).await;

        use crate::domain::repository::RouteRepository as _;
        route.deactivate();
        f.routes.save(&route).await.unwrap();

        let err = f
            .svc
            .create_student(candidate("D-1", parent.id, Some(route.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert!(f.svc.list_students().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reassignment_respects_the_target_capacity() {
        let f = fixture();
        let parent = seed_parent(&f.users, "ana").await;
        let full = seed_route(&f.routes, "R-01", 1).await;
        let open = seed_route(&f.routes, "R-02", 1).await;

        f.svc
            .create_student(candidate("D-1", parent.id, Some(full.id)))
            .await
            .unwrap();
        let moving = f
            .svc
            .create_student(candidate("D-2", parent.id, Some(open.id)))
            .await
            .unwrap();

        let err = f.svc.assign_to_route(moving.id, full.id).await.unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded(_)));
        // Still on the original route.
        let unchanged = f.svc.get_student(moving.id).await.unwrap();
        assert_eq!(unchanged.route_id, Some(open.id));
    }

    #[tokio::test]
    async fn update_rechecks_capacity_only_when_the_route_changes() {
        let f = fixture();
        let parent = seed_parent(&f.users, "ana").await;
        let route = seed_route(&f.routes, "R-01", 1).await;
        let student = f
            .svc
            .create_student(candidate("D-1", parent.id, Some(route.id)))
            .await
            .unwrap();

        // Same route in the update: the full route does not matter.
        let updated = f
            .svc
            .update_student(
                student.id,
                StudentUpdate {
                    route_id: Some(route.id),
                    grade: Some("5th".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.grade.as_deref(), Some("5th"));
        assert_eq!(updated.route_id, Some(route.id));
    }

    #[tokio::test]
    async fn unassign_clears_the_route_and_frees_a_seat() {
        let f = fixture();
        let parent = seed_parent(&f.users, "ana").await;
        let route = seed_route(&f.routes, "R-01", 1).await;
        let student = f
            .svc
            .create_student(candidate("D-1", parent.id, Some(route.id)))
            .await
            .unwrap();

        let cleared = f.svc.unassign_from_route(student.id).await.unwrap();
        assert_eq!(cleared.route_id, None);

        // The freed seat can be taken again.
        f.svc
            .create_student(candidate("D-2", parent.id, Some(route.id)))
            .await
            .unwrap();
    }
}
