// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Account management: creation with uniqueness checks, credential
//! validation, parent self-registration, and the self-protection rules that
//! keep an administrator from locking themselves out.

use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::domain::repository::{RouteRepository, StudentRepository, UserRepository};
use crate::domain::user::{NewUser, Principal, Role, User, UserId, UserUpdate};
use crate::infrastructure::password::PasswordHasher;

/// Active/inactive tallies per role for the admin dashboard.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserStats {
    pub total_admins: u64,
    pub total_parents: u64,
    pub total_drivers: u64,
    pub active_parents: u64,
    pub active_drivers: u64,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    students: Arc<dyn StudentRepository>,
    routes: Arc<dyn RouteRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        students: Arc<dyn StudentRepository>,
        routes: Arc<dyn RouteRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            students,
            routes,
            hasher,
        }
    }

    /// Creates an account of any role. Username and email must be unused;
    /// both checks run before anything is written.
    pub async fn create_user(&self, candidate: NewUser) -> Result<User, DomainError> {
        candidate.validate()?;
        if self.users.exists_by_username(candidate.username.trim()).await? {
            return Err(DomainError::DuplicateKey(format!(
                "username '{}' is already taken",
                candidate.username.trim()
            )));
        }
        if self.users.exists_by_email(candidate.email.trim()).await? {
            return Err(DomainError::DuplicateKey(format!(
                "email '{}' is already registered",
                candidate.email.trim()
            )));
        }
        let hash = self.hasher.hash(&candidate.password)?;
        let user = User::new(&candidate, hash);
        Ok(self.users.save(&user).await?)
    }

    /// Public self-registration. The role is forced to `PARENT` regardless
    /// of what the candidate carries.
    pub async fn register_parent(&self, mut candidate: NewUser) -> Result<User, DomainError> {
        candidate.role = Role::Parent;
        self.create_user(candidate).await
    }

    /// Checks a username/password pair. Inactive accounts and unknown
    /// usernames fail the same way as a wrong password.
    pub async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, DomainError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .filter(|u| u.active)
            .filter(|u| self.hasher.verify(password, &u.password_hash))
            .ok_or_else(|| DomainError::Forbidden("invalid credentials".into()))?;
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, DomainError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user"))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        Ok(self.users.list_all().await?)
    }

    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>, DomainError> {
        Ok(self.users.list_by_role(role).await?)
    }

    pub async fn list_active_by_role(&self, role: Role) -> Result<Vec<User>, DomainError> {
        Ok(self.users.list_by_role_and_active(role, true).await?)
    }

    pub async fn search_by_name(&self, term: &str) -> Result<Vec<User>, DomainError> {
        Ok(self.users.search_by_name(term).await?)
    }

    /// Applies a partial update. Username and email uniqueness are
    /// re-checked only when the value actually changes; a password in the
    /// update is re-hashed.
    pub async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, DomainError> {
        let mut user = self.get_user(id).await?;

        if let Some(username) = &update.username {
            let username = username.trim();
            if username != user.username && self.users.exists_by_username(username).await? {
                return Err(DomainError::DuplicateKey(format!(
                    "username '{username}' is already taken"
                )));
            }
        }
        if let Some(email) = &update.email {
            let email = email.trim();
            if email != user.email && self.users.exists_by_email(email).await? {
                return Err(DomainError::DuplicateKey(format!(
                    "email '{email}' is already registered"
                )));
            }
        }

        user.apply_update(&update);
        if let Some(password) = &update.password {
            if password.is_empty() {
                return Err(DomainError::InvalidInput("password cannot be empty".into()));
            }
            user.password_hash = self.hasher.hash(password)?;
        }
        Ok(self.users.save(&user).await?)
    }

    /// Profile password change: requires the current password to match.
    pub async fn change_password(
        &self,
        id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), DomainError> {
        let mut user = self.get_user(id).await?;
        if !self.hasher.verify(current, &user.password_hash) {
            return Err(DomainError::Forbidden(
                "current password is incorrect".into(),
            ));
        }
        if new.is_empty() {
            return Err(DomainError::InvalidInput("password cannot be empty".into()));
        }
        user.password_hash = self.hasher.hash(new)?;
        self.users.save(&user).await?;
        Ok(())
    }

    /// Flips the active flag. Callers cannot toggle their own account.
    pub async fn toggle_active(&self, actor: Principal, id: UserId) -> Result<User, DomainError> {
        if actor.id == id {
            return Err(DomainError::Forbidden(
                "you cannot change the status of your own account".into(),
            ));
        }
        let mut user = self.get_user(id).await?;
        user.toggle_active();
        Ok(self.users.save(&user).await?)
    }

    /// Hard delete. Refused for the caller's own account, and for any
    /// account still referenced by students (as parent) or routes (as
    /// driver).
    pub async fn delete_user(&self, actor: Principal, id: UserId) -> Result<(), DomainError> {
        if actor.id == id {
            return Err(DomainError::Forbidden(
                "you cannot delete your own account".into(),
            ));
        }
        let user = self.get_user(id).await?;

        let student_count = self.students.count_by_parent(id).await?;
        if student_count > 0 {
            return Err(DomainError::InvalidState(format!(
                "user '{}' still has {student_count} student(s) registered",
                user.username
            )));
        }
        let assigned_routes = self.routes.list_by_driver(id).await?;
        if !assigned_routes.is_empty() {
            return Err(DomainError::InvalidState(format!(
                "user '{}' is still assigned as driver on {} route(s)",
                user.username,
                assigned_routes.len()
            )));
        }

        self.users.delete(id).await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<UserStats, DomainError> {
        Ok(UserStats {
            total_admins: self.users.count_by_role(Role::Admin).await?,
            total_parents: self.users.count_by_role(Role::Parent).await?,
            total_drivers: self.users.count_by_role(Role::Driver).await?,
            active_parents: self.users.count_by_role_and_active(Role::Parent, true).await?,
            active_drivers: self.users.count_by_role_and_active(Role::Driver, true).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::{NewRoute, Route, Shift};
    use crate::domain::student::{NewStudent, Student};
    use crate::infrastructure::password::Argon2PasswordHasher;
    use crate::infrastructure::repositories::{
        InMemoryRouteRepository, InMemoryStudentRepository, InMemoryUserRepository,
    };

    fn service() -> (
        UserService,
        Arc<InMemoryStudentRepository>,
        Arc<InMemoryRouteRepository>,
    ) {
        let students = Arc::new(InMemoryStudentRepository::new());
        let routes = Arc::new(InMemoryRouteRepository::new());
        let svc = UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            students.clone(),
            routes.clone(),
            Arc::new(Argon2PasswordHasher::new()),
        );
        (svc, students, routes)
    }

    fn candidate(username: &str, email: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: "hunter2!".to_string(),
            role,
            full_name: "Test User".to_string(),
            email: email.to_string(),
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
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_without_writing() {
        let (svc, _, _) = service();
        svc.create_user(candidate("ana", "ana@example.com", Role::Parent))
            .await
            .unwrap();

        let err = svc
            .create_user(candidate("ana", "other@example.com", Role::Parent))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateKey(_)));
        assert_eq!(svc.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (svc, _, _) = service();
        svc.create_user(candidate("ana", "ana@example.com", Role::Parent))
            .await
            .unwrap();
        let err = svc
            .create_user(candidate("bea", "ana@example.com", Role::Parent))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn register_parent_forces_the_role() {
        let (svc, _, _) = service();
        let user = svc
            .register_parent(candidate("carl", "carl@example.com", Role::Admin))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Parent);
    }

    #[tokio::test]
    async fn credentials_validate_only_for_active_accounts() {
        let (svc, _, _) = service();
        let user = svc
            .create_user(candidate("ana", "ana@example.com", Role::Parent))
            .await
            .unwrap();

        assert!(svc.validate_credentials("ana", "hunter2!").await.is_ok());
        assert!(svc.validate_credentials("ana", "wrong").await.is_err());

        let admin = svc
            .create_user(candidate("root", "root@example.com", Role::Admin))
            .await
            .unwrap();
        let actor = Principal::new(admin.id, Role::Admin);
        svc.toggle_active(actor, user.id).await.unwrap();
        assert!(svc.validate_credentials("ana", "hunter2!").await.is_err());
    }

    #[tokio::test]
    async fn cannot_toggle_or_delete_own_account() {
        let (svc, _, _) = service();
        let admin = svc
            .create_user(candidate("root", "root@example.com", Role::Admin))
            .await
            .unwrap();
        let actor = Principal::new(admin.id, Role::Admin);

        let err = svc.toggle_active(actor, admin.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        let err = svc.delete_user(actor, admin.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn delete_is_blocked_while_students_reference_the_parent() {
        let (svc, students, _) = service();
        let admin = svc
            .create_user(candidate("root", "root@example.com", Role::Admin))
            .await
            .unwrap();
        let parent = svc
            .create_user(candidate("ana", "ana@example.com", Role::Parent))
            .await
            .unwrap();

        use crate::domain::repository::StudentRepository as _;
        let student = Student::new(&NewStudent {
            first_name: "Leo".into(),
            last_name: "Diaz".into(),
            document: "D-100".into(),
            birth_date: None,
            address: None,
            phone: None,
            grade: None,
            institution: None,
            parent_id: parent.id,
            route_id: None,
        });
        students.save(&student).await.unwrap();

        let actor = Principal::new(admin.id, Role::Admin);
        let err = svc.delete_user(actor, parent.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert!(svc.get_user(parent.id).await.is_ok());
    }

    #[tokio::test]
    async fn delete_is_blocked_while_routes_reference_the_driver() {
        let (svc, _, routes) = service();
        let admin = svc
            .create_user(candidate("root", "root@example.com", Role::Admin))
            .await
            .unwrap();
        let driver = svc
            .create_user(candidate("dave", "dave@example.com", Role::Driver))
            .await
            .unwrap();

        use crate::domain::repository::RouteRepository as _;
        let route = Route::new(&NewRoute {
            code: "R-01".into(),
            name: "North".into(),
            description: None,
            start_time: None,
            end_time: None,
            shift: Shift::Morning,
            max_capacity: 30,
            driver_id: Some(driver.id),
        });
        routes.save(&route).await.unwrap();

        let actor = Principal::new(admin.id, Role::Admin);
        let err = svc.delete_user(actor, driver.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[tokio::test]
    async fn change_password_requires_the_current_one() {
        let (svc, _, _) = service();
        let user = svc
            .create_user(candidate("ana", "ana@example.com", Role::Parent))
            .await
            .unwrap();

        let err = svc
            .change_password(user.id, "wrong", "newpass!")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        svc.change_password(user.id, "hunter2!", "newpass!")
            .await
            .unwrap();
        assert!(svc.validate_credentials("ana", "newpass!").await.is_ok());
        assert!(svc.validate_credentials("ana", "hunter2!").await.is_err());
    }

    #[tokio::test]
    async fn update_rechecks_uniqueness_only_on_change() {
        let (svc, _, _) = service();
        let ana = svc
            .create_user(candidate("ana", "ana@example.com", Role::Parent))
            .await
            .unwrap();
        svc.create_user(candidate("bea", "bea@example.com", Role::Parent))
            .await
            .unwrap();

        // Re-submitting the same username is fine.
        let updated = svc
            .update_user(
                ana.id,
                UserUpdate {
                    username: Some("ana".into()),
                    full_name: Some("Ana Maria".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Ana Maria");

        let err = svc
            .update_user(
                ana.id,
                UserUpdate {
                    username: Some("bea".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateKey(_)));
    }
}
