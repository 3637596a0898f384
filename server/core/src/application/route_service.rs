// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Route management: CRUD with code uniqueness, driver reference checks,
//! capacity-aware shrinking, and the occupancy views backing the route and
//! dashboard screens.

use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::domain::repository::{RouteRepository, StudentRepository, UserRepository};
use crate::domain::route::{
    NewRoute, Route, RouteId, RouteSearch, RouteStats, RouteUpdate, Shift,
};
use crate::domain::user::{Role, UserId};

/// A route together with its live occupancy numbers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RouteWithOccupancy {
    #[serde(flatten)]
    pub route: Route,
    pub assigned_students: u64,
    pub occupancy_percentage: f64,
    pub has_spare_capacity: bool,
}

pub struct RouteService {
    routes: Arc<dyn RouteRepository>,
    students: Arc<dyn StudentRepository>,
    users: Arc<dyn UserRepository>,
}

impl RouteService {
    pub fn new(
        routes: Arc<dyn RouteRepository>,
        students: Arc<dyn StudentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            routes,
            students,
            users,
        }
    }

    async fn check_driver_reference(&self, driver_id: UserId) -> Result<(), DomainError> {
        let driver = self
            .users
            .find_by_id(driver_id)
            .await?
            .ok_or_else(|| DomainError::InvalidReference("driver does not exist".into()))?;
        if driver.role != Role::Driver {
            return Err(DomainError::InvalidReference(format!(
                "user '{}' is not a driver",
                driver.username
            )));
        }
        if !driver.active {
            return Err(DomainError::InvalidReference(format!(
                "driver '{}' is inactive",
                driver.username
            )));
        }
        Ok(())
    }

    pub async fn create_route(&self, candidate: NewRoute) -> Result<Route, DomainError> {
        candidate.validate()?;
        if self.routes.exists_by_code(candidate.code.trim()).await? {
            return Err(DomainError::DuplicateKey(format!(
                "route code '{}' is already in use",
                candidate.code.trim()
            )));
        }
        if let Some(driver_id) = candidate.driver_id {
            self.check_driver_reference(driver_id).await?;
        }
        let route = Route::new(&candidate);
        Ok(self.routes.save(&route).await?)
    }

    pub async fn get_route(&self, id: RouteId) -> Result<Route, DomainError> {
        self.routes
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("route"))
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Route, DomainError> {
        self.routes
            .find_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("route"))
    }

    pub async fn list_routes(&self) -> Result<Vec<Route>, DomainError> {
        Ok(self.routes.list_all().await?)
    }

    pub async fn list_active(&self) -> Result<Vec<Route>, DomainError> {
        Ok(self.routes.list_by_active(true).await?)
    }

    pub async fn list_by_driver(&self, driver_id: UserId) -> Result<Vec<Route>, DomainError> {
        Ok(self.routes.list_by_driver(driver_id).await?)
    }

    /// The route screen's search box: the first non-empty filter wins, an
    /// empty set lists everything.
    pub async fn search(&self, params: &RouteSearch) -> Result<Vec<Route>, DomainError> {
        if let Some(code) = params.code.as_deref().filter(|c| !c.trim().is_empty()) {
            return Ok(self.routes.search_by_code(code.trim()).await?);
        }
        if let Some(name) = params.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Ok(self.routes.search_by_name(name.trim()).await?);
        }
        if let Some(shift) = params.shift {
            return Ok(self.routes.list_by_shift(shift).await?);
        }
        if let Some(active) = params.active {
            return Ok(self.routes.list_by_active(active).await?);
        }
        Ok(self.routes.list_all().await?)
    }

    /// Applies a partial update. The code is re-checked only when it
    /// changes; shrinking `max_capacity` below the current active
    /// assignment count is refused.
    pub async fn update_route(&self, id: RouteId, update: RouteUpdate) -> Result<Route, DomainError> {
        let mut route = self.get_route(id).await?;

        if let Some(code) = &update.code {
            let code = code.trim();
            if code != route.code && self.routes.exists_by_code(code).await? {
                return Err(DomainError::DuplicateKey(format!(
                    "route code '{code}' is already in use"
                )));
            }
        }
        if let Some(driver_id) = update.driver_id {
            self.check_driver_reference(driver_id).await?;
        }
        if let Some(new_capacity) = update.max_capacity {
            if new_capacity <= 0 {
                return Err(DomainError::InvalidInput(
                    "maximum capacity must be greater than zero".into(),
                ));
            }
            let assigned = self.students.count_active_by_route(id).await?;
            if (new_capacity as u64) < assigned {
                return Err(DomainError::CapacityExceeded(format!(
                    "route '{}' has {assigned} active students assigned; capacity cannot drop to {new_capacity}",
                    route.code
                )));
            }
        }

        route.apply_update(&update);
        Ok(self.routes.save(&route).await?)
    }

    pub async fn toggle_active(&self, id: RouteId) -> Result<Route, DomainError> {
        let mut route = self.get_route(id).await?;
        route.toggle_active();
        Ok(self.routes.save(&route).await?)
    }

    pub async fn deactivate(&self, id: RouteId) -> Result<Route, DomainError> {
        let mut route = self.get_route(id).await?;
        route.deactivate();
        Ok(self.routes.save(&route).await?)
    }

    /// Hard delete, refused while any student is still assigned to the
    /// route.
    pub async fn delete_route(&self, id: RouteId) -> Result<(), DomainError> {
        let route = self.get_route(id).await?;
        let assigned = self.students.list_by_route(id).await?;
        if !assigned.is_empty() {
            return Err(DomainError::InvalidState(format!(
                "route '{}' still has {} student(s) assigned",
                route.code,
                assigned.len()
            )));
        }
        self.routes.delete(id).await?;
        Ok(())
    }

    pub async fn occupancy(&self, id: RouteId) -> Result<RouteWithOccupancy, DomainError> {
        let route = self.get_route(id).await?;
        let assigned = self.students.count_active_by_route(id).await?;
        Ok(RouteWithOccupancy {
            occupancy_percentage: route.occupancy_percentage(assigned),
            has_spare_capacity: route.has_spare_capacity(assigned),
            assigned_students: assigned,
            route,
        })
    }

    /// Active routes that still have spare capacity, for the assignment
    /// picker.
    pub async fn list_with_capacity(&self) -> Result<Vec<RouteWithOccupancy>, DomainError> {
        let mut out = Vec::new();
        for route in self.routes.list_by_active(true).await? {
            let assigned = self.students.count_active_by_route(route.id).await?;
            if route.has_spare_capacity(assigned) {
                out.push(RouteWithOccupancy {
                    occupancy_percentage: route.occupancy_percentage(assigned),
                    has_spare_capacity: true,
                    assigned_students: assigned,
                    route,
                });
            }
        }
        Ok(out)
    }

    /// Active routes departing after `after`, soonest first. Routes without
    /// a start time are left out.
    pub async fn upcoming(
        &self,
        after: chrono::NaiveTime,
        limit: usize,
    ) -> Result<Vec<Route>, DomainError> {
        let mut routes: Vec<Route> = self
            .routes
            .list_by_active(true)
            .await?
            .into_iter()
            .filter(|r| r.start_time.is_some_and(|t| t >= after))
            .collect();
        routes.sort_by_key(|r| r.start_time);
        routes.truncate(limit);
        Ok(routes)
    }

    /// Same cut, restricted to one driver's routes. The limit applies after
    /// the driver filter, so a busy fleet cannot crowd a driver's own
    /// departures out of their dashboard.
    pub async fn upcoming_for_driver(
        &self,
        driver_id: UserId,
        after: chrono::NaiveTime,
        limit: usize,
    ) -> Result<Vec<Route>, DomainError> {
        let mut routes: Vec<Route> = self
            .routes
            .list_by_driver(driver_id)
            .await?
            .into_iter()
            .filter(|r| r.active)
            .filter(|r| r.start_time.is_some_and(|t| t >= after))
            .collect();
        routes.sort_by_key(|r| r.start_time);
        routes.truncate(limit);
        Ok(routes)
    }

    /// Occupancy for dashboard tiles; an unknown route reads as empty
    /// instead of failing the whole summary.
    pub async fn occupancy_percentage(&self, id: RouteId) -> Result<f64, DomainError> {
        match self.routes.find_by_id(id).await? {
            Some(route) => {
                let assigned = self.students.count_active_by_route(id).await?;
                Ok(route.occupancy_percentage(assigned))
            }
            None => Ok(0.0),
        }
    }

    pub async fn stats(&self) -> Result<RouteStats, DomainError> {
        Ok(RouteStats {
            total: self.routes.count_all().await?,
            active: self.routes.count_by_active(true).await?,
            inactive: self.routes.count_by_active(false).await?,
            morning: self.routes.count_by_shift(Shift::Morning).await?,
            afternoon: self.routes.count_by_shift(Shift::Afternoon).await?,
            night: self.routes.count_by_shift(Shift::Night).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::student::{NewStudent, Student};
    use crate::domain::user::{NewUser, User};
    use crate::infrastructure::repositories::{
        InMemoryRouteRepository, InMemoryStudentRepository, InMemoryUserRepository,
    };

    struct Fixture {
        svc: RouteService,
        users: Arc<InMemoryUserRepository>,
        students: Arc<InMemoryStudentRepository>,
    }

    fn fixture() -> Fixture {
        let routes = Arc::new(InMemoryRouteRepository::new());
        let students = Arc::new(InMemoryStudentRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        Fixture {
            svc: RouteService::new(routes, students.clone(), users.clone()),
            users,
            students,
        }
    }

    async fn seed_driver(users: &InMemoryUserRepository, username: &str) -> User {
        use crate::domain::repository::UserRepository as _;
        let user = User::new(
            &NewUser {
                username: username.to_string(),
                password: "pw".into(),
                role: Role::Driver,
                full_name: "Driver".into(),
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

    async fn seed_student(
        students: &InMemoryStudentRepository,
        document: &str,
        route_id: Option<RouteId>,
    ) -> Student {
        use crate::domain::repository::StudentRepository as _;
        let mut student = Student::new(&NewStudent {
            first_name: "Leo".into(),
            last_name: "Diaz".into(),
            document: document.into(),
            birth_date: None,
            address: None,
            phone: None,
            grade: None,
            institution: None,
            parent_id: UserId::new(),
            route_id: None,
        });
        student.route_id = route_id;
        students.save(&student).await.unwrap()
    }

    fn new_route(code: &str, capacity: i32) -> NewRoute {
        NewRoute {
            code: code.to_string(),
            name: format!("Route {code}"),
            description: None,
            start_time: None,
            end_time: None,
            shift: Shift::Morning,
            max_capacity: capacity,
            driver_id: None,
        }
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let f = fixture();
        f.svc.create_route(new_route("R-01", 30)).await.unwrap();
        let err = f.svc.create_route(new_route("R-01", 10)).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn driver_reference_must_be_an_active_driver() {
        let f = fixture();
        let mut candidate = new_route("R-01", 30);
        candidate.driver_id = Some(UserId::new());
        let err = f.svc.create_route(candidate).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidReference(_)));

        let driver = seed_driver(&f.users, "dave").await;
        let mut candidate = new_route("R-02", 30);
        candidate.driver_id = Some(driver.id);
        assert!(f.svc.create_route(candidate).await.is_ok());
    }

    #[tokio::test]
    async fn capacity_cannot_shrink_below_assignments() {
        let f = fixture();
        let route = f.svc.create_route(new_route("R-01", 5)).await.unwrap();
        seed_student(&f.students, "D-1", Some(route.id)).await;
        seed_student(&f.students, "D-2", Some(route.id)).await;
        seed_student(&f.students, "D-3", Some(route.id)).await;

        let err = f
            .svc
            .update_route(
                route.id,
                RouteUpdate {
                    max_capacity: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded(_)));

        // Shrinking down to exactly the assigned count is allowed.
        let updated = f
            .svc
            .update_route(
                route.id,
                RouteUpdate {
                    max_capacity: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.max_capacity, 3);
    }

    #[tokio::test]
    async fn delete_is_blocked_while_students_are_assigned() {
        let f = fixture();
        let route = f.svc.create_route(new_route("R-01", 5)).await.unwrap();
        seed_student(&f.students, "D-1", Some(route.id)).await;

        let err = f.svc.delete_route(route.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert!(f.svc.get_route(route.id).await.is_ok());

        let empty = f.svc.create_route(new_route("R-02", 5)).await.unwrap();
        f.svc.delete_route(empty.id).await.unwrap();
        assert!(f.svc.get_route(empty.id).await.is_err());
    }

    #[tokio::test]
    async fn search_uses_first_non_empty_filter() {
        let f = fixture();
        f.svc.create_route(new_route("R-01", 5)).await.unwrap();
        let mut afternoon = new_route("S-01", 5);
        afternoon.shift = Shift::Afternoon;
        f.svc.create_route(afternoon).await.unwrap();

        let by_code = f
            .svc
            .search(&RouteSearch {
                code: Some("R-".into()),
                shift: Some(Shift::Afternoon),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].code, "R-01");

        let all = f.svc.search(&RouteSearch::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn occupancy_counts_only_active_students() {
        let f = fixture();
        let route = f.svc.create_route(new_route("R-01", 4)).await.unwrap();
        seed_student(&f.students, "D-1", Some(route.id)).await;
        let second = seed_student(&f.students, "D-2", Some(route.id)).await;

        use crate::domain::repository::StudentRepository as _;
        let mut inactive = second.clone();
        inactive.deactivate();
        f.students.save(&inactive).await.unwrap();

        let view = f.svc.occupancy(route.id).await.unwrap();
        assert_eq!(view.assigned_students, 1);
        assert_eq!(view.occupancy_percentage, 25.0);
        assert!(view.has_spare_capacity);
    }

    #[tokio::test]
    async fn full_routes_drop_out_of_the_capacity_list() {
        let f = fixture();
        let small = f.svc.create_route(new_route("R-01", 1)).await.unwrap();
        f.svc.create_route(new_route("R-02", 10)).await.unwrap();
        seed_student(&f.students, "D-1", Some(small.id)).await;

        let open = f.svc.list_with_capacity().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].route.code, "R-02");
    }

    #[tokio::test]
    async fn upcoming_orders_by_start_time() {
        let f = fixture();
        let mut early = new_route("R-01", 5);
        early.start_time = chrono::NaiveTime::from_hms_opt(6, 30, 0);
        let mut late = new_route("R-02", 5);
        late.start_time = chrono::NaiveTime::from_hms_opt(14, 0, 0);
        f.svc.create_route(late).await.unwrap();
        f.svc.create_route(early).await.unwrap();

        let upcoming = f
            .svc
            .upcoming(chrono::NaiveTime::from_hms_opt(5, 0, 0).unwrap(), 10)
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].code, "R-01");

        let after_noon = f
            .svc
            .upcoming(chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap(), 10)
            .await
            .unwrap();
        assert_eq!(after_noon.len(), 1);
        assert_eq!(after_noon[0].code, "R-02");
    }

    #[tokio::test]
    async fn earlier_departures_of_other_drivers_do_not_crowd_out_a_drivers_own() {
        let f = fixture();
        let busy = seed_driver(&f.users, "busy").await;
        let me = seed_driver(&f.users, "me").await;

        for (code, hour) in [("B-01", 6), ("B-02", 7), ("B-03", 8)] {
            let mut route = new_route(code, 5);
            route.start_time = chrono::NaiveTime::from_hms_opt(hour, 0, 0);
            route.driver_id = Some(busy.id);
            f.svc.create_route(route).await.unwrap();
        }
        let mut mine = new_route("M-01", 5);
        mine.start_time = chrono::NaiveTime::from_hms_opt(15, 0, 0);
        mine.driver_id = Some(me.id);
        f.svc.create_route(mine).await.unwrap();

        let after = chrono::NaiveTime::from_hms_opt(5, 0, 0).unwrap();
        let upcoming = f.svc.upcoming_for_driver(me.id, after, 3).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].code, "M-01");

        let busiest = f.svc.upcoming_for_driver(busy.id, after, 2).await.unwrap();
        assert_eq!(busiest.len(), 2);
        assert_eq!(busiest[0].code, "B-01");
    }

    #[tokio::test]
    async fn occupancy_percentage_reads_zero_for_an_unknown_route() {
        let f = fixture();
        let route = f.svc.create_route(new_route("R-01", 2)).await.unwrap();
        seed_student(&f.students, "D-1", Some(route.id)).await;

        let pct = f.svc.occupancy_percentage(route.id).await.unwrap();
        assert!((pct - 50.0).abs() < f64::EPSILON);

        let missing = f.svc.occupancy_percentage(RouteId::new()).await.unwrap();
        assert_eq!(missing, 0.0);
    }
}
