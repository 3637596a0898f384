// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service-level scenarios around the route capacity ceiling: a route can
//! fill to exactly `max_capacity` active students, never beyond, and a
//! refused assignment leaves no trace behind.

use std::sync::Arc;

use saferide_core::application::{RouteService, StudentService};
use saferide_core::domain::error::DomainError;
use saferide_core::domain::repository::UserRepository;
use saferide_core::domain::route::{NewRoute, Route, RouteUpdate, Shift};
use saferide_core::domain::student::NewStudent;
use saferide_core::domain::user::{NewUser, Role, User};
use saferide_core::infrastructure::repositories::{
    InMemoryRouteRepository, InMemoryStudentRepository, InMemoryUserRepository,
};

struct World {
    routes: RouteService,
    students: StudentService,
    parent: User,
}

async fn world() -> World {
    let route_repo = Arc::new(InMemoryRouteRepository::new());
    let student_repo = Arc::new(InMemoryStudentRepository::new());
    let user_repo = Arc::new(InMemoryUserRepository::new());

    let parent = User::new(
        &NewUser {
            username: "ana".into(),
            password: "pw".into(),
            role: Role::Parent,
            full_name: "Ana Torres".into(),
            email: "ana@example.com".into(),
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
    let parent = user_repo.save(&parent).await.unwrap();

    World {
        routes: RouteService::new(route_repo.clone(), student_repo.clone(), user_repo.clone()),
        students: StudentService::new(student_repo, route_repo, user_repo),
        parent,
    }
}

async fn seed_route(world: &World, code: &str, capacity: i32) -> Route {
    world
        .routes
        .create_route(NewRoute {
            code: code.into(),
            name: format!("Route {code}"),
            description: None,
            start_time: None,
            end_time: None,
            shift: Shift::Morning,
            max_capacity: capacity,
            driver_id: None,
        })
        .await
        .unwrap()
}

fn rider(world: &World, document: &str, route: Option<&Route>) -> NewStudent {
    NewStudent {
        first_name: "Rider".into(),
        last_name: document.to_string(),
        document: document.into(),
        birth_date: None,
        address: None,
        phone: None,
        grade: None,
        institution: None,
        parent_id: world.parent.id,
        route_id: route.map(|r| r.id),
    }
}

#[tokio::test]
async fn a_two_seat_route_goes_50_then_100_then_refuses() {
    let w = world().await;
    let route = seed_route(&w, "R-01", 2).await;

    w.students
        .create_student(rider(&w, "D-1", Some(&route)))
        .await
        .unwrap();
    assert_eq!(w.routes.occupancy(route.id).await.unwrap().occupancy_percentage, 50.0);

    w.students
        .create_student(rider(&w, "D-2", Some(&route)))
        .await
        .unwrap();
    let full = w.routes.occupancy(route.id).await.unwrap();
    assert_eq!(full.occupancy_percentage, 100.0);
    assert!(!full.has_spare_capacity);

    let err = w
        .students
        .create_student(rider(&w, "D-3", Some(&route)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::CapacityExceeded(_)));
}

#[tokio::test]
async fn refused_assignment_writes_nothing() {
    let w = world().await;
    let route = seed_route(&w, "R-01", 1).await;

    w.students
        .create_student(rider(&w, "D-1", Some(&route)))
        .await
        .unwrap();
    let _ = w
        .students
        .create_student(rider(&w, "D-2", Some(&route)))
        .await
        .unwrap_err();

    // The rejected rider never became a student at all.
    assert_eq!(w.students.list_students().await.unwrap().len(), 1);
    assert_eq!(
        w.routes.occupancy(route.id).await.unwrap().assigned_students,
        1
    );
}

#[tokio::test]
async fn deactivating_a_student_frees_a_seat() {
    let w = world().await;
    let route = seed_route(&w, "R-01", 1).await;

    let first = w
        .students
        .create_student(rider(&w, "D-1", Some(&route)))
        .await
        .unwrap();
    w.students.toggle_active(first.id).await.unwrap();

    // Inactive students do not count against capacity.
    w.students
        .create_student(rider(&w, "D-2", Some(&route)))
        .await
        .unwrap();
    assert_eq!(
        w.routes.occupancy(route.id).await.unwrap().assigned_students,
        1
    );
}

#[tokio::test]
async fn capacity_shrink_is_refused_below_current_load() {
    let w = world().await;
    let route = seed_route(&w, "R-01", 3).await;
    w.students
        .create_student(rider(&w, "D-1", Some(&route)))
        .await
        .unwrap();
    w.students
        .create_student(rider(&w, "D-2", Some(&route)))
        .await
        .unwrap();

    let err = w
        .routes
        .update_route(
            route.id,
            RouteUpdate {
                max_capacity: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::CapacityExceeded(_)));

    // The stored route is untouched by the refused shrink.
    assert_eq!(w.routes.get_route(route.id).await.unwrap().max_capacity, 3);
}

#[tokio::test]
async fn occupied_route_cannot_be_deleted_until_emptied() {
    let w = world().await;
    let route = seed_route(&w, "R-01", 2).await;
    let student = w
        .students
        .create_student(rider(&w, "D-1", Some(&route)))
        .await
        .unwrap();

    let err = w.routes.delete_route(route.id).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    w.students.unassign_from_route(student.id).await.unwrap();
    w.routes.delete_route(route.id).await.unwrap();
    assert!(w.routes.get_route(route.id).await.is_err());
}

#[tokio::test]
async fn moving_between_routes_updates_both_counts() {
    let w = world().await;
    let origin = seed_route(&w, "R-01", 2).await;
    let target = seed_route(&w, "R-02", 2).await;
    let student = w
        .students
        .create_student(rider(&w, "D-1", Some(&origin)))
        .await
        .unwrap();

    w.students.assign_to_route(student.id, target.id).await.unwrap();

    assert_eq!(w.routes.occupancy(origin.id).await.unwrap().assigned_students, 0);
    assert_eq!(w.routes.occupancy(target.id).await.unwrap().assigned_students, 1);
}
