// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP-level tests: header-based principal resolution, the per-role access
//! map, and the error-to-status translation.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use saferide_core::application::{
    DashboardService, PaymentService, ReportService, RouteService, StudentService, UserService,
};
use saferide_core::domain::user::{NewUser, Role, User};
use saferide_core::infrastructure::password::Argon2PasswordHasher;
use saferide_core::infrastructure::repositories::{
    InMemoryPaymentRepository, InMemoryRouteRepository, InMemoryStudentRepository,
    InMemoryUserRepository,
};
use saferide_core::infrastructure::{CsvReportExporter, SampleReportDataSource};
use saferide_core::presentation::{app, AppState};

struct World {
    app: Router,
    users: Arc<UserService>,
    admin: User,
    parent: User,
    driver: User,
}

fn candidate(username: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_string(),
        password: "hunter2!".into(),
        role,
        full_name: format!("{username} account"),
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
    }
}

async fn world() -> World {
    let user_repo = Arc::new(InMemoryUserRepository::new());
    let route_repo = Arc::new(InMemoryRouteRepository::new());
    let student_repo = Arc::new(InMemoryStudentRepository::new());
    let payment_repo = Arc::new(InMemoryPaymentRepository::new());

    let users = Arc::new(UserService::new(
        user_repo.clone(),
        student_repo.clone(),
        route_repo.clone(),
        Arc::new(Argon2PasswordHasher::new()),
    ));
    let routes = Arc::new(RouteService::new(
        route_repo.clone(),
        student_repo.clone(),
        user_repo.clone(),
    ));
    let students = Arc::new(StudentService::new(
        student_repo.clone(),
        route_repo.clone(),
        user_repo.clone(),
    ));
    let payments = Arc::new(PaymentService::new(
        payment_repo,
        student_repo,
        user_repo,
    ));
    let dashboard = Arc::new(DashboardService::new(
        users.clone(),
        routes.clone(),
        students.clone(),
        payments.clone(),
    ));
    let reports = Arc::new(ReportService::new(
        Arc::new(SampleReportDataSource),
        Arc::new(CsvReportExporter),
    ));

    let admin = users.create_user(candidate("root", Role::Admin)).await.unwrap();
    let parent = users.create_user(candidate("ana", Role::Parent)).await.unwrap();
    let driver = users.create_user(candidate("dave", Role::Driver)).await.unwrap();

    let state = Arc::new(AppState {
        users: users.clone(),
        routes,
        students,
        payments,
        dashboard,
        reports,
    });

    World {
        app: app(state),
        users,
        admin,
        parent,
        driver,
    }
}

fn request_as(user: Option<&User>, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder
            .header("x-user-id", user.id.to_string())
            .header("x-user-role", user.role.as_str());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(world: &World, req: Request<Body>) -> (StatusCode, Value) {
    let response = world.app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_needs_no_principal() {
    let w = world().await;
    let (status, body) = send(&w, request_as(None, "GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_identity_headers_yield_401() {
    let w = world().await;
    let (status, _) = send(&w, request_as(None, "GET", "/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_administration_is_admin_only() {
    let w = world().await;

    let (status, _) = send(&w, request_as(Some(&w.parent), "GET", "/users", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&w, request_as(Some(&w.driver), "GET", "/users", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&w, request_as(Some(&w.admin), "GET", "/users", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    // Password hashes never leave the service.
    assert!(body[0].get("password_hash").is_none());
}

#[tokio::test]
async fn every_role_gets_its_own_dashboard_and_profile() {
    let w = world().await;
    for user in [&w.admin, &w.parent, &w.driver] {
        let (status, _) = send(&w, request_as(Some(user), "GET", "/dashboard", None)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&w, request_as(Some(user), "GET", "/profile", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], user.username.as_str());
    }
}

#[tokio::test]
async fn public_registration_always_creates_a_parent() {
    let w = world().await;
    let payload = json!({
        "username": "newparent",
        "password": "pw123456",
        "role": "ADMIN",
        "full_name": "New Parent",
        "email": "newparent@example.com"
    });
    let (status, body) = send(&w, request_as(None, "POST", "/auth/register", Some(payload))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "PARENT");
}

#[tokio::test]
async fn login_round_trip() {
    let w = world().await;
    let ok = json!({ "username": "ana", "password": "hunter2!" });
    let (status, body) = send(&w, request_as(None, "POST", "/auth/login", Some(ok))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ana");

    let bad = json!({ "username": "ana", "password": "nope" });
    let (status, _) = send(&w, request_as(None, "POST", "/auth/login", Some(bad))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn payment_lifecycle_over_http() {
    let w = world().await;

    // A student to bill.
    let student = json!({
        "first_name": "Leo",
        "last_name": "Torres",
        "document": "D-100",
        "parent_id": w.parent.id,
    });
    let (status, student) = send(
        &w,
        request_as(Some(&w.admin), "POST", "/students", Some(student)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let payment = json!({
        "amount": "150.00",
        "student_id": student["id"],
        "parent_id": w.parent.id,
    });
    let (status, payment) = send(
        &w,
        request_as(Some(&w.admin), "POST", "/payments", Some(payment)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = payment["code"].as_str().unwrap();
    assert!(code.starts_with("PAG-"), "unexpected code {code}");
    assert!(code.ends_with("-0001"));

    // The owning parent sees it, another role's listing is refused.
    let (status, mine) = send(
        &w,
        request_as(Some(&w.parent), "GET", "/my/payments", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (status, _) = send(
        &w,
        request_as(Some(&w.driver), "GET", "/my/payments", None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Confirmation works once, the retry maps to 409.
    let id = payment["id"].as_str().unwrap();
    let uri = format!("/payments/{id}/pay");
    let (status, paid) = send(
        &w,
        request_as(Some(&w.admin), "POST", &uri, Some(json!({ "method": "CASH" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "PAID");
    let (status, _) = send(
        &w,
        request_as(Some(&w.admin), "POST", &uri, Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn full_route_maps_to_409_over_http() {
    let w = world().await;
    let route = json!({
        "code": "R-01",
        "name": "North",
        "shift": "MORNING",
        "max_capacity": 1,
    });
    let (status, route) = send(
        &w,
        request_as(Some(&w.admin), "POST", "/routes", Some(route)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let rider = |doc: &str| {
        json!({
            "first_name": "Rider",
            "last_name": doc,
            "document": doc,
            "parent_id": w.parent.id,
            "route_id": route["id"],
        })
    };
    let (status, _) = send(
        &w,
        request_as(Some(&w.admin), "POST", "/students", Some(rider("D-1"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(
        &w,
        request_as(Some(&w.admin), "POST", "/students", Some(rider("D-2"))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("capacity"));
}

#[tokio::test]
async fn drivers_only_see_their_own_routes() {
    let w = world().await;
    let route = json!({
        "code": "R-01",
        "name": "North",
        "shift": "MORNING",
        "max_capacity": 10,
        "driver_id": w.driver.id,
    });
    let (status, route) = send(
        &w,
        request_as(Some(&w.admin), "POST", "/routes", Some(route)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, mine) = send(&w, request_as(Some(&w.driver), "GET", "/my/routes", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    // Another driver cannot read the route detail.
    let other = w
        .users
        .create_user(candidate("other", Role::Driver))
        .await
        .unwrap();
    let uri = format!("/routes/{}", route["id"].as_str().unwrap());
    let (status, _) = send(&w, request_as(Some(&other), "GET", &uri, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&w, request_as(Some(&w.driver), "GET", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reports_are_admin_only_and_export_as_csv() {
    let w = world().await;
    let (status, _) = send(&w, request_as(Some(&w.parent), "GET", "/reports", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, rows) = send(&w, request_as(Some(&w.admin), "GET", "/reports", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().unwrap().len(), 5);

    let response = w
        .app
        .clone()
        .oneshot(request_as(
            Some(&w.admin),
            "GET",
            "/reports/export?status=DELAYED",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/csv"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("DELAYED"));
}

#[tokio::test]
async fn unknown_ids_map_to_404() {
    let w = world().await;
    let uri = format!("/users/{}", uuid::Uuid::new_v4());
    let (status, _) = send(&w, request_as(Some(&w.admin), "GET", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
