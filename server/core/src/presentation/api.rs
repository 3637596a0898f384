// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP surface. Authentication is delegated to an external session layer:
//! requests arrive with `x-user-id` and `x-user-role` headers already
//! resolved, and this layer only enforces the per-role access map and
//! translates `DomainError` into status codes.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::{
    DashboardService, PaymentService, ReportService, RouteService, StudentService, UserService,
};
use crate::domain::error::DomainError;
use crate::domain::payment::{NewPayment, PaymentId, PaymentStatus, PaymentUpdate};
use crate::domain::report::ReportFilters;
use crate::domain::route::{NewRoute, RouteId, RouteSearch, RouteUpdate};
use crate::domain::student::{NewStudent, StudentId, StudentUpdate};
use crate::domain::user::{NewUser, Principal, Role, UserId, UserUpdate};

pub struct AppState {
    pub users: Arc<UserService>,
    pub routes: Arc<RouteService>,
    pub students: Arc<StudentService>,
    pub payments: Arc<PaymentService>,
    pub dashboard: Arc<DashboardService>,
    pub reports: Arc<ReportService>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/users", get(list_users).post(create_user))
        .route("/users/search", get(search_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/toggle", post(toggle_user))
        .route("/profile", get(profile).put(update_profile))
        .route("/profile/password", post(change_password))
        .route("/routes", get(search_routes).post(create_route))
        .route("/routes/available", get(routes_with_capacity))
        .route(
            "/routes/{id}",
            get(get_route).put(update_route).delete(delete_route),
        )
        .route("/routes/{id}/toggle", post(toggle_route))
        .route("/routes/{id}/occupancy", get(route_occupancy))
        .route("/routes/{id}/students", get(route_students))
        .route("/students", get(list_students).post(create_student))
        .route("/students/search", get(search_students))
        .route(
            "/students/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/students/{id}/toggle", post(toggle_student))
        .route("/students/{id}/route/{route_id}", post(assign_student))
        .route("/students/{id}/route", delete(unassign_student))
        .route("/payments", get(list_payments).post(create_payment))
        .route("/payments/search", get(search_payments))
        .route("/payments/sweep", post(sweep_overdue))
        .route(
            "/payments/{id}",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
        .route("/payments/{id}/pay", post(pay_payment))
        .route("/my/students", get(my_students))
        .route("/my/payments", get(my_payments))
        .route("/my/routes", get(my_routes))
        .route("/dashboard", get(dashboard))
        .route("/reports", get(search_reports))
        .route("/reports/export", get(export_report))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ---- errors -------------------------------------------------------------

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.to_string(),
        }
    }

    fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: "access denied".to_string(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status = match &err {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::DuplicateKey(_) => StatusCode::CONFLICT,
            DomainError::InvalidReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::CapacityExceeded(_) => StatusCode::CONFLICT,
            DomainError::InvalidState(_) => StatusCode::CONFLICT,
            DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Storage(inner) => {
                tracing::error!(error = %inner, "storage failure");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "internal error".to_string(),
                };
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---- authn/authz --------------------------------------------------------

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing x-user-id header"))?;
        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing x-user-role header"))?;

        let id = UserId::from_string(id)
            .map_err(|_| ApiError::unauthorized("malformed x-user-id header"))?;
        let role: Role = role
            .parse()
            .map_err(|_| ApiError::unauthorized("malformed x-user-role header"))?;
        Ok(Principal::new(id, role))
    }
}

fn require_admin(principal: &Principal) -> ApiResult<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

fn require_role(principal: &Principal, role: Role) -> ApiResult<()> {
    if principal.role == role {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

// ---- auth ---------------------------------------------------------------

#[derive(serde::Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    let user = state
        .users
        .validate_credentials(&payload.username, &payload.password)
        .await?;
    Ok(Json(user).into_response())
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(candidate): Json<NewUser>,
) -> ApiResult<Response> {
    let user = state.users.register_parent(candidate).await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

// ---- users (admin) ------------------------------------------------------

#[derive(serde::Deserialize)]
struct RoleQuery {
    role: Option<Role>,
    active: Option<bool>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<RoleQuery>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    let users = match (query.role, query.active) {
        (Some(role), Some(true)) => state.users.list_active_by_role(role).await?,
        (Some(role), _) => state.users.list_by_role(role).await?,
        (None, _) => state.users.list_users().await?,
    };
    Ok(Json(users).into_response())
}

#[derive(serde::Deserialize)]
struct NameQuery {
    name: String,
}

async fn search_users(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<NameQuery>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.users.search_by_name(&query.name).await?).into_response())
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(candidate): Json<NewUser>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    let user = state.users.create_user(candidate).await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<UserId>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.users.get_user(id).await?).into_response())
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<UserId>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.users.update_user(id, update).await?).into_response())
}

async fn toggle_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<UserId>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.users.toggle_active(principal, id).await?).into_response())
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<UserId>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    state.users.delete_user(principal, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---- profile (any role) -------------------------------------------------

async fn profile(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> ApiResult<Response> {
    Ok(Json(state.users.get_user(principal.id).await?).into_response())
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(mut update): Json<UserUpdate>,
) -> ApiResult<Response> {
    // Role and status changes stay admin-only.
    update.role = None;
    update.active = None;
    Ok(Json(state.users.update_user(principal.id, update).await?).into_response())
}

#[derive(serde::Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Response> {
    state
        .users
        .change_password(principal.id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---- routes -------------------------------------------------------------

async fn search_routes(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(params): Query<RouteSearch>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.routes.search(&params).await?).into_response())
}

async fn routes_with_capacity(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.routes.list_with_capacity().await?).into_response())
}

async fn create_route(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(candidate): Json<NewRoute>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    let route = state.routes.create_route(candidate).await?;
    Ok((StatusCode::CREATED, Json(route)).into_response())
}

/// Admins see any route; a driver only their own.
async fn get_route(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<RouteId>,
) -> ApiResult<Response> {
    let route = state.routes.get_route(id).await?;
    if !principal.is_admin() && route.driver_id != Some(principal.id) {
        return Err(ApiError::forbidden());
    }
    Ok(Json(route).into_response())
}

async fn update_route(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<RouteId>,
    Json(update): Json<RouteUpdate>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.routes.update_route(id, update).await?).into_response())
}

async fn toggle_route(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<RouteId>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.routes.toggle_active(id).await?).into_response())
}

async fn delete_route(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<RouteId>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    state.routes.delete_route(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn route_occupancy(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<RouteId>,
) -> ApiResult<Response> {
    let view = state.routes.occupancy(id).await?;
    if !principal.is_admin() && view.route.driver_id != Some(principal.id) {
        return Err(ApiError::forbidden());
    }
    Ok(Json(view).into_response())
}

async fn route_students(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<RouteId>,
) -> ApiResult<Response> {
    let route = state.routes.get_route(id).await?;
    if !principal.is_admin() && route.driver_id != Some(principal.id) {
        return Err(ApiError::forbidden());
    }
    Ok(Json(state.students.list_active_by_route(id).await?).into_response())
}

// ---- students -----------------------------------------------------------

async fn list_students(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.students.list_students().await?).into_response())
}

async fn search_students(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<NameQuery>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.students.search_by_name(&query.name).await?).into_response())
}

async fn create_student(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(candidate): Json<NewStudent>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    let student = state.students.create_student(candidate).await?;
    Ok((StatusCode::CREATED, Json(student)).into_response())
}

/// Admins see any student; a parent only their own children.
async fn get_student(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<StudentId>,
) -> ApiResult<Response> {
    let student = state.students.get_student(id).await?;
    if !principal.is_admin() && student.parent_id != principal.id {
        return Err(ApiError::forbidden());
    }
    Ok(Json(student).into_response())
}

async fn update_student(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<StudentId>,
    Json(update): Json<StudentUpdate>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.students.update_student(id, update).await?).into_response())
}

async fn toggle_student(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<StudentId>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.students.toggle_active(id).await?).into_response())
}

async fn assign_student(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path((id, route_id)): Path<(StudentId, RouteId)>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.students.assign_to_route(id, route_id).await?).into_response())
}

async fn unassign_student(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<StudentId>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.students.unassign_from_route(id).await?).into_response())
}

async fn delete_student(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<StudentId>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    state.students.delete_student(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---- payments -----------------------------------------------------------

#[derive(serde::Deserialize)]
struct PaymentQuery {
    status: Option<PaymentStatus>,
}

async fn list_payments(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<PaymentQuery>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    let payments = match query.status {
        Some(status) => state.payments.list_by_status(status).await?,
        None => state.payments.list_payments().await?,
    };
    Ok(Json(payments).into_response())
}

#[derive(serde::Deserialize)]
struct CodeQuery {
    code: String,
}

async fn search_payments(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<CodeQuery>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.payments.search_by_code(&query.code).await?).into_response())
}

async fn create_payment(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(candidate): Json<NewPayment>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    let payment = state.payments.create_payment(candidate).await?;
    Ok((StatusCode::CREATED, Json(payment)).into_response())
}

/// Admins see any payment; a parent only their own.
async fn get_payment(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<PaymentId>,
) -> ApiResult<Response> {
    let payment = state.payments.get_payment(id).await?;
    if !principal.is_admin() && payment.parent_id != principal.id {
        return Err(ApiError::forbidden());
    }
    Ok(Json(payment).into_response())
}

async fn update_payment(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<PaymentId>,
    Json(update): Json<PaymentUpdate>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.payments.update_payment(id, update).await?).into_response())
}

#[derive(serde::Deserialize, Default)]
struct PayRequest {
    method: Option<String>,
}

async fn pay_payment(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<PaymentId>,
    payload: Option<Json<PayRequest>>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    let method = payload.and_then(|Json(p)| p.method);
    Ok(Json(state.payments.mark_paid(id, method).await?).into_response())
}

async fn sweep_overdue(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    let today = chrono::Utc::now().date_naive();
    let swept = state.payments.sweep_overdue(today).await?;
    Ok(Json(json!({ "marked_overdue": swept })).into_response())
}

async fn delete_payment(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<PaymentId>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    state.payments.delete_payment(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---- role-scoped views --------------------------------------------------

async fn my_students(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> ApiResult<Response> {
    require_role(&principal, Role::Parent)?;
    Ok(Json(state.students.list_by_parent(principal.id).await?).into_response())
}

async fn my_payments(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<PaymentQuery>,
) -> ApiResult<Response> {
    require_role(&principal, Role::Parent)?;
    let payments = match query.status {
        Some(status) => {
            state
                .payments
                .list_by_parent_and_status(principal.id, status)
                .await?
        }
        None => state.payments.list_by_parent(principal.id).await?,
    };
    Ok(Json(payments).into_response())
}

async fn my_routes(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> ApiResult<Response> {
    require_role(&principal, Role::Driver)?;
    Ok(Json(state.routes.list_by_driver(principal.id).await?).into_response())
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> ApiResult<Response> {
    let body = match principal.role {
        Role::Admin => Json(json!(state.dashboard.admin_summary().await?)).into_response(),
        Role::Parent => {
            Json(json!(state.dashboard.parent_summary(principal.id).await?)).into_response()
        }
        Role::Driver => {
            Json(json!(state.dashboard.driver_summary(principal.id).await?)).into_response()
        }
    };
    Ok(body)
}

// ---- reports ------------------------------------------------------------

async fn search_reports(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(filters): Query<ReportFilters>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    Ok(Json(state.reports.search(&filters).await?).into_response())
}

async fn export_report(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(filters): Query<ReportFilters>,
) -> ApiResult<Response> {
    require_admin(&principal)?;
    let bytes = state.reports.export(&filters).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"trip-report.csv\"",
            ),
        ],
        bytes,
    )
        .into_response())
}
