// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # SafeRide CLI
//!
//! The `saferide` binary runs the school-transport management service.
//!
//! ## Commands
//!
//! - `saferide serve` - run the HTTP API (PostgreSQL when `DATABASE_URL` is
//!   set, in-memory repositories otherwise)
//! - `saferide sweep-overdue` - one-shot sweep moving stale pending
//!   payments to `OVERDUE`

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use saferide_core::application::{
    DashboardService, PaymentService, ReportService, RouteService, StudentService, UserService,
};
use saferide_core::domain::repository::{
    PaymentRepository, RouteRepository, StudentRepository, UserRepository,
};
use saferide_core::infrastructure::password::Argon2PasswordHasher;
use saferide_core::infrastructure::repositories::{
    InMemoryPaymentRepository, InMemoryRouteRepository, InMemoryStudentRepository,
    InMemoryUserRepository, PostgresPaymentRepository, PostgresRouteRepository,
    PostgresStudentRepository, PostgresUserRepository,
};
use saferide_core::infrastructure::{CsvReportExporter, Database, SampleReportDataSource};
use saferide_core::presentation::{app, AppState};

/// SafeRide - school transport management service
#[derive(Parser)]
#[command(name = "saferide")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// HTTP API host
    #[arg(long, global = true, env = "SAFERIDE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// HTTP API port
    #[arg(long, global = true, env = "SAFERIDE_PORT", default_value = "8000")]
    port: u16,

    /// PostgreSQL connection string; omit to run fully in memory
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SAFERIDE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,

    /// Mark every pending payment past its due date as overdue
    SweepOverdue,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    routes: Arc<dyn RouteRepository>,
    students: Arc<dyn StudentRepository>,
    payments: Arc<dyn PaymentRepository>,
}

async fn build_repositories(database_url: Option<&str>) -> Result<Repositories> {
    match database_url {
        Some(url) => {
            let db = Database::new(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Using PostgreSQL persistence");
            let pool = db.get_pool().clone();
            Ok(Repositories {
                users: Arc::new(PostgresUserRepository::new(pool.clone())),
                routes: Arc::new(PostgresRouteRepository::new(pool.clone())),
                students: Arc::new(PostgresStudentRepository::new(pool.clone())),
                payments: Arc::new(PostgresPaymentRepository::new(pool)),
            })
        }
        None => {
            info!("No DATABASE_URL set, using in-memory repositories");
            Ok(Repositories {
                users: Arc::new(InMemoryUserRepository::new()),
                routes: Arc::new(InMemoryRouteRepository::new()),
                students: Arc::new(InMemoryStudentRepository::new()),
                payments: Arc::new(InMemoryPaymentRepository::new()),
            })
        }
    }
}

fn build_state(repos: Repositories) -> Arc<AppState> {
    let users = Arc::new(UserService::new(
        repos.users.clone(),
        repos.students.clone(),
        repos.routes.clone(),
        Arc::new(Argon2PasswordHasher::new()),
    ));
    let routes = Arc::new(RouteService::new(
        repos.routes.clone(),
        repos.students.clone(),
        repos.users.clone(),
    ));
    let students = Arc::new(StudentService::new(
        repos.students.clone(),
        repos.routes.clone(),
        repos.users.clone(),
    ));
    let payments = Arc::new(PaymentService::new(
        repos.payments,
        repos.students,
        repos.users,
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
    Arc::new(AppState {
        users,
        routes,
        students,
        payments,
        dashboard,
        reports,
    })
}

async fn serve(cli: &Cli) -> Result<()> {
    let repos = build_repositories(cli.database_url.as_deref()).await?;
    let state = build_state(repos);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("SafeRide API listening on {addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn sweep_overdue(cli: &Cli) -> Result<()> {
    let repos = build_repositories(cli.database_url.as_deref()).await?;
    let payments = PaymentService::new(repos.payments, repos.students, repos.users);

    let today = chrono::Utc::now().date_naive();
    let swept = payments
        .sweep_overdue(today)
        .await
        .context("Overdue sweep failed")?;
    if swept == 0 {
        println!("{}", "No pending payments past their due date.".green());
    } else {
        println!(
            "{}",
            format!("Marked {swept} payment(s) as overdue.").yellow()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Serve) | None => serve(&cli).await,
        Some(Commands::SweepOverdue) => sweep_overdue(&cli).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
