// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod memory;
mod postgres_payment;
mod postgres_route;
mod postgres_student;
mod postgres_user;

pub use memory::{
    InMemoryPaymentRepository, InMemoryRouteRepository, InMemoryStudentRepository,
    InMemoryUserRepository,
};
pub use postgres_payment::PostgresPaymentRepository;
pub use postgres_route::PostgresRouteRepository;
pub use postgres_student::PostgresStudentRepository;
pub use postgres_user::PostgresUserRepository;
