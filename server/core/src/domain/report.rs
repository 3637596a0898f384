// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Trip reporting collaborators.
//!
//! The system has no trip/telemetry store of its own: report rows come from
//! an external `ReportDataSource` and leave through an external
//! `ReportExporter`. Both are trait seams so a real trip backend and a real
//! document renderer can be swapped in without touching the report service.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::route::RouteId;
use crate::domain::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    OnTime,
    Delayed,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::OnTime => "ON_TIME",
            TripStatus::Delayed => "DELAYED",
            TripStatus::Completed => "COMPLETED",
        }
    }
}

/// One completed (or in-progress) run of a route on a given day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub date: NaiveDate,
    pub route_id: Option<RouteId>,
    pub route_name: String,
    pub driver_id: Option<UserId>,
    pub driver_name: String,
    pub departure: NaiveTime,
    pub arrival: NaiveTime,
    pub student_count: u32,
    pub status: TripStatus,
    pub distance_km: f64,
}

impl ReportRow {
    pub fn duration_minutes(&self) -> i64 {
        (self.arrival - self.departure).num_minutes()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilters {
    pub route_id: Option<RouteId>,
    pub driver_id: Option<UserId>,
    pub status: Option<TripStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Where report rows come from. The shipped implementation serves sample
/// data; a trip store would implement this against real records.
#[async_trait]
pub trait ReportDataSource: Send + Sync {
    async fn fetch_report_rows(&self, filters: &ReportFilters)
        -> Result<Vec<ReportRow>, DomainError>;
}

/// Renders a filtered row set plus its bounding dates into a downloadable
/// document. Layout is entirely the exporter's concern.
pub trait ReportExporter: Send + Sync {
    fn render(
        &self,
        rows: &[ReportRow],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<u8>, DomainError>;
}
