// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shipped report collaborators: a sample-data source standing in for a
//! trip-telemetry backend, and a CSV exporter.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};

use crate::domain::error::DomainError;
use crate::domain::report::{
    ReportDataSource, ReportExporter, ReportFilters, ReportRow, TripStatus,
};

/// Serves a deterministic batch of recent trips. Rows carry no route or
/// driver ids, so id-based filters only match rows that actually have one.
pub struct SampleReportDataSource;

impl SampleReportDataSource {
    fn sample_rows() -> Vec<ReportRow> {
        let today = Utc::now().date_naive();
        let row = |days_ago: i64,
                   route_name: &str,
                   driver_name: &str,
                   departure: (u32, u32),
                   arrival: (u32, u32),
                   student_count: u32,
                   status: TripStatus,
                   distance_km: f64| ReportRow {
            date: today - Duration::days(days_ago),
            route_id: None,
            route_name: route_name.to_string(),
            driver_id: None,
            driver_name: driver_name.to_string(),
            departure: NaiveTime::from_hms_opt(departure.0, departure.1, 0)
                .unwrap_or_default(),
            arrival: NaiveTime::from_hms_opt(arrival.0, arrival.1, 0).unwrap_or_default(),
            student_count,
            status,
            distance_km,
        };

        vec![
            row(0, "North Route", "Charles Rodriguez", (6, 30), (7, 45), 25, TripStatus::OnTime, 15.5),
            row(0, "South Route", "Mary Gonzalez", (6, 45), (8, 0), 30, TripStatus::Delayed, 18.2),
            row(1, "East Route", "Peter Martinez", (6, 15), (7, 30), 22, TripStatus::Completed, 12.8),
            row(1, "West Route", "Anna Lopez", (7, 0), (8, 15), 28, TripStatus::OnTime, 20.1),
            row(2, "Downtown Route", "Louis Hernandez", (6, 0), (7, 15), 35, TripStatus::Completed, 25.3),
        ]
    }
}

#[async_trait]
impl ReportDataSource for SampleReportDataSource {
    async fn fetch_report_rows(
        &self,
        filters: &ReportFilters,
    ) -> Result<Vec<ReportRow>, DomainError> {
        let rows = Self::sample_rows()
            .into_iter()
            .filter(|r| filters.route_id.is_none_or(|id| r.route_id == Some(id)))
            .filter(|r| filters.driver_id.is_none_or(|id| r.driver_id == Some(id)))
            .filter(|r| filters.status.is_none_or(|s| r.status == s))
            .filter(|r| filters.date_from.is_none_or(|d| r.date >= d))
            .filter(|r| filters.date_to.is_none_or(|d| r.date <= d))
            .collect();
        Ok(rows)
    }
}

/// Plain CSV with a header comment carrying the bounding dates.
pub struct CsvReportExporter;

impl ReportExporter for CsvReportExporter {
    fn render(
        &self,
        rows: &[ReportRow],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<u8>, DomainError> {
        let mut out = String::new();
        out.push_str(&format!("# Trip report {from} to {to}\n"));
        out.push_str("date,route,driver,departure,arrival,duration_min,students,status,distance_km\n");
        for r in rows {
            out.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                r.date,
                csv_field(&r.route_name),
                csv_field(&r.driver_name),
                r.departure.format("%H:%M"),
                r.arrival.format("%H:%M"),
                r.duration_minutes(),
                r.student_count,
                r.status.as_str(),
                r.distance_km,
            ));
        }
        Ok(out.into_bytes())
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_filter_narrows_rows() {
        let source = SampleReportDataSource;
        let filters = ReportFilters {
            status: Some(TripStatus::Completed),
            ..Default::default()
        };
        let rows = source.fetch_report_rows(&filters).await.unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.status == TripStatus::Completed));
    }

    #[tokio::test]
    async fn empty_filters_return_everything() {
        let source = SampleReportDataSource;
        let rows = source
            .fetch_report_rows(&ReportFilters::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn csv_export_has_header_and_one_line_per_row() {
        let rows = vec![ReportRow {
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            route_id: None,
            route_name: "North Route".to_string(),
            driver_id: None,
            driver_name: "Doe, Jane".to_string(),
            departure: NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
            arrival: NaiveTime::from_hms_opt(7, 45, 0).unwrap(),
            student_count: 25,
            status: TripStatus::OnTime,
            distance_km: 15.5,
        }];
        let bytes = CsvReportExporter
            .render(
                &rows,
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            )
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("\"Doe, Jane\""));
        assert!(lines[2].contains("75"));
    }
}
