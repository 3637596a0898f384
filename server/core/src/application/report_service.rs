// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The reporting screen: filtered trip rows from the pluggable data source,
//! plus export through the pluggable renderer. Swapping either collaborator
//! never touches this service.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::error::DomainError;
use crate::domain::report::{ReportDataSource, ReportExporter, ReportFilters, ReportRow};

pub struct ReportService {
    source: Arc<dyn ReportDataSource>,
    exporter: Arc<dyn ReportExporter>,
}

impl ReportService {
    pub fn new(source: Arc<dyn ReportDataSource>, exporter: Arc<dyn ReportExporter>) -> Self {
        Self { source, exporter }
    }

    pub async fn search(&self, filters: &ReportFilters) -> Result<Vec<ReportRow>, DomainError> {
        if let (Some(from), Some(to)) = (filters.date_from, filters.date_to) {
            if from > to {
                return Err(DomainError::InvalidInput(
                    "date range start is after its end".into(),
                ));
            }
        }
        self.source.fetch_report_rows(filters).await
    }

    /// Renders the filtered rows. Missing range bounds default to the last
    /// thirty days ending today.
    pub async fn export(&self, filters: &ReportFilters) -> Result<Vec<u8>, DomainError> {
        let rows = self.search(filters).await?;
        let today = Utc::now().date_naive();
        let to = filters.date_to.unwrap_or(today);
        let from = filters.date_from.unwrap_or(to - Duration::days(30));
        self.exporter.render(&rows, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::TripStatus;
    use crate::infrastructure::report::{CsvReportExporter, SampleReportDataSource};

    fn service() -> ReportService {
        ReportService::new(Arc::new(SampleReportDataSource), Arc::new(CsvReportExporter))
    }

    #[tokio::test]
    async fn inverted_date_range_is_rejected() {
        let filters = ReportFilters {
            date_from: chrono::NaiveDate::from_ymd_opt(2026, 6, 30),
            date_to: chrono::NaiveDate::from_ymd_opt(2026, 6, 1),
            ..Default::default()
        };
        let err = service().search(&filters).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn export_applies_the_same_filters_as_search() {
        let svc = service();
        let filters = ReportFilters {
            status: Some(TripStatus::Delayed),
            ..Default::default()
        };
        let rows = svc.search(&filters).await.unwrap();
        let bytes = svc.export(&filters).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();

        // Comment line + header + one line per row.
        assert_eq!(text.lines().count(), rows.len() + 2);
        assert!(text.contains("DELAYED"));
        assert!(!text.contains("ON_TIME"));
    }
}
