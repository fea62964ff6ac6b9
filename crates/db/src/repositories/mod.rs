//! Repositories over the database entities.

pub mod report;

pub use report::{NearbyReport, ReportFilter, ReportPage, ReportRepository};
