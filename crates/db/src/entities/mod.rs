//! Database entities.

#![allow(missing_docs)]

pub mod accident_report;

pub use accident_report::Entity as AccidentReport;
