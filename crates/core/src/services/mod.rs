//! Business logic services.

pub mod report;

pub use report::{
    DEFAULT_NEARBY_DISTANCE_METERS, DEFAULT_PAGE_SIZE, ListQuery, MAX_PAGE_SIZE, NEARBY_LIMIT,
    NearbyQuery, ReportListing, ReportService,
};
