//! Accident report repository.

use std::collections::HashMap;
use std::sync::Arc;

use roadwatch_common::{AppError, AppResult, GeoPoint, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

use crate::entities::{
    AccidentReport,
    accident_report::{self, ReportPriority, ReportStatus},
};

/// Optional filters for the privileged listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub priority: Option<ReportPriority>,
}

/// One page of a filtered listing.
#[derive(Debug, Clone)]
pub struct ReportPage {
    /// Reports on this page, newest first.
    pub reports: Vec<accident_report::Model>,
    /// Number of reports matching the filter across all pages.
    pub total: u64,
}

/// A report together with its distance from a query point.
#[derive(Debug, Clone)]
pub struct NearbyReport {
    pub report: accident_report::Model,
    pub distance_meters: f64,
}

/// Accident report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new report.
    pub async fn create(
        &self,
        model: accident_report::ActiveModel,
    ) -> AppResult<accident_report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a report by ID.
    ///
    /// Malformed IDs never reach the database and simply find nothing.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<accident_report::Model>> {
        if !IdGenerator::is_well_formed(id) {
            return Ok(None);
        }

        AccidentReport::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a report by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<accident_report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {id} not found")))
    }

    /// Persist changes to a report.
    pub async fn update(
        &self,
        model: accident_report::ActiveModel,
    ) -> AppResult<accident_report::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Hard-delete a report.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !IdGenerator::is_well_formed(id) {
            return Err(AppError::NotFound(format!("Report {id} not found")));
        }

        let result = AccidentReport::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Report {id} not found")));
        }
        Ok(())
    }

    /// List reports matching a filter, newest first.
    ///
    /// `page` is 1-based.
    pub async fn list(&self, filter: ReportFilter, page: u64, limit: u64) -> AppResult<ReportPage> {
        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(accident_report::Column::Status.eq(status));
        }
        if let Some(priority) = filter.priority {
            condition = condition.add(accident_report::Column::Priority.eq(priority));
        }

        let reports = AccidentReport::find()
            .filter(condition.clone())
            .order_by_desc(accident_report::Column::CreatedAt)
            .offset(page.saturating_sub(1).saturating_mul(limit))
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let total = AccidentReport::find()
            .filter(condition)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ReportPage { reports, total })
    }

    /// All reports submitted by a reporter, newest first.
    pub async fn find_by_reporter(&self, reporter_id: &str) -> AppResult<Vec<accident_report::Model>> {
        AccidentReport::find()
            .filter(accident_report::Column::ReporterId.eq(reporter_id))
            .order_by_desc(accident_report::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Reports within `max_distance_m` of `center`, nearest first.
    ///
    /// The database narrows candidates to the bounding box of the search
    /// circle and returns the closest few by a flat-earth estimate, reading
    /// only their coordinates. Exact great-circle distances are computed here
    /// and only the surviving rows are loaded in full.
    pub async fn find_nearby(
        &self,
        center: GeoPoint,
        max_distance_m: f64,
        limit: usize,
    ) -> AppResult<Vec<NearbyReport>> {
        let bbox = center.bounding_box(max_distance_m);

        let longitude = bbox
            .lon_ranges
            .iter()
            .fold(Condition::any(), |cond, (west, east)| {
                cond.add(accident_report::Column::Longitude.between(*west, *east))
            });

        // Squared degrees, with longitude scaled by cos(latitude) and wrapped
        // across the antimeridian.
        let approx_distance = Expr::cust_with_values(
            "POWER(latitude - ?, 2) + POWER(LEAST(ABS(longitude - ?), 360 - ABS(longitude - ?)) * ?, 2)",
            [
                center.latitude,
                center.longitude,
                center.longitude,
                center.latitude.to_radians().cos(),
            ],
        );

        let candidates = AccidentReport::find()
            .select_only()
            .columns([
                accident_report::Column::Id,
                accident_report::Column::Longitude,
                accident_report::Column::Latitude,
            ])
            .filter(accident_report::Column::Latitude.between(bbox.min_lat, bbox.max_lat))
            .filter(longitude)
            .order_by(approx_distance, Order::Asc)
            .order_by_desc(accident_report::Column::CreatedAt)
            .limit((limit as u64).saturating_mul(NEARBY_CANDIDATE_FACTOR))
            .into_model::<Candidate>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let ranked = rank_by_distance(center, max_distance_m, limit, candidates);
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let mut reports: HashMap<String, accident_report::Model> = AccidentReport::find()
            .filter(accident_report::Column::Id.is_in(ranked.iter().map(|(id, _)| id.clone())))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .into_iter()
            .map(|report| (report.id.clone(), report))
            .collect();

        // A row deleted between the two reads is skipped.
        Ok(ranked
            .into_iter()
            .filter_map(|(id, distance_meters)| {
                reports.remove(&id).map(|report| NearbyReport {
                    report,
                    distance_meters,
                })
            })
            .collect())
    }
}

/// Candidates ranked exactly per requested nearby result.
const NEARBY_CANDIDATE_FACTOR: u64 = 8;

/// Coordinates of a proximity candidate.
#[derive(Debug, Clone, FromQueryResult)]
struct Candidate {
    id: String,
    longitude: f64,
    latitude: f64,
}

/// Keep candidates inside the radius, sorted by ascending distance.
///
/// The sort is stable, so equidistant reports keep their incoming order.
fn rank_by_distance(
    center: GeoPoint,
    max_distance_m: f64,
    limit: usize,
    candidates: Vec<Candidate>,
) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let point = GeoPoint {
                longitude: candidate.longitude,
                latitude: candidate.latitude,
            };
            let distance = center.distance_to(&point);
            (distance <= max_distance_m).then_some((candidate.id, distance))
        })
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(limit);
    ranked
}
