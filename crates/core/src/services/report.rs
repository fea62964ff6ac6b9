//! Accident report service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use roadwatch_common::{
    AppError, AppResult, Config, GeoPoint, IdGenerator, MAX_SURFACE_DISTANCE_METERS,
    StorageBackend, generate_storage_key,
};
use roadwatch_db::{
    entities::accident_report::{self, Attachment, ReportPriority, ReportStatus},
    repositories::{NearbyReport, ReportFilter, ReportRepository},
};
use sea_orm::Set;
use serde_json::Value;
use tracing::{info, warn};

use crate::classifier::PriorityClassifier;
use crate::identity::Caller;
use crate::lifecycle::{LifecycleManager, StatusUpdate};
use crate::normalizer::{AttachmentNormalizer, NormalizedSubmission, RawSubmission, Slot, ValidatedFile};

/// Maximum number of reports returned by a proximity query.
pub const NEARBY_LIMIT: usize = 50;
/// Search radius when none is given.
pub const DEFAULT_NEARBY_DISTANCE_METERS: f64 = 5_000.0;
/// Page size when none is given.
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Filters and paging for the privileged listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListQuery {
    pub status: Option<ReportStatus>,
    pub priority: Option<ReportPriority>,
    /// 1-based page number.
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// One page of the privileged listing.
#[derive(Debug, Clone)]
pub struct ReportListing {
    pub reports: Vec<accident_report::Model>,
    /// Reports matching the filter across all pages.
    pub count: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

/// Proximity query.
#[derive(Debug, Clone, Copy)]
pub struct NearbyQuery {
    pub longitude: f64,
    pub latitude: f64,
    /// Radius in meters.
    pub max_distance: Option<f64>,
}

/// Attachments written to the file store for one submission.
#[derive(Debug, Default)]
struct StoredFiles {
    media: Vec<Attachment>,
    voice: Option<Attachment>,
    identity_capture: Option<Attachment>,
}

impl StoredFiles {
    fn push(&mut self, slot: Slot, attachment: Attachment) {
        match slot {
            Slot::Media(_) => self.media.push(attachment),
            Slot::Voice => self.voice = Some(attachment),
            Slot::FaceCapture => self.identity_capture = Some(attachment),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.media
            .iter()
            .chain(self.voice.iter())
            .chain(self.identity_capture.iter())
    }
}

/// Authorization-scoped report operations.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    storage: Arc<dyn StorageBackend>,
    normalizer: AttachmentNormalizer,
    classifier: PriorityClassifier,
    lifecycle: LifecycleManager,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(
        report_repo: ReportRepository,
        storage: Arc<dyn StorageBackend>,
        normalizer: AttachmentNormalizer,
        classifier: PriorityClassifier,
        lifecycle: LifecycleManager,
    ) -> Self {
        Self {
            report_repo,
            storage,
            normalizer,
            classifier,
            lifecycle,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a report service from application configuration.
    pub fn from_config(
        report_repo: ReportRepository,
        storage: Arc<dyn StorageBackend>,
        config: &Config,
    ) -> AppResult<Self> {
        Ok(Self::new(
            report_repo,
            storage,
            AttachmentNormalizer::new(config.uploads.max_file_size),
            PriorityClassifier::from_config(&config.triage)?,
            LifecycleManager::new(config.lifecycle.transition_policy),
        ))
    }

    /// Submit a new report as `caller`.
    ///
    /// The submission is fully validated before any file is stored. If the
    /// report cannot be saved, stored files are removed again.
    pub async fn create(
        &self,
        caller: &Caller,
        raw: RawSubmission,
    ) -> AppResult<accident_report::Model> {
        let submission = self.normalizer.normalize(raw)?;
        let priority = self.classifier.classify(&submission.description);
        let now = Utc::now();

        let stored = self.store_files(&submission, now).await?;

        let report = match self
            .insert_report(caller, submission, priority, &stored, now)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                self.discard(stored.iter()).await;
                return Err(e);
            }
        };

        info!(
            report_id = %report.id,
            reporter_id = %report.reporter_id,
            priority = report.priority.as_str(),
            attachments = stored.iter().count(),
            "Report created"
        );

        Ok(report)
    }

    /// List all reports (privileged).
    pub async fn list_all(&self, caller: &Caller, query: ListQuery) -> AppResult<ReportListing> {
        caller.require_admin()?;

        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        // OFFSET is a signed 64-bit value in SQL.
        if (page - 1)
            .checked_mul(limit)
            .is_none_or(|offset| offset > i64::MAX as u64)
        {
            return Err(AppError::Validation(format!("page {page} is out of range")));
        }

        let filter = ReportFilter {
            status: query.status,
            priority: query.priority,
        };
        let result = self.report_repo.list(filter, page, limit).await?;

        Ok(ReportListing {
            reports: result.reports,
            count: result.total,
            total_pages: result.total.div_ceil(limit),
            current_page: page,
        })
    }

    /// Reports submitted by the caller, newest first.
    pub async fn my_reports(&self, caller: &Caller) -> AppResult<Vec<accident_report::Model>> {
        self.report_repo.find_by_reporter(&caller.id).await
    }

    /// Reports near a point, nearest first.
    ///
    /// Open to every authenticated caller; results are not owner-scoped.
    pub async fn nearby(&self, _caller: &Caller, query: NearbyQuery) -> AppResult<Vec<NearbyReport>> {
        let center = GeoPoint::new(query.longitude, query.latitude)?;
        let max_distance = query.max_distance.unwrap_or(DEFAULT_NEARBY_DISTANCE_METERS);
        if !(0.0..=MAX_SURFACE_DISTANCE_METERS).contains(&max_distance) {
            return Err(AppError::Validation(format!(
                "maxDistance must be between 0 and {MAX_SURFACE_DISTANCE_METERS:.0} meters"
            )));
        }

        self.report_repo
            .find_nearby(center, max_distance, NEARBY_LIMIT)
            .await
    }

    /// Fetch a report visible to the caller.
    pub async fn get_by_id(&self, caller: &Caller, id: &str) -> AppResult<accident_report::Model> {
        let report = self.report_repo.get_by_id(id).await?;

        if report.reporter_id != caller.id && !caller.is_admin() {
            return Err(AppError::Forbidden(
                "Not authorized to view this report".to_string(),
            ));
        }

        Ok(report)
    }

    /// Change a report's status (privileged).
    pub async fn update_status(
        &self,
        caller: &Caller,
        id: &str,
        update: StatusUpdate,
    ) -> AppResult<accident_report::Model> {
        caller.require_admin()?;

        let current = self.report_repo.get_by_id(id).await?;
        let previous_status = current.status;
        let next = self.lifecycle.apply(&current, &update, &caller.id, Utc::now())?;

        let mut active: accident_report::ActiveModel = current.into();
        active.status = Set(next.status);
        active.assigned_to = Set(next.assigned_to);
        active.notes = Set(next.notes);
        active.resolved_at = Set(next.resolved_at);
        active.response_time_minutes = Set(next.response_time_minutes);
        active.updated_at = Set(next.updated_at);

        let report = self.report_repo.update(active).await?;

        info!(
            report_id = %report.id,
            actor_id = %caller.id,
            from = previous_status.as_str(),
            status = report.status.as_str(),
            "Report status updated"
        );

        Ok(report)
    }

    /// Hard-delete a report (privileged).
    ///
    /// Attachment bytes are left to the file store's retention.
    pub async fn delete(&self, caller: &Caller, id: &str) -> AppResult<()> {
        caller.require_admin()?;

        self.report_repo.delete(id).await?;

        info!(report_id = %id, actor_id = %caller.id, "Report deleted");
        Ok(())
    }

    async fn store_files(
        &self,
        submission: &NormalizedSubmission,
        now: DateTime<Utc>,
    ) -> AppResult<StoredFiles> {
        let mut stored = StoredFiles::default();

        for file in submission.files() {
            match self.store_file(file, now).await {
                Ok(attachment) => stored.push(file.slot, attachment),
                Err(e) => {
                    self.discard(stored.iter()).await;
                    return Err(e);
                }
            }
        }

        Ok(stored)
    }

    async fn store_file(&self, file: &ValidatedFile, now: DateTime<Utc>) -> AppResult<Attachment> {
        let key = generate_storage_key(
            file.slot.storage_dir(),
            &file.slot.field_name(),
            &file.file_name,
        );
        let uploaded = self
            .storage
            .upload(&key, &file.data, &file.content_type)
            .await?;

        Ok(Attachment {
            storage_ref: uploaded.key,
            url: uploaded.url,
            file_name: file.file_name.clone(),
            mimetype: uploaded.content_type,
            mime_class: file.mime_class,
            size_bytes: uploaded.size,
            md5: uploaded.md5,
            uploaded_at: now,
        })
    }

    async fn insert_report(
        &self,
        caller: &Caller,
        submission: NormalizedSubmission,
        priority: ReportPriority,
        stored: &StoredFiles,
        now: DateTime<Utc>,
    ) -> AppResult<accident_report::Model> {
        let location = submission.location;

        let model = accident_report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(caller.id.clone()),
            reporter_snapshot: Set(serde_json::to_value(caller.snapshot())?),
            description: Set(submission.description),
            longitude: Set(location.point.longitude),
            latitude: Set(location.point.latitude),
            address: Set(location.address),
            accuracy_meters: Set(location.accuracy_meters),
            attachments: Set(serde_json::to_value(&stored.media)?),
            voice_recording: Set(stored.voice.as_ref().map(serde_json::to_value).transpose()?),
            identity_capture: Set(stored
                .identity_capture
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?),
            status: Set(ReportStatus::Pending),
            priority: Set(priority),
            assigned_to: Set(None),
            notes: Set(Value::Array(Vec::new())),
            resolved_at: Set(None),
            response_time_minutes: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        self.report_repo.create(model).await
    }

    async fn discard(&self, attachments: impl Iterator<Item = &Attachment>) {
        for attachment in attachments {
            if let Err(e) = self.storage.delete(&attachment.storage_ref).await {
                warn!(
                    storage_ref = %attachment.storage_ref,
                    error = %e,
                    "Failed to remove orphaned attachment"
                );
            }
        }
    }
}
