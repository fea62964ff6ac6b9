//! Accident report entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ReportStatus {
    /// Wire name, as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether no further work is expected on the report.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

/// Triage priority tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ReportPriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    #[default]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "critical")]
    Critical,
}

impl ReportPriority {
    /// Wire name, as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Broad media class of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeClass {
    Image,
    Video,
    Audio,
}

impl MimeClass {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Reporter details copied at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterSnapshot {
    pub name: String,
    pub national_id_number: String,
    pub phone: String,
    pub email: String,
}

/// Reference to bytes held by the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub storage_ref: String,
    pub url: String,
    pub file_name: String,
    pub mimetype: String,
    pub mime_class: MimeClass,
    pub size_bytes: u64,
    /// Hex MD5 of the stored bytes; empty for records written without one.
    #[serde(default)]
    pub md5: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

/// One entry of the append-only note ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportNote {
    pub author_id: String,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Accident report model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accident_report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Submitting user (owned by the identity service)
    #[sea_orm(indexed)]
    pub reporter_id: String,

    /// [`ReporterSnapshot`] taken at submission
    #[sea_orm(column_type = "JsonBinary")]
    pub reporter_snapshot: Json,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub longitude: f64,
    pub latitude: f64,

    #[sea_orm(nullable)]
    pub address: Option<String>,

    #[sea_orm(nullable)]
    pub accuracy_meters: Option<f64>,

    /// Photo/video/audio [`Attachment`]s, at most five
    #[sea_orm(column_type = "JsonBinary")]
    pub attachments: Json,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub voice_recording: Option<Json>,

    /// Image used to verify the reporter
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub identity_capture: Option<Json>,

    pub status: ReportStatus,

    /// Computed once at creation
    pub priority: ReportPriority,

    #[sea_orm(nullable)]
    pub assigned_to: Option<String>,

    /// [`ReportNote`] ledger
    #[sea_orm(column_type = "JsonBinary")]
    pub notes: Json,

    #[sea_orm(nullable)]
    pub resolved_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub response_time_minutes: Option<i64>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Decoded reporter snapshot.
    pub fn reporter_snapshot(&self) -> Result<ReporterSnapshot, serde_json::Error> {
        serde_json::from_value(self.reporter_snapshot.clone())
    }

    /// Decoded media attachments.
    pub fn attachments(&self) -> Result<Vec<Attachment>, serde_json::Error> {
        serde_json::from_value(self.attachments.clone())
    }

    /// Decoded voice recording.
    pub fn voice_recording(&self) -> Result<Option<Attachment>, serde_json::Error> {
        self.voice_recording
            .clone()
            .map(serde_json::from_value)
            .transpose()
    }

    /// Decoded identity capture.
    pub fn identity_capture(&self) -> Result<Option<Attachment>, serde_json::Error> {
        self.identity_capture
            .clone()
            .map(serde_json::from_value)
            .transpose()
    }

    /// Decoded note ledger.
    pub fn notes(&self) -> Result<Vec<ReportNote>, serde_json::Error> {
        serde_json::from_value(self.notes.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
