//! Accident report endpoints.

use axum::{
    Json, Router,
    extract::{
        FromRequest, Multipart, Path, Query, Request, State,
        multipart::MultipartError,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header::CONTENT_TYPE},
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use roadwatch_common::{AppError, AppResult, MAX_SURFACE_DISTANCE_METERS, MessageKey};
use roadwatch_core::{
    FileSlots, IncomingFile, ListQuery, LocationInput, NearbyQuery, RawSubmission, Slot,
    StatusUpdate,
};
use roadwatch_db::{
    entities::accident_report::{
        self, Attachment, ReportNote, ReportPriority, ReportStatus, ReporterSnapshot,
    },
    repositories::NearbyReport,
};
use serde::{Deserialize, Deserializer, Serialize, de::IntoDeserializer};
use validator::Validate;

use crate::{
    extractors::{AuthCaller, RequestLocale},
    middleware::AppState,
    response::{ApiResponse, Empty},
};

/// Create report router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_report).get(list_reports))
        .route("/my-reports", get(my_reports))
        .route("/nearby", get(nearby_reports))
        .route("/{id}", get(get_report).delete(delete_report))
        .route("/{id}/status", put(update_status))
}

/// Report location.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub longitude: f64,
    pub latitude: f64,
    pub address: Option<String>,
    pub accuracy_meters: Option<f64>,
}

/// Report response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub reporter_id: String,
    pub reporter_info: ReporterSnapshot,
    pub description: String,
    pub location: LocationResponse,
    pub attachments: Vec<Attachment>,
    pub voice_recording: Option<Attachment>,
    pub identity_capture: Option<Attachment>,
    pub status: ReportStatus,
    pub priority: ReportPriority,
    pub assigned_to: Option<String>,
    pub notes: Vec<ReportNote>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub response_time_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

impl TryFrom<accident_report::Model> for ReportResponse {
    type Error = AppError;

    fn try_from(report: accident_report::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            reporter_info: report.reporter_snapshot()?,
            attachments: report.attachments()?,
            voice_recording: report.voice_recording()?,
            identity_capture: report.identity_capture()?,
            notes: report.notes()?,
            id: report.id,
            reporter_id: report.reporter_id,
            description: report.description,
            location: LocationResponse {
                longitude: report.longitude,
                latitude: report.latitude,
                address: report.address,
                accuracy_meters: report.accuracy_meters,
            },
            status: report.status,
            priority: report.priority,
            assigned_to: report.assigned_to,
            resolved_at: report.resolved_at.map(|t| t.with_timezone(&Utc)),
            response_time_minutes: report.response_time_minutes,
            created_at: report.created_at.with_timezone(&Utc),
            updated_at: report.updated_at.with_timezone(&Utc),
            distance_meters: None,
        })
    }
}

impl TryFrom<NearbyReport> for ReportResponse {
    type Error = AppError;

    fn try_from(nearby: NearbyReport) -> Result<Self, Self::Error> {
        let mut response = Self::try_from(nearby.report)?;
        response.distance_meters = Some(nearby.distance_meters);
        Ok(response)
    }
}

fn to_responses<T>(reports: Vec<T>) -> AppResult<Vec<ReportResponse>>
where
    ReportResponse: TryFrom<T, Error = AppError>,
{
    reports.into_iter().map(ReportResponse::try_from).collect()
}

/// Single report payload.
#[derive(Debug, Serialize)]
pub struct ReportEnvelope {
    pub report: ReportResponse,
}

/// Report list payload.
#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub count: usize,
    pub reports: Vec<ReportResponse>,
}

/// Paged report list payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedReportListResponse {
    pub count: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub reports: Vec<ReportResponse>,
}

/// JSON creation request (no attachments).
#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub description: Option<String>,
    pub location: Option<serde_json::Value>,
}

/// Treat an empty query value (`?status=`) as an absent filter.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.trim().is_empty() => {
            T::deserialize(value.trim().to_string().into_deserializer()).map(Some)
        }
        _ => Ok(None),
    }
}

/// List reports query.
#[derive(Debug, Deserialize, Validate)]
pub struct ListReportsQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<ReportStatus>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub priority: Option<ReportPriority>,
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
}

/// Nearby reports query.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NearbyReportsQuery {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    #[validate(range(min = 0.0, max = MAX_SURFACE_DISTANCE_METERS))]
    pub max_distance: Option<f64>,
}

/// Update status request.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: ReportStatus,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(e.body_text())
    }
}

async fn read_multipart(mut multipart: Multipart) -> AppResult<RawSubmission> {
    let mut description = None;
    let mut location = None;
    let mut files = FileSlots::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "description" => {
                description = Some(field.text().await.map_err(multipart_error)?);
            }
            "location" => {
                let text = field.text().await.map_err(multipart_error)?;
                location = Some(LocationInput::Encoded(text));
            }
            _ if field.file_name().is_some() && Slot::from_field_name(&name).is_some() => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(multipart_error)?.to_vec();

                files.insert(
                    &name,
                    IncomingFile {
                        file_name,
                        content_type,
                        data,
                    },
                )?;
            }
            _ => {}
        }
    }

    Ok(RawSubmission {
        description,
        location,
        files,
    })
}

/// Submit a report (multipart form, or JSON without attachments).
async fn create_report(
    AuthCaller(caller): AuthCaller,
    RequestLocale(locale): RequestLocale,
    State(state): State<AppState>,
    request: Request,
) -> AppResult<ApiResponse<ReportEnvelope>> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let raw = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let Json(body): Json<CreateReportRequest> = Json::from_request(request, &state)
            .await
            .map_err(|e: JsonRejection| AppError::Validation(e.body_text()))?;
        RawSubmission {
            description: body.description,
            location: body.location.map(|value| match value {
                serde_json::Value::String(text) => LocationInput::Encoded(text),
                other => LocationInput::Structured(other),
            }),
            files: FileSlots::default(),
        }
    };

    let report = state.report_service.create(&caller, raw).await?;

    Ok(ApiResponse::created(ReportEnvelope {
        report: report.try_into()?,
    })
    .with_message(MessageKey::ReportCreated.text(locale)))
}

/// List all reports (admin).
async fn list_reports(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    query: Result<Query<ListReportsQuery>, QueryRejection>,
) -> AppResult<ApiResponse<PagedReportListResponse>> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    query.validate()?;

    let listing = state
        .report_service
        .list_all(
            &caller,
            ListQuery {
                status: query.status,
                priority: query.priority,
                page: query.page,
                limit: query.limit,
            },
        )
        .await?;

    Ok(ApiResponse::ok(PagedReportListResponse {
        count: listing.count,
        total_pages: listing.total_pages,
        current_page: listing.current_page,
        reports: to_responses(listing.reports)?,
    }))
}

/// List the caller's own reports.
async fn my_reports(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ReportListResponse>> {
    let reports = to_responses(state.report_service.my_reports(&caller).await?)?;

    Ok(ApiResponse::ok(ReportListResponse {
        count: reports.len(),
        reports,
    }))
}

/// Reports near a point.
async fn nearby_reports(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    query: Result<Query<NearbyReportsQuery>, QueryRejection>,
) -> AppResult<ApiResponse<ReportListResponse>> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    query.validate()?;

    let (Some(longitude), Some(latitude)) = (query.longitude, query.latitude) else {
        return Err(AppError::Validation(
            "Please provide longitude and latitude".to_string(),
        ));
    };

    let nearby = state
        .report_service
        .nearby(
            &caller,
            NearbyQuery {
                longitude,
                latitude,
                max_distance: query.max_distance,
            },
        )
        .await?;
    let reports = to_responses(nearby)?;

    Ok(ApiResponse::ok(ReportListResponse {
        count: reports.len(),
        reports,
    }))
}

/// Get a report by ID.
async fn get_report(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ReportEnvelope>> {
    let report = state.report_service.get_by_id(&caller, &id).await?;

    Ok(ApiResponse::ok(ReportEnvelope {
        report: report.try_into()?,
    }))
}

/// Update a report's status (admin).
async fn update_status(
    AuthCaller(caller): AuthCaller,
    RequestLocale(locale): RequestLocale,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AppResult<ApiResponse<ReportEnvelope>> {
    // Authorization is checked before the body is interpreted.
    caller.require_admin()?;
    let Json(req) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    req.validate()?;

    let report = state
        .report_service
        .update_status(
            &caller,
            &id,
            StatusUpdate {
                status: req.status,
                note: req.note,
            },
        )
        .await?;

    Ok(ApiResponse::ok(ReportEnvelope {
        report: report.try_into()?,
    })
    .with_message(MessageKey::StatusUpdated.text(locale)))
}

/// Delete a report (admin).
async fn delete_report(
    AuthCaller(caller): AuthCaller,
    RequestLocale(locale): RequestLocale,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Empty>> {
    state.report_service.delete(&caller, &id).await?;

    Ok(ApiResponse::ok(Empty::default()).with_message(MessageKey::ReportDeleted.text(locale)))
}
