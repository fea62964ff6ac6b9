//! Report status lifecycle.
//!
//! ```text
//! pending ──► in_progress ──► resolved
//!    │             │
//!    └─────────────┴────────► rejected
//! ```
//!
//! Under [`TransitionPolicy::Permissive`] any status may follow any other;
//! [`TransitionPolicy::ForwardOnly`] only allows the arrows above (and
//! re-asserting the current status).

use chrono::{DateTime, Utc};
use roadwatch_common::{AppError, AppResult, TransitionPolicy};
use roadwatch_db::entities::accident_report::{self, ReportNote, ReportStatus};

/// Requested status change.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// Target status.
    pub status: ReportStatus,
    /// Optional note to append.
    pub note: Option<String>,
}

/// Whether `policy` allows moving from `from` to `to`.
#[must_use]
pub const fn is_transition_allowed(
    policy: TransitionPolicy,
    from: ReportStatus,
    to: ReportStatus,
) -> bool {
    use ReportStatus::{InProgress, Pending, Rejected, Resolved};

    match policy {
        TransitionPolicy::Permissive => true,
        TransitionPolicy::ForwardOnly if from.is_terminal() => {
            matches!((from, to), (Resolved, Resolved) | (Rejected, Rejected))
        }
        TransitionPolicy::ForwardOnly => matches!(
            (from, to),
            (Pending, _) | (InProgress, InProgress | Resolved | Rejected)
        ),
    }
}

/// Applies status updates to reports.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleManager {
    policy: TransitionPolicy,
}

impl LifecycleManager {
    /// Create a lifecycle manager.
    #[must_use]
    pub const fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    /// Compute the next state of `report`.
    ///
    /// The input is left untouched; the caller persists the result.
    pub fn apply(
        &self,
        report: &accident_report::Model,
        update: &StatusUpdate,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<accident_report::Model> {
        if !is_transition_allowed(self.policy, report.status, update.status) {
            return Err(AppError::Validation(format!(
                "Cannot change status from {} to {}",
                report.status.as_str(),
                update.status.as_str()
            )));
        }

        let mut next = report.clone();
        next.status = update.status;

        match update.status {
            ReportStatus::Resolved => {
                let created_at = report.created_at.with_timezone(&Utc);
                let resolved_at = now.max(created_at);
                next.resolved_at = Some(resolved_at.into());
                next.response_time_minutes =
                    Some((resolved_at - created_at).num_milliseconds() / 60_000);
            }
            _ => {
                next.resolved_at = None;
                next.response_time_minutes = None;
            }
        }

        if update.status == ReportStatus::InProgress && report.assigned_to.is_none() {
            next.assigned_to = Some(actor_id.to_string());
        }

        if let Some(text) = update.note.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let mut notes = report.notes()?;
            notes.push(ReportNote {
                author_id: actor_id.to_string(),
                text: text.to_string(),
                created_at: now,
            });
            next.notes = serde_json::to_value(notes)?;
        }

        next.updated_at = now.into();
        Ok(next)
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new(TransitionPolicy::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use roadwatch_db::entities::accident_report::ReportPriority;
    use serde_json::json;

    fn report_created_at(created_at: DateTime<Utc>, status: ReportStatus) -> accident_report::Model {
        accident_report::Model {
            id: "01j0000000000000000000000a".to_string(),
            reporter_id: "user1".to_string(),
            reporter_snapshot: json!({}),
            description: "Test".to_string(),
            longitude: 31.0,
            latitude: 30.0,
            address: None,
            accuracy_meters: None,
            attachments: json!([]),
            voice_recording: None,
            identity_capture: None,
            status,
            priority: ReportPriority::Medium,
            assigned_to: None,
            notes: json!([]),
            resolved_at: None,
            response_time_minutes: None,
            created_at: created_at.into(),
            updated_at: created_at.into(),
        }
    }

    fn update(status: ReportStatus, note: Option<&str>) -> StatusUpdate {
        StatusUpdate {
            status,
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn test_resolve_computes_response_time() {
        let now = Utc::now();
        let created = now - Duration::minutes(90) - Duration::seconds(59);
        let report = report_created_at(created, ReportStatus::InProgress);

        let next = LifecycleManager::default()
            .apply(&report, &update(ReportStatus::Resolved, None), "admin1", now)
            .unwrap();

        assert_eq!(next.status, ReportStatus::Resolved);
        assert_eq!(next.response_time_minutes, Some(90));
        assert_eq!(next.resolved_at.unwrap().with_timezone(&Utc), now);
        assert_eq!(next.updated_at.with_timezone(&Utc), now);
    }

    #[test]
    fn test_resolved_at_never_precedes_creation() {
        let now = Utc::now();
        // Clock skew between the writer of created_at and this process.
        let report = report_created_at(now + Duration::seconds(5), ReportStatus::Pending);

        let next = LifecycleManager::default()
            .apply(&report, &update(ReportStatus::Resolved, None), "admin1", now)
            .unwrap();

        assert!(next.resolved_at.unwrap() >= next.created_at);
        assert_eq!(next.response_time_minutes, Some(0));
    }

    #[test]
    fn test_re_resolve_recomputes() {
        let created = Utc::now() - Duration::hours(3);
        let manager = LifecycleManager::default();
        let first = manager
            .apply(
                &report_created_at(created, ReportStatus::Pending),
                &update(ReportStatus::Resolved, None),
                "admin1",
                created + Duration::minutes(10),
            )
            .unwrap();

        let second = manager
            .apply(
                &first,
                &update(ReportStatus::Resolved, None),
                "admin1",
                created + Duration::minutes(45),
            )
            .unwrap();

        assert_eq!(first.response_time_minutes, Some(10));
        assert_eq!(second.response_time_minutes, Some(45));
    }

    #[test]
    fn test_leaving_resolved_clears_resolution() {
        let created = Utc::now() - Duration::hours(1);
        let manager = LifecycleManager::default();
        let resolved = manager
            .apply(
                &report_created_at(created, ReportStatus::Pending),
                &update(ReportStatus::Resolved, None),
                "admin1",
                Utc::now(),
            )
            .unwrap();

        let reopened = manager
            .apply(&resolved, &update(ReportStatus::Pending, None), "admin1", Utc::now())
            .unwrap();

        assert_eq!(reopened.status, ReportStatus::Pending);
        assert!(reopened.resolved_at.is_none());
        assert!(reopened.response_time_minutes.is_none());
    }

    #[test]
    fn test_note_appended_without_status_change() {
        let report = report_created_at(Utc::now(), ReportStatus::Pending);
        let manager = LifecycleManager::default();

        let next = manager
            .apply(
                &report,
                &update(ReportStatus::Pending, Some("  called the reporter ")),
                "admin1",
                Utc::now(),
            )
            .unwrap();
        let again = manager
            .apply(&next, &update(ReportStatus::Pending, Some("second")), "admin2", Utc::now())
            .unwrap();

        let notes = again.notes().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].text, "called the reporter");
        assert_eq!(notes[0].author_id, "admin1");
        assert_eq!(notes[1].author_id, "admin2");
    }

    #[test]
    fn test_blank_note_not_appended() {
        let report = report_created_at(Utc::now(), ReportStatus::Pending);

        let next = LifecycleManager::default()
            .apply(&report, &update(ReportStatus::InProgress, Some("   ")), "admin1", Utc::now())
            .unwrap();

        assert!(next.notes().unwrap().is_empty());
    }

    #[test]
    fn test_in_progress_assigns_actor_once() {
        let manager = LifecycleManager::default();
        let report = report_created_at(Utc::now(), ReportStatus::Pending);

        let taken = manager
            .apply(&report, &update(ReportStatus::InProgress, None), "admin1", Utc::now())
            .unwrap();
        assert_eq!(taken.assigned_to.as_deref(), Some("admin1"));

        let again = manager
            .apply(&taken, &update(ReportStatus::InProgress, None), "admin2", Utc::now())
            .unwrap();
        assert_eq!(again.assigned_to.as_deref(), Some("admin1"));
    }

    #[test]
    fn test_updates_from_one_snapshot_do_not_merge() {
        let manager = LifecycleManager::default();
        let snapshot = report_created_at(Utc::now(), ReportStatus::Pending);

        let first = manager
            .apply(
                &snapshot,
                &update(ReportStatus::InProgress, Some("ambulance dispatched")),
                "admin1",
                Utc::now(),
            )
            .unwrap();
        let second = manager
            .apply(
                &snapshot,
                &update(ReportStatus::Rejected, Some("duplicate report")),
                "admin2",
                Utc::now(),
            )
            .unwrap();

        assert_eq!(first.assigned_to.as_deref(), Some("admin1"));

        // Persisting `second` after `first` discards the first handler's
        // status, note and assignment.
        let notes = second.notes().unwrap();
        assert_eq!(second.status, ReportStatus::Rejected);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "duplicate report");
        assert!(second.assigned_to.is_none());
    }

    #[test]
    fn test_permissive_allows_everything() {
        let all = [
            ReportStatus::Pending,
            ReportStatus::InProgress,
            ReportStatus::Resolved,
            ReportStatus::Rejected,
        ];
        for from in all {
            for to in all {
                assert!(is_transition_allowed(TransitionPolicy::Permissive, from, to));
            }
        }
    }

    #[test]
    fn test_forward_only_table() {
        use ReportStatus::{InProgress, Pending, Rejected, Resolved};
        let forward = TransitionPolicy::ForwardOnly;

        assert!(is_transition_allowed(forward, Pending, InProgress));
        assert!(is_transition_allowed(forward, Pending, Rejected));
        assert!(is_transition_allowed(forward, InProgress, Resolved));
        assert!(is_transition_allowed(forward, Resolved, Resolved));
        assert!(!is_transition_allowed(forward, Resolved, Pending));
        assert!(!is_transition_allowed(forward, Rejected, InProgress));
        assert!(!is_transition_allowed(forward, InProgress, Pending));
        assert!(!is_transition_allowed(forward, Resolved, Rejected));
        assert!(is_transition_allowed(forward, Rejected, Rejected));
        assert!(is_transition_allowed(forward, Pending, Pending));

        let report = report_created_at(Utc::now(), Resolved);
        assert!(matches!(
            LifecycleManager::new(forward).apply(&report, &update(Pending, None), "admin1", Utc::now()),
            Err(AppError::Validation(_))
        ));
    }
}
