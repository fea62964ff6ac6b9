//! Caller-facing message catalog.

use serde::{Deserialize, Serialize};

/// Supported response locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Arabic.
    #[default]
    Ar,
    /// English.
    En,
}

impl Locale {
    /// Parse a single language tag such as `ar-EG` or `en`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "ar" => Some(Self::Ar),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    /// Language tag for `Content-Language`.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
        }
    }

    /// Pick the preferred supported locale from an `Accept-Language` value.
    ///
    /// Entries are ranked by their `q` weight; entries with `q=0` are skipped.
    #[must_use]
    pub fn negotiate(header: &str) -> Option<Self> {
        let mut ranked: Vec<(f32, usize, Self)> = header
            .split(',')
            .enumerate()
            .filter_map(|(pos, entry)| {
                let mut parts = entry.split(';');
                let locale = Self::from_tag(parts.next()?)?;
                let weight = parts
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                (weight > 0.0).then_some((weight, pos, locale))
            })
            .collect();

        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.first().map(|(_, _, locale)| *locale)
    }
}

/// Catalog entries.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    Validation,
    UnsupportedMedia,
    PayloadTooLarge,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
    ReportCreated,
    StatusUpdated,
    ReportDeleted,
}

impl MessageKey {
    /// Message text in the given locale.
    #[must_use]
    pub const fn text(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Validation, Locale::Ar) => "البيانات المدخلة غير صحيحة",
            (Self::Validation, Locale::En) => "The submitted data is invalid",
            (Self::UnsupportedMedia, Locale::Ar) => "يُسمح فقط بملفات الصور والفيديو والصوت",
            (Self::UnsupportedMedia, Locale::En) => "Only image, video, and audio files are allowed",
            (Self::PayloadTooLarge, Locale::Ar) => "حجم الملف أكبر من المسموح",
            (Self::PayloadTooLarge, Locale::En) => "The file exceeds the allowed size",
            (Self::Unauthorized, Locale::Ar) => "رمز التحقق غير صحيح",
            (Self::Unauthorized, Locale::En) => "Invalid or missing access token",
            (Self::Forbidden, Locale::Ar) => "غير مصرح لك بتنفيذ هذا الإجراء",
            (Self::Forbidden, Locale::En) => "You are not allowed to perform this action",
            (Self::NotFound, Locale::Ar) => "البلاغ غير موجود",
            (Self::NotFound, Locale::En) => "Report not found",
            (Self::Internal, Locale::Ar) => "حدث خطأ في الخادم",
            (Self::Internal, Locale::En) => "An internal server error occurred",
            (Self::ReportCreated, Locale::Ar) => "تم إرسال البلاغ بنجاح",
            (Self::ReportCreated, Locale::En) => "Report submitted successfully",
            (Self::StatusUpdated, Locale::Ar) => "تم تحديث حالة البلاغ بنجاح",
            (Self::StatusUpdated, Locale::En) => "Report status updated successfully",
            (Self::ReportDeleted, Locale::Ar) => "تم حذف البلاغ بنجاح",
            (Self::ReportDeleted, Locale::En) => "Report deleted successfully",
        }
    }
}
