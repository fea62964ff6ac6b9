//! Attachment normalizer.
//!
//! Turns the loose parts of a creation request (description, location and
//! named file parts) into a validated [`NormalizedSubmission`]. Nothing is
//! stored here; the report service uploads the validated files afterwards.

use roadwatch_common::{AppError, AppResult, GeoPoint};
use roadwatch_db::entities::accident_report::MimeClass;
use serde_json::Value;

/// Number of photo/video slots (`media_0` to `media_4`).
pub const MEDIA_SLOTS: usize = 5;

const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "webm"];

/// A named position a file part can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// `media_0` .. `media_4`.
    Media(usize),
    /// `voice`.
    Voice,
    /// `face_capture`.
    FaceCapture,
}

impl Slot {
    /// Resolve a form field name. Unknown names yield `None`.
    #[must_use]
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "voice" => Some(Self::Voice),
            "face_capture" => Some(Self::FaceCapture),
            _ => name
                .strip_prefix("media_")
                .and_then(|index| index.parse::<usize>().ok())
                .filter(|index| *index < MEDIA_SLOTS && name.len() == "media_".len() + 1)
                .map(Self::Media),
        }
    }

    /// Form field name of this slot.
    #[must_use]
    pub fn field_name(self) -> String {
        match self {
            Self::Media(index) => format!("media_{index}"),
            Self::Voice => "voice".to_string(),
            Self::FaceCapture => "face_capture".to_string(),
        }
    }

    /// Storage directory for files in this slot.
    #[must_use]
    pub const fn storage_dir(self) -> &'static str {
        match self {
            Self::Media(_) => "media",
            Self::Voice => "voice",
            Self::FaceCapture => "faces",
        }
    }

    const fn accepts(self, class: MimeClass) -> bool {
        match self {
            Self::Media(_) => true,
            Self::Voice => matches!(class, MimeClass::Audio),
            Self::FaceCapture => matches!(class, MimeClass::Image),
        }
    }
}

/// A file part as received.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Client-supplied file name.
    pub file_name: String,
    /// Declared mimetype.
    pub content_type: String,
    /// File bytes.
    pub data: Vec<u8>,
}

/// Received file parts, one per slot.
#[derive(Debug, Clone, Default)]
pub struct FileSlots {
    media: [Option<IncomingFile>; MEDIA_SLOTS],
    voice: Option<IncomingFile>,
    face_capture: Option<IncomingFile>,
}

impl FileSlots {
    /// Place a file part by its field name.
    ///
    /// Returns `Ok(false)` when the field is not a file slot or the part is an
    /// empty file input. A second file for the same slot is a validation error.
    pub fn insert(&mut self, field_name: &str, file: IncomingFile) -> AppResult<bool> {
        let Some(slot) = Slot::from_field_name(field_name) else {
            return Ok(false);
        };
        if file.file_name.is_empty() && file.data.is_empty() {
            return Ok(false);
        }

        let target = match slot {
            Slot::Media(index) => &mut self.media[index],
            Slot::Voice => &mut self.voice,
            Slot::FaceCapture => &mut self.face_capture,
        };
        if target.is_some() {
            return Err(AppError::Validation(format!(
                "Only one file is allowed for {field_name}"
            )));
        }
        *target = Some(file);
        Ok(true)
    }

    fn into_slots(self) -> impl Iterator<Item = (Slot, IncomingFile)> {
        let media = self
            .media
            .into_iter()
            .enumerate()
            .filter_map(|(index, file)| file.map(|f| (Slot::Media(index), f)));
        media
            .chain(self.voice.map(|f| (Slot::Voice, f)))
            .chain(self.face_capture.map(|f| (Slot::FaceCapture, f)))
    }
}

/// Location as supplied by the client.
#[derive(Debug, Clone)]
pub enum LocationInput {
    /// JSON-encoded object (multipart forms).
    Encoded(String),
    /// Already-structured object.
    Structured(Value),
}

/// Raw creation request.
#[derive(Debug, Clone, Default)]
pub struct RawSubmission {
    /// Free-text description.
    pub description: Option<String>,
    /// Location value.
    pub location: Option<LocationInput>,
    /// File parts.
    pub files: FileSlots,
}

/// Validated report location.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLocation {
    /// Coordinates.
    pub point: GeoPoint,
    /// Optional street address.
    pub address: Option<String>,
    /// Optional fix accuracy.
    pub accuracy_meters: Option<f64>,
}

/// A file that passed type and size checks.
#[derive(Debug, Clone)]
pub struct ValidatedFile {
    /// Slot the file was received in.
    pub slot: Slot,
    /// Client-supplied file name.
    pub file_name: String,
    /// Declared mimetype.
    pub content_type: String,
    /// Class derived from the mimetype.
    pub mime_class: MimeClass,
    /// File bytes.
    pub data: Vec<u8>,
}

/// Validated creation request.
#[derive(Debug, Clone)]
pub struct NormalizedSubmission {
    /// Trimmed, non-empty description.
    pub description: String,
    /// Location.
    pub location: ReportLocation,
    /// Photo/video/audio files in slot order.
    pub media: Vec<ValidatedFile>,
    /// Voice recording.
    pub voice: Option<ValidatedFile>,
    /// Identity capture image.
    pub identity_capture: Option<ValidatedFile>,
}

impl NormalizedSubmission {
    /// All files, in storage order.
    pub fn files(&self) -> impl Iterator<Item = &ValidatedFile> {
        self.media
            .iter()
            .chain(self.voice.iter())
            .chain(self.identity_capture.iter())
    }
}

/// Validates creation requests.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentNormalizer {
    max_file_size: u64,
}

impl AttachmentNormalizer {
    /// Create a normalizer with a per-file size ceiling.
    #[must_use]
    pub const fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Validate a raw submission.
    ///
    /// Checks run in order: description, location, then files by slot.
    pub fn normalize(&self, raw: RawSubmission) -> AppResult<NormalizedSubmission> {
        let description = raw
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AppError::Validation("Description is required".to_string()))?
            .to_string();

        let location = raw
            .location
            .ok_or_else(|| AppError::Validation("Location is required".to_string()))
            .and_then(parse_location)?;

        let mut media = Vec::new();
        let mut voice = None;
        let mut identity_capture = None;
        for (slot, file) in raw.files.into_slots() {
            let validated = self.validate_file(slot, file)?;
            match slot {
                Slot::Media(_) => media.push(validated),
                Slot::Voice => voice = Some(validated),
                Slot::FaceCapture => identity_capture = Some(validated),
            }
        }

        Ok(NormalizedSubmission {
            description,
            location,
            media,
            voice,
            identity_capture,
        })
    }

    fn validate_file(&self, slot: Slot, file: IncomingFile) -> AppResult<ValidatedFile> {
        let field = slot.field_name();
        let mime_class = classify_file(&file.file_name, &file.content_type).ok_or_else(|| {
            AppError::UnsupportedMedia(format!(
                "{field}: {} ({}) is not an allowed image, video or audio file",
                file.file_name, file.content_type
            ))
        })?;

        if !slot.accepts(mime_class) {
            return Err(AppError::UnsupportedMedia(format!(
                "{field} does not accept {} files",
                mime_class.as_str()
            )));
        }

        if file.data.len() as u64 > self.max_file_size {
            return Err(AppError::PayloadTooLarge(format!(
                "{field} exceeds {} bytes",
                self.max_file_size
            )));
        }

        Ok(ValidatedFile {
            slot,
            file_name: file.file_name,
            content_type: file.content_type,
            mime_class,
            data: file.data,
        })
    }
}

/// Class of a file whose mimetype prefix and extension agree.
#[must_use]
pub fn classify_file(file_name: &str, content_type: &str) -> Option<MimeClass> {
    let content_type = content_type.trim().to_ascii_lowercase();
    let (class, allowed) = match content_type.split('/').next()? {
        "image" => (MimeClass::Image, IMAGE_EXTENSIONS),
        "video" => (MimeClass::Video, VIDEO_EXTENSIONS),
        "audio" => (MimeClass::Audio, AUDIO_EXTENSIONS),
        _ => return None,
    };

    let (_, extension) = file_name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    allowed.contains(&extension.as_str()).then_some(class)
}

fn parse_location(input: LocationInput) -> AppResult<ReportLocation> {
    let value = match input {
        LocationInput::Structured(value) => value,
        LocationInput::Encoded(text) => serde_json::from_str(&text)
            .map_err(|e| AppError::Validation(format!("Location is not valid JSON: {e}")))?,
    };

    let Value::Object(fields) = value else {
        return Err(AppError::Validation(
            "Location must be an object".to_string(),
        ));
    };

    let latitude = coordinate(fields.get("latitude"), "latitude")?;
    let longitude = coordinate(fields.get("longitude"), "longitude")?;
    let point = GeoPoint::new(longitude, latitude)?;

    let address = match fields.get("address") {
        None | Some(Value::Null) => None,
        Some(Value::String(address)) => {
            Some(address.trim().to_string()).filter(|a| !a.is_empty())
        }
        Some(_) => {
            return Err(AppError::Validation(
                "Location address must be a string".to_string(),
            ));
        }
    };

    let accuracy_meters = match fields.get("accuracy") {
        None | Some(Value::Null) => None,
        Some(value) => {
            let accuracy = number(value)
                .filter(|a| a.is_finite() && *a >= 0.0)
                .ok_or_else(|| {
                    AppError::Validation(
                        "Location accuracy must be a non-negative number".to_string(),
                    )
                })?;
            Some(accuracy)
        }
    };

    Ok(ReportLocation {
        point,
        address,
        accuracy_meters,
    })
}

fn coordinate(value: Option<&Value>, name: &str) -> AppResult<f64> {
    value
        .and_then(number)
        .ok_or_else(|| AppError::Validation(format!("Location {name} must be a number")))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
