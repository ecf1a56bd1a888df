//! Pre-submission intake checks
//!
//! Files dropped onto a conversion page are filtered before they become
//! jobs: a page holds a limited number of files of a limited size, and only
//! files the page's backend can convert. Each rejection class produces one
//! notification text for the UI.

use crate::settings::MediaKind;
use crate::types::file_extension;
use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Count and size limits of one conversion page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    pub max_files: usize,
    pub max_size_mb: u64,
}

impl IntakeLimits {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * MIB
    }
}

/// Limits of a media kind
pub fn limits(kind: MediaKind) -> IntakeLimits {
    let (max_files, max_size_mb) = match kind {
        MediaKind::Image => (10, 200),
        MediaKind::Document => (15, 100),
        MediaKind::Audio => (5, 512),
        MediaKind::Video => (5, 1024),
        MediaKind::Gif => (1, 250),
    };
    IntakeLimits {
        max_files,
        max_size_mb,
    }
}

/// Conversions the document backend supports, keyed by source extension
pub fn document_targets(extension: &str) -> &'static [&'static str] {
    match extension {
        "pdf" => &["txt", "docx", "jpeg", "png", "tiff", "webp", "bmp"],
        "docx" => &["pdf", "txt"],
        "txt" => &["pdf", "docx"],
        _ => &[],
    }
}

/// Target formats offered for a file: the kind's formats without the
/// file's own extension
pub fn available_formats(kind: MediaKind, file_name: &str) -> Vec<&'static str> {
    let current = file_extension(file_name).unwrap_or_default();
    let formats = match kind {
        MediaKind::Document => document_targets(&current),
        _ => kind.target_formats(),
    };
    formats
        .iter()
        .copied()
        .filter(|f| *f != current)
        .collect()
}

/// What the intake needs to know about a candidate file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub mime: Option<String>,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64, mime: Option<&str>) -> Self {
        Self {
            name: name.into(),
            size,
            mime: mime.map(str::to_string),
        }
    }

    fn mime(&self) -> &str {
        self.mime.as_deref().unwrap_or("")
    }

    /// Audio or video, judged by MIME prefix
    fn media_class(&self) -> Option<MediaKind> {
        let mime = self.mime();
        if mime.starts_with("audio/") {
            Some(MediaKind::Audio)
        } else if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Error,
    Warning,
}

/// Message shown to the user about rejected files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    fn error(message: String) -> Self {
        Self {
            level: NotificationLevel::Error,
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message,
        }
    }
}

/// Result of admitting a drop of files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub accepted: Vec<FileInfo>,
    pub notifications: Vec<Notification>,
}

fn kind_label(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "audio",
        _ => "video",
    }
}

fn too_many(limits: IntakeLimits, existing: usize) -> Notification {
    Notification::error(format!(
        "You can only add up to {} files at a time. You already have {} files.",
        limits.max_files, existing
    ))
}

fn too_large(count: usize, limits: IntakeLimits) -> Notification {
    Notification::warning(format!(
        "{} file(s) were rejected because they exceed the {}MB size limit.",
        count, limits.max_size_mb
    ))
}

/// Decide which of `incoming` may join a page already holding `existing`
pub fn admit(kind: MediaKind, existing: &[FileInfo], incoming: Vec<FileInfo>) -> Admission {
    match kind {
        MediaKind::Audio | MediaKind::Video => admit_media(existing, incoming),
        MediaKind::Gif => admit_gif(existing, incoming),
        MediaKind::Image | MediaKind::Document => admit_by_type(kind, existing, incoming),
    }
}

fn admit_by_type(kind: MediaKind, existing: &[FileInfo], incoming: Vec<FileInfo>) -> Admission {
    let limits = limits(kind);
    let mut admission = Admission::default();

    if existing.len() + incoming.len() > limits.max_files {
        admission.notifications.push(too_many(limits, existing.len()));
        return admission;
    }

    let total = incoming.len();
    let typed: Vec<FileInfo> = incoming
        .into_iter()
        .filter(|f| match kind {
            MediaKind::Image => f.mime().starts_with("image/"),
            _ => {
                !f.mime().starts_with("image/")
                    && file_extension(&f.name)
                        .map(|ext| MediaKind::Document.target_formats().contains(&ext.as_str()))
                        .unwrap_or(false)
            }
        })
        .collect();
    let rejected_for_type = total - typed.len();

    let typed_count = typed.len();
    admission.accepted = typed
        .into_iter()
        .filter(|f| f.size <= limits.max_size_bytes())
        .collect();
    let rejected_for_size = typed_count - admission.accepted.len();

    if rejected_for_type > 0 {
        let reason = match kind {
            MediaKind::Image => "they are not images",
            _ => "they are not supported document formats (images are not accepted)",
        };
        admission.notifications.push(Notification::warning(format!(
            "{} file(s) were rejected because {}.",
            rejected_for_type, reason
        )));
    }
    if rejected_for_size > 0 {
        admission
            .notifications
            .push(too_large(rejected_for_size, limits));
    }

    admission
}

/// Audio and video share one page, but a batch holds only one of them
fn admit_media(existing: &[FileInfo], incoming: Vec<FileInfo>) -> Admission {
    let max_files = limits(MediaKind::Audio).max_files;
    let mut admission = Admission::default();

    if existing.len() + incoming.len() > max_files {
        admission
            .notifications
            .push(too_many(limits(MediaKind::Audio), existing.len()));
        return admission;
    }

    let total = incoming.len();
    let media: Vec<FileInfo> = incoming
        .into_iter()
        .filter(|f| f.media_class().is_some())
        .collect();
    let rejected_non_media = total - media.len();
    if rejected_non_media > 0 {
        admission.notifications.push(Notification::warning(format!(
            "{} file(s) were rejected because they are not audio or video files.",
            rejected_non_media
        )));
    }

    let current = existing.first().and_then(FileInfo::media_class);
    if let Some(current) = current {
        if media.iter().any(|f| f.media_class() != Some(current)) {
            admission.notifications.push(Notification::warning(format!(
                "Cannot mix audio and video files. Please only add {} files.",
                kind_label(current)
            )));
            return admission;
        }
    }

    let Some(accepted_kind) = current.or_else(|| media.first().and_then(FileInfo::media_class))
    else {
        return admission;
    };
    let limits = limits(accepted_kind);

    let media_count = media.len();
    let same_type: Vec<FileInfo> = media
        .into_iter()
        .filter(|f| f.media_class() == Some(accepted_kind))
        .collect();
    let rejected_for_type = media_count - same_type.len();

    let same_type_count = same_type.len();
    admission.accepted = same_type
        .into_iter()
        .filter(|f| f.size <= limits.max_size_bytes())
        .collect();
    let rejected_for_size = same_type_count - admission.accepted.len();

    if rejected_for_type > 0 {
        admission.notifications.push(Notification::warning(format!(
            "{} file(s) were rejected because they are not {} files.",
            rejected_for_type,
            kind_label(accepted_kind)
        )));
    }
    if rejected_for_size > 0 {
        admission
            .notifications
            .push(too_large(rejected_for_size, limits));
    }

    admission
}

/// The GIF page takes a single video
fn admit_gif(existing: &[FileInfo], incoming: Vec<FileInfo>) -> Admission {
    let limits = limits(MediaKind::Gif);
    let mut admission = Admission::default();

    if existing.len() + incoming.len() > limits.max_files {
        admission.notifications.push(too_many(limits, existing.len()));
        return admission;
    }

    for file in incoming {
        if !file.mime().starts_with("video/") {
            admission.notifications.push(Notification::error(
                "Selected file is not a video. Please upload a video file.".to_string(),
            ));
        } else if file.size > limits.max_size_bytes() {
            admission.notifications.push(Notification::error(format!(
                "The file is too large. Maximum allowed file size is {}MB.",
                limits.max_size_mb
            )));
        } else {
            admission.accepted.push(file);
        }
    }

    admission
}
