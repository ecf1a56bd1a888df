//! Conversion settings and request encoders
//!
//! One settings type per media kind. Format-specific parameters live in a
//! struct with one typed field per target format; `select(format)` returns
//! the live entry as a sum type while every other entry is kept, so edits
//! made for one format survive switching to another.
//!
//! Each settings type implements [`EncodeRequest`], which appends its
//! fields to a [`FormPayload`] using the backend's field names. Those names
//! differ between media kinds (`remove_metadata`, `audio_remove_metadata`,
//! `video_remove_metadata`) and are kept exactly as the backend expects.

mod audio;
mod document;
mod gif;
mod image;
mod video;

pub use audio::{
    AudioFormatParams, AudioFormats, AudioSettings, BitrateParams, FlacParams, LossyAudioParams,
};
pub use document::{
    DocumentFormatParams, DocumentFormats, DocumentSettings, RasterParams, RasterQualityParams,
};
pub use gif::GifSettings;
pub use image::{
    AvifParams, CompressionParams, ImageFormatParams, ImageFormats, ImageSettings, OptimizeParams,
    PageSize, PdfParams,
};
pub use video::{H264FamilyParams, VideoFormatParams, VideoFormats, VideoSettings, WebmParams};

use crate::form::FormPayload;
use crate::types::SourceFile;
use serde::{Deserialize, Serialize};

/// Appends media-specific fields to a conversion request
pub trait EncodeRequest {
    /// Append every field for `format` (already lower-cased) to `form`
    fn encode_fields(&self, format: &str, form: &mut FormPayload);
}

/// Build the full multipart payload for one job
pub fn encode_request<S: EncodeRequest + ?Sized>(
    file: &SourceFile,
    format: &str,
    settings: &S,
) -> FormPayload {
    let mut form = FormPayload::new(file, format);
    settings.encode_fields(&format.to_lowercase(), &mut form);
    form
}

/// Media kind of a conversion page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Document,
    Audio,
    Video,
    Gif,
}

impl MediaKind {
    pub const ALL: [MediaKind; 5] = [
        MediaKind::Image,
        MediaKind::Document,
        MediaKind::Audio,
        MediaKind::Video,
        MediaKind::Gif,
    ];

    /// Target formats offered for this kind
    pub fn target_formats(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &[
                "jpg", "png", "webp", "gif", "bmp", "tiff", "ico", "heic", "avif", "pdf", "pbm",
                "ppm", "tga", "sgi",
            ],
            MediaKind::Document => &["pdf", "docx", "txt", "jpeg", "png", "tiff", "webp", "bmp"],
            MediaKind::Audio => &[
                "mp3", "ogg", "opus", "aac", "m4a", "flac", "alac", "wav", "aiff", "wma", "amr",
                "ac3",
            ],
            MediaKind::Video => &["mp4", "webm", "mkv", "mov", "avi", "wmv", "flv", "ts", "mts"],
            MediaKind::Gif => &["gif"],
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "document" | "doc" => Some(MediaKind::Document),
            "audio" => Some(MediaKind::Audio),
            "video" => Some(MediaKind::Video),
            "gif" => Some(MediaKind::Gif),
            _ => None,
        }
    }
}

/// Settings of one job, tagged by media kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConversionSettings {
    Image(ImageSettings),
    Document(DocumentSettings),
    Audio(AudioSettings),
    Video(VideoSettings),
    Gif(GifSettings),
}

impl ConversionSettings {
    /// Defaults a freshly added file starts with
    pub fn defaults(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => ConversionSettings::Image(ImageSettings::default()),
            MediaKind::Document => ConversionSettings::Document(DocumentSettings::default()),
            MediaKind::Audio => ConversionSettings::Audio(AudioSettings::default()),
            MediaKind::Video => ConversionSettings::Video(VideoSettings::default()),
            MediaKind::Gif => ConversionSettings::Gif(GifSettings::default()),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            ConversionSettings::Image(_) => MediaKind::Image,
            ConversionSettings::Document(_) => MediaKind::Document,
            ConversionSettings::Audio(_) => MediaKind::Audio,
            ConversionSettings::Video(_) => MediaKind::Video,
            ConversionSettings::Gif(_) => MediaKind::Gif,
        }
    }

    /// Encode `file` for conversion to `format` with these settings
    pub fn encode(&self, file: &SourceFile, format: &str) -> FormPayload {
        encode_request(file, format, self)
    }
}

impl EncodeRequest for ConversionSettings {
    fn encode_fields(&self, format: &str, form: &mut FormPayload) {
        match self {
            ConversionSettings::Image(s) => s.encode_fields(format, form),
            ConversionSettings::Document(s) => s.encode_fields(format, form),
            ConversionSettings::Audio(s) => s.encode_fields(format, form),
            ConversionSettings::Video(s) => s.encode_fields(format, form),
            ConversionSettings::Gif(s) => s.encode_fields(format, form),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_match_kind() {
        for kind in MediaKind::ALL {
            assert_eq!(ConversionSettings::defaults(kind).kind(), kind);
        }
    }

    #[test]
    fn test_format_is_lower_cased_for_lookup() {
        let file = SourceFile::new("photo.heic", vec![0u8; 8]);
        let settings = ConversionSettings::defaults(MediaKind::Image);
        let form = settings.encode(&file, "JPG");
        assert_eq!(form.get("convert_to"), Some("JPG"));
        assert_eq!(form.get("optimize"), Some("true"));
    }

    #[test]
    fn test_settings_deserialize_with_kind_tag() {
        let value = json!({
            "kind": "gif",
            "removeMetadata": true,
            "quality": 70,
            "fps": 12,
            "maintainAspectRatio": true,
            "loop": false,
            "dither": true
        });
        let settings: ConversionSettings = serde_json::from_value(value).unwrap();
        match settings {
            ConversionSettings::Gif(gif) => {
                assert!(gif.remove_metadata);
                assert_eq!(gif.fps, 12);
                assert!(!gif.r#loop);
            }
            other => panic!("unexpected settings: {:?}", other),
        }
    }

    #[test]
    fn test_media_kind_formats() {
        assert_eq!(MediaKind::Gif.target_formats(), &["gif"]);
        assert!(MediaKind::Video.target_formats().contains(&"mts"));
        assert_eq!(MediaKind::parse("Doc"), Some(MediaKind::Document));
        assert_eq!(MediaKind::parse("spreadsheet"), None);
    }
}
