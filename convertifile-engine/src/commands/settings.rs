use crate::types::ValidateFilesParams;
use convertifile::{admit, available_formats as formats_for, Admission, ConversionSettings, MediaKind};

pub fn default_settings(kind: MediaKind) -> ConversionSettings {
    ConversionSettings::defaults(kind)
}

pub fn available_formats(kind: MediaKind, file_name: &str) -> Vec<&'static str> {
    formats_for(kind, file_name)
}

/// Decide which of the incoming files join the selection
pub fn validate_files(params: ValidateFilesParams) -> Admission {
    admit(params.kind, &params.existing, params.incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use convertifile::FileInfo;

    #[test]
    fn test_available_formats_skip_own_extension() {
        let formats = available_formats(MediaKind::Image, "photo.png");
        assert!(!formats.contains(&"png"));
        assert!(formats.contains(&"jpg"));
    }

    #[test]
    fn test_validate_files_rejects_mixed_media() {
        let params = ValidateFilesParams {
            kind: MediaKind::Audio,
            existing: vec![FileInfo::new("a.mp3", 1024, Some("audio/mpeg"))],
            incoming: vec![FileInfo::new("b.mp4", 1024, Some("video/mp4"))],
        };
        let admission = validate_files(params);
        assert!(admission.accepted.is_empty());
        assert!(!admission.notifications.is_empty());
    }
}
