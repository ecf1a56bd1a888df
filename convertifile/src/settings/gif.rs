//! Video-to-GIF settings
//!
//! GIF has a single target format, so there is no per-format table. The
//! backend treats a GIF job as a video job with the `gif` codec.

use super::EncodeRequest;
use crate::form::FormPayload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GifSettings {
    pub remove_metadata: bool,
    pub quality: u8,
    pub fps: u32,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub maintain_aspect_ratio: bool,
    pub r#loop: bool,
    pub dither: bool,
}

impl Default for GifSettings {
    fn default() -> Self {
        Self {
            remove_metadata: false,
            quality: 85,
            fps: 15,
            width: None,
            height: None,
            maintain_aspect_ratio: true,
            r#loop: true,
            dither: true,
        }
    }
}

impl EncodeRequest for GifSettings {
    fn encode_fields(&self, _format: &str, form: &mut FormPayload) {
        form.text("video_remove_metadata", self.remove_metadata);
        form.text("video_codec", "gif");
        form.text("video_fps", self.fps);
        form.text("gif_quality", self.quality);
        form.optional("gif_width", self.width.filter(|w| *w > 0));
        form.optional("gif_height", self.height.filter(|h| *h > 0));
        form.text("gif_maintain_aspect_ratio", self.maintain_aspect_ratio);
        form.text("gif_loop", self.r#loop);
        form.text("gif_dither", self.dither);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::encode_request;
    use crate::types::SourceFile;

    #[test]
    fn test_gif_defaults() {
        let file = SourceFile::new("skate.mp4", vec![0u8; 256]).with_mime("video/mp4");
        let form = encode_request(&file, "gif", &GifSettings::default());
        assert_eq!(
            form.field_names(),
            vec![
                "file",
                "convert_to",
                "video_remove_metadata",
                "video_codec",
                "video_fps",
                "gif_quality",
                "gif_maintain_aspect_ratio",
                "gif_loop",
                "gif_dither"
            ]
        );
        assert_eq!(form.get("video_codec"), Some("gif"));
        assert_eq!(form.get("video_fps"), Some("15"));
        assert_eq!(form.get("gif_quality"), Some("85"));
    }

    #[test]
    fn test_dimensions_when_set() {
        let file = SourceFile::new("skate.mp4", vec![0u8; 256]);
        let settings = GifSettings {
            width: Some(480),
            height: Some(0),
            r#loop: false,
            ..Default::default()
        };
        let form = encode_request(&file, "gif", &settings);
        assert_eq!(form.get("gif_width"), Some("480"));
        assert!(!form.has("gif_height"));
        assert_eq!(form.get("gif_loop"), Some("false"));
    }
}
