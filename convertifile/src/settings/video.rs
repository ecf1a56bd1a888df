//! Video conversion settings

use super::EncodeRequest;
use crate::form::FormPayload;
use serde::{Deserialize, Serialize};

/// Containers encoded with the x264/x265 family (mp4, mkv, mov, ts, mts)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct H264FamilyParams {
    pub profile: Option<String>,
    pub level: Option<String>,
    pub crf: Option<u8>,
    pub speed: Option<String>,
    /// Target bitrate in Mbps
    pub bitrate: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebmParams {
    pub speed: Option<String>,
    /// Target bitrate in Mbps
    pub bitrate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoFormats {
    pub mp4: H264FamilyParams,
    pub webm: WebmParams,
    pub mkv: H264FamilyParams,
    pub mov: H264FamilyParams,
    pub ts: H264FamilyParams,
    pub mts: H264FamilyParams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VideoFormatParams<'a> {
    H264Family(&'a H264FamilyParams),
    Webm(&'a WebmParams),
}

impl VideoFormats {
    pub fn select(&self, format: &str) -> Option<VideoFormatParams<'_>> {
        match format {
            "mp4" => Some(VideoFormatParams::H264Family(&self.mp4)),
            "mkv" => Some(VideoFormatParams::H264Family(&self.mkv)),
            "mov" => Some(VideoFormatParams::H264Family(&self.mov)),
            "ts" => Some(VideoFormatParams::H264Family(&self.ts)),
            "mts" => Some(VideoFormatParams::H264Family(&self.mts)),
            "webm" => Some(VideoFormatParams::Webm(&self.webm)),
            _ => None,
        }
    }
}

impl Default for VideoFormats {
    fn default() -> Self {
        let x264 = || H264FamilyParams {
            profile: Some("main".to_string()),
            level: Some("4.0".to_string()),
            crf: Some(23),
            speed: Some("medium".to_string()),
            bitrate: Some(8),
        };
        Self {
            mp4: x264(),
            webm: WebmParams {
                speed: Some("good".to_string()),
                bitrate: Some(6),
            },
            mkv: x264(),
            mov: x264(),
            ts: x264(),
            mts: x264(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSettings {
    pub remove_metadata: bool,
    pub codec: Option<String>,
    pub fps: Option<u32>,
    pub format_specific: VideoFormats,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            remove_metadata: false,
            codec: Some("libx264".to_string()),
            fps: None,
            format_specific: VideoFormats::default(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Bitrates are stored in Mbps and sent as `<N>M`
fn mbps(value: Option<u32>) -> Option<String> {
    value.filter(|b| *b > 0).map(|b| format!("{}M", b))
}

impl EncodeRequest for VideoSettings {
    fn encode_fields(&self, format: &str, form: &mut FormPayload) {
        form.text("video_remove_metadata", self.remove_metadata);
        form.optional("video_codec", non_empty(&self.codec));
        form.optional("video_fps", self.fps);

        match self.format_specific.select(format) {
            Some(VideoFormatParams::H264Family(p)) => {
                form.optional("video_profile", non_empty(&p.profile));
                form.optional("video_level", non_empty(&p.level));
                form.optional("video_crf", p.crf);
                form.optional("video_speed", non_empty(&p.speed));
                form.optional("video_bitrate", mbps(p.bitrate));
            }
            Some(VideoFormatParams::Webm(p)) => {
                form.optional("video_speed", non_empty(&p.speed));
                form.optional("video_bitrate", mbps(p.bitrate));
            }
            None => {}
        }
    }
}
