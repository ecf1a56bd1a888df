//! Audio conversion settings

use super::EncodeRequest;
use crate::form::FormPayload;
use serde::{Deserialize, Serialize};

/// mp3, ogg and opus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LossyAudioParams {
    /// Bitrate in the encoder's own notation, e.g. `192k`; sent verbatim
    pub bitrate: Option<String>,
    pub compression_level: Option<u8>,
    pub sample_rate: Option<u32>,
}

/// Codecs that only take a bitrate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BitrateParams {
    pub bitrate: Option<String>,
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlacParams {
    pub compression_level: Option<u8>,
    pub lossless: Option<bool>,
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFormats {
    pub mp3: LossyAudioParams,
    pub ogg: LossyAudioParams,
    pub opus: LossyAudioParams,
    pub aac: BitrateParams,
    pub m4a: BitrateParams,
    pub wma: BitrateParams,
    pub amr: BitrateParams,
    pub ac3: BitrateParams,
    pub flac: FlacParams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioFormatParams<'a> {
    Lossy(&'a LossyAudioParams),
    Bitrate(&'a BitrateParams),
    Flac(&'a FlacParams),
}

impl AudioFormats {
    pub fn select(&self, format: &str) -> Option<AudioFormatParams<'_>> {
        match format {
            "mp3" => Some(AudioFormatParams::Lossy(&self.mp3)),
            "ogg" => Some(AudioFormatParams::Lossy(&self.ogg)),
            "opus" => Some(AudioFormatParams::Lossy(&self.opus)),
            "aac" => Some(AudioFormatParams::Bitrate(&self.aac)),
            "m4a" => Some(AudioFormatParams::Bitrate(&self.m4a)),
            "wma" => Some(AudioFormatParams::Bitrate(&self.wma)),
            "amr" => Some(AudioFormatParams::Bitrate(&self.amr)),
            "ac3" => Some(AudioFormatParams::Bitrate(&self.ac3)),
            "flac" => Some(AudioFormatParams::Flac(&self.flac)),
            _ => None,
        }
    }
}

impl Default for AudioFormats {
    fn default() -> Self {
        let lossy = |level| LossyAudioParams {
            bitrate: Some("192k".to_string()),
            compression_level: Some(level),
            sample_rate: None,
        };
        let bitrate = || BitrateParams {
            bitrate: Some("192k".to_string()),
            sample_rate: None,
        };
        Self {
            mp3: lossy(6),
            ogg: lossy(10),
            opus: lossy(10),
            aac: bitrate(),
            m4a: bitrate(),
            wma: bitrate(),
            amr: bitrate(),
            ac3: bitrate(),
            flac: FlacParams {
                compression_level: Some(5),
                lossless: None,
                sample_rate: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettings {
    pub remove_metadata: bool,
    pub channels: Option<u8>,
    pub sample_rate: Option<u32>,
    /// Encoder name, e.g. `libmp3lame`; the backend picks one when unset
    pub codec: Option<String>,
    pub format_specific: AudioFormats,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            remove_metadata: false,
            channels: Some(2),
            sample_rate: Some(44100),
            codec: None,
            format_specific: AudioFormats::default(),
        }
    }
}

impl EncodeRequest for AudioSettings {
    fn encode_fields(&self, format: &str, form: &mut FormPayload) {
        form.text("audio_remove_metadata", self.remove_metadata);
        form.optional("channels", self.channels);
        form.optional("sample_rate", self.sample_rate);
        form.optional("audio_codec", self.codec.as_deref().filter(|c| !c.is_empty()));

        let (bitrate, level, lossless, sample_rate) = match self.format_specific.select(format) {
            Some(AudioFormatParams::Lossy(p)) => {
                (p.bitrate.as_deref(), p.compression_level, None, p.sample_rate)
            }
            Some(AudioFormatParams::Bitrate(p)) => (p.bitrate.as_deref(), None, None, p.sample_rate),
            Some(AudioFormatParams::Flac(p)) => (None, p.compression_level, p.lossless, p.sample_rate),
            None => return,
        };

        form.optional("bitrate", bitrate.filter(|b| !b.is_empty()));
        form.optional("compression_level", level);
        form.optional("lossless", lossless);
        // A format-level sample rate goes out as an additional part
        form.optional("sample_rate", sample_rate);
    }
}
