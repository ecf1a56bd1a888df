//! Image conversion settings

use super::EncodeRequest;
use crate::form::FormPayload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Page sizes accepted for PDF output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PageSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageSize::A3 => "A3",
            PageSize::A4 => "A4",
            PageSize::A5 => "A5",
            PageSize::Letter => "LETTER",
            PageSize::Legal => "LEGAL",
            PageSize::Tabloid => "TABLOID",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeParams {
    pub optimize: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionParams {
    pub compression: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvifParams {
    /// Encoder speed, 0 (slowest) to 10
    pub speed: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfParams {
    pub page_size: Option<PageSize>,
}

/// Per-format image parameters; every entry is kept across format switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageFormats {
    pub jpg: OptimizeParams,
    pub webp: OptimizeParams,
    pub png: OptimizeParams,
    pub bmp: CompressionParams,
    pub tga: CompressionParams,
    pub avif: AvifParams,
    pub pdf: PdfParams,
}

/// Live image parameters for the selected target format
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageFormatParams<'a> {
    Optimize(&'a OptimizeParams),
    BmpCompression(&'a CompressionParams),
    TgaCompression(&'a CompressionParams),
    Avif(&'a AvifParams),
    Pdf(&'a PdfParams),
}

impl ImageFormats {
    pub fn select(&self, format: &str) -> Option<ImageFormatParams<'_>> {
        match format {
            "jpg" => Some(ImageFormatParams::Optimize(&self.jpg)),
            "webp" => Some(ImageFormatParams::Optimize(&self.webp)),
            "png" => Some(ImageFormatParams::Optimize(&self.png)),
            "bmp" => Some(ImageFormatParams::BmpCompression(&self.bmp)),
            "tga" => Some(ImageFormatParams::TgaCompression(&self.tga)),
            "avif" => Some(ImageFormatParams::Avif(&self.avif)),
            "pdf" => Some(ImageFormatParams::Pdf(&self.pdf)),
            _ => None,
        }
    }
}

impl Default for ImageFormats {
    fn default() -> Self {
        Self {
            jpg: OptimizeParams { optimize: Some(true) },
            webp: OptimizeParams { optimize: Some(true) },
            png: OptimizeParams { optimize: Some(true) },
            bmp: CompressionParams { compression: Some(true) },
            tga: CompressionParams { compression: Some(true) },
            avif: AvifParams { speed: Some(6) },
            pdf: PdfParams { page_size: Some(PageSize::A4) },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageSettings {
    pub remove_metadata: bool,
    pub compression: bool,
    /// Output quality 1-100, sent only when compression is on
    pub quality: u8,
    pub format_specific: ImageFormats,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            remove_metadata: false,
            compression: false,
            quality: 100,
            format_specific: ImageFormats::default(),
        }
    }
}

impl EncodeRequest for ImageSettings {
    fn encode_fields(&self, format: &str, form: &mut FormPayload) {
        form.text("remove_metadata", self.remove_metadata);
        form.text("compression", self.compression);
        if self.compression {
            form.text("quality", self.quality);
        }

        match self.format_specific.select(format) {
            Some(ImageFormatParams::Optimize(p)) => form.optional("optimize", p.optimize),
            Some(ImageFormatParams::BmpCompression(p)) => {
                form.optional("bmp_compression", p.compression)
            }
            Some(ImageFormatParams::TgaCompression(p)) => {
                form.optional("tga_compression", p.compression)
            }
            Some(ImageFormatParams::Avif(p)) => form.optional("avif_speed", p.speed),
            Some(ImageFormatParams::Pdf(p)) => form.optional("page_size", p.page_size),
            None => {
                // Formats without own parameters get the backend's fallback block
                form.text("optimize", false);
                form.text("bmp_compression", true);
                form.text("tga_compression", true);
                form.text("avif_speed", 6);
                form.text("page_size", PageSize::A4);
            }
        }
    }
}
