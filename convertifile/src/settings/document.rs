//! Document conversion settings
//!
//! Only raster outputs of a document carry parameters. The document
//! backend has no metadata flag.

use super::EncodeRequest;
use crate::form::FormPayload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterQualityParams {
    pub dpi: Option<u32>,
    pub quality: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterParams {
    pub dpi: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentFormats {
    pub jpeg: RasterQualityParams,
    pub webp: RasterQualityParams,
    pub png: RasterParams,
    pub bmp: RasterParams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocumentFormatParams<'a> {
    Lossy(&'a RasterQualityParams),
    Lossless(&'a RasterParams),
}

impl DocumentFormats {
    pub fn select(&self, format: &str) -> Option<DocumentFormatParams<'_>> {
        match format {
            "jpeg" | "jpg" => Some(DocumentFormatParams::Lossy(&self.jpeg)),
            "webp" => Some(DocumentFormatParams::Lossy(&self.webp)),
            "png" => Some(DocumentFormatParams::Lossless(&self.png)),
            "bmp" => Some(DocumentFormatParams::Lossless(&self.bmp)),
            _ => None,
        }
    }
}

impl Default for DocumentFormats {
    fn default() -> Self {
        Self {
            jpeg: RasterQualityParams {
                dpi: Some(200),
                quality: Some(100),
            },
            webp: RasterQualityParams {
                dpi: Some(200),
                quality: Some(100),
            },
            png: RasterParams { dpi: Some(300) },
            bmp: RasterParams { dpi: Some(300) },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentSettings {
    pub format_specific: DocumentFormats,
}

impl EncodeRequest for DocumentSettings {
    fn encode_fields(&self, format: &str, form: &mut FormPayload) {
        match self.format_specific.select(format) {
            Some(DocumentFormatParams::Lossy(p)) => {
                form.optional("dpi", p.dpi);
                form.optional("quality", p.quality);
            }
            Some(DocumentFormatParams::Lossless(p)) => form.optional("dpi", p.dpi),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::encode_request;
    use crate::types::SourceFile;

    fn report() -> SourceFile {
        SourceFile::new("report.pdf", vec![0u8; 32]).with_mime("application/pdf")
    }

    #[test]
    fn test_jpeg_sends_dpi_and_quality() {
        let form = encode_request(&report(), "jpeg", &DocumentSettings::default());
        assert_eq!(form.get("dpi"), Some("200"));
        assert_eq!(form.get("quality"), Some("100"));
    }

    #[test]
    fn test_png_sends_dpi_only() {
        let form = encode_request(&report(), "png", &DocumentSettings::default());
        assert_eq!(form.get("dpi"), Some("300"));
        assert!(!form.has("quality"));
    }

    #[test]
    fn test_text_output_has_no_extra_fields() {
        let form = encode_request(&report(), "txt", &DocumentSettings::default());
        assert_eq!(form.field_names(), vec!["file", "convert_to"]);
    }

    #[test]
    fn test_missing_quality_is_omitted() {
        let mut settings = DocumentSettings::default();
        settings.format_specific.webp.quality = None;
        let form = encode_request(&report(), "webp", &settings);
        assert!(form.has("dpi"));
        assert!(!form.has("quality"));
    }
}
