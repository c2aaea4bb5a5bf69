use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// One image to validate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub url: String,
    pub tenant_id: String,
    /// Delivery id of the triggering event; absent for synchronous pre-commit checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<String>,
}

impl ImageRef {
    pub fn new(url: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tenant_id: tenant_id.into(),
            source_event_id: None,
        }
    }

    pub fn with_source_event(mut self, source_event_id: impl Into<String>) -> Self {
        self.source_event_id = Some(source_event_id.into());
        self
    }
}

/// Raster container formats the probe recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormatKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl Display for ImageFormatKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ImageFormatKind::Jpeg => write!(f, "jpeg"),
            ImageFormatKind::Png => write!(f, "png"),
            ImageFormatKind::Gif => write!(f, "gif"),
            ImageFormatKind::Webp => write!(f, "webp"),
        }
    }
}

/// Metadata derived from fetched bytes. Width and height are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width_px: u32,
    pub height_px: u32,
    pub size_bytes: u64,
    pub format: ImageFormatKind,
}
