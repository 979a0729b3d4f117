use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LogoTransform, MarkingZone};

/// Full transform-related field set sent on every mockup save. The backend
/// treats this as an idempotent overwrite, so unrelated fields (marking
/// zone, technique) are carried through from current project state rather
/// than patched separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockupUpdateRequest {
    pub logo_scale: f64,
    pub logo_rotation: f64,
    pub marking_zone_x: f64,
    pub marking_zone_y: f64,
    pub marking_zone_w: f64,
    pub marking_zone_h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marking_technique: Option<String>,
    pub logo_opacity: f64,
}

impl MockupUpdateRequest {
    pub fn from_state(
        transform: LogoTransform,
        zone: MarkingZone,
        technique: Option<String>,
    ) -> Self {
        Self {
            logo_scale: transform.scale,
            logo_rotation: transform.rotation,
            marking_zone_x: transform.x,
            marking_zone_y: transform.y,
            marking_zone_w: zone.w,
            marking_zone_h: zone.h,
            marking_technique: technique,
            logo_opacity: transform.opacity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockupUpdateResponse {
    pub logo_scale: f64,
    pub logo_rotation: f64,
    pub marking_zone_x: f64,
    pub marking_zone_y: f64,
    pub marking_zone_w: f64,
    pub marking_zone_h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marking_technique: Option<String>,
    pub logo_opacity: f64,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot sent verbatim when asking the backend for a new render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateRequest {
    pub logo_scale: f64,
    pub logo_rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_color: Option<String>,
    pub marking_zone_x: f64,
    pub marking_zone_y: f64,
    pub marking_zone_w: f64,
    pub marking_zone_h: f64,
    pub marking_technique: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateResponse {
    pub result_image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadImageResponse {
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkingTechnique {
    pub name: String,
    pub display_name: String,
}
