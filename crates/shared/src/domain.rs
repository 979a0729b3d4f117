use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(ProjectId);

/// Placement of the logo within the product image: a whole-value snapshot.
/// Later snapshots replace earlier ones; fields are never merged across
/// snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogoTransform {
    pub scale: f64,
    /// Degrees; any real value, normalization is up to the consumer.
    pub rotation: f64,
    /// Product-image-relative coordinates.
    pub x: f64,
    pub y: f64,
    /// In [0, 1].
    pub opacity: f64,
}

impl Default for LogoTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: 0.0,
            x: 200.0,
            y: 150.0,
            opacity: 1.0,
        }
    }
}

/// Bounding box of the logo placement zone. Persisted alongside the
/// transform but never mutated by the transform-sync path.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkingZone {
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSlot {
    #[serde(rename = "products")]
    Product,
    #[serde(rename = "logos")]
    Logo,
}

impl ImageSlot {
    /// Slot name as the upload service expects it.
    pub fn wire_name(self) -> &'static str {
        match self {
            ImageSlot::Product => "products",
            ImageSlot::Logo => "logos",
        }
    }

    /// Singular label for user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            ImageSlot::Product => "product",
            ImageSlot::Logo => "logo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub product_image_url: Option<String>,
    pub logo_image_url: Option<String>,
    pub result_image_url: Option<String>,
    pub marking_technique: Option<String>,
    pub logo_color: Option<String>,
    pub transform: LogoTransform,
    pub marking_zone: MarkingZone,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            product_image_url: None,
            logo_image_url: None,
            result_image_url: None,
            marking_technique: None,
            logo_color: None,
            transform: LogoTransform::default(),
            marking_zone: MarkingZone::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn image_url_for_slot(&self, slot: ImageSlot) -> Option<&str> {
        match slot {
            ImageSlot::Product => self.product_image_url.as_deref(),
            ImageSlot::Logo => self.logo_image_url.as_deref(),
        }
    }

    pub fn set_image_url_for_slot(&mut self, slot: ImageSlot, url: String) {
        match slot {
            ImageSlot::Product => self.product_image_url = Some(url),
            ImageSlot::Logo => self.logo_image_url = Some(url),
        }
    }
}
