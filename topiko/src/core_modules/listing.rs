// THEORY:
// The `listing` module holds the data model shared by every layer of the
// directory. A `Listing` is owned by the hosted backend; from this crate's point
// of view it is an immutable record that only ever gets read, filtered, grouped
// and rendered.
//
// Key architectural principles:
// 1.  **Backend-Shaped Records**: Field names follow the backend's JSON rows
//     (`title_en`, `category_id`, ...) so rows deserialize without adapters.
// 2.  **Coordinates Are Untrusted**: Rows with a missing or `null` latitude or
//     longitude still deserialize, carrying `NaN`. The map layer checks
//     `has_valid_coords` and skips them instead of rejecting the whole payload.
// 3.  **Bilingual Text**: Every user-facing string comes as an English/Greek
//     pair, resolved through `Language`.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two interface languages of the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Gr,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Gr => "gr",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            // `el` is the ISO 639-1 code; `gr` is what the UI has always used.
            "gr" | "el" => Ok(Language::Gr),
            other => Err(format!("unknown language '{other}', expected 'en' or 'gr'")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coords {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Parses the `"lat,lon"` form used on the command line and in query strings.
impl FromStr for Coords {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 2 {
            return Err(format!("expected 'lat,lon', got '{s}'"));
        }
        let latitude = parts[0]
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid latitude '{}': {e}", parts[0].trim()))?;
        let longitude = parts[1]
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid longitude '{}': {e}", parts[1].trim()))?;
        let coords = Coords::new(latitude, longitude);
        if !coords.is_finite() {
            return Err(format!("coordinates must be finite, got '{s}'"));
        }
        Ok(coords)
    }
}

/// Contact block shown on a listing's detail page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub whatsapp: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
}

/// Ready-to-use links for the call / WhatsApp / email buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactLinks {
    pub call: String,
    pub whatsapp: String,
    pub email: String,
}

impl Contact {
    pub fn links(&self) -> ContactLinks {
        ContactLinks {
            call: format!("tel:{}", self.phone),
            whatsapp: format!("https://wa.me/{}", self.whatsapp),
            email: format!("mailto:{}", self.email),
        }
    }
}

/// A listing category with its localized names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name_en: String,
    pub name_gr: String,
    pub icon: String,
}

impl Category {
    pub fn name(&self, language: Language) -> &str {
        match language {
            Language::En => &self.name_en,
            Language::Gr => &self.name_gr,
        }
    }
}

/// A business or experience record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    #[serde(default)]
    pub title_en: String,
    #[serde(default)]
    pub title_gr: String,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub description_gr: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default = "missing_degrees", deserialize_with = "lenient_degrees")]
    pub lat: f64,
    #[serde(default = "missing_degrees", deserialize_with = "lenient_degrees")]
    pub lon: f64,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn missing_degrees() -> f64 {
    f64::NAN
}

fn lenient_degrees<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl Listing {
    /// Creates an approved listing with empty text fields.
    pub fn new(id: i64, category_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id,
            title_en: String::new(),
            title_gr: String::new(),
            description_en: String::new(),
            description_gr: String::new(),
            images: Vec::new(),
            contact: None,
            lat,
            lon,
            category_id: category_id.into(),
            approved: true,
            user_id: None,
            created_at: None,
        }
    }

    pub fn with_titles(mut self, en: impl Into<String>, gr: impl Into<String>) -> Self {
        self.title_en = en.into();
        self.title_gr = gr.into();
        self
    }

    pub fn with_descriptions(mut self, en: impl Into<String>, gr: impl Into<String>) -> Self {
        self.description_en = en.into();
        self.description_gr = gr.into();
        self
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Fills in a deterministic placeholder picture when the row has none.
    pub fn with_placeholder_image(mut self) -> Self {
        if self.images.is_empty() {
            self.images
                .push(format!("https://picsum.photos/seed/{}/400/300", self.id));
        }
        self
    }

    pub fn coords(&self) -> Coords {
        Coords::new(self.lat, self.lon)
    }

    /// Whether both coordinates are finite numbers. Listings failing this are
    /// never placed on the map.
    pub fn has_valid_coords(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn title(&self, language: Language) -> &str {
        match language {
            Language::En => &self.title_en,
            Language::Gr => &self.title_gr,
        }
    }

    pub fn description(&self, language: Language) -> &str {
        match language {
            Language::En => &self.description_en,
            Language::Gr => &self.description_gr,
        }
    }

    /// Case-insensitive substring match over both languages' titles and
    /// descriptions. `lowercased_term` must already be lowercase.
    pub fn matches_term(&self, lowercased_term: &str) -> bool {
        [
            &self.title_en,
            &self.title_gr,
            &self.description_en,
            &self.description_gr,
        ]
        .iter()
        .any(|text| text.to_lowercase().contains(lowercased_term))
    }

    pub fn directions_url(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.lat, self.lon
        )
    }

    pub fn detail_path(&self) -> String {
        format!("/listing/{}", self.id)
    }
}
