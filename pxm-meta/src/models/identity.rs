//! Identity key normalization for reference entities
//!
//! Make and model strings come straight from EXIF and vary wildly between
//! vendors ("NIKON CORPORATION" vs "Nikon", "Canon EOS 5D" with make
//! "Canon"). Normalization turns them into a display name and a slug that
//! is identical for identical inputs.

use pxm_common::text::{clip, slugify, CLIP_DEFAULT, CLIP_SLUG};

/// Reserved slug of the Unknown instance
pub const UNKNOWN_SLUG: &str = "zz";

/// Display name of the Unknown instance
pub const UNKNOWN_NAME: &str = "Unknown";

/// Free-form descriptive fields an identity key is derived from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptiveFields {
    pub make: String,
    pub model: String,
}

impl DescriptiveFields {
    pub fn new(make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
        }
    }

    /// True when both fields are blank
    pub fn is_empty(&self) -> bool {
        self.make.trim().is_empty() && self.model.trim().is_empty()
    }
}

/// Result of normalizing descriptive fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    pub slug: String,
    pub name: String,
    pub make: String,
    pub model: String,
}

impl NormalizedIdentity {
    /// Normalize `fields`, mapping makes (and optionally models) through
    /// synonym tables.
    ///
    /// Returns `None` when the fields cannot form a key: both blank, or
    /// nothing slug-worthy left after normalization.
    pub fn new(
        fields: &DescriptiveFields,
        model_synonym: fn(&str) -> Option<&'static str>,
    ) -> Option<Self> {
        let mut make = clip(&fields.make, CLIP_DEFAULT);
        let mut model = clip(&fields.model, CLIP_DEFAULT);

        if make.is_empty() && model.is_empty() {
            return None;
        }

        let raw_make = make.clone();
        if let Some(canonical) = canonical_make(&make) {
            make = canonical.to_string();
        }

        // "Canon EF24-70mm" with make "Canon" becomes model "EF24-70mm"
        for prefix in [raw_make.as_str(), make.as_str()] {
            if let Some(rest) = strip_make_prefix(&model, prefix) {
                model = rest.to_string();
            }
        }

        if let Some(canonical) = model_synonym(&model) {
            model = canonical.to_string();
        }

        let name = [make.as_str(), model.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        // Transliteration can lengthen the text, so the slug is clipped again
        let slug = clip(&slugify(&clip(&name, CLIP_SLUG)), CLIP_SLUG)
            .trim_end_matches('-')
            .to_string();
        if slug.is_empty() {
            return None;
        }

        Some(Self {
            slug,
            name,
            make,
            model,
        })
    }
}

/// `model` without a leading `make` (ASCII case-insensitive, whole words only)
fn strip_make_prefix<'a>(model: &'a str, make: &str) -> Option<&'a str> {
    if make.is_empty() {
        return None;
    }

    let head = model.get(..make.len())?;
    let rest = &model[make.len()..];
    if head.eq_ignore_ascii_case(make) && (rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        Some(rest.trim())
    } else {
        None
    }
}

/// No model synonyms
pub fn no_model_synonym(_model: &str) -> Option<&'static str> {
    None
}

/// Canonical manufacturer names for the most common EXIF spellings
pub fn canonical_make(make: &str) -> Option<&'static str> {
    let canonical = match make {
        "ACER" => "Acer",
        "asus" | "ASUSTeK" => "ASUS",
        "Blackberry" => "BlackBerry",
        "Canon Inc." | "CANON" => "Canon",
        "EASTMAN KODAK COMPANY" | "KODAK" => "Kodak",
        "FUJIFILM" | "FUJIFILM Corporation" | "FUJI PHOTO FILM CO., LTD." => "Fujifilm",
        "Hewlett-Packard" => "HP",
        "HMD Global" => "Nokia",
        "HUAWEI" => "Huawei",
        "LEICA" | "Leica Camera AG" | "LEICA CAMERA AG" => "Leica",
        "LG Electronics" | "LGE" => "LG",
        "Motorola Mobility" | "motorola" => "Motorola",
        "NIKON" | "NIKON CORPORATION" => "Nikon",
        "OLYMPUS IMAGING CORP." | "OLYMPUS OPTICAL CO.,LTD" | "OLYMPUS CORPORATION" => "Olympus",
        "OM Digital Solutions" => "OM System",
        "Panasonic Corporation" => "Panasonic",
        "PENTAX" | "PENTAX Corporation" | "RICOH IMAGING COMPANY, LTD." => "Pentax",
        "samsung" | "SAMSUNG" | "SAMSUNG TECHWIN" => "Samsung",
        "SONY" => "Sony",
        "SIGMA" => "Sigma",
        "TAMRON" => "Tamron",
        "Xiaomi Communications Co., Ltd." => "Xiaomi",
        _ => return None,
    };

    Some(canonical)
}

/// Marketing names for camera model codes
pub fn canonical_camera_model(model: &str) -> Option<&'static str> {
    let canonical = match model {
        "ILCE-6000" => "Alpha 6000",
        "ILCE-7M3" => "Alpha 7 III",
        "ILCE-7RM4" => "Alpha 7R IV",
        "DSC-RX100M3" => "RX100 III",
        "SM-G991B" => "Galaxy S21",
        "WAS-LX1A" => "P10 lite",
        _ => return None,
    };

    Some(canonical)
}
