use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ScryError;

/// Quality label → image URL, as published on a card or a card face.
pub type ImageVariants = BTreeMap<String, String>;

/// Separator used in the full name of multi-face cards ("Fire // Ice").
pub const FACE_SEPARATOR: &str = "//";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Small,
    Normal,
    #[default]
    Large,
}

impl Quality {
    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Small => "small",
            Quality::Normal => "normal",
            Quality::Large => "large",
        }
    }

    /// Lookup order used when picking an image: the preferred quality first,
    /// then the catalog's usual sizes.
    pub fn fallback_chain(self) -> [Quality; 4] {
        [self, Quality::Normal, Quality::Small, Quality::Large]
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ScryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Quality::Small),
            "normal" => Ok(Quality::Normal),
            "large" => Ok(Quality::Large),
            _ => Err(ScryError::InvalidQuality(value.to_string())),
        }
    }
}

/// Number of image downloads allowed in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct ConcurrencyLimit(usize);

impl ConcurrencyLimit {
    pub const MIN: usize = 1;
    pub const MAX: usize = 50;

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<usize> for ConcurrencyLimit {
    type Error = ScryError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ScryError::InvalidConcurrency(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl From<ConcurrencyLimit> for usize {
    fn from(value: ConcurrencyLimit) -> Self {
        value.0
    }
}

impl FromStr for ConcurrencyLimit {
    type Err = ScryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<usize>()
            .map_err(|_| ScryError::InvalidConcurrency(value.to_string()))?;
        Self::try_from(parsed)
    }
}

impl fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical arrangement of a card. Layouts the planner does not model
/// explicitly are kept verbatim in `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Layout {
    #[default]
    Normal,
    Adventure,
    Transform,
    ModalDoubleFaced,
    Reversible,
    DoubleFacedToken,
    Split,
    Flip,
    Other(String),
}

impl Layout {
    pub fn as_str(&self) -> &str {
        match self {
            Layout::Normal => "normal",
            Layout::Adventure => "adventure",
            Layout::Transform => "transform",
            Layout::ModalDoubleFaced => "modal_dfc",
            Layout::Reversible => "reversible_card",
            Layout::DoubleFacedToken => "double_faced_token",
            Layout::Split => "split",
            Layout::Flip => "flip",
            Layout::Other(tag) => tag,
        }
    }
}

impl From<String> for Layout {
    fn from(value: String) -> Self {
        match value.as_str() {
            "normal" => Layout::Normal,
            "adventure" => Layout::Adventure,
            "transform" => Layout::Transform,
            "modal_dfc" => Layout::ModalDoubleFaced,
            "reversible_card" => Layout::Reversible,
            "double_faced_token" => Layout::DoubleFacedToken,
            "split" => Layout::Split,
            "flip" => Layout::Flip,
            _ => Layout::Other(value),
        }
    }
}

impl From<Layout> for String {
    fn from(value: Layout) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub name: String,
    #[serde(default)]
    pub image_uris: Option<ImageVariants>,
}

impl Face {
    pub fn has_images(&self) -> bool {
        self.image_uris.as_ref().is_some_and(|uris| !uris.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub name: String,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub image_uris: Option<ImageVariants>,
    #[serde(default)]
    pub card_faces: Vec<Face>,
    pub set: String,
    #[serde(default)]
    pub prints_search_uri: String,
}

impl CardRecord {
    pub fn has_images(&self) -> bool {
        self.image_uris.as_ref().is_some_and(|uris| !uris.is_empty())
    }

    pub fn is_multi_face_name(&self) -> bool {
        self.name.contains(FACE_SEPARATOR)
    }

    /// Name printed on the front face: everything before the first separator.
    pub fn front_name(&self) -> &str {
        self.name
            .split(FACE_SEPARATOR)
            .next()
            .unwrap_or(&self.name)
            .trim_end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub search_uri: String,
    #[serde(default)]
    pub set_type: String,
    #[serde(default)]
    pub card_count: u32,
    #[serde(default)]
    pub released_at: String,
    #[serde(default)]
    pub digital: bool,
}

impl Set {
    pub fn matches_code(&self, code: &SetCode) -> bool {
        self.code.eq_ignore_ascii_case(code.as_str())
    }

    pub fn matches_filter(&self, filter: &str) -> bool {
        let needle = filter.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.code, &self.name, &self.set_type]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Set code as typed by a user, trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SetCode(String);

impl SetCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SetCode {
    type Err = ScryError;

    /// Any non-empty token is accepted; codes the catalog does not know are
    /// reported per set rather than rejected here.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ScryError::InvalidSetCode(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Which sets a set-level batch should cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetSelection {
    /// Every non-digital set in the catalog.
    All,
    Codes(Vec<SetCode>),
}

impl FromStr for SetSelection {
    type Err = ScryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(SetSelection::All);
        }
        let codes = trimmed
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<SetCode>, ScryError>>()?;
        if codes.is_empty() {
            return Err(ScryError::InvalidSetCode(value.to_string()));
        }
        Ok(SetSelection::Codes(codes))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn layout_round_trips_known_tags() {
        let layout = Layout::from("modal_dfc".to_string());
        assert_eq!(layout, Layout::ModalDoubleFaced);
        assert_eq!(String::from(layout), "modal_dfc");
    }

    #[test]
    fn layout_keeps_unknown_tags() {
        let layout = Layout::from("battle".to_string());
        assert_eq!(layout, Layout::Other("battle".to_string()));
        assert_eq!(layout.as_str(), "battle");
    }

    #[test]
    fn front_name_stops_at_separator() {
        let card = CardRecord {
            name: "Bonecrusher Giant // Stomp".to_string(),
            layout: Layout::Adventure,
            image_uris: None,
            card_faces: Vec::new(),
            set: "eld".to_string(),
            prints_search_uri: String::new(),
        };
        assert_eq!(card.front_name(), "Bonecrusher Giant");
    }

    #[test]
    fn concurrency_limit_bounds() {
        assert_eq!(ConcurrencyLimit::try_from(1).unwrap().get(), 1);
        assert_eq!(ConcurrencyLimit::try_from(50).unwrap().get(), 50);
        assert_matches!(
            ConcurrencyLimit::try_from(0),
            Err(ScryError::InvalidConcurrency(_))
        );
        assert_matches!(
            "51".parse::<ConcurrencyLimit>(),
            Err(ScryError::InvalidConcurrency(_))
        );
    }
}
