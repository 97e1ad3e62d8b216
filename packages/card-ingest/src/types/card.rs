//! Card metadata produced by the extraction service.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Card rarity printed in the top-left corner.
///
/// Ordered from most to least common so display code can sort by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    N,
    R,
    SR,
    SSR,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [Rarity::N, Rarity::R, Rarity::SR, Rarity::SSR];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::N => "N",
            Rarity::R => "R",
            Rarity::SR => "SR",
            Rarity::SSR => "SSR",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| UnknownValue::new("rarity", s))
    }
}

/// Card category printed on the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Costume,
    Accessory,
    Support,
    SpecialAppeal,
}

impl CardType {
    pub const ALL: [CardType; 4] = [
        CardType::Costume,
        CardType::Accessory,
        CardType::Support,
        CardType::SpecialAppeal,
    ];

    /// Stable name used in the catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Costume => "Costume",
            CardType::Accessory => "Accessory",
            CardType::Support => "Support",
            CardType::SpecialAppeal => "SpecialAppeal",
        }
    }

    /// Label as printed on the physical card.
    pub fn printed_label(&self) -> &'static str {
        match self {
            CardType::Costume => "コスチューム",
            CardType::Accessory => "アクセサリー",
            CardType::Support => "サポート",
            CardType::SpecialAppeal => "SPアピール",
        }
    }

    /// Parse either the catalog name or the printed label.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        CardType::ALL
            .into_iter()
            .find(|t| t.as_str() == label || t.printed_label() == label)
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardType::from_label(s).ok_or_else(|| UnknownValue::new("card type", s))
    }
}

/// A value outside a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue {
    pub field: &'static str,
    pub value: String,
}

impl UnknownValue {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.field, self.value)
    }
}

impl std::error::Error for UnknownValue {}

/// Structured metadata read from one card photo.
///
/// Only the extraction client constructs these; nothing mutates them later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub rarity: Rarity,
    pub card_type: CardType,
    /// Unique card identifier, e.g. `IMT-01-069`
    pub card_id: String,
    pub card_name: Option<String>,
    pub character_name: Option<String>,
}

impl CardInfo {
    pub fn new(rarity: Rarity, card_type: CardType, card_id: impl Into<String>) -> Self {
        Self {
            rarity,
            card_type,
            card_id: card_id.into(),
            card_name: None,
            character_name: None,
        }
    }

    pub fn with_card_name(mut self, name: impl Into<String>) -> Self {
        self.card_name = Some(name.into());
        self
    }

    pub fn with_character_name(mut self, name: impl Into<String>) -> Self {
        self.character_name = Some(name.into());
        self
    }

    /// Whether the id follows the printed `PREFIX-NN-NNN` layout.
    pub fn has_canonical_id(&self) -> bool {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        PATTERN
            .get_or_init(|| Regex::new(r"^[A-Z]+-\d{2}-\d{3}$").expect("static regex"))
            .is_match(&self.card_id)
    }
}
