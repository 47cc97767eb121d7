/// Rarity tiers and paint colors
///
/// This module holds the two closed vocabularies that drive item visuals:
/// - Rarity tiers (ordinal rank, base RGB used by the gradient overlay)
/// - Paint colors (hex fill for the paint label)
///
/// Both parse case-insensitively and ignore spaces, hyphens and underscores,
/// so "Black Market", "black-market" and "BLACKMARKET" are the same tier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// RGB triple
pub type Rgb = [u8; 3];

/// Normalize a user-facing name into its lookup form
fn canonical(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Rarity tier, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    VeryRare,
    Import,
    Exotic,
    BlackMarket,
    Limited,
    Premium,
    Legacy,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 11] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::VeryRare,
        Rarity::Import,
        Rarity::Exotic,
        Rarity::BlackMarket,
        Rarity::Limited,
        Rarity::Premium,
        Rarity::Legacy,
        Rarity::Legendary,
    ];

    /// Ordinal used for sorting (0 = lowest tier)
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// The two lowest tiers render without a gradient overlay
    pub fn is_plain(self) -> bool {
        matches!(self, Rarity::Common | Rarity::Uncommon)
    }

    /// Base color of the tier
    pub fn rgb(self) -> Rgb {
        match self {
            Rarity::Common => [224, 224, 224],
            Rarity::Uncommon => [180, 225, 255],
            Rarity::Rare => [116, 151, 235],
            Rarity::VeryRare => [136, 106, 241],
            Rarity::Import => [227, 90, 82],
            Rarity::Exotic => [236, 219, 108],
            Rarity::BlackMarket => [232, 48, 220],
            Rarity::Limited => [247, 120, 44],
            Rarity::Premium => [107, 241, 174],
            Rarity::Legacy => [210, 160, 90],
            Rarity::Legendary => [255, 170, 20],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::VeryRare => "Very Rare",
            Rarity::Import => "Import",
            Rarity::Exotic => "Exotic",
            Rarity::BlackMarket => "Black Market",
            Rarity::Limited => "Limited",
            Rarity::Premium => "Premium",
            Rarity::Legacy => "Legacy",
            Rarity::Legendary => "Legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rarity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = canonical(s);
        Rarity::ALL
            .into_iter()
            .find(|r| canonical(r.name()) == key)
            .ok_or_else(|| ParseError::Rarity(s.to_string()))
    }
}

impl TryFrom<String> for Rarity {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rarity> for String {
    fn from(value: Rarity) -> Self {
        value.name().to_string()
    }
}

/// Paint color of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaintColor {
    #[default]
    Default,
    Black,
    TitaniumWhite,
    Grey,
    Crimson,
    Pink,
    Cobalt,
    SkyBlue,
    BurntSienna,
    Saffron,
    Lime,
    ForestGreen,
    Orange,
    Purple,
    Gold,
}

impl PaintColor {
    pub const ALL: [PaintColor; 15] = [
        PaintColor::Default,
        PaintColor::Black,
        PaintColor::TitaniumWhite,
        PaintColor::Grey,
        PaintColor::Crimson,
        PaintColor::Pink,
        PaintColor::Cobalt,
        PaintColor::SkyBlue,
        PaintColor::BurntSienna,
        PaintColor::Saffron,
        PaintColor::Lime,
        PaintColor::ForestGreen,
        PaintColor::Orange,
        PaintColor::Purple,
        PaintColor::Gold,
    ];

    pub fn is_default(self) -> bool {
        self == PaintColor::Default
    }

    /// Fill used for the paint label
    pub fn rgb(self) -> Rgb {
        match self {
            PaintColor::Default => [255, 255, 255],
            PaintColor::Black => [17, 17, 17],
            PaintColor::TitaniumWhite => [255, 255, 255],
            PaintColor::Grey => [119, 119, 119],
            PaintColor::Crimson => [225, 0, 0],
            PaintColor::Pink => [255, 75, 216],
            PaintColor::Cobalt => [63, 81, 181],
            PaintColor::SkyBlue => [34, 216, 255],
            PaintColor::BurntSienna => [76, 17, 0],
            PaintColor::Saffron => [255, 255, 0],
            PaintColor::Lime => [127, 255, 0],
            PaintColor::ForestGreen => [60, 140, 10],
            PaintColor::Orange => [255, 140, 0],
            PaintColor::Purple => [157, 0, 255],
            PaintColor::Gold => [255, 215, 0],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PaintColor::Default => "Default",
            PaintColor::Black => "Black",
            PaintColor::TitaniumWhite => "Titanium White",
            PaintColor::Grey => "Grey",
            PaintColor::Crimson => "Crimson",
            PaintColor::Pink => "Pink",
            PaintColor::Cobalt => "Cobalt",
            PaintColor::SkyBlue => "Sky Blue",
            PaintColor::BurntSienna => "Burnt Sienna",
            PaintColor::Saffron => "Saffron",
            PaintColor::Lime => "Lime",
            PaintColor::ForestGreen => "Forest Green",
            PaintColor::Orange => "Orange",
            PaintColor::Purple => "Purple",
            PaintColor::Gold => "Gold",
        }
    }
}

impl fmt::Display for PaintColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaintColor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = canonical(s);
        PaintColor::ALL
            .into_iter()
            .find(|c| canonical(c.name()) == key)
            .ok_or_else(|| ParseError::Paint(s.to_string()))
    }
}

impl TryFrom<String> for PaintColor {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaintColor> for String {
    fn from(value: PaintColor) -> Self {
        value.name().to_string()
    }
}

/// Format an RGB triple as `#RRGGBB`
pub fn to_hex(rgb: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_parsing_is_lenient() {
        assert_eq!("Black Market".parse::<Rarity>().unwrap(), Rarity::BlackMarket);
        assert_eq!("black-market".parse::<Rarity>().unwrap(), Rarity::BlackMarket);
        assert_eq!("VERY_RARE".parse::<Rarity>().unwrap(), Rarity::VeryRare);
        assert!("Mythic".parse::<Rarity>().is_err());
    }

    #[test]
    fn test_plain_tiers() {
        let plain: Vec<Rarity> = Rarity::ALL.into_iter().filter(|r| r.is_plain()).collect();
        assert_eq!(plain, vec![Rarity::Common, Rarity::Uncommon]);
    }

    #[test]
    fn test_rank_follows_declaration_order() {
        assert!(Rarity::Common.rank() < Rarity::Rare.rank());
        assert!(Rarity::Limited.rank() < Rarity::Legendary.rank());
    }

    #[test]
    fn test_paint_serde_uses_display_names() {
        let json = serde_json::to_string(&PaintColor::TitaniumWhite).unwrap();
        assert_eq!(json, "\"Titanium White\"");
        let back: PaintColor = serde_json::from_str("\"titanium white\"").unwrap();
        assert_eq!(back, PaintColor::TitaniumWhite);
        assert!(serde_json::from_str::<PaintColor>("\"Mauve\"").is_err());
    }

    #[test]
    fn test_hex_format() {
        assert_eq!(to_hex(PaintColor::Crimson.rgb()), "#E10000");
    }
}
