/// Shared data structures for item state
///
/// These structs describe items as they arrive from the inventory source,
/// before any render state is attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::color::{PaintColor, Rarity};

/// Stable handle of a record inside the collection (its insertion index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub usize);

/// Attributes that decide which icon an item is drawn with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIdentity {
    pub name: String,
    pub slot: String,
    #[serde(default)]
    pub paint: PaintColor,
    #[serde(default)]
    pub blueprint: bool,
}

impl ItemIdentity {
    pub fn new(name: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: slot.into(),
            paint: PaintColor::Default,
            blueprint: false,
        }
    }

    pub fn with_paint(mut self, paint: PaintColor) -> Self {
        self.paint = paint;
        self
    }

    /// Two identities share a representation when a cached base image
    /// of one is valid for the other
    pub fn same_representation(&self, other: &ItemIdentity) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.slot.eq_ignore_ascii_case(&other.slot)
            && self.paint == other.paint
            && self.blueprint == other.blueprint
    }
}

/// Marketplace price range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u32,
    pub max: u32,
}

impl PriceRange {
    pub fn label(&self) -> String {
        format!("{} - {}", self.min, self.max)
    }
}

/// One item as delivered by the inventory source
///
/// Each bundle becomes exactly one record in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBundle {
    #[serde(flatten)]
    pub identity: ItemIdentity,
    pub rarity: Rarity,
    /// Certification label; absent means uncertified
    #[serde(default)]
    pub certified: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub trade_lock: bool,
    #[serde(default)]
    pub price: Option<PriceRange>,
    #[serde(default = "Utc::now")]
    pub acquired: DateTime<Utc>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub archived: bool,
}

fn default_quantity() -> u32 {
    1
}

impl ItemBundle {
    pub fn new(identity: ItemIdentity, rarity: Rarity) -> Self {
        Self {
            identity,
            rarity,
            certified: None,
            quantity: default_quantity(),
            trade_lock: false,
            price: None,
            acquired: Utc::now(),
            series: None,
            favorite: false,
            archived: false,
        }
    }

    /// Parse a JSON array of bundles
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Treat "None" and blank certification labels as uncertified
pub(crate) fn normalize_certified(certified: Option<String>) -> Option<String> {
    certified.filter(|c| {
        let c = c.trim();
        !c.is_empty() && !c.eq_ignore_ascii_case("none")
    })
}
