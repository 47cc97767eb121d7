/// Attribute edits for item records
///
/// An `ItemEdit` is a sparse delta: every `None` field leaves the record's
/// current value untouched. Edits are applied with `ItemRecord::update`, which
/// turns them into visual commands without touching the render surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::data::{ItemIdentity, PriceRange};
use crate::color::Rarity;

/// Sparse set of attribute changes for one record
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ItemEdit {
    // ========== Identity ==========

    /// Replacement identity. A non-equivalent identity drops the cached
    /// icon and forces a re-fetch.
    pub identity: Option<ItemIdentity>,

    // ========== Image-affecting ==========

    /// New rarity (re-runs the image pipeline when it differs)
    pub rarity: Option<Rarity>,

    // ========== Text overlays ==========

    /// `Some(None)` clears the certification
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "cleared")]
    pub certified: Option<Option<String>>,
    pub quantity: Option<u32>,
    pub trade_lock: Option<bool>,
    /// `Some(None)` clears the price range
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "cleared")]
    pub price: Option<Option<PriceRange>>,

    // ========== Bookkeeping ==========

    pub acquired: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "cleared")]
    pub series: Option<Option<String>>,
    pub favorite: Option<bool>,
    pub archived: Option<bool>,
}

/// A present `null` means "clear", an absent field means "keep"
fn cleared<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ItemEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = Some(rarity);
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn certified(mut self, certified: Option<&str>) -> Self {
        self.certified = Some(certified.map(str::to_string));
        self
    }

    pub fn trade_lock(mut self, trade_lock: bool) -> Self {
        self.trade_lock = Some(trade_lock);
        self
    }

    pub fn price(mut self, price: Option<PriceRange>) -> Self {
        self.price = Some(price);
        self
    }

    pub fn identity(mut self, identity: ItemIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn favorite(mut self, favorite: bool) -> Self {
        self.favorite = Some(favorite);
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    /// Convert to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// True when the edit changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Drop all pending changes
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(ItemEdit::default().is_empty());
    }

    #[test]
    fn test_json_keeps_cleared_fields_distinct() {
        let edit = ItemEdit::new().quantity(4).certified(None);

        let json = edit.to_json().unwrap();
        let restored = ItemEdit::from_json(&json).unwrap();

        assert_eq!(restored.quantity, Some(4));
        assert_eq!(restored.certified, Some(None));
        assert_eq!(restored.rarity, None);
    }

    #[test]
    fn test_reset() {
        let mut edit = ItemEdit::new().rarity(Rarity::Exotic).favorite(true);
        assert!(!edit.is_empty());

        edit.reset();

        assert!(edit.is_empty());
    }
}
