/// Item collection
///
/// Insertion-ordered storage for every record, addressed by `ItemId`.
/// Filtering and sorting never touch this order; they only decide which
/// ids the grid shows and where.

use std::ops::Index;

use super::data::{ItemBundle, ItemId};
use super::record::{ItemRecord, LoadState};
use crate::view::surface::VisualState;

/// The Collection holds every item record in arrival order.
///
/// Records are never removed, so an `ItemId` (the insertion index) stays
/// valid for the lifetime of the collection.
#[derive(Debug, Default)]
pub struct Collection {
    records: Vec<ItemRecord>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from the inventory source's bundles
    pub fn from_bundles(bundles: impl IntoIterator<Item = ItemBundle>) -> Self {
        let mut collection = Self::new();
        for bundle in bundles {
            collection.push(ItemRecord::new(bundle));
        }
        collection
    }

    /// Append a record and return its id
    pub fn push(&mut self, record: ItemRecord) -> ItemId {
        self.records.push(record);
        ItemId(self.records.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&ItemRecord> {
        self.records.get(id.0)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut ItemRecord> {
        self.records.get_mut(id.0)
    }

    /// All ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.records.len()).map(ItemId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &ItemRecord)> + '_ {
        self.records.iter().enumerate().map(|(i, r)| (ItemId(i), r))
    }

    /// Records still waiting for their first load
    pub fn pending_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.load_state() == LoadState::Pending)
            .count()
    }

    /// Records whose icon could not be resolved or fetched
    pub fn not_found_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.visual_state() == VisualState::NotFound)
            .count()
    }

    pub fn selected(&self) -> Vec<ItemId> {
        self.iter()
            .filter(|(_, r)| r.is_selected())
            .map(|(id, _)| id)
            .collect()
    }
}

impl Index<ItemId> for Collection {
    type Output = ItemRecord;

    fn index(&self, id: ItemId) -> &ItemRecord {
        &self.records[id.0]
    }
}
