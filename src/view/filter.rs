/// Filter and sort engine
///
/// Every active filter keeps the set of records that satisfy it. The
/// displayed membership is the intersection of those sets, and each
/// `apply_filter` reports how it differs from the previous one so the grid
/// only has to touch what changed. Sorting always reorders the whole
/// membership; only set membership is incremental.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::color::{PaintColor, Rarity};
use crate::state::collection::Collection;
use crate::state::data::ItemId;
use crate::state::record::ItemRecord;
use crate::view::surface::VisualState;

/// Test applied to each record's current attributes
#[derive(Clone)]
pub enum Predicate {
    /// Case-insensitive substring of the item name
    NameContains(String),
    Slot(String),
    Paint(PaintColor),
    Certified(String),
    Rarity(Rarity),
    Series(String),
    Blueprint(bool),
    TradeLock(bool),
    Favorite(bool),
    Archived(bool),
    /// Icon did not fail to resolve (pending items included)
    Found,
    /// Icon loaded and shown
    Resolved,
    Custom(Arc<dyn Fn(&ItemRecord) -> bool + Send + Sync>),
}

impl Predicate {
    pub fn custom(f: impl Fn(&ItemRecord) -> bool + Send + Sync + 'static) -> Self {
        Predicate::Custom(Arc::new(f))
    }

    pub fn matches(&self, record: &ItemRecord) -> bool {
        match self {
            Predicate::NameContains(needle) => record
                .name()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Predicate::Slot(slot) => record.identity().slot.eq_ignore_ascii_case(slot),
            Predicate::Paint(paint) => record.identity().paint == *paint,
            Predicate::Certified(label) => record
                .certified()
                .is_some_and(|c| c.eq_ignore_ascii_case(label)),
            Predicate::Rarity(rarity) => record.rarity() == *rarity,
            Predicate::Series(series) => record
                .series()
                .is_some_and(|s| s.eq_ignore_ascii_case(series)),
            Predicate::Blueprint(wanted) => record.identity().blueprint == *wanted,
            Predicate::TradeLock(wanted) => record.trade_lock() == *wanted,
            Predicate::Favorite(wanted) => record.is_favorite() == *wanted,
            Predicate::Archived(wanted) => record.is_archived() == *wanted,
            Predicate::Found => record.visual_state() != VisualState::NotFound,
            Predicate::Resolved => {
                record.is_loaded() && record.visual_state() == VisualState::Normal
            }
            Predicate::Custom(f) => f(record),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::NameContains(s) => f.debug_tuple("NameContains").field(s).finish(),
            Predicate::Slot(s) => f.debug_tuple("Slot").field(s).finish(),
            Predicate::Paint(p) => f.debug_tuple("Paint").field(p).finish(),
            Predicate::Certified(s) => f.debug_tuple("Certified").field(s).finish(),
            Predicate::Rarity(r) => f.debug_tuple("Rarity").field(r).finish(),
            Predicate::Series(s) => f.debug_tuple("Series").field(s).finish(),
            Predicate::Blueprint(b) => f.debug_tuple("Blueprint").field(b).finish(),
            Predicate::TradeLock(b) => f.debug_tuple("TradeLock").field(b).finish(),
            Predicate::Favorite(b) => f.debug_tuple("Favorite").field(b).finish(),
            Predicate::Archived(b) => f.debug_tuple("Archived").field(b).finish(),
            Predicate::Found => f.write_str("Found"),
            Predicate::Resolved => f.write_str("Resolved"),
            Predicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Attribute the displayed sequence is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Acquired,
    Rarity,
    Quantity,
    Series,
}

impl SortKey {
    fn compare(self, a: &ItemRecord, b: &ItemRecord) -> Ordering {
        match self {
            SortKey::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
            SortKey::Acquired => a.acquired().cmp(&b.acquired()),
            SortKey::Rarity => a.rarity().rank().cmp(&b.rarity().rank()),
            SortKey::Quantity => a.quantity().cmp(&b.quantity()),
            // Items without a series go last
            SortKey::Series => {
                let key = |r: &ItemRecord| (r.series().is_none(), r.series().map(str::to_lowercase));
                key(a).cmp(&key(b))
            }
        }
    }
}

/// Difference between two consecutive `apply_filter` calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDelta {
    /// Previously displayed, no longer a member
    pub removed: Vec<ItemId>,
    /// Newly a member
    pub added: Vec<ItemId>,
    /// Full membership in display order
    pub ordered: Vec<ItemId>,
    /// The ordered sequence came from a sort rather than collection order
    pub resorted: bool,
}

impl FilterDelta {
    pub fn is_unchanged(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && !self.resorted
    }
}

#[derive(Debug, Clone)]
struct ActiveFilter {
    predicate: Predicate,
    members: BTreeSet<ItemId>,
}

impl ActiveFilter {
    fn evaluate(predicate: Predicate, collection: &Collection) -> Self {
        let members = collection
            .iter()
            .filter(|(_, record)| predicate.matches(record))
            .map(|(id, _)| id)
            .collect();
        Self { predicate, members }
    }
}

#[derive(Debug, Default)]
pub struct FilterEngine {
    filters: BTreeMap<String, ActiveFilter>,
    sort: Option<SortKey>,
    displayed: BTreeSet<ItemId>,
    ordered: Vec<ItemId>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `predicate` over the whole collection and store it under `name`
    ///
    /// Replaces any filter already registered under that name.
    pub fn set_filter(
        &mut self,
        name: impl Into<String>,
        predicate: Predicate,
        collection: &Collection,
    ) {
        let name = name.into();
        let filter = ActiveFilter::evaluate(predicate, collection);
        debug!(
            "Filter '{}' {:?} matches {} of {} items",
            name,
            filter.predicate,
            filter.members.len(),
            collection.len()
        );
        self.filters.insert(name, filter);
    }

    /// Stop constraining by `name`; false when no such filter was active
    pub fn clear_filter(&mut self, name: &str) -> bool {
        self.filters.remove(name).is_some()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn active_filters(&self) -> impl Iterator<Item = &str> + '_ {
        self.filters.keys().map(String::as_str)
    }

    pub fn set_sort(&mut self, sort: Option<SortKey>) {
        self.sort = sort;
    }

    pub fn sort(&self) -> Option<SortKey> {
        self.sort
    }

    /// Recompute every active filter after attribute edits
    pub fn reevaluate(&mut self, collection: &Collection) {
        for filter in self.filters.values_mut() {
            *filter = ActiveFilter::evaluate(filter.predicate.clone(), collection);
        }
    }

    /// Intersection of all active filters, or the whole collection if none
    pub fn current_membership(&self, collection: &Collection) -> BTreeSet<ItemId> {
        let mut sets: Vec<&BTreeSet<ItemId>> =
            self.filters.values().map(|f| &f.members).collect();
        sets.sort_by_key(|s| s.len());

        let Some((smallest, rest)) = sets.split_first() else {
            return collection.ids().collect();
        };

        smallest
            .iter()
            .filter(|id| rest.iter().all(|set| set.contains(id)))
            .copied()
            .collect()
    }

    /// Recompute membership and report the change since the last call
    pub fn apply_filter(&mut self, collection: &Collection) -> FilterDelta {
        let membership = self.current_membership(collection);

        let removed: Vec<ItemId> = self.displayed.difference(&membership).copied().collect();
        let added: Vec<ItemId> = membership.difference(&self.displayed).copied().collect();

        // BTreeSet iteration is collection order, so the stable sort keeps
        // insertion order among ties
        let mut ordered: Vec<ItemId> = membership.iter().copied().collect();
        if let Some(key) = self.sort {
            ordered.sort_by(|a, b| key.compare(&collection[*a], &collection[*b]));
        }

        debug!(
            "Applied filters: {} shown, {} removed, {} added",
            ordered.len(),
            removed.len(),
            added.len()
        );

        self.displayed = membership;
        self.ordered = ordered.clone();

        FilterDelta {
            removed,
            added,
            ordered,
            resorted: self.sort.is_some(),
        }
    }

    /// Display order produced by the last `apply_filter`
    pub fn displayed(&self) -> &[ItemId] {
        &self.ordered
    }
}
