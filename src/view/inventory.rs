/// Inventory view controller
///
/// Owns the collection and wires it to the filter engine, the grid
/// placement, the lazy loader and the host's render surface. Every state
/// change goes through a record or the engine first; the resulting commands
/// are then pushed to the surface in one place. Nothing here blocks on icon
/// jobs: they are started synchronously and drained as they finish.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::icon::gradient::GradientCache;
use crate::icon::source::IconSource;
use crate::state::collection::Collection;
use crate::state::data::{ItemBundle, ItemId};
use crate::state::edit::ItemEdit;
use crate::state::record::ItemRecord;
use crate::view::filter::{FilterDelta, FilterEngine, Predicate, SortKey};
use crate::view::grid::{GridLayout, GridPlacement, Viewport};
use crate::view::scheduler::{LazyLoader, LoadReport};
use crate::view::surface::{
    apply_commands, PlacementCommand, RenderSurface, SurfaceEvent, VisualCommand,
};

pub struct InventoryView<R: RenderSurface, S> {
    surface: R,
    /// Placeholder handles, indexed by `ItemId`
    handles: Vec<R::Handle>,
    collection: Collection,
    engine: FilterEngine,
    grid: GridPlacement,
    loader: LazyLoader<S>,
    viewport: Option<Viewport>,
}

impl<R, S> InventoryView<R, S>
where
    R: RenderSurface,
    S: IconSource + Send + Sync + 'static,
{
    pub fn new(surface: R, loader: LazyLoader<S>, layout: GridLayout) -> Self {
        Self {
            surface,
            handles: Vec::new(),
            collection: Collection::new(),
            engine: FilterEngine::new(),
            grid: GridPlacement::new(layout),
            loader,
            viewport: None,
        }
    }

    pub fn from_config(
        surface: R,
        source: Arc<S>,
        gradients: Arc<GradientCache>,
        config: &Config,
    ) -> Self {
        let loader = LazyLoader::from_config(source, gradients, config);
        Self::new(surface, loader, GridLayout::from(&config.grid))
    }

    // ========== Accessors ==========

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut R {
        &mut self.surface
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn grid(&self) -> &GridPlacement {
        &self.grid
    }

    pub fn filters(&self) -> &FilterEngine {
        &self.engine
    }

    pub fn handle(&self, id: ItemId) -> Option<&R::Handle> {
        self.handles.get(id.0)
    }

    /// Ids of every selected record, in collection order
    pub fn selected(&self) -> Vec<ItemId> {
        self.collection.selected()
    }

    // ========== Population ==========

    /// Create a record and an unplaced placeholder for each bundle
    pub fn add_bundles(&mut self, bundles: impl IntoIterator<Item = ItemBundle>) -> Vec<ItemId> {
        let ids: Vec<ItemId> = bundles
            .into_iter()
            .map(|bundle| self.add_record(ItemRecord::new(bundle)))
            .collect();
        info!("Added {} items ({} total)", ids.len(), self.collection.len());
        ids
    }

    /// Add a single record, possibly one that already carries its icon
    pub fn add_record(&mut self, record: ItemRecord) -> ItemId {
        let handle = self.surface.create_placeholder(self.loader.pipeline().size());
        apply_commands(&mut self.surface, &handle, &record.full_redraw());
        self.handles.push(handle);
        self.collection.push(record)
    }

    /// Start compositing every record that was added with a base icon only
    ///
    /// All jobs are spawned at once and share the loader's worker pool; the
    /// composites land through `apply_completed`. Returns the number started.
    pub fn process_preloaded(&mut self) -> usize {
        let ids: Vec<ItemId> = self
            .collection
            .iter()
            .filter(|(_, r)| r.needs_processing())
            .map(|(id, _)| id)
            .collect();

        ids.into_iter()
            .filter(|&id| self.loader.reprocess(&self.collection, id))
            .count()
    }

    // ========== Filtering ==========

    pub fn set_filter(&mut self, name: impl Into<String>, predicate: Predicate) {
        self.engine.set_filter(name, predicate, &self.collection);
    }

    pub fn clear_filter(&mut self, name: &str) -> bool {
        self.engine.clear_filter(name)
    }

    pub fn set_sort(&mut self, sort: Option<SortKey>) {
        self.engine.set_sort(sort);
    }

    /// Recompute membership from current attributes and update the grid
    pub fn apply_filter(&mut self) -> FilterDelta {
        self.engine.reevaluate(&self.collection);
        let delta = self.engine.apply_filter(&self.collection);
        let placements = self.grid.relayout(&delta.removed, &delta.added, &delta.ordered);
        debug!("Relayout issued {} placement commands", placements.len());
        self.push_placements(&placements);
        delta
    }

    // ========== Events ==========

    /// React to host input; never waits on the network
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Viewport(viewport) => {
                self.load_visible(viewport);
            }
            SurfaceEvent::Click(id) => {
                if let Some(record) = self.collection.get_mut(id) {
                    let commands = record.toggle_selected();
                    self.push_commands(id, &commands);
                }
            }
            SurfaceEvent::Hover { id, inside } => {
                if let Some(record) = self.collection.get_mut(id) {
                    let commands = record.set_hovered(inside);
                    self.push_commands(id, &commands);
                }
            }
        }
    }

    /// Start loads for every pending record visible in `viewport`
    ///
    /// Returns the number of jobs started. Icons reach the surface through
    /// `apply_completed`, `next_completed` or `settle`.
    pub fn load_visible(&mut self, viewport: Viewport) -> usize {
        self.viewport = Some(viewport);
        self.loader
            .load_visible(&mut self.collection, &self.grid, &viewport)
    }

    /// Repeat the last viewport load, e.g. after a relayout moved new items into view
    pub fn reload_viewport(&mut self) -> usize {
        match self.viewport {
            Some(viewport) => self.load_visible(viewport),
            None => 0,
        }
    }

    /// Jobs started but not yet applied to the surface
    pub fn is_loading(&self) -> bool {
        !self.loader.is_idle()
    }

    // ========== Completed jobs ==========

    /// Push every job that has already finished to the surface, without waiting
    ///
    /// Meant to be called from the host's frame or tick handler.
    pub fn apply_completed(&mut self) -> LoadReport {
        let report = self.loader.apply_completed(&mut self.collection);
        self.push_report(&report);
        report
    }

    /// Wait for at least one job to finish and push what is ready
    pub async fn next_completed(&mut self) -> LoadReport {
        let report = self.loader.wait_completed(&mut self.collection).await;
        self.push_report(&report);
        report
    }

    /// Wait for every outstanding job, pushing each as it lands
    pub async fn settle(&mut self) -> LoadReport {
        let mut report = LoadReport::default();
        while self.is_loading() {
            report.merge(self.next_completed().await);
        }
        report
    }

    // ========== Editing ==========

    /// Apply an attribute edit, re-running image work only when it is needed
    ///
    /// Text changes reach the surface immediately; a new composite or a new
    /// icon arrives later as a completed job. Returns false for an unknown id.
    pub fn edit_item(&mut self, id: ItemId, edit: ItemEdit) -> bool {
        let Some(record) = self.collection.get_mut(id) else {
            return false;
        };
        let outcome = record.update(edit);
        self.push_commands(id, &outcome.commands);

        if outcome.reprocess {
            self.loader.reprocess(&self.collection, id);
        }
        if outcome.refetch {
            self.refresh_item(id);
        }
        true
    }

    /// Fetch an item's icon again; false when a load for it is in flight
    pub fn refresh_item(&mut self, id: ItemId) -> bool {
        self.loader.refresh(&mut self.collection, id)
    }

    // ========== Surface plumbing ==========

    fn push_report(&mut self, report: &LoadReport) {
        for (id, commands) in &report.updates {
            self.push_commands(*id, commands);
        }
    }

    fn push_commands(&mut self, id: ItemId, commands: &[VisualCommand]) {
        if commands.is_empty() {
            return;
        }
        if let Some(handle) = self.handles.get(id.0) {
            apply_commands(&mut self.surface, handle, commands);
        }
    }

    fn push_placements(&mut self, placements: &[PlacementCommand]) {
        for placement in placements {
            match *placement {
                PlacementCommand::Place { id, row, col } => {
                    if let Some(handle) = self.handles.get(id.0) {
                        self.surface.place_at(handle, row, col);
                    }
                }
                PlacementCommand::Detach { id } => {
                    if let Some(handle) = self.handles.get(id.0) {
                        self.surface.detach(handle);
                    }
                }
            }
        }
    }
}
