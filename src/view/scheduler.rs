/// Viewport-driven lazy loading
///
/// Only records placed in cells the viewport intersects, and still waiting
/// for their first load, get a job. Jobs run as spawned tasks
/// (resolve → fetch → composite on a blocking worker) and report back over a
/// channel. Claiming records and spawning is instant; the owner of the
/// collection drains finished jobs whenever it likes and applies each one to
/// its own record, in whatever order they landed. A failed job marks its
/// record not-found and never disturbs its siblings.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use crate::color::Rarity;
use crate::config::Config;
use crate::error::IconError;
use crate::icon::gradient::GradientCache;
use crate::icon::processor::ImagePipeline;
use crate::icon::source::IconSource;
use crate::state::collection::Collection;
use crate::state::data::{ItemId, ItemIdentity};
use crate::state::record::{LoadTicket, LoadedIcon};
use crate::view::grid::{GridPlacement, Viewport};
use crate::view::surface::{DisplayImage, VisualCommand};

/// Finished jobs applied to the collection by one drain
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Load jobs that produced an icon
    pub loaded: usize,
    /// Load jobs that left their record in the not-found state
    pub not_found: usize,
    /// Composite-only jobs (rarity edits, preloaded records) that succeeded
    pub processed: usize,
    /// Visual changes per record, in completion order
    pub updates: Vec<(ItemId, Vec<VisualCommand>)>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded += other.loaded;
        self.not_found += other.not_found;
        self.processed += other.processed;
        self.updates.extend(other.updates);
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.loaded == 0 && self.not_found == 0 && self.processed == 0
    }
}

/// Message sent back by a spawned job
#[derive(Debug)]
struct Completion {
    id: ItemId,
    output: JobOutput,
}

#[derive(Debug)]
enum JobOutput {
    Load {
        ticket: LoadTicket,
        result: Result<LoadedIcon, IconError>,
    },
    /// Composite of an existing base icon for the rarity it was started with
    Composite {
        rarity: Rarity,
        base: Arc<RgbaImage>,
        result: Result<DisplayImage, IconError>,
    },
}

pub struct LazyLoader<S> {
    source: Arc<S>,
    pipeline: ImagePipeline,
    fetch_timeout: Duration,
    compute: Arc<Semaphore>,
    result_tx: mpsc::UnboundedSender<Completion>,
    result_rx: mpsc::UnboundedReceiver<Completion>,
    /// Spawned jobs whose completion has not been applied yet
    outstanding: usize,
}

impl<S: IconSource + Send + Sync + 'static> LazyLoader<S> {
    /// `workers` bounds how many compositing jobs run at once
    ///
    /// Jobs are spawned with `tokio::spawn`, so the loader must be driven
    /// from inside a Tokio runtime.
    pub fn new(
        source: Arc<S>,
        pipeline: ImagePipeline,
        fetch_timeout: Duration,
        workers: usize,
    ) -> Self {
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        Self {
            source,
            pipeline,
            fetch_timeout,
            compute: Arc::new(Semaphore::new(workers.max(1))),
            result_tx,
            result_rx,
            outstanding: 0,
        }
    }

    pub fn from_config(source: Arc<S>, gradients: Arc<GradientCache>, config: &Config) -> Self {
        Self::new(
            source,
            ImagePipeline::new(gradients, config.grid.icon_size),
            Duration::from_secs(config.fetch.timeout_secs),
            config.processing.worker_count(),
        )
    }

    pub fn pipeline(&self) -> &ImagePipeline {
        &self.pipeline
    }

    /// Jobs spawned but not yet applied
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding == 0
    }

    // ========== Starting jobs ==========

    /// Start a load for every pending record visible in `viewport`
    ///
    /// Records that are already loaded or in flight are skipped, so calling
    /// this repeatedly for the same viewport is harmless. Returns the number
    /// of jobs started.
    pub fn load_visible(
        &mut self,
        collection: &mut Collection,
        grid: &GridPlacement,
        viewport: &Viewport,
    ) -> usize {
        let mut issued = 0;
        for id in grid.visible_in(viewport) {
            let Some(record) = collection.get_mut(id) else {
                continue;
            };
            if let Some(ticket) = record.begin_load() {
                self.spawn_load(id, ticket, record.identity().clone(), record.rarity());
                issued += 1;
            }
        }
        if issued > 0 {
            debug!("Started {} icon loads", issued);
        }
        issued
    }

    /// Fetch a record's icon again regardless of its load state
    ///
    /// Returns false when the record is unknown or a job for it is already
    /// in flight.
    pub fn refresh(&mut self, collection: &mut Collection, id: ItemId) -> bool {
        let Some(record) = collection.get_mut(id) else {
            return false;
        };
        match record.begin_refresh() {
            Some(ticket) => {
                self.spawn_load(id, ticket, record.identity().clone(), record.rarity());
                true
            }
            None => {
                debug!("Refresh of {} skipped, load already in flight", record.name());
                false
            }
        }
    }

    /// Composite a record's existing base icon again (rarity edit, preloaded record)
    pub fn reprocess(&mut self, collection: &Collection, id: ItemId) -> bool {
        let Some(record) = collection.get(id) else {
            return false;
        };
        let Some(base) = record.base_image().cloned() else {
            return false;
        };
        if !record.needs_processing() {
            return false;
        }
        self.spawn_composite(id, base, record.rarity(), record.name().to_string());
        true
    }

    fn spawn_load(&mut self, id: ItemId, ticket: LoadTicket, identity: ItemIdentity, rarity: Rarity) {
        let source = self.source.clone();
        let pipeline = self.pipeline.clone();
        let compute = self.compute.clone();
        let fetch_timeout = self.fetch_timeout;
        let result_tx = self.result_tx.clone();
        self.outstanding += 1;

        tokio::spawn(async move {
            let result =
                acquire(&*source, &pipeline, &compute, fetch_timeout, identity, rarity).await;
            // The receiver lives as long as the loader
            let _ = result_tx.send(Completion {
                id,
                output: JobOutput::Load { ticket, result },
            });
        });
    }

    fn spawn_composite(&mut self, id: ItemId, base: Arc<RgbaImage>, rarity: Rarity, label: String) {
        let pipeline = self.pipeline.clone();
        let compute = self.compute.clone();
        let result_tx = self.result_tx.clone();
        self.outstanding += 1;

        tokio::spawn(async move {
            let result = composite(&pipeline, &compute, base.clone(), rarity, label).await;
            let _ = result_tx.send(Completion {
                id,
                output: JobOutput::Composite {
                    rarity,
                    base,
                    result,
                },
            });
        });
    }

    // ========== Applying results ==========

    /// Apply every job that has already finished, without waiting
    pub fn apply_completed(&mut self, collection: &mut Collection) -> LoadReport {
        let mut report = LoadReport::default();
        while let Ok(completion) = self.result_rx.try_recv() {
            self.apply(collection, completion, &mut report);
        }
        report
    }

    /// Wait for the next job to finish, then apply it and anything else ready
    ///
    /// Returns an empty report right away when nothing is outstanding.
    pub async fn wait_completed(&mut self, collection: &mut Collection) -> LoadReport {
        let mut report = LoadReport::default();
        if self.is_idle() {
            return report;
        }
        if let Some(completion) = self.result_rx.recv().await {
            self.apply(collection, completion, &mut report);
        }
        report.merge(self.apply_completed(collection));
        report
    }

    /// Wait until every outstanding job has been applied
    pub async fn settle(&mut self, collection: &mut Collection) -> LoadReport {
        let mut report = LoadReport::default();
        while !self.is_idle() {
            report.merge(self.wait_completed(collection).await);
        }
        report
    }

    fn apply(&mut self, collection: &mut Collection, completion: Completion, report: &mut LoadReport) {
        self.outstanding = self.outstanding.saturating_sub(1);
        let id = completion.id;
        let Some(record) = collection.get_mut(id) else {
            return;
        };

        let commands = match completion.output {
            JobOutput::Load { ticket, result } => {
                let failure = result.as_ref().err().map(|e| e.to_string());
                let Some(commands) = record.finish_load(ticket, result) else {
                    debug!("Dropping outdated icon result for {}", record.name());
                    return;
                };
                match failure {
                    Some(reason) => {
                        warn!("Icon for {} unavailable: {}", record.name(), reason);
                        report.not_found += 1;
                    }
                    None => report.loaded += 1,
                }
                commands
            }
            JobOutput::Composite {
                rarity,
                base,
                result,
            } => {
                let current = record.rarity() == rarity
                    && record.base_image().is_some_and(|b| Arc::ptr_eq(b, &base));
                if !current {
                    debug!("Dropping outdated composite for {}", record.name());
                    return;
                }
                match result {
                    Ok(processed) => {
                        report.processed += 1;
                        record.set_processed(processed)
                    }
                    Err(e) => {
                        warn!("Reprocessing {} failed: {}", record.name(), e);
                        record.composite_failed()
                    }
                }
            }
        };

        if !commands.is_empty() {
            report.updates.push((id, commands));
        }
    }
}

async fn acquire<S: IconSource>(
    source: &S,
    pipeline: &ImagePipeline,
    compute: &Semaphore,
    fetch_timeout: Duration,
    identity: ItemIdentity,
    rarity: Rarity,
) -> Result<LoadedIcon, IconError> {
    let icon = source.resolve(&identity).await?;

    let base = tokio::time::timeout(fetch_timeout, source.fetch(&icon, pipeline.size()))
        .await
        .map_err(|_| {
            IconError::FetchFailed(format!("{} timed out after {:?}", icon.url, fetch_timeout))
        })??;

    let base = Arc::new(base);
    let processed = composite(pipeline, compute, base.clone(), rarity, identity.name).await?;
    Ok(LoadedIcon { base, processed })
}

/// Run the image pipeline on a blocking worker
async fn composite(
    pipeline: &ImagePipeline,
    compute: &Semaphore,
    base: Arc<RgbaImage>,
    rarity: Rarity,
    label: String,
) -> Result<DisplayImage, IconError> {
    let _permit = compute
        .acquire()
        .await
        .map_err(|e| IconError::Processing(e.to_string()))?;

    let pipeline = pipeline.clone();
    tokio::task::spawn_blocking(move || pipeline.run(&base, rarity, &label))
        .await
        .map_err(|e| IconError::Processing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PaintColor;
    use crate::icon::source::IconRef;
    use crate::state::data::ItemBundle;
    use crate::state::edit::ItemEdit;
    use crate::state::record::LoadState;
    use crate::view::grid::GridLayout;
    use crate::view::surface::VisualState;
    use image::Rgba;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SIZE: u32 = 16;

    #[derive(Default)]
    struct FakeSource {
        missing: HashSet<String>,
        /// Fetches for these names take eight seconds
        slow: HashSet<String>,
        fetches: AtomicUsize,
    }

    impl IconSource for FakeSource {
        async fn resolve(&self, identity: &ItemIdentity) -> Result<IconRef, IconError> {
            if self.missing.contains(&identity.name) {
                return Err(IconError::NotFound(identity.name.clone()));
            }
            Ok(IconRef::new(identity.name.clone()))
        }

        async fn fetch(&self, icon: &IconRef, size: u32) -> Result<RgbaImage, IconError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.slow.contains(&icon.url) {
                tokio::time::sleep(Duration::from_secs(8)).await;
            }
            Ok(RgbaImage::from_pixel(size, size, Rgba([90, 90, 90, 255])))
        }
    }

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn setup(
        count: usize,
        source: FakeSource,
        timeout: Duration,
    ) -> (LazyLoader<FakeSource>, Collection, GridPlacement) {
        let collection = Collection::from_bundles((0..count).map(|i| {
            ItemBundle::new(ItemIdentity::new(format!("item{}", i), "Body"), Rarity::Import)
        }));
        let mut grid = GridPlacement::new(GridLayout::new(7, SIZE, 0));
        let ids: Vec<ItemId> = collection.ids().collect();
        grid.relayout(&[], &ids, &ids);

        let pipeline = ImagePipeline::new(Arc::new(GradientCache::new()), SIZE);
        let loader = LazyLoader::new(Arc::new(source), pipeline, timeout, 2);
        (loader, collection, grid)
    }

    fn everything() -> Viewport {
        Viewport::new(0.0, 0.0, 7.0 * SIZE as f32, 10.0 * SIZE as f32)
    }

    fn fetches(loader: &LazyLoader<FakeSource>) -> usize {
        loader.source.fetches.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let source = FakeSource {
            missing: set(&["item2", "item5", "item9"]),
            ..FakeSource::default()
        };
        let (mut loader, mut collection, grid) = setup(10, source, Duration::from_secs(10));

        assert_eq!(loader.load_visible(&mut collection, &grid, &everything()), 10);
        let report = loader.settle(&mut collection).await;

        assert_eq!(report.loaded, 7);
        assert_eq!(report.not_found, 3);
        assert_eq!(report.updates.len(), 10);
        assert_eq!(collection.not_found_count(), 3);
        for (_, record) in collection.iter() {
            assert!(record.is_loaded());
            if record.visual_state() == VisualState::Normal {
                assert_eq!(record.processed_image().map(|i| i.dimensions()), Some((SIZE, SIZE)));
            } else {
                assert!(record.processed_image().is_none());
            }
        }
    }

    #[tokio::test]
    async fn test_repeated_loads_are_idempotent() {
        let (mut loader, mut collection, grid) = setup(4, FakeSource::default(), Duration::from_secs(10));

        assert_eq!(loader.load_visible(&mut collection, &grid, &everything()), 4);
        // Still in flight
        assert_eq!(loader.load_visible(&mut collection, &grid, &everything()), 0);
        loader.settle(&mut collection).await;
        // Loaded
        assert_eq!(loader.load_visible(&mut collection, &grid, &everything()), 0);

        assert_eq!(fetches(&loader), 4);
        assert!(loader.is_idle());
    }

    #[tokio::test]
    async fn test_only_visible_rows_load() {
        let (mut loader, mut collection, grid) = setup(10, FakeSource::default(), Duration::from_secs(10));
        let first_row = Viewport::new(0.0, 0.0, 7.0 * SIZE as f32, SIZE as f32);

        assert_eq!(loader.load_visible(&mut collection, &grid, &first_row), 7);
        loader.settle(&mut collection).await;

        assert_eq!(collection.pending_count(), 3);
        assert_eq!(collection[ItemId(8)].load_state(), LoadState::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let source = FakeSource {
            slow: set(&["item1"]),
            ..FakeSource::default()
        };
        let (mut loader, mut collection, grid) = setup(3, source, Duration::from_secs(5));

        loader.load_visible(&mut collection, &grid, &everything());
        let report = loader.settle(&mut collection).await;

        assert_eq!(report.loaded, 2);
        assert_eq!(report.not_found, 1);
        assert_eq!(collection[ItemId(1)].visual_state(), VisualState::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completions_apply_without_waiting_for_slow_jobs() {
        let source = FakeSource {
            slow: set(&["item0"]),
            ..FakeSource::default()
        };
        let (mut loader, mut collection, grid) = setup(3, source, Duration::from_secs(10));

        loader.load_visible(&mut collection, &grid, &everything());
        tokio::time::sleep(Duration::from_secs(2)).await;
        let early = loader.apply_completed(&mut collection);

        assert_eq!(early.loaded, 2);
        assert_eq!(
            early.updates.iter().map(|(id, _)| *id).collect::<HashSet<_>>(),
            [ItemId(1), ItemId(2)].into_iter().collect()
        );
        assert_eq!(collection[ItemId(0)].load_state(), LoadState::InFlight);
        assert_eq!(loader.outstanding(), 1);

        let late = loader.settle(&mut collection).await;
        assert_eq!(late.loaded, 1);
        assert!(collection[ItemId(0)].is_loaded());
    }

    #[tokio::test]
    async fn test_refresh_refuses_in_flight_record() {
        let (mut loader, mut collection, grid) = setup(2, FakeSource::default(), Duration::from_secs(10));

        loader.load_visible(&mut collection, &grid, &everything());
        assert!(!loader.refresh(&mut collection, ItemId(1)));
        assert!(!loader.refresh(&mut collection, ItemId(7)));
        loader.settle(&mut collection).await;
        assert_eq!(fetches(&loader), 2);

        assert!(loader.refresh(&mut collection, ItemId(1)));
        loader.settle(&mut collection).await;
        assert_eq!(fetches(&loader), 3);
        assert!(collection[ItemId(1)].is_loaded());
    }

    #[tokio::test]
    async fn test_result_for_replaced_identity_is_dropped() {
        let (mut loader, mut collection, grid) = setup(1, FakeSource::default(), Duration::from_secs(10));
        loader.load_visible(&mut collection, &grid, &everything());

        let painted = ItemIdentity::new("item0", "Body").with_paint(PaintColor::Gold);
        if let Some(record) = collection.get_mut(ItemId(0)) {
            record.update(ItemEdit::new().identity(painted));
        }
        let report = loader.settle(&mut collection).await;

        assert!(report.updates.is_empty());
        assert_eq!(collection[ItemId(0)].load_state(), LoadState::Pending);
        assert!(collection[ItemId(0)].base_image().is_none());
    }

    #[tokio::test]
    async fn test_reprocess_after_rarity_change() {
        let (mut loader, mut collection, grid) = setup(1, FakeSource::default(), Duration::from_secs(10));
        loader.load_visible(&mut collection, &grid, &everything());
        loader.settle(&mut collection).await;
        let before = collection[ItemId(0)].processed_image().cloned();

        let outcome = collection
            .get_mut(ItemId(0))
            .map(|r| r.update(ItemEdit::new().rarity(Rarity::Exotic)))
            .unwrap_or_default();
        assert!(outcome.reprocess);

        assert!(loader.reprocess(&collection, ItemId(0)));
        let report = loader.settle(&mut collection).await;

        assert_eq!(report.processed, 1);
        assert_ne!(collection[ItemId(0)].processed_image().cloned(), before);
        assert_eq!(fetches(&loader), 1);
    }

    #[tokio::test]
    async fn test_failed_reprocess_shows_base_icon() {
        let (mut loader, mut collection, grid) = setup(1, FakeSource::default(), Duration::from_secs(10));
        loader.load_visible(&mut collection, &grid, &everything());
        loader.settle(&mut collection).await;

        if let Some(record) = collection.get_mut(ItemId(0)) {
            record.update(ItemEdit::new().rarity(Rarity::Premium));
        }
        loader.compute.close();
        loader.reprocess(&collection, ItemId(0));
        let report = loader.settle(&mut collection).await;

        let base = collection[ItemId(0)].base_image().cloned();
        assert!(base.is_some());
        assert_eq!(report.processed, 0);
        assert_eq!(
            report.updates,
            vec![(ItemId(0), vec![VisualCommand::SetImage(base)])]
        );
    }
}
