use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{debug, info};

use inventory_grid::view::surface::{DisplayImage, Overlay};
use inventory_grid::{
    init_tracing, Catalog, CatalogIconSource, Config, GradientCache, InventoryView, ItemBundle,
    Predicate, Rarity, RenderSurface, SortKey, Viewport, VisualState,
};

/// Load an inventory headlessly and report what the first screen would show
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Icon catalog (JSON)
    catalog: PathBuf,

    /// Inventory bundles (JSON array)
    inventory: PathBuf,

    /// Only show items of this rarity
    #[arg(long)]
    rarity: Option<Rarity>,

    /// Only show items whose name contains this text
    #[arg(long)]
    name: Option<String>,

    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Number of grid rows in the initial viewport
    #[arg(long, default_value_t = 4)]
    rows: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Acquired,
    Rarity,
    Quantity,
    Series,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortKey::Name,
            SortArg::Acquired => SortKey::Acquired,
            SortArg::Rarity => SortKey::Rarity,
            SortArg::Quantity => SortKey::Quantity,
            SortArg::Series => SortKey::Series,
        }
    }
}

/// Surface that records placements and logs every change
#[derive(Debug, Default)]
struct LogSurface {
    created: usize,
    placed: usize,
    images: usize,
}

impl RenderSurface for LogSurface {
    type Handle = usize;

    fn create_placeholder(&mut self, _size: u32) -> usize {
        self.created += 1;
        self.created - 1
    }

    fn set_image(&mut self, handle: &usize, image: Option<&DisplayImage>) {
        if image.is_some() {
            self.images += 1;
        }
        debug!("#{} image {}", handle, if image.is_some() { "set" } else { "cleared" });
    }

    fn set_text(&mut self, handle: &usize, tag: Overlay, text: &str, visible: bool) {
        if visible {
            debug!("#{} {:?} = {:?}", handle, tag, text);
        }
    }

    fn set_fill(&mut self, _handle: &usize, _tag: Overlay, _rgb: [u8; 3]) {}

    fn set_visible(&mut self, handle: &usize, tag: Overlay, visible: bool) {
        debug!("#{} {:?} visible: {}", handle, tag, visible);
    }

    fn set_state(&mut self, handle: &usize, state: VisualState) {
        if state == VisualState::NotFound {
            debug!("#{} not found", handle);
        }
    }

    fn set_outline(&mut self, _handle: &usize, _outline: Option<[u8; 3]>) {}

    fn place_at(&mut self, handle: &usize, row: usize, col: usize) {
        self.placed += 1;
        debug!("#{} placed at ({}, {})", handle, row, col);
    }

    fn detach(&mut self, handle: &usize) {
        debug!("#{} detached", handle);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    let catalog = Catalog::load(&args.catalog)?;
    info!("Catalog has {} entries", catalog.len());
    let source = Arc::new(CatalogIconSource::new(catalog, &config.fetch)?);

    let json = tokio::fs::read_to_string(&args.inventory).await?;
    let bundles = ItemBundle::list_from_json(&json)?;

    let gradients = Arc::new(GradientCache::new());
    let mut view = InventoryView::from_config(LogSurface::default(), source, gradients, &config);
    view.add_bundles(bundles);

    if let Some(rarity) = args.rarity {
        view.set_filter("rarity", Predicate::Rarity(rarity));
    }
    if let Some(name) = args.name {
        view.set_filter("name", Predicate::NameContains(name));
    }
    view.set_sort(args.sort.map(SortKey::from));
    let delta = view.apply_filter();

    let layout = *view.grid().layout();
    let width = layout.columns as f32 * layout.pitch();
    let height = args.rows as f32 * layout.pitch();
    let issued = view.load_visible(Viewport::new(0.0, 0.0, width, height));
    info!("Loading {} visible icons", issued);
    let report = view.settle().await;

    info!(
        "{} of {} items shown, {} icons loaded, {} not found, {} still pending",
        delta.ordered.len(),
        view.collection().len(),
        report.loaded,
        report.not_found,
        view.collection().pending_count()
    );
    info!(
        "Surface: {} placeholders, {} placements, {} images",
        view.surface().created,
        view.surface().placed,
        view.surface().images
    );

    Ok(())
}
