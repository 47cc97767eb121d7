/// Lazy-loading inventory grid
///
/// Displays a large collection of collectible items in a fixed-column grid.
/// Icons are resolved and downloaded only once their cell scrolls into view,
/// composited with a memoized rarity gradient, and applied to the right item
/// as each job completes. Filters and sorting produce minimal placement
/// deltas instead of rebuilding the grid.

pub mod color;
pub mod config;
pub mod error;
pub mod icon;
pub mod state;
pub mod view;

use tracing_subscriber::EnvFilter;

pub use color::{PaintColor, Rarity};
pub use config::Config;
pub use error::{CatalogError, ConfigError, IconError, ParseError};
pub use icon::catalog::{Catalog, CatalogIconSource};
pub use icon::gradient::GradientCache;
pub use icon::processor::ImagePipeline;
pub use icon::source::{IconRef, IconSource};
pub use state::collection::Collection;
pub use state::data::{ItemBundle, ItemId, ItemIdentity, PriceRange};
pub use state::edit::ItemEdit;
pub use state::record::ItemRecord;
pub use view::filter::{FilterDelta, FilterEngine, Predicate, SortKey};
pub use view::grid::{GridLayout, GridPlacement, Viewport};
pub use view::inventory::InventoryView;
pub use view::scheduler::{LazyLoader, LoadReport};
pub use view::surface::{RenderSurface, SurfaceEvent, VisualCommand, VisualState};

/// Install a stderr fmt subscriber filtered by `RUST_LOG` (default `info`)
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
