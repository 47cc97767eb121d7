/// Icon acquisition and compositing
///
/// - Rarity gradient overlays and their cache (gradient.rs)
/// - Base icon + overlay compositing (processor.rs)
/// - The icon source contract (source.rs)
/// - Catalog-backed HTTP source (catalog.rs)

pub mod catalog;
pub mod gradient;
pub mod processor;
pub mod source;
