/// Grid view module
///
/// Everything between the item collection and the host toolkit:
/// - Render surface contract and visual commands (surface.rs)
/// - Row/column placement and viewport queries (grid.rs)
/// - Named filters and sorting (filter.rs)
/// - Viewport-driven icon loading (scheduler.rs)
/// - The controller tying them together (inventory.rs)

pub mod filter;
pub mod grid;
pub mod inventory;
pub mod scheduler;
pub mod surface;
