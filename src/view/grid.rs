/// Grid placement
///
/// Assigns each displayed item a (row, column) slot from its index in the
/// ordered sequence and emits only the placement commands that actually
/// change something on screen.

use std::collections::{HashMap, HashSet};

use crate::config::GridConfig;
use crate::state::data::ItemId;
use crate::view::surface::PlacementCommand;

/// Visible scroll region in grid content coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    fn intersects(&self, rect: &CellRect) -> bool {
        rect.x < self.x + self.width
            && rect.x + rect.size > self.x
            && rect.y < self.y + self.height
            && rect.y + rect.size > self.y
    }
}

/// Square cell rectangle in content coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRect {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// Fixed-column grid geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: usize,
    pub cell_size: u32,
    pub padding: u32,
}

impl GridLayout {
    pub fn new(columns: usize, cell_size: u32, padding: u32) -> Self {
        Self {
            columns: columns.max(1),
            cell_size,
            padding,
        }
    }

    /// Distance between the origins of two neighbouring cells
    pub fn pitch(&self) -> f32 {
        (self.cell_size + 2 * self.padding) as f32
    }

    /// Slot of the item at `index` in the ordered sequence
    pub fn cell_at(&self, index: usize) -> (usize, usize) {
        (index / self.columns, index % self.columns)
    }

    pub fn cell_rect(&self, row: usize, col: usize) -> CellRect {
        let pitch = self.pitch();
        CellRect {
            x: col as f32 * pitch + self.padding as f32,
            y: row as f32 * pitch + self.padding as f32,
            size: self.cell_size as f32,
        }
    }

    pub fn rows_for(&self, count: usize) -> usize {
        count.div_ceil(self.columns)
    }
}

impl From<&GridConfig> for GridLayout {
    fn from(config: &GridConfig) -> Self {
        Self::new(config.columns, config.icon_size, config.padding)
    }
}

/// Tracks which slot every displayed item occupies
#[derive(Debug, Clone)]
pub struct GridPlacement {
    layout: GridLayout,
    order: Vec<ItemId>,
    cells: HashMap<ItemId, (usize, usize)>,
}

impl GridPlacement {
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            order: Vec::new(),
            cells: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Items currently placed, in slot order
    pub fn order(&self) -> &[ItemId] {
        &self.order
    }

    pub fn cell_of(&self, id: ItemId) -> Option<(usize, usize)> {
        self.cells.get(&id).copied()
    }

    /// Height of the placed content in pixels
    pub fn content_height(&self) -> f32 {
        self.layout.rows_for(self.order.len()) as f32 * self.layout.pitch()
    }

    /// Bring the grid in line with a new ordered sequence
    ///
    /// When nothing was removed and the previous sequence is a prefix of the
    /// new one, only the appended items are placed. Otherwise every item
    /// whose slot moved is placed again.
    pub fn relayout(
        &mut self,
        removed: &[ItemId],
        added: &[ItemId],
        ordered: &[ItemId],
    ) -> Vec<PlacementCommand> {
        let mut commands = Vec::new();

        for &id in removed {
            if self.cells.remove(&id).is_some() {
                commands.push(PlacementCommand::Detach { id });
            }
        }

        if removed.is_empty() && ordered.starts_with(&self.order) {
            debug_assert_eq!(ordered.len() - self.order.len(), added.len());
            for (index, &id) in ordered.iter().enumerate().skip(self.order.len()) {
                commands.push(self.place(id, index));
            }
        } else {
            let keep: HashSet<ItemId> = ordered.iter().copied().collect();
            let mut stale: Vec<ItemId> = self
                .cells
                .keys()
                .filter(|id| !keep.contains(id))
                .copied()
                .collect();
            stale.sort();
            for id in stale {
                self.cells.remove(&id);
                commands.push(PlacementCommand::Detach { id });
            }

            for (index, &id) in ordered.iter().enumerate() {
                if self.cells.get(&id) != Some(&self.layout.cell_at(index)) {
                    commands.push(self.place(id, index));
                }
            }
        }

        self.order = ordered.to_vec();
        commands
    }

    fn place(&mut self, id: ItemId, index: usize) -> PlacementCommand {
        let (row, col) = self.layout.cell_at(index);
        self.cells.insert(id, (row, col));
        PlacementCommand::Place { id, row, col }
    }

    /// Placed items whose cell intersects the viewport, in slot order
    pub fn visible_in(&self, viewport: &Viewport) -> Vec<ItemId> {
        if self.order.is_empty() || viewport.width <= 0.0 || viewport.height <= 0.0 {
            return Vec::new();
        }

        let pitch = self.layout.pitch();
        let rows = self.layout.rows_for(self.order.len());
        // Float to usize casts saturate, so only the row arithmetic needs bounding
        let first_row = (viewport.y.max(0.0) / pitch).floor() as usize;
        if first_row >= rows {
            return Vec::new();
        }
        let last_row = ((viewport.y + viewport.height).max(0.0) / pitch).floor() as usize;
        let last_row = last_row.min(rows - 1);
        let start = first_row * self.layout.columns;
        let end = ((last_row + 1) * self.layout.columns).min(self.order.len());

        (start..end)
            .filter(|&index| {
                let (row, col) = self.layout.cell_at(index);
                viewport.intersects(&self.layout.cell_rect(row, col))
            })
            .map(|index| self.order[index])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[usize]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId).collect()
    }

    fn placement() -> GridPlacement {
        GridPlacement::new(GridLayout::new(7, 100, 0))
    }

    #[test]
    fn test_initial_placement_fills_rows() {
        let mut grid = placement();
        let all = ids(&[0, 1, 2, 3, 4, 5, 6, 7]);

        let commands = grid.relayout(&[], &all, &all);

        assert_eq!(commands.len(), 8);
        assert_eq!(grid.cell_of(ItemId(6)), Some((0, 6)));
        assert_eq!(grid.cell_of(ItemId(7)), Some((1, 0)));
    }

    #[test]
    fn test_growth_places_only_the_tail() {
        let mut grid = placement();
        grid.relayout(&[], &ids(&[0, 1]), &ids(&[0, 1]));

        let commands = grid.relayout(&[], &ids(&[2]), &ids(&[0, 1, 2]));

        assert_eq!(
            commands,
            vec![PlacementCommand::Place { id: ItemId(2), row: 0, col: 2 }]
        );
    }

    #[test]
    fn test_removal_shifts_followers() {
        let mut grid = placement();
        grid.relayout(&[], &ids(&[0, 1, 2]), &ids(&[0, 1, 2]));

        let commands = grid.relayout(&ids(&[0]), &[], &ids(&[1, 2]));

        assert_eq!(
            commands,
            vec![
                PlacementCommand::Detach { id: ItemId(0) },
                PlacementCommand::Place { id: ItemId(1), row: 0, col: 0 },
                PlacementCommand::Place { id: ItemId(2), row: 0, col: 1 },
            ]
        );
    }

    #[test]
    fn test_reorder_moves_only_changed_slots() {
        let mut grid = placement();
        grid.relayout(&[], &ids(&[0, 1, 2]), &ids(&[0, 1, 2]));

        let commands = grid.relayout(&[], &[], &ids(&[0, 2, 1]));

        assert_eq!(commands.len(), 2);
        assert_eq!(grid.cell_of(ItemId(0)), Some((0, 0)));
        assert_eq!(grid.cell_of(ItemId(2)), Some((0, 1)));
    }

    #[test]
    fn test_visible_rows() {
        let mut grid = GridPlacement::new(GridLayout::new(2, 100, 0));
        let all = ids(&[0, 1, 2, 3, 4, 5]);
        grid.relayout(&[], &all, &all);

        assert_eq!(grid.visible_in(&Viewport::new(0.0, 0.0, 200.0, 100.0)), ids(&[0, 1]));
        assert_eq!(
            grid.visible_in(&Viewport::new(0.0, 150.0, 200.0, 100.0)),
            ids(&[2, 3, 4, 5])
        );
        assert_eq!(grid.visible_in(&Viewport::new(0.0, 0.0, 50.0, 100.0)), ids(&[0]));
        assert!(grid.visible_in(&Viewport::new(0.0, 900.0, 200.0, 100.0)).is_empty());
        assert_eq!(grid.content_height(), 300.0);
    }

    #[test]
    fn test_far_viewport_is_empty() {
        let mut grid = GridPlacement::new(GridLayout::new(2, 100, 0));
        let all = ids(&[0, 1, 2, 3, 4, 5]);
        grid.relayout(&[], &all, &all);

        assert!(grid.visible_in(&Viewport::new(0.0, 1.0e20, 200.0, 100.0)).is_empty());
        assert!(grid.visible_in(&Viewport::new(0.0, f32::INFINITY, 200.0, 100.0)).is_empty());
        assert_eq!(
            grid.visible_in(&Viewport::new(0.0, 250.0, 200.0, f32::INFINITY)),
            ids(&[4, 5])
        );
        assert_eq!(grid.visible_in(&Viewport::new(0.0, -1.0e20, 200.0, f32::MAX)), all);
    }
}
