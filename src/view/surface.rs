/// Render surface contract
///
/// The widget toolkit is an external collaborator. Records never talk to it
/// directly: they produce `VisualCommand`s, and `apply_commands` forwards them
/// to whatever `RenderSurface` the host application provides.

use std::sync::Arc;

use image::RgbaImage;

use crate::color::Rgb;
use crate::state::data::ItemId;
use crate::view::grid::Viewport;

/// Composited icon ready for display, shared cheaply between record and surface
pub type DisplayImage = Arc<RgbaImage>;

/// Per-item overlay drawn on top of the icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overlay {
    Name,
    Paint,
    Certified,
    Quantity,
    Price,
    TradeLock,
}

/// Whether the icon resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualState {
    #[default]
    Normal,
    /// Hides the image and overlays and shows a not-found label instead
    NotFound,
}

/// A single change to one item's on-screen appearance
#[derive(Debug, Clone, PartialEq)]
pub enum VisualCommand {
    SetImage(Option<DisplayImage>),
    SetText {
        tag: Overlay,
        text: String,
        visible: bool,
    },
    SetFill {
        tag: Overlay,
        rgb: Rgb,
    },
    SetVisible {
        tag: Overlay,
        visible: bool,
    },
    SetState(VisualState),
    SetOutline(Option<Rgb>),
}

/// Grid slot assignment produced by the grid placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementCommand {
    Place { id: ItemId, row: usize, col: usize },
    Detach { id: ItemId },
}

/// Input delivered by the host toolkit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    /// Scroll release, wheel, resize or the grid becoming mapped
    Viewport(Viewport),
    Click(ItemId),
    Hover { id: ItemId, inside: bool },
}

/// What the host toolkit must implement to display the grid
pub trait RenderSurface {
    type Handle: Clone;

    fn create_placeholder(&mut self, size: u32) -> Self::Handle;
    fn set_image(&mut self, handle: &Self::Handle, image: Option<&DisplayImage>);
    fn set_text(&mut self, handle: &Self::Handle, tag: Overlay, text: &str, visible: bool);
    fn set_fill(&mut self, handle: &Self::Handle, tag: Overlay, rgb: Rgb);
    fn set_visible(&mut self, handle: &Self::Handle, tag: Overlay, visible: bool);
    fn set_state(&mut self, handle: &Self::Handle, state: VisualState);
    fn set_outline(&mut self, handle: &Self::Handle, outline: Option<Rgb>);
    fn place_at(&mut self, handle: &Self::Handle, row: usize, col: usize);
    /// Remove from the grid without destroying the widget
    fn detach(&mut self, handle: &Self::Handle);
}

/// Forward visual commands for one item to the surface
pub fn apply_commands<S: RenderSurface>(
    surface: &mut S,
    handle: &S::Handle,
    commands: &[VisualCommand],
) {
    for command in commands {
        match command {
            VisualCommand::SetImage(image) => surface.set_image(handle, image.as_ref()),
            VisualCommand::SetText { tag, text, visible } => {
                surface.set_text(handle, *tag, text, *visible)
            }
            VisualCommand::SetFill { tag, rgb } => surface.set_fill(handle, *tag, *rgb),
            VisualCommand::SetVisible { tag, visible } => {
                surface.set_visible(handle, *tag, *visible)
            }
            VisualCommand::SetState(state) => surface.set_state(handle, *state),
            VisualCommand::SetOutline(outline) => surface.set_outline(handle, *outline),
        }
    }
}
