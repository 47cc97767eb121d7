/// Per-item render record
///
/// A record owns an item's attributes and its render state (base icon,
/// composited icon, load state, selection). State transitions are plain
/// methods that return the `VisualCommand`s describing what changed; pushing
/// those commands to a render surface is a separate step.

use std::sync::Arc;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use image::RgbaImage;

use super::data::{normalize_certified, ItemBundle, ItemIdentity, PriceRange};
use super::edit::ItemEdit;
use crate::color::{Rarity, Rgb};
use crate::error::IconError;
use crate::view::surface::{DisplayImage, Overlay, VisualCommand, VisualState};

/// Outline drawn around a selected item
pub const SELECT_OUTLINE: Rgb = [0x00, 0xA3, 0xF5];
/// Outline drawn around a hovered, unselected item
pub const HOVER_OUTLINE: Rgb = [0x85, 0xD6, 0xFF];

bitflags! {
    /// Interaction behaviors attached to a record
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const SELECTABLE = 0b0000_0001;
        const HOVERABLE  = 0b0000_0010;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::SELECTABLE | Capabilities::HOVERABLE
    }
}

/// Icon acquisition progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Pending,
    InFlight,
    Loaded,
}

/// Identifies one load job; results carrying an outdated ticket are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Icon produced by a finished load job
#[derive(Debug, Clone)]
pub struct LoadedIcon {
    pub base: Arc<RgbaImage>,
    pub processed: DisplayImage,
}

/// Result of applying an `ItemEdit`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOutcome {
    pub commands: Vec<VisualCommand>,
    /// The composited icon is stale and the image pipeline must run again
    pub reprocess: bool,
    /// The identity changed representation; the icon must be fetched again
    pub refetch: bool,
}

#[derive(Debug, Clone)]
pub struct ItemRecord {
    identity: ItemIdentity,
    rarity: Rarity,
    certified: Option<String>,
    quantity: u32,
    trade_lock: bool,
    price: Option<PriceRange>,
    acquired: DateTime<Utc>,
    series: Option<String>,
    favorite: bool,
    archived: bool,

    base_image: Option<Arc<RgbaImage>>,
    processed_image: Option<DisplayImage>,
    load_state: LoadState,
    load_ticket: u64,
    visual_state: VisualState,

    selected: bool,
    hovered: bool,
    capabilities: Capabilities,
}

impl ItemRecord {
    pub fn new(bundle: ItemBundle) -> Self {
        Self {
            identity: bundle.identity,
            rarity: bundle.rarity,
            certified: normalize_certified(bundle.certified),
            quantity: bundle.quantity,
            trade_lock: bundle.trade_lock,
            price: bundle.price,
            acquired: bundle.acquired,
            series: bundle.series,
            favorite: bundle.favorite,
            archived: bundle.archived,
            base_image: None,
            processed_image: None,
            load_state: LoadState::Pending,
            load_ticket: 0,
            visual_state: VisualState::Normal,
            selected: false,
            hovered: false,
            capabilities: Capabilities::default(),
        }
    }

    /// Record whose icon was fetched ahead of time (eager batch import)
    ///
    /// Without a processed image the record is left needing the pipeline,
    /// see `needs_processing`.
    pub fn preloaded(
        bundle: ItemBundle,
        base: Arc<RgbaImage>,
        processed: Option<DisplayImage>,
    ) -> Self {
        let mut record = Self::new(bundle);
        record.base_image = Some(base);
        record.processed_image = processed;
        record.load_state = LoadState::Loaded;
        record
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    // ========== Accessors ==========

    pub fn identity(&self) -> &ItemIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn rarity(&self) -> Rarity {
        self.rarity
    }

    pub fn certified(&self) -> Option<&str> {
        self.certified.as_deref()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn trade_lock(&self) -> bool {
        self.trade_lock
    }

    pub fn price(&self) -> Option<PriceRange> {
        self.price
    }

    pub fn acquired(&self) -> DateTime<Utc> {
        self.acquired
    }

    pub fn series(&self) -> Option<&str> {
        self.series.as_deref()
    }

    pub fn is_favorite(&self) -> bool {
        self.favorite
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }

    pub fn base_image(&self) -> Option<&Arc<RgbaImage>> {
        self.base_image.as_ref()
    }

    pub fn processed_image(&self) -> Option<&DisplayImage> {
        self.processed_image.as_ref()
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_loaded(&self) -> bool {
        self.load_state == LoadState::Loaded
    }

    pub fn visual_state(&self) -> VisualState {
        self.visual_state
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Base icon is present but the composite is missing
    pub fn needs_processing(&self) -> bool {
        self.base_image.is_some()
            && self.processed_image.is_none()
            && self.visual_state == VisualState::Normal
    }

    // ========== Visual commands ==========

    /// Commands that bring a freshly created placeholder up to date
    pub fn full_redraw(&self) -> Vec<VisualCommand> {
        let mut commands = vec![
            VisualCommand::SetState(self.visual_state),
            VisualCommand::SetImage(self.current_image()),
            self.name_command(),
        ];
        commands.extend(self.paint_commands());
        commands.push(self.certified_command());
        commands.push(self.quantity_command());
        commands.push(self.price_command());
        commands.push(self.trade_lock_command());
        commands.push(VisualCommand::SetOutline(self.outline()));
        commands
    }

    /// Composite if ready, otherwise the bare base icon
    fn current_image(&self) -> Option<DisplayImage> {
        self.processed_image.clone().or_else(|| self.base_image.clone())
    }

    fn name_command(&self) -> VisualCommand {
        VisualCommand::SetText {
            tag: Overlay::Name,
            text: self.identity.name.clone(),
            visible: true,
        }
    }

    fn paint_commands(&self) -> Vec<VisualCommand> {
        let paint = self.identity.paint;
        vec![
            VisualCommand::SetText {
                tag: Overlay::Paint,
                text: paint.name().to_string(),
                visible: !paint.is_default(),
            },
            VisualCommand::SetFill {
                tag: Overlay::Paint,
                rgb: paint.rgb(),
            },
        ]
    }

    fn certified_command(&self) -> VisualCommand {
        VisualCommand::SetText {
            tag: Overlay::Certified,
            text: self.certified.clone().unwrap_or_default(),
            visible: self.certified.is_some(),
        }
    }

    fn quantity_command(&self) -> VisualCommand {
        VisualCommand::SetText {
            tag: Overlay::Quantity,
            text: self.quantity.to_string(),
            visible: self.quantity > 1,
        }
    }

    fn price_command(&self) -> VisualCommand {
        VisualCommand::SetText {
            tag: Overlay::Price,
            text: self.price.map(|p| p.label()).unwrap_or_default(),
            visible: self.price.is_some(),
        }
    }

    fn trade_lock_command(&self) -> VisualCommand {
        VisualCommand::SetVisible {
            tag: Overlay::TradeLock,
            visible: self.trade_lock,
        }
    }

    // ========== State transitions ==========

    /// Apply an attribute delta
    ///
    /// Only rarity and identity invalidate images; everything else is a
    /// text or visibility toggle.
    pub fn update(&mut self, edit: ItemEdit) -> EditOutcome {
        let mut outcome = EditOutcome::default();

        if let Some(identity) = edit.identity {
            if identity.same_representation(&self.identity) {
                self.identity = identity;
                outcome.commands.push(self.name_command());
            } else {
                self.identity = identity;
                self.base_image = None;
                self.processed_image = None;
                self.load_state = LoadState::Pending;
                // A job still running for the old identity must not land
                self.load_ticket += 1;
                self.visual_state = VisualState::Normal;
                outcome.refetch = true;
                outcome.commands.push(VisualCommand::SetState(VisualState::Normal));
                outcome.commands.push(VisualCommand::SetImage(None));
                outcome.commands.push(self.name_command());
                outcome.commands.extend(self.paint_commands());
            }
        }

        if let Some(rarity) = edit.rarity {
            if rarity != self.rarity {
                self.rarity = rarity;
                self.processed_image = None;
                outcome.reprocess = self.needs_processing();
            }
        }

        if let Some(certified) = edit.certified {
            self.certified = normalize_certified(certified);
            outcome.commands.push(self.certified_command());
        }

        if let Some(quantity) = edit.quantity {
            self.quantity = quantity;
            outcome.commands.push(self.quantity_command());
        }

        if let Some(trade_lock) = edit.trade_lock {
            self.trade_lock = trade_lock;
            outcome.commands.push(self.trade_lock_command());
        }

        if let Some(price) = edit.price {
            self.price = price;
            outcome.commands.push(self.price_command());
        }

        if let Some(acquired) = edit.acquired {
            self.acquired = acquired;
        }
        if let Some(series) = edit.series {
            self.series = series;
        }
        if let Some(favorite) = edit.favorite {
            self.favorite = favorite;
        }
        if let Some(archived) = edit.archived {
            self.archived = archived;
        }

        outcome
    }

    /// Store a freshly composited icon
    ///
    /// Ignored when the record has no base icon or is in the not-found
    /// state, so the composite can never outlive its source.
    pub fn set_processed(&mut self, processed: DisplayImage) -> Vec<VisualCommand> {
        if self.base_image.is_none() || self.visual_state != VisualState::Normal {
            return Vec::new();
        }
        self.processed_image = Some(processed.clone());
        vec![VisualCommand::SetImage(Some(processed))]
    }

    /// Show the bare base icon when compositing it failed
    pub fn composite_failed(&self) -> Vec<VisualCommand> {
        if self.visual_state != VisualState::Normal || self.processed_image.is_some() {
            return Vec::new();
        }
        vec![VisualCommand::SetImage(self.base_image.clone())]
    }

    /// Claim the record for a viewport load; `None` when already claimed or loaded
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        if self.load_state != LoadState::Pending {
            return None;
        }
        Some(self.issue_ticket())
    }

    /// Claim the record for a forced refresh; `None` while a job is in flight
    pub fn begin_refresh(&mut self) -> Option<LoadTicket> {
        if self.load_state == LoadState::InFlight {
            return None;
        }
        Some(self.issue_ticket())
    }

    fn issue_ticket(&mut self) -> LoadTicket {
        self.load_state = LoadState::InFlight;
        self.load_ticket += 1;
        LoadTicket(self.load_ticket)
    }

    /// Apply the result of a load job
    ///
    /// Returns `None` and leaves the record untouched when the ticket is no
    /// longer current.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<LoadedIcon, IconError>,
    ) -> Option<Vec<VisualCommand>> {
        if ticket.0 != self.load_ticket || self.load_state != LoadState::InFlight {
            return None;
        }
        self.load_state = LoadState::Loaded;
        let commands = match result {
            Ok(icon) => {
                self.base_image = Some(icon.base);
                self.processed_image = Some(icon.processed.clone());
                self.visual_state = VisualState::Normal;
                vec![
                    VisualCommand::SetState(VisualState::Normal),
                    VisualCommand::SetImage(Some(icon.processed)),
                ]
            }
            Err(_) => {
                self.base_image = None;
                self.processed_image = None;
                self.visual_state = VisualState::NotFound;
                vec![
                    VisualCommand::SetState(VisualState::NotFound),
                    VisualCommand::SetImage(None),
                ]
            }
        };
        Some(commands)
    }

    // ========== Interaction ==========

    fn outline(&self) -> Option<Rgb> {
        if self.selected {
            Some(SELECT_OUTLINE)
        } else if self.hovered && self.capabilities.contains(Capabilities::HOVERABLE) {
            Some(HOVER_OUTLINE)
        } else {
            None
        }
    }

    pub fn toggle_selected(&mut self) -> Vec<VisualCommand> {
        if !self.capabilities.contains(Capabilities::SELECTABLE) {
            return Vec::new();
        }
        self.selected = !self.selected;
        vec![VisualCommand::SetOutline(self.outline())]
    }

    pub fn set_hovered(&mut self, inside: bool) -> Vec<VisualCommand> {
        if !self.capabilities.contains(Capabilities::HOVERABLE) || self.hovered == inside {
            return Vec::new();
        }
        self.hovered = inside;
        vec![VisualCommand::SetOutline(self.outline())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PaintColor;

    fn record(rarity: Rarity) -> ItemRecord {
        ItemRecord::new(ItemBundle::new(ItemIdentity::new("Dingo", "Body"), rarity))
    }

    fn icon() -> LoadedIcon {
        LoadedIcon {
            base: Arc::new(RgbaImage::new(4, 4)),
            processed: Arc::new(RgbaImage::new(4, 4)),
        }
    }

    fn load(rec: &mut ItemRecord) {
        let ticket = rec.begin_load().expect("record should be pending");
        rec.finish_load(ticket, Ok(icon())).expect("ticket should be current");
    }

    fn text_visibility(commands: &[VisualCommand], wanted: Overlay) -> Option<bool> {
        commands.iter().find_map(|c| match c {
            VisualCommand::SetText { tag, visible, .. } if *tag == wanted => Some(*visible),
            _ => None,
        })
    }

    #[test]
    fn test_quantity_shown_only_above_one() {
        let mut rec = record(Rarity::Rare);

        let outcome = rec.update(ItemEdit::new().quantity(1));
        assert_eq!(text_visibility(&outcome.commands, Overlay::Quantity), Some(false));

        let outcome = rec.update(ItemEdit::new().quantity(5));
        assert_eq!(text_visibility(&outcome.commands, Overlay::Quantity), Some(true));
        assert!(!outcome.reprocess);
    }

    #[test]
    fn test_text_edits_keep_composite() {
        let mut rec = record(Rarity::Exotic);
        load(&mut rec);

        let outcome = rec.update(
            ItemEdit::new()
                .quantity(3)
                .certified(Some("Striker"))
                .trade_lock(true)
                .price(Some(PriceRange { min: 1, max: 2 })),
        );

        assert!(!outcome.reprocess);
        assert!(rec.processed_image().is_some());
        assert!(!outcome
            .commands
            .iter()
            .any(|c| matches!(c, VisualCommand::SetImage(_))));
    }

    #[test]
    fn test_rarity_change_invalidates_composite() {
        let mut rec = record(Rarity::Exotic);
        load(&mut rec);

        let outcome = rec.update(ItemEdit::new().rarity(Rarity::BlackMarket));

        assert!(outcome.reprocess);
        assert!(rec.processed_image().is_none());
        assert!(rec.base_image().is_some());

        let unchanged = rec.update(ItemEdit::new().rarity(Rarity::BlackMarket));
        assert!(!unchanged.reprocess);
    }

    #[test]
    fn test_certified_none_is_hidden() {
        let mut rec = record(Rarity::Rare);
        let outcome = rec.update(ItemEdit::new().certified(Some("None")));
        assert_eq!(text_visibility(&outcome.commands, Overlay::Certified), Some(false));
        assert_eq!(rec.certified(), None);
    }

    #[test]
    fn test_failed_load_clears_images() {
        let mut rec = record(Rarity::Import);
        let ticket = rec.begin_load().unwrap();
        assert!(rec.begin_load().is_none());

        rec.finish_load(ticket, Err(IconError::NotFound("Dingo".into())));

        assert!(rec.is_loaded());
        assert_eq!(rec.visual_state(), VisualState::NotFound);
        assert!(rec.processed_image().is_none());
        assert!(rec.begin_load().is_none());
    }

    #[test]
    fn test_processed_requires_base() {
        let mut rec = record(Rarity::Import);
        let commands = rec.set_processed(Arc::new(RgbaImage::new(2, 2)));
        assert!(commands.is_empty());
        assert!(rec.processed_image().is_none());
    }

    #[test]
    fn test_refresh_is_not_reentrant() {
        let mut rec = record(Rarity::Import);
        load(&mut rec);

        assert!(rec.begin_refresh().is_some());
        assert!(rec.begin_refresh().is_none());
    }

    #[test]
    fn test_outdated_ticket_is_dropped() {
        let mut rec = record(Rarity::Import);
        let ticket = rec.begin_load().unwrap();

        let painted = ItemIdentity::new("Dingo", "Body").with_paint(PaintColor::Lime);
        rec.update(ItemEdit::new().identity(painted));

        assert!(rec.finish_load(ticket, Ok(icon())).is_none());
        assert_eq!(rec.load_state(), LoadState::Pending);
        assert!(rec.base_image().is_none());

        let fresh = rec.begin_refresh().unwrap();
        assert!(rec.finish_load(ticket, Ok(icon())).is_none());
        assert!(rec.finish_load(fresh, Ok(icon())).is_some());
        assert!(rec.is_loaded());
    }

    #[test]
    fn test_failed_composite_falls_back_to_base() {
        let mut rec = record(Rarity::Exotic);
        load(&mut rec);
        assert!(rec.composite_failed().is_empty());

        rec.update(ItemEdit::new().rarity(Rarity::Limited));

        let base = rec.base_image().cloned();
        assert_eq!(rec.composite_failed(), vec![VisualCommand::SetImage(base)]);
    }

    #[test]
    fn test_identity_change_forces_refetch() {
        let mut rec = record(Rarity::Import);
        load(&mut rec);

        let same = rec.update(ItemEdit::new().identity(ItemIdentity::new("DINGO", "body")));
        assert!(!same.refetch);
        assert!(rec.base_image().is_some());

        let painted = ItemIdentity::new("Dingo", "Body").with_paint(PaintColor::Lime);
        let outcome = rec.update(ItemEdit::new().identity(painted));
        assert!(outcome.refetch);
        assert_eq!(rec.load_state(), LoadState::Pending);
        assert!(rec.base_image().is_none());
    }

    #[test]
    fn test_selection_outline_wins_over_hover() {
        let mut rec = record(Rarity::Rare);

        assert_eq!(rec.set_hovered(true), vec![VisualCommand::SetOutline(Some(HOVER_OUTLINE))]);
        assert_eq!(rec.toggle_selected(), vec![VisualCommand::SetOutline(Some(SELECT_OUTLINE))]);
        assert_eq!(rec.set_hovered(false), vec![VisualCommand::SetOutline(Some(SELECT_OUTLINE))]);
        assert_eq!(rec.toggle_selected(), vec![VisualCommand::SetOutline(None)]);
    }

    #[test]
    fn test_unselectable_ignores_clicks() {
        let mut rec = record(Rarity::Rare).with_capabilities(Capabilities::HOVERABLE);
        assert!(rec.toggle_selected().is_empty());
        assert!(!rec.is_selected());
    }
}
