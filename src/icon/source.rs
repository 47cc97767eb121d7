/// Remote icon resolution contract
///
/// Resolving maps an item identity to a fetchable icon reference; fetching
/// downloads it and downsizes it to the grid cell. Both may fail per item,
/// and neither is retried automatically.

use std::future::Future;

use image::RgbaImage;

use crate::error::IconError;
use crate::state::data::ItemIdentity;

/// Where an icon can be downloaded from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconRef {
    pub url: String,
}

impl IconRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

pub trait IconSource {
    /// Find the icon for an identity; `IconError::NotFound` when unknown
    fn resolve(
        &self,
        identity: &ItemIdentity,
    ) -> impl Future<Output = Result<IconRef, IconError>> + Send;

    /// Download an icon and resize it to `size × size`
    fn fetch(
        &self,
        icon: &IconRef,
        size: u32,
    ) -> impl Future<Output = Result<RgbaImage, IconError>> + Send;
}
