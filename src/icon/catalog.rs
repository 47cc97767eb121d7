/// HTTP icon source backed by a marketplace catalog
///
/// The catalog is a JSON document listing every known item with its icon
/// path, and for paintable items one icon per paint color:
///
/// ```json
/// { "items": [
///     { "name": "Zomba", "slot": "Wheels", "icon": "/icons/zomba.png",
///       "colors": { "Titanium White": "/icons/zomba_tw.png" } }
/// ] }
/// ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::processor::downscale;
use super::source::{IconRef, IconSource};
use crate::color::PaintColor;
use crate::config::FetchConfig;
use crate::error::{CatalogError, IconError};
use crate::state::data::ItemIdentity;

/// One catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub slot: String,
    pub icon: String,
    /// Paint-specific icon variants
    #[serde(default)]
    pub colors: HashMap<PaintColor, String>,
}

impl CatalogEntry {
    /// Icon path for a paint, falling back to the unpainted icon
    pub fn icon_for(&self, paint: PaintColor) -> &str {
        self.colors
            .get(&paint)
            .map(String::as_str)
            .unwrap_or(&self.icon)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    items: Vec<CatalogEntry>,
}

/// Index of catalog entries by (name, slot), case-insensitive
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<(String, String), CatalogEntry>,
}

fn key(name: &str, slot: &str) -> (String, String) {
    (name.trim().to_lowercase(), slot.trim().to_lowercase())
}

impl Catalog {
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (key(&e.name, &e.slot), e))
            .collect();
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::from_entries(file.items))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, identity: &ItemIdentity) -> Option<&CatalogEntry> {
        self.entries.get(&key(&identity.name, &identity.slot))
    }
}

/// `IconSource` that resolves through a `Catalog` and downloads over HTTP
#[derive(Debug, Clone)]
pub struct CatalogIconSource {
    catalog: Catalog,
    base_url: String,
    client: reqwest::Client,
}

impl CatalogIconSource {
    pub fn new(catalog: Catalog, config: &FetchConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            catalog,
            base_url: config.catalog_base_url.clone(),
            client,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Absolute URL for a catalog icon path
    fn full_url(&self, icon: &str) -> String {
        if icon.starts_with("http://") || icon.starts_with("https://") {
            icon.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                icon.trim_start_matches('/')
            )
        }
    }
}

impl IconSource for CatalogIconSource {
    async fn resolve(&self, identity: &ItemIdentity) -> Result<IconRef, IconError> {
        let entry = self
            .catalog
            .lookup(identity)
            .ok_or_else(|| IconError::NotFound(identity.name.clone()))?;
        Ok(IconRef::new(self.full_url(entry.icon_for(identity.paint))))
    }

    async fn fetch(&self, icon: &IconRef, size: u32) -> Result<RgbaImage, IconError> {
        debug!("Downloading icon {}", icon.url);

        let response = self.client.get(&icon.url).send().await?;
        if !response.status().is_success() {
            warn!("Icon {} returned status {}", icon.url, response.status());
            return Err(IconError::FetchFailed(format!(
                "{} returned {}",
                icon.url,
                response.status()
            )));
        }
        let bytes = response.bytes().await?;

        // Decoding and resampling are CPU-bound
        tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&bytes)?;
            Ok::<_, IconError>(downscale(&image, size))
        })
        .await
        .map_err(|e| IconError::FetchFailed(format!("decode task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{ "items": [
        { "name": "Dingo", "slot": "Body", "icon": "/icons/dingo.png" },
        { "name": "Zomba", "slot": "Wheels", "icon": "/icons/zomba.png",
          "colors": { "Titanium White": "/icons/zomba_tw.png" } }
    ] }"#;

    fn source() -> CatalogIconSource {
        let config = FetchConfig {
            catalog_base_url: "https://cdn.example.com/".to_string(),
            ..FetchConfig::default()
        };
        CatalogIconSource::new(Catalog::from_json(CATALOG).unwrap(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_plain_item() {
        let icon = source()
            .resolve(&ItemIdentity::new("dingo", "BODY"))
            .await
            .unwrap();
        assert_eq!(icon.url, "https://cdn.example.com/icons/dingo.png");
    }

    #[tokio::test]
    async fn test_resolve_picks_paint_variant() {
        let source = source();

        let painted = ItemIdentity::new("Zomba", "Wheels").with_paint(PaintColor::TitaniumWhite);
        let icon = source.resolve(&painted).await.unwrap();
        assert!(icon.url.ends_with("zomba_tw.png"));

        let unlisted = ItemIdentity::new("Zomba", "Wheels").with_paint(PaintColor::Crimson);
        let icon = source.resolve(&unlisted).await.unwrap();
        assert!(icon.url.ends_with("zomba.png"));
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let result = source().resolve(&ItemIdentity::new("Breakout", "Body")).await;
        assert!(matches!(result, Err(IconError::NotFound(_))));
    }

    #[test]
    fn test_malformed_catalog() {
        assert!(matches!(
            Catalog::from_json("{ \"items\": 3 }"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Catalog::load(Path::new("/nonexistent/catalog.json"));
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }
}
