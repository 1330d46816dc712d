//! Champion catalog provider and one-shot HTTP loader
//!
//! The catalog source is a Data Dragon style document: a JSON object whose
//! `data` field maps champion names to records carrying an `id`. A fetch or
//! parse failure is logged and leaves the catalog empty; the service keeps
//! running and timeout auto-picks degrade accordingly.

use crate::config::CatalogSettings;
use crate::error::{DraftRoomError, Result};
use rand::seq::IteratorRandom;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{info, warn};

/// Trait for read-only access to the champion pool
pub trait CatalogProvider: Send + Sync {
    /// All selectable champion identifiers
    fn champion_ids(&self) -> &[String];

    /// Number of champions in the catalog
    fn len(&self) -> usize {
        self.champion_ids().len()
    }

    /// Whether the catalog holds no champions (e.g. after a failed load)
    fn is_empty(&self) -> bool {
        self.champion_ids().is_empty()
    }

    /// Uniformly random champion not present in `taken`, or `None` when the
    /// remaining pool is empty
    fn random_excluding(&self, taken: &HashSet<&str>) -> Option<String> {
        self.champion_ids()
            .iter()
            .filter(|id| !taken.contains(id.as_str()))
            .choose(&mut rand::thread_rng())
            .cloned()
    }
}

/// In-memory champion catalog, immutable after construction
#[derive(Debug, Clone, Default)]
pub struct ChampionCatalog {
    ids: Vec<String>,
}

impl ChampionCatalog {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }

    /// An empty catalog, the degraded state after a failed load
    pub fn empty() -> Self {
        Self::default()
    }
}

impl CatalogProvider for ChampionCatalog {
    fn champion_ids(&self) -> &[String] {
        &self.ids
    }
}

/// Wire format of the catalog document
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    data: HashMap<String, CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
}

/// Fetch the catalog once, degrading to an empty catalog on any failure
///
/// This is deliberately infallible: catalog availability is not a reason to
/// refuse to start the service.
pub async fn load_catalog(settings: &CatalogSettings) -> ChampionCatalog {
    match fetch_catalog(settings).await {
        Ok(catalog) => {
            info!(
                "Champion catalog loaded - {} champions from {}",
                catalog.len(),
                settings.url
            );
            catalog
        }
        Err(e) => {
            warn!(
                "Champion catalog load failed, continuing with empty catalog: {}",
                e
            );
            ChampionCatalog::empty()
        }
    }
}

/// Single fetch attempt against the configured catalog source
async fn fetch_catalog(settings: &CatalogSettings) -> Result<ChampionCatalog> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.fetch_timeout_seconds))
        .build()
        .map_err(|e| DraftRoomError::CatalogUnavailable {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

    let document: CatalogDocument = client
        .get(&settings.url)
        .send()
        .await
        .map_err(|e| DraftRoomError::CatalogUnavailable {
            message: format!("Catalog request failed: {}", e),
        })?
        .json()
        .await
        .map_err(|e| DraftRoomError::CatalogUnavailable {
            message: format!("Catalog response was not valid JSON: {}", e),
        })?;

    let mut ids: Vec<String> = document.data.into_values().map(|entry| entry.id).collect();
    ids.sort();

    Ok(ChampionCatalog::new(ids))
}
