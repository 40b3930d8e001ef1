use std::collections::HashMap;
use tracing::debug;

use super::storage::{self, Storage};
use super::zone::{CanvasZone, FetchState, ZoneSummary};
use crate::errors::{Result, SkywayError};
use crate::metrics::registry::CANVAS_LISTINGS_TOTAL;

/// Bucket entries that sit next to the zone directories
const RESERVED_DIRS: &[&str] = &["models", "output"];

/// All UTM zones stored under one bucket
pub struct CanvasCollection {
    storage: Storage,
    bucket: String,
    zones: Vec<u32>,
    zones_state: FetchState,
    zone_cache: HashMap<u32, CanvasZone>,
}

impl CanvasCollection {
    pub fn new(storage: Storage, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
            zones: Vec::new(),
            zones_state: FetchState::NotFetched,
            zone_cache: HashMap::new(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Zone numbers found in the bucket, listed on first use
    pub fn canvas_zones(&mut self) -> Result<Vec<u32>> {
        if self.zones_state != FetchState::Fetched {
            self.zones_state = FetchState::Fetching;
            CANVAS_LISTINGS_TOTAL.with_label_values(&["bucket"]).inc();
            let paths = match self.storage.list_dir(&self.bucket) {
                Ok(paths) => paths,
                Err(e) => {
                    self.zones_state = FetchState::NotFetched;
                    return Err(e);
                }
            };

            let mut zones: Vec<u32> = paths
                .iter()
                .filter_map(|p| storage::file_name(p))
                .filter(|name| !RESERVED_DIRS.contains(name))
                .filter_map(|name| match name.parse::<u32>() {
                    Ok(zone) => Some(zone),
                    Err(_) => {
                        debug!(name, "Skipping non-zone entry");
                        None
                    }
                })
                .collect();
            zones.sort_unstable();
            zones.dedup();

            self.zones = zones;
            self.zones_state = FetchState::Fetched;
        }

        Ok(self.zones.clone())
    }

    /// Zone accessor; zones are built once and reused
    pub fn zone(&mut self, utm_zone: u32) -> Result<&mut CanvasZone> {
        if !self.canvas_zones()?.contains(&utm_zone) {
            return Err(SkywayError::not_found(format!(
                "zone {} in {}",
                utm_zone, self.bucket
            )));
        }

        let storage = &self.storage;
        let bucket = &self.bucket;
        Ok(self
            .zone_cache
            .entry(utm_zone)
            .or_insert_with(|| CanvasZone::new(storage.clone(), bucket, utm_zone)))
    }

    /// Coverage summary of every zone
    pub fn descriptions(&mut self) -> Result<Vec<ZoneSummary>> {
        let zones = self.canvas_zones()?;
        let mut summaries = Vec::with_capacity(zones.len());
        for utm_zone in zones {
            summaries.push(self.zone(utm_zone)?.summary()?);
        }
        Ok(summaries)
    }
}
