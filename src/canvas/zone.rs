use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use super::quadkey::{Quadkey, Tile};
use super::storage::{self, Storage};
use crate::errors::{Result, SkywayError};
use crate::metrics::registry::CANVAS_LISTINGS_TOTAL;

/// Ground area of one 5 km tile
pub const TILE_AREA_M2: u64 = 5_000 * 5_000;

/// Progress of a lazy listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    NotFetched,
    Fetching,
    Fetched,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CoverageNode {
    Quadkey(Quadkey),
    CatalogId(String),
}

/// Counts reported for one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneSummary {
    pub utm_zone: u32,
    pub area_m2: u64,
    pub quadkeys: usize,
    pub catalog_ids: usize,
}

/// Coverage of one UTM zone: `<bucket>/<zone>/<quadkey>/<catalog_id>-*`
pub struct CanvasZone {
    storage: Storage,
    utm_zone: u32,
    zone_path: String,
    graph: UnGraph<CoverageNode, ()>,
    index: HashMap<CoverageNode, NodeIndex>,
    quadkeys_state: FetchState,
    catalog_state: FetchState,
}

impl CanvasZone {
    pub fn new(storage: Storage, bucket: &str, utm_zone: u32) -> Self {
        Self {
            storage,
            utm_zone,
            zone_path: storage::join(bucket, &utm_zone.to_string()),
            graph: UnGraph::new_undirected(),
            index: HashMap::new(),
            quadkeys_state: FetchState::NotFetched,
            catalog_state: FetchState::NotFetched,
        }
    }

    pub fn utm_zone(&self) -> u32 {
        self.utm_zone
    }

    pub fn quadkeys_state(&self) -> FetchState {
        self.quadkeys_state
    }

    pub fn catalog_state(&self) -> FetchState {
        self.catalog_state
    }

    fn node(&mut self, node: CoverageNode) -> NodeIndex {
        if let Some(idx) = self.index.get(&node) {
            return *idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.index.insert(node, idx);
        idx
    }

    fn fetch_quadkeys(&mut self) -> Result<()> {
        if self.quadkeys_state == FetchState::Fetched {
            return Ok(());
        }

        self.quadkeys_state = FetchState::Fetching;
        CANVAS_LISTINGS_TOTAL.with_label_values(&["zone"]).inc();
        let paths = match self.storage.list_dir(&self.zone_path) {
            Ok(paths) => paths,
            Err(e) => {
                self.quadkeys_state = FetchState::NotFetched;
                return Err(e);
            }
        };

        for path in paths {
            let Some(name) = storage::file_name(&path) else {
                continue;
            };
            match Quadkey::parse(name) {
                Ok(qk) => {
                    self.node(CoverageNode::Quadkey(qk));
                }
                Err(_) => debug!(path = %path, "Skipping non-quadkey entry"),
            }
        }

        self.quadkeys_state = FetchState::Fetched;
        debug!(utm_zone = self.utm_zone, "Fetched quadkeys");
        Ok(())
    }

    fn fetch_catalog_ids(&mut self) -> Result<()> {
        if self.catalog_state == FetchState::Fetched {
            return Ok(());
        }
        self.fetch_quadkeys()?;

        self.catalog_state = FetchState::Fetching;
        for qk in self.quadkeys_sorted() {
            let qk_path = storage::join(&self.zone_path, qk.as_str());
            CANVAS_LISTINGS_TOTAL.with_label_values(&["quadkey"]).inc();
            let files = match self.storage.list_dir(&qk_path) {
                Ok(files) => files,
                Err(e) => {
                    self.catalog_state = FetchState::NotFetched;
                    return Err(e);
                }
            };

            let qk_idx = self.node(CoverageNode::Quadkey(qk));
            for file in files {
                let Some(catid) = storage::file_stem(&file)
                    .and_then(|stem| stem.split('-').next())
                    .filter(|c| !c.is_empty())
                else {
                    continue;
                };
                let cat_idx = self.node(CoverageNode::CatalogId(catid.to_string()));
                if self.graph.find_edge(cat_idx, qk_idx).is_none() {
                    self.graph.add_edge(cat_idx, qk_idx, ());
                }
            }
        }

        self.catalog_state = FetchState::Fetched;
        debug!(utm_zone = self.utm_zone, "Fetched catalog ids");
        Ok(())
    }

    fn quadkeys_sorted(&self) -> Vec<Quadkey> {
        let mut qks: Vec<Quadkey> = self
            .graph
            .node_weights()
            .filter_map(|n| match n {
                CoverageNode::Quadkey(qk) => Some(qk.clone()),
                CoverageNode::CatalogId(_) => None,
            })
            .collect();
        qks.sort();
        qks
    }

    fn catalog_ids_sorted(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .graph
            .node_weights()
            .filter_map(|n| match n {
                CoverageNode::CatalogId(id) => Some(id.clone()),
                CoverageNode::Quadkey(_) => None,
            })
            .collect();
        ids.sort();
        ids
    }

    /// Quadkeys present in the zone, listed on first use
    pub fn tile_quadkeys(&mut self) -> Result<Vec<Quadkey>> {
        self.fetch_quadkeys()?;
        Ok(self.quadkeys_sorted())
    }

    /// Catalog ids with at least one tile in the zone, listed on first use
    pub fn catalog_ids(&mut self) -> Result<Vec<String>> {
        self.fetch_catalog_ids()?;
        Ok(self.catalog_ids_sorted())
    }

    pub fn nqks(&mut self) -> Result<usize> {
        Ok(self.tile_quadkeys()?.len())
    }

    pub fn ncatids(&mut self) -> Result<usize> {
        Ok(self.catalog_ids()?.len())
    }

    pub fn area_coverage(&mut self) -> Result<String> {
        let area = TILE_AREA_M2 * self.nqks()? as u64;
        Ok(format!("{} m^2", area))
    }

    pub fn contains(&mut self, quadkey: &str) -> Result<bool> {
        self.fetch_quadkeys()?;
        Ok(match Quadkey::parse(quadkey) {
            Ok(qk) => self.index.contains_key(&CoverageNode::Quadkey(qk)),
            Err(_) => false,
        })
    }

    /// Tile for a quadkey present in the zone
    pub fn get(&mut self, quadkey: &str) -> Result<Tile> {
        if !self.contains(quadkey)? {
            return Err(SkywayError::not_found(format!(
                "quadkey {} in zone {}",
                quadkey, self.utm_zone
            )));
        }
        Ok(Quadkey::parse(quadkey)?.to_tile())
    }

    pub fn catalog_ids_for(&mut self, quadkey: &str) -> Result<Vec<String>> {
        self.fetch_catalog_ids()?;
        let qk = Quadkey::parse(quadkey)?;
        let idx = self
            .index
            .get(&CoverageNode::Quadkey(qk))
            .copied()
            .ok_or_else(|| SkywayError::not_found(format!("quadkey {}", quadkey)))?;

        let mut ids: Vec<String> = self
            .graph
            .neighbors(idx)
            .filter_map(|n| match &self.graph[n] {
                CoverageNode::CatalogId(id) => Some(id.clone()),
                CoverageNode::Quadkey(_) => None,
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub fn quadkeys_for(&mut self, catalog_id: &str) -> Result<Vec<Quadkey>> {
        self.fetch_catalog_ids()?;
        let idx = self
            .index
            .get(&CoverageNode::CatalogId(catalog_id.to_string()))
            .copied()
            .ok_or_else(|| SkywayError::not_found(format!("catalog id {}", catalog_id)))?;

        let mut qks: Vec<Quadkey> = self
            .graph
            .neighbors(idx)
            .filter_map(|n| match &self.graph[n] {
                CoverageNode::Quadkey(qk) => Some(qk.clone()),
                CoverageNode::CatalogId(_) => None,
            })
            .collect();
        qks.sort();
        Ok(qks)
    }

    /// Tiles ordered by row, then column
    pub fn tiles(&mut self) -> Result<Vec<Tile>> {
        let mut tiles: Vec<Tile> = self
            .tile_quadkeys()?
            .iter()
            .map(Quadkey::to_tile)
            .collect();
        tiles.sort_by_key(|t| (t.y, t.x));
        Ok(tiles)
    }

    pub fn summary(&mut self) -> Result<ZoneSummary> {
        let quadkeys = self.nqks()?;
        let catalog_ids = self.ncatids()?;
        let summary = ZoneSummary {
            utm_zone: self.utm_zone,
            area_m2: TILE_AREA_M2 * quadkeys as u64,
            quadkeys,
            catalog_ids,
        };
        info!(
            utm_zone = summary.utm_zone,
            area_m2 = summary.area_m2,
            quadkeys = summary.quadkeys,
            catalog_ids = summary.catalog_ids,
            "Zone coverage"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for CanvasZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasZone")
            .field("utm_zone", &self.utm_zone)
            .field("zone_path", &self.zone_path)
            .field("nodes", &self.graph.node_count())
            .field("quadkeys_state", &self.quadkeys_state)
            .field("catalog_state", &self.catalog_state)
            .finish()
    }
}
