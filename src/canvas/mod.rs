//! Coverage index over tiles stored as
//! `<bucket>/<utm_zone>/<quadkey>/<catalog_id>-*`
//!
//! Listings are issued lazily, once per level, and recorded in a graph
//! linking catalog ids to the quadkeys they cover.

pub mod collection;
pub mod quadkey;
pub mod storage;
pub mod zone;

pub use collection::CanvasCollection;
pub use quadkey::{Quadkey, Tile};
pub use storage::{LocalStorage, Storage, StorageLister};
pub use zone::{CanvasZone, FetchState, ZoneSummary};
