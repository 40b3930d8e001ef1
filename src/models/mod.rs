pub mod bbox;
pub mod element;

pub use bbox::Bbox;
pub use element::{CsvTable, Element, ElementType, OverpassJson, OverpassResponse};
