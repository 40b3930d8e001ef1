use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{Result, SkywayError};

/// Decoded Overpass answer
#[derive(Debug, Clone, PartialEq)]
pub enum OverpassResponse {
    Json(OverpassJson),
    Csv(CsvTable),
}

impl OverpassResponse {
    pub fn as_json(&self) -> Option<&OverpassJson> {
        match self {
            Self::Json(json) => Some(json),
            Self::Csv(_) => None,
        }
    }

    pub fn as_csv(&self) -> Option<&CsvTable> {
        match self {
            Self::Csv(table) => Some(table),
            Self::Json(_) => None,
        }
    }
}

/// Body of an `[out:json]` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverpassJson {
    #[serde(default)]
    pub version: Option<f64>,
    #[serde(default)]
    pub generator: Option<String>,
    #[serde(default)]
    pub osm3s: Option<Osm3s>,
    /// Set by the server on runtime errors such as timeouts
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl OverpassJson {
    pub fn from_body(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn count_by_type(&self, element_type: ElementType) -> usize {
        self.elements
            .iter()
            .filter(|e| e.element_type == element_type)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Osm3s {
    #[serde(default)]
    pub timestamp_osm_base: Option<String>,
    #[serde(default)]
    pub timestamp_areas_base: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Node,
    Way,
    Relation,
    Area,
    /// Synthetic element produced by `out count;`
    Count,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub nodes: Vec<u64>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub geometry: Vec<Option<LatLon>>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
}

impl Element {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub member_type: ElementType,
    #[serde(rename = "ref")]
    pub reference: u64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Vec<Option<LatLon>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub minlat: f64,
    pub minlon: f64,
    pub maxlat: f64,
    pub maxlon: f64,
}

/// Body of an `[out:csv(...)]` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvTable {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn parse(body: &str, separator: &str, has_header: bool) -> Result<Self> {
        if separator.is_empty() {
            return Err(SkywayError::Decode("empty CSV separator".to_string()));
        }

        let mut lines = body.lines().filter(|l| !l.trim().is_empty());
        let split = |line: &str| -> Vec<String> {
            line.split(separator).map(|s| s.to_string()).collect()
        };

        let header = if has_header { lines.next().map(split) } else { None };
        let rows: Vec<Vec<String>> = lines.map(split).collect();

        if let Some(header) = &header {
            if let Some(bad) = rows.iter().position(|r| r.len() != header.len()) {
                return Err(SkywayError::Decode(format!(
                    "CSV row {} has {} columns, header has {}",
                    bad + 1,
                    rows[bad].len(),
                    header.len()
                )));
            }
        }

        Ok(Self { header, rows })
    }

    /// Look up a column by header name
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.header.as_ref()?.iter().position(|h| h == name)?;
        Some(
            self.rows
                .iter()
                .filter_map(|r| r.get(idx).map(|s| s.as_str()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "version": 0.6,
      "generator": "Overpass API 0.7.61",
      "osm3s": {"timestamp_osm_base": "2024-01-01T00:00:00Z", "copyright": "ODbL"},
      "elements": [
        {"type": "node", "id": 1, "lat": 1.5, "lon": 2.5, "tags": {"amenity": "school"}},
        {"type": "way", "id": 2, "nodes": [1, 3],
         "bounds": {"minlat": 1.0, "minlon": 2.0, "maxlat": 3.0, "maxlon": 4.0},
         "geometry": [{"lat": 1.0, "lon": 2.0}, null]},
        {"type": "relation", "id": 3,
         "members": [{"type": "way", "ref": 2, "role": "outer"}]},
        {"type": "timeline", "id": 4}
      ]
    }"#;

    #[test]
    fn test_decode_json() {
        let json = OverpassJson::from_body(SAMPLE).unwrap();
        assert_eq!(json.elements.len(), 4);
        assert_eq!(json.elements[0].tag("amenity"), Some("school"));
        assert_eq!(json.elements[1].nodes, vec![1, 3]);
        assert_eq!(json.elements[1].geometry[1], None);
        assert_eq!(json.elements[2].members[0].role, "outer");
        assert_eq!(json.elements[3].element_type, ElementType::Other);
        assert_eq!(json.count_by_type(ElementType::Way), 1);
        assert_eq!(
            json.osm3s.unwrap().copyright.as_deref(),
            Some("ODbL")
        );
    }

    #[test]
    fn test_decode_remark() {
        let json = OverpassJson::from_body(
            r#"{"elements": [], "remark": "runtime error: Query timed out"}"#,
        )
        .unwrap();
        assert!(json.elements.is_empty());
        assert!(json.remark.unwrap().contains("timed out"));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(OverpassJson::from_body("<osm/>").is_err());
    }

    #[test]
    fn test_csv_with_header() {
        let table = CsvTable::parse("@id\tname\n1\tFoo\n2\tBar\n", "\t", true).unwrap();
        assert_eq!(table.header.as_ref().unwrap(), &vec!["@id", "name"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column("name").unwrap(), vec!["Foo", "Bar"]);
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_csv_without_header() {
        let table = CsvTable::parse("1,a\n\n2,b\n", ",", false).unwrap();
        assert!(table.header.is_none());
        assert_eq!(table.rows, vec![vec!["1", "a"], vec!["2", "b"]]);
    }

    #[test]
    fn test_csv_ragged_rows() {
        let err = CsvTable::parse("a\tb\n1\n", "\t", true).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
