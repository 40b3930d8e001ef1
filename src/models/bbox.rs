use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Result, SkywayError};

/// Bounding box in WGS84 degrees, ordered the way Overpass expects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bbox {
    /// Build a validated bounding box
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self> {
        for (name, lat) in [("south", south), ("north", north)] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(SkywayError::construction(format!(
                    "{} latitude {} outside [-90, 90]",
                    name, lat
                )));
            }
        }
        for (name, lon) in [("west", west), ("east", east)] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(SkywayError::construction(format!(
                    "{} longitude {} outside [-180, 180]",
                    name, lon
                )));
            }
        }
        if south > north {
            return Err(SkywayError::construction(format!(
                "south {} is above north {}",
                south, north
            )));
        }

        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    /// Parse `s,w,n,e`
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<f64> = text
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| SkywayError::construction(format!("invalid bbox '{}': {}", text, e)))?;

        match parts.as_slice() {
            [s, w, n, e] => Self::new(*s, *w, *n, *e),
            _ => Err(SkywayError::construction(format!(
                "bbox needs 4 values, got {}",
                parts.len()
            ))),
        }
    }
}

impl TryFrom<(f64, f64, f64, f64)> for Bbox {
    type Error = SkywayError;

    fn try_from((s, w, n, e): (f64, f64, f64, f64)) -> Result<Self> {
        Self::new(s, w, n, e)
    }
}

/// Two decimals per coordinate, the precision Overpass bboxes are written with
impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2},{:.2},{:.2},{:.2}",
            self.south, self.west, self.north, self.east
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        let bbox = Bbox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        assert_eq!(bbox.to_string(), "1.00,2.00,3.00,4.00");
    }

    #[test]
    fn test_display_rounds_binary_value() {
        // 1.005 and 2.005 are stored just below the half-way point
        let bbox = Bbox::new(1.005, 2.005, 3.0, 4.0).unwrap();
        assert_eq!(bbox.to_string(), "1.00,2.00,3.00,4.00");

        let bbox = Bbox::new(1.006, 2.0049, 3.999, -4.0).unwrap();
        assert_eq!(bbox.to_string(), "1.01,2.00,4.00,-4.00");
    }

    #[test]
    fn test_rejects_inverted_latitudes() {
        let err = Bbox::new(10.0, 0.0, 5.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("above north"));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Bbox::new(-91.0, 0.0, 0.0, 0.0).is_err());
        assert!(Bbox::new(0.0, -181.0, 0.0, 0.0).is_err());
        assert!(Bbox::new(0.0, 0.0, 0.0, 180.5).is_err());
    }

    #[test]
    fn test_parse() {
        let bbox = Bbox::parse("50.7, 7.1, 50.8, 7.2").unwrap();
        assert_eq!(bbox.south, 50.7);
        assert_eq!(bbox.east, 7.2);

        assert!(Bbox::parse("1,2,3").is_err());
        assert!(Bbox::parse("a,b,c,d").is_err());
    }

    #[test]
    fn test_try_from_tuple() {
        let bbox = Bbox::try_from((1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(bbox.west, 2.0);
    }
}
