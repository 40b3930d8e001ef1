use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, SkywayError};

/// Quad-tree tile address: one base-4 digit per zoom level
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quadkey(String);

/// Tile column, row and zoom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

const MAX_ZOOM: usize = 31;

impl Quadkey {
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() || text.len() > MAX_ZOOM {
            return Err(SkywayError::construction(format!(
                "quadkey '{}' must have 1 to {} digits",
                text, MAX_ZOOM
            )));
        }
        if let Some(bad) = text.chars().find(|c| !('0'..='3').contains(c)) {
            return Err(SkywayError::construction(format!(
                "quadkey '{}' contains '{}'",
                text, bad
            )));
        }
        Ok(Self(text.to_string()))
    }

    pub fn from_tile(tile: Tile) -> Result<Self> {
        let zoom = tile.zoom as usize;
        if zoom == 0 || zoom > MAX_ZOOM {
            return Err(SkywayError::construction(format!(
                "zoom {} outside 1..={}",
                zoom, MAX_ZOOM
            )));
        }
        let limit = 1u64 << zoom;
        if u64::from(tile.x) >= limit || u64::from(tile.y) >= limit {
            return Err(SkywayError::construction(format!(
                "tile ({}, {}) outside zoom {}",
                tile.x, tile.y, zoom
            )));
        }

        let digits = (1..=zoom)
            .rev()
            .map(|level| {
                let mask = 1u32 << (level - 1);
                let mut digit = 0u8;
                if tile.x & mask != 0 {
                    digit += 1;
                }
                if tile.y & mask != 0 {
                    digit += 2;
                }
                char::from(b'0' + digit)
            })
            .collect();

        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn zoom(&self) -> u8 {
        self.0.len() as u8
    }

    pub fn to_tile(&self) -> Tile {
        let zoom = self.0.len();
        let mut x = 0u32;
        let mut y = 0u32;
        for (i, digit) in self.0.bytes().enumerate() {
            let mask = 1u32 << (zoom - i - 1);
            let digit = digit - b'0';
            if digit & 1 != 0 {
                x |= mask;
            }
            if digit & 2 != 0 {
                y |= mask;
            }
        }
        Tile {
            x,
            y,
            zoom: zoom as u8,
        }
    }

    pub fn parent(&self) -> Option<Quadkey> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_string()))
    }

    /// Children in quadkey digit order; `None` at the deepest zoom
    pub fn children(&self) -> Option<[Quadkey; 4]> {
        if self.0.len() >= MAX_ZOOM {
            return None;
        }
        Some(['0', '1', '2', '3'].map(|d| Self(format!("{}{}", self.0, d))))
    }

    /// Leading digit 0 or 1 addresses the northern UTM hemisphere
    pub fn is_northern(&self) -> bool {
        matches!(self.0.as_bytes().first(), Some(b'0' | b'1'))
    }
}

impl TryFrom<String> for Quadkey {
    type Error = SkywayError;

    fn try_from(text: String) -> Result<Self> {
        Self::parse(&text)
    }
}

impl From<Quadkey> for String {
    fn from(qk: Quadkey) -> Self {
        qk.0
    }
}

impl fmt::Display for Quadkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Quadkey {
    type Err = SkywayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_tile() {
        let tile = Quadkey::parse("213").unwrap().to_tile();
        assert_eq!(tile, Tile { x: 3, y: 5, zoom: 3 });
    }

    #[test]
    fn test_from_tile() {
        let qk = Quadkey::from_tile(Tile { x: 3, y: 5, zoom: 3 }).unwrap();
        assert_eq!(qk.as_str(), "213");
        assert!(Quadkey::from_tile(Tile { x: 8, y: 0, zoom: 3 }).is_err());
        assert!(Quadkey::from_tile(Tile { x: 0, y: 0, zoom: 0 }).is_err());
    }

    #[test]
    fn test_rejects_bad_digits() {
        assert!(Quadkey::parse("").is_err());
        assert!(Quadkey::parse("0124").is_err());
        assert!(Quadkey::parse("models").is_err());
        assert!("0123".parse::<Quadkey>().is_ok());
    }

    #[test]
    fn test_hierarchy() {
        let qk = Quadkey::parse("0231").unwrap();
        assert_eq!(qk.parent().unwrap().as_str(), "023");
        assert_eq!(Quadkey::parse("2").unwrap().parent(), None);

        let children = qk.children().unwrap();
        assert_eq!(children[3].as_str(), "02313");
        for child in &children {
            assert_eq!(child.parent().as_ref(), Some(&qk));
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let qk: Quadkey = serde_json::from_str("\"0213\"").unwrap();
        assert_eq!(qk.as_str(), "0213");
        assert_eq!(serde_json::to_string(&qk).unwrap(), "\"0213\"");

        assert!(serde_json::from_str::<Quadkey>("\"\"").is_err());
        assert!(serde_json::from_str::<Quadkey>("\"9z\"").is_err());
    }

    #[test]
    fn test_hemisphere() {
        assert!(Quadkey::parse("1302").unwrap().is_northern());
        assert!(!Quadkey::parse("2302").unwrap().is_northern());
    }
}
