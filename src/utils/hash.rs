use sha2::{Digest, Sha256};

const FINGERPRINT_LEN: usize = 16;

/// Short SHA-256 fingerprint of an Overpass query, used to correlate log lines
pub fn query_fingerprint(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_fingerprint() {
        let a = query_fingerprint("[out:json];nwr[amenity=school];out geom;");
        let b = query_fingerprint("[out:json];nwr[amenity=school];out geom;");
        let c = query_fingerprint("[out:json];nwr[amenity=college];out geom;");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
