//! Serde adapter for byte fields in the persisted wire formats:
//! base64-encoded field values in an otherwise text-encoded object.

pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::base64_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn round_trips_through_json() {
        let original = Wrapper {
            data: vec![0, 1, 2, 255, 254],
        };
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("data"));
        let parsed: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.data, original.data);
    }
}
