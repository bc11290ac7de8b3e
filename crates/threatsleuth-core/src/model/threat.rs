/// A single detection recorded by the detection pipeline.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threat {
    /// Absolute path of the file that matched.
    pub path: String,

    /// Taxonomy label, e.g. `Malware.Test.EICAR` or `Malware.Generic.Hash`.
    #[serde(rename = "type")]
    pub threat_type: String,

    /// The matched signature string, or the lowercase hex SHA-256 digest.
    pub signature: String,

    pub detected_at: DateTime<Utc>,
}

impl Threat {
    pub fn new(
        path: impl Into<String>,
        threat_type: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            threat_type: threat_type.into(),
            signature: signature.into(),
            detected_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_type_field_name() {
        let threat = Threat::new("/tmp/x.exe", "Malware.Generic.Hash", "abc");
        let json = serde_json::to_value(&threat).unwrap();
        assert_eq!(json["type"], "Malware.Generic.Hash");
        assert_eq!(json["signature"], "abc");
        assert!(json.get("threat_type").is_none());
    }
}
