use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `metadata.json`: the package-wide manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: u32,
    #[serde(rename = "shapeIndex")]
    pub shape_index: BTreeMap<String, ShapeSource>,
    #[serde(rename = "colorIndex")]
    pub color_index: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "createdAt")]
    pub created_at: Option<String>,
}

/// Where a shape referenced by `level.json` comes from: a name built into the host
/// application, or a `*.shape.json` member of this same archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeSource {
    Builtin(String),
    Custom(String),
}

impl ShapeSource {
    const BUILTIN_PREFIX: &'static str = "builtin:";
    const CUSTOM_PREFIX: &'static str = "custom:";

    pub fn as_wire_string(&self) -> String {
        match self {
            ShapeSource::Builtin(name) => format!("{}{name}", Self::BUILTIN_PREFIX),
            ShapeSource::Custom(filename) => format!("{}{filename}", Self::CUSTOM_PREFIX),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(name) = raw.strip_prefix(Self::BUILTIN_PREFIX) {
            Some(ShapeSource::Builtin(name.to_string()))
        } else {
            raw.strip_prefix(Self::CUSTOM_PREFIX)
                .map(|filename| ShapeSource::Custom(filename.to_string()))
        }
    }
}

impl Serialize for ShapeSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.as_wire_string())
    }
}

impl<'de> Deserialize<'de> for ShapeSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ShapeSource::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized shape source '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_source_round_trips_through_the_wire_string() {
        let source = ShapeSource::Builtin("square".to_string());
        let wire = source.as_wire_string();
        assert_eq!(wire, "builtin:square");
        assert_eq!(ShapeSource::parse(&wire), Some(source));
    }

    #[test]
    fn custom_source_round_trips_through_the_wire_string() {
        let source = ShapeSource::Custom("zigzag.shape.json".to_string());
        let wire = source.as_wire_string();
        assert_eq!(wire, "custom:zigzag.shape.json");
        assert_eq!(ShapeSource::parse(&wire), Some(source));
    }

    #[test]
    fn unrecognized_prefix_fails_to_parse() {
        assert_eq!(ShapeSource::parse("remote:square"), None);
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let mut shape_index = BTreeMap::new();
        shape_index.insert("s1".to_string(), ShapeSource::Builtin("dot".to_string()));
        let mut color_index = BTreeMap::new();
        color_index.insert("s1".to_string(), "#FF0000".to_string());

        let metadata = Metadata {
            version: 1,
            shape_index,
            color_index,
            author: Some("sky".to_string()),
            description: None,
            created_at: None,
        };

        let json = serde_json::to_string(&metadata).unwrap();
        let parsed: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }
}
