//! The command catalogue's on-disk shape (spec.md §6): a mapping
//! `commandName → CatalogueEntry` plus a separate reply map
//! `commandName → [reply-spec lines]`, both deserialized straight off
//! `serde_json`, using `serde`-derived structs for every wire/config shape.
use serde::Deserialize;
use std::collections::BTreeMap;

/// One argument node in a command's signature.
#[derive(Debug, Clone, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub kind: ArgumentKind,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub optional: bool,
    /// True for a "pure token" argument: a literal keyword written only
    /// when present, contributing no value of its own (e.g. `NX` in
    /// `SET key value NX`).
    #[serde(default)]
    pub token: bool,
}

/// The kinds an argument node's `type` field can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgumentKind {
    Integer,
    Double,
    String,
    Key,
    Block,
    Oneof,
    PureToken,
    UnixTime,
    Pattern,
}

/// One entry in the catalogue, keyed by command name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueEntry {
    pub summary: String,
    pub since: String,
    pub complexity: String,
    #[serde(default)]
    pub acl_categories: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
}

/// The full catalogue: commands plus their reply specs, read as two
/// top-level JSON objects sharing the command name as key.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalogue {
    pub commands: BTreeMap<String, CatalogueEntry>,
    #[serde(default)]
    pub replies: BTreeMap<String, Vec<String>>,
}

impl Catalogue {
    /// Parse a catalogue from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_catalogue() {
        let json = r#"{
            "commands": {
                "GET": {
                    "summary": "Get the value of a key",
                    "since": "1.0.0",
                    "complexity": "O(1)",
                    "aclCategories": ["@read", "@string", "@fast"],
                    "arguments": [
                        {"name": "key", "kind": "key"}
                    ]
                }
            },
            "replies": {
                "GET": ["Bulk string reply: the value, or nil if missing"]
            }
        }"#;
        let catalogue = Catalogue::from_json(json).unwrap();
        let get = &catalogue.commands["GET"];
        assert_eq!(get.since, "1.0.0");
        assert_eq!(get.arguments[0].kind, ArgumentKind::Key);
        assert!(!get.arguments[0].optional);
    }
}
