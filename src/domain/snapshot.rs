//! Serializable snapshot of an identity forest
//!
//! The persisted document has two top-level fields: `nodes`, one flat record
//! per live identity, and `hierarchy`, the nested tree of identity ids.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{IdentityId, Person};

/// Class tag written for every identity record.
pub const PERSON_CLASS: &str = "Person";

fn default_class_name() -> String {
    PERSON_CLASS.to_string()
}

/// Flat record of one live identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(default = "default_class_name")]
    pub class_name: String,
    pub name: String,
    pub age: u8,
    #[serde(alias = "uid")]
    pub id: IdentityId,
}

impl From<&Person> for IdentityRecord {
    fn from(person: &Person) -> Self {
        Self {
            class_name: default_class_name(),
            name: person.name.clone(),
            age: person.age(),
            id: person.id(),
        }
    }
}

impl From<&IdentityRecord> for Person {
    fn from(record: &IdentityRecord) -> Self {
        Person::new(record.id, record.name.clone(), record.age)
    }
}

/// One display node in the hierarchy snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyEntry {
    #[serde(alias = "uid")]
    pub id: IdentityId,
    #[serde(default)]
    pub children: Vec<HierarchyEntry>,
}

impl HierarchyEntry {
    /// Number of display nodes in this entry's subtree, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// Full persisted form of a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub nodes: Vec<IdentityRecord>,
    #[serde(default)]
    pub hierarchy: Vec<HierarchyEntry>,
}

impl Document {
    /// Pretty JSON with four-space indentation.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| {
            serde_json::Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_legacy_uid_fields_when_parsing_then_accepts_alias() {
        let json = r#"{
            "nodes": [{"class_name": "Person", "name": "Alice", "age": 4,
                       "uid": "67e55044-10b1-426f-9247-bb680e5fe0c8"}],
            "hierarchy": [{"uid": "67e55044-10b1-426f-9247-bb680e5fe0c8", "children": []}]
        }"#;

        let doc = Document::from_json(json).unwrap();

        assert_eq!(doc.nodes[0].name, "Alice");
        assert_eq!(doc.nodes[0].id, doc.hierarchy[0].id);
    }

    #[test]
    fn given_record_without_class_name_when_parsing_then_defaults_to_person() {
        let json = r#"{"nodes": [{"name": "Bob", "age": 1,
                        "id": "67e55044-10b1-426f-9247-bb680e5fe0c8"}]}"#;

        let doc = Document::from_json(json).unwrap();

        assert_eq!(doc.nodes[0].class_name, PERSON_CLASS);
        assert!(doc.hierarchy.is_empty());
    }

    #[test]
    fn given_document_when_serializing_then_uses_four_space_indent() {
        let id = IdentityId::new();
        let doc = Document {
            nodes: vec![IdentityRecord::from(&Person::new(id, "Alice", 2))],
            hierarchy: vec![HierarchyEntry { id, children: vec![] }],
        };

        let json = doc.to_json().unwrap();

        assert!(json.contains("\n    \"nodes\""));
        assert!(json.contains("\"class_name\": \"Person\""));
        assert_eq!(Document::from_json(&json).unwrap(), doc);
    }
}
