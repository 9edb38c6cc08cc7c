//! Device schema parsing
//!
//! The device describes itself with a JSON array of nodes. Each node has a
//! `name` and a `type`; objects carry `members`, functions carry `inputs`
//! and `outputs`, and every non-object node carries a numeric `id`. Leaf
//! nodes may carry an `access` marker (`"r"` for read-only).
//!
//! The node of type `"json"` describes the schema transfer itself and is
//! never materialised.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::endpoint::{Endpoint, EndpointId, EndpointKind, NodeIndex, ScalarType, MAX_ENDPOINT_ID};
use crate::tree::EndpointTree;

/// Prefix of the per-device tag used in full paths
pub const DEVICE_TAG_PREFIX: &str = "odrv";

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Node under '{parent}' is missing field '{field}'")]
    MissingField { parent: String, field: &'static str },
    #[error("Duplicate endpoint identifier '{0}'")]
    DuplicateIdentifier(String),
    #[error("Endpoint '{identifier}' has id {id}, above the addressable range")]
    IdOutOfRange { identifier: String, id: EndpointId },
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<EndpointId>,
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    members: Vec<RawNode>,
    #[serde(default)]
    inputs: Vec<RawNode>,
    #[serde(default)]
    outputs: Vec<RawNode>,
}

/// Tag identifying one device instance, e.g. `odrv0`
pub fn device_tag(device_index: u32) -> String {
    format!("{}{}", DEVICE_TAG_PREFIX, device_index)
}

/// Build an endpoint tree from the schema text
pub fn parse_schema(text: &str, device_index: u32) -> Result<EndpointTree, SchemaError> {
    let nodes: Vec<RawNode> = serde_json::from_str(text)?;

    let mut builder = TreeBuilder {
        tree: EndpointTree::new(),
        device_tag: device_tag(device_index),
    };

    for node in nodes {
        if node.kind == "json" {
            continue;
        }
        if let Some(index) = builder.make_node(node, "")? {
            builder.tree.add_root(index);
        }
    }

    debug!(
        nodes = builder.tree.len(),
        addressable = builder.tree.directory().len(),
        device = %builder.device_tag,
        "Parsed schema"
    );

    Ok(builder.tree)
}

struct TreeBuilder {
    tree: EndpointTree,
    device_tag: String,
}

impl TreeBuilder {
    fn make_node(&mut self, raw: RawNode, parent_path: &str) -> Result<Option<NodeIndex>, SchemaError> {
        let name = raw.name.ok_or_else(|| SchemaError::MissingField {
            parent: parent_path.to_string(),
            field: "name",
        })?;

        let identifier = if parent_path.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", parent_path, name)
        };

        let kind = match raw.kind.as_str() {
            "object" => EndpointKind::Object,
            "function" => EndpointKind::Function,
            other => match ScalarType::from_schema(other) {
                Some(ty) => EndpointKind::Scalar(ty),
                None => {
                    warn!(identifier = %identifier, kind = other, "Skipping endpoint of unknown type");
                    return Ok(None);
                }
            },
        };

        let id = if kind.is_addressable() {
            let id = raw.id.ok_or_else(|| SchemaError::MissingField {
                parent: identifier.clone(),
                field: "id",
            })?;
            if id > MAX_ENDPOINT_ID {
                return Err(SchemaError::IdOutOfRange { identifier, id });
            }
            if self.tree.directory().contains(&identifier) {
                return Err(SchemaError::DuplicateIdentifier(identifier));
            }
            Some(id)
        } else {
            None
        };

        let mut endpoint = Endpoint {
            full_path: format!("{}.{}", self.device_tag, identifier),
            name,
            identifier,
            kind,
            id,
            readonly: false,
            children: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        };

        match kind {
            EndpointKind::Object => {
                endpoint.children = self.make_nodes(raw.members, &endpoint.identifier)?;
            }
            EndpointKind::Function => {
                endpoint.inputs = self.make_nodes(raw.inputs, &endpoint.identifier)?;
                endpoint.outputs = self.make_nodes(raw.outputs, &endpoint.identifier)?;
            }
            EndpointKind::Scalar(_) => {
                endpoint.readonly = raw.access.as_deref() == Some("r");
            }
        }

        Ok(Some(self.tree.insert(endpoint)))
    }

    fn make_nodes(&mut self, raw: Vec<RawNode>, parent_path: &str) -> Result<Vec<NodeIndex>, SchemaError> {
        let mut out = Vec::with_capacity(raw.len());
        for node in raw {
            if let Some(index) = self.make_node(node, parent_path)? {
                out.push(index);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"[
        {"name": "", "id": 0, "type": "json", "access": "r"},
        {"name": "vbus_voltage", "id": 1, "type": "float", "access": "r"},
        {"name": "axis0", "type": "object", "members": [
            {"name": "error", "id": 2, "type": "uint32", "access": "rw"},
            {"name": "motor", "type": "object", "members": [
                {"name": "error", "id": 3, "type": "uint64", "access": "rw"}
            ]},
            {"name": "clear_errors", "id": 4, "type": "function", "inputs": [], "outputs": []},
            {"name": "move_incremental", "id": 5, "type": "function",
             "inputs": [
                {"name": "displacement", "id": 6, "type": "float", "access": "rw"},
                {"name": "from_input_pos", "id": 7, "type": "bool", "access": "rw"}
             ],
             "outputs": [
                {"name": "ok", "id": 8, "type": "bool", "access": "r"}
             ]}
        ]}
    ]"#;

    #[test]
    fn test_parse_builds_identifiers_and_paths() {
        let tree = parse_schema(SCHEMA, 3).unwrap();

        let error = tree.resolve("axis0.motor.error").unwrap();
        assert_eq!(error.name, "error");
        assert_eq!(error.full_path, "odrv3.axis0.motor.error");
        assert_eq!(error.kind, EndpointKind::Scalar(ScalarType::Uint64));
        assert_eq!(error.id, Some(3));
        assert!(!error.readonly);

        let vbus = tree.resolve("vbus_voltage").unwrap();
        assert!(vbus.readonly);
        assert_eq!(vbus.full_path, "odrv3.vbus_voltage");
    }

    #[test]
    fn test_json_endpoint_is_skipped() {
        let tree = parse_schema(SCHEMA, 0).unwrap();
        assert!(tree.resolve("").is_none());
        assert!(tree.walk().iter().all(|(_, ep)| ep.id != Some(0)));
        assert_eq!(tree.roots().count(), 2);
    }

    #[test]
    fn test_directory_holds_exactly_non_objects() {
        let tree = parse_schema(SCHEMA, 0).unwrap();
        let non_objects = tree
            .walk()
            .iter()
            .filter(|(_, ep)| ep.kind != EndpointKind::Object)
            .count();
        assert_eq!(non_objects, 8);
        assert_eq!(tree.directory().len(), non_objects);
        assert_eq!(tree.len(), 10);
    }

    #[test]
    fn test_function_inputs_and_outputs_in_order() {
        let tree = parse_schema(SCHEMA, 0).unwrap();
        let function = tree.resolve("axis0.move_incremental").unwrap();
        assert!(function.is_function());

        let inputs: Vec<&str> = function
            .inputs
            .iter()
            .map(|i| tree.get(*i).unwrap().identifier.as_str())
            .collect();
        assert_eq!(
            inputs,
            vec![
                "axis0.move_incremental.displacement",
                "axis0.move_incremental.from_input_pos"
            ]
        );
        assert_eq!(function.outputs.len(), 1);
        assert!(tree.resolve("axis0.move_incremental.ok").unwrap().readonly);
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let text = r#"[{"name": "vbus_voltage", "type": "float"}]"#;
        assert!(matches!(
            parse_schema(text, 0),
            Err(SchemaError::MissingField { field: "id", .. })
        ));
    }

    #[test]
    fn test_malformed_schema_is_an_error() {
        assert!(matches!(parse_schema("[{\"name\": ", 0), Err(SchemaError::Json(_))));
        assert!(matches!(parse_schema("{}", 0), Err(SchemaError::Json(_))));
    }

    #[test]
    fn test_id_with_read_flag_bit_is_rejected() {
        let text = r#"[{"name": "high", "id": 32773, "type": "uint8"}]"#;
        assert!(matches!(
            parse_schema(text, 0),
            Err(SchemaError::IdOutOfRange { id: 0x8005, .. })
        ));

        let text = r#"[{"name": "top", "id": 32767, "type": "uint8"}]"#;
        assert_eq!(parse_schema(text, 0).unwrap().resolve("top").unwrap().id, Some(0x7fff));
    }

    #[test]
    fn test_duplicate_identifier_is_an_error() {
        let text = r#"[
            {"name": "x", "id": 1, "type": "uint8"},
            {"name": "x", "id": 2, "type": "uint8"}
        ]"#;
        assert!(matches!(
            parse_schema(text, 0),
            Err(SchemaError::DuplicateIdentifier(id)) if id == "x"
        ));
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let text = r#"[
            {"name": "ref", "id": 1, "type": "endpoint_ref"},
            {"name": "x", "id": 2, "type": "int32"}
        ]"#;
        let tree = parse_schema(text, 0).unwrap();
        assert_eq!(tree.directory().len(), 1);
        assert!(tree.resolve("ref").is_none());
    }
}
