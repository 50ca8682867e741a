//! Lenient digital-asset-tree parsing
//!
//! The asset-tree endpoint is the least disciplined part of the remote
//! API: the tree may sit at the document root or under one or more
//! wrapper keys, as an object or a bare array, with child collections
//! under any of several synonymous key names. Nothing here errors -
//! unrecognizable input parses to an empty leaf list, which callers
//! treat as "nothing to sync".
//!
//! Grouping nodes (folder-like type, or no usable file id) are never
//! emitted, but their children are always visited. Output is the flat
//! leaf list only; tree shape is not preserved beyond each leaf's
//! immediate parent id.

use fieldsync_core::domain::asset::AssetLeaf;
use fieldsync_core::domain::newtypes::{FileId, NodeId};
use serde_json::{Map, Value};
use tracing::debug;

/// Wrapper keys the root locator looks under, in order. Applied
/// recursively, so `data.project_digital_asset_tree` resolves too.
const WRAPPER_KEYS: &[&str] = &[
    "data",
    "result",
    "project_digital_asset_tree",
    "digital_asset_tree",
    "asset_tree",
    "tree",
];

/// Synonymous child-collection keys
const CHILD_KEYS: &[&str] = &["children", "items", "nodes", "files", "assets", "content"];

/// Node id field synonyms
const ID_KEYS: &[&str] = &["node_id", "nodeId", "id"];

/// File id field synonyms
const FILE_ID_KEYS: &[&str] = &["file_id", "fileId"];

/// Node type field synonyms
const NODE_TYPE_KEYS: &[&str] = &["node_type", "nodeType"];

/// Display name field synonyms, first non-empty wins
const NAME_KEYS: &[&str] = &["node_name", "nodeName", "name", "title"];

/// File type field synonyms; the filename extension is the fallback
const FILE_TYPE_KEYS: &[&str] = &["file_type", "fileType", "mime_type", "mimeType"];

/// File size field synonyms
const FILE_SIZE_KEYS: &[&str] = &["file_size", "fileSize", "size"];

/// Node types marking pure grouping nodes, matched case-insensitively
const FOLDER_LIKE_TYPES: &[&str] = &["folder", "setting"];

/// Node type assumed when the payload does not say
const DEFAULT_NODE_TYPE: &str = "Folder";

/// How many wrapper levels the root locator will unwrap
const WRAPPER_DEPTH_LIMIT: u8 = 4;

// ============================================================================
// Entry points
// ============================================================================

/// Parses an asset-tree payload into its flat leaf list.
///
/// Never errors: payloads with no recognizable tree yield an empty list.
pub fn parse(payload: &Value) -> Vec<AssetLeaf> {
    let mut leaves = Vec::new();
    match locate_root(payload, WRAPPER_DEPTH_LIMIT) {
        Some(root) => visit(root, None, &mut leaves),
        None => debug!("Asset tree payload has no recognizable root"),
    }
    leaves
}

/// Parses a raw JSON document into its flat leaf list.
///
/// Unparseable documents yield an empty list, same as an empty tree.
pub fn parse_document(raw: &str) -> Vec<AssetLeaf> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => parse(&value),
        Err(err) => {
            debug!(error = %err, "Asset tree document is not valid JSON");
            Vec::new()
        }
    }
}

// ============================================================================
// Root location
// ============================================================================

/// Finds the tree root: a node-like object or an array, either at this
/// level or nested under known wrapper keys.
fn locate_root(value: &Value, depth: u8) -> Option<&Value> {
    match value {
        Value::Array(_) => Some(value),
        Value::Object(map) => {
            if is_node_like(map) {
                return Some(value);
            }
            if depth == 0 {
                return None;
            }
            WRAPPER_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|inner| locate_root(inner, depth - 1))
        }
        _ => None,
    }
}

/// An object counts as a tree node when it carries any node-ish field
fn is_node_like(map: &Map<String, Value>) -> bool {
    ID_KEYS
        .iter()
        .chain(FILE_ID_KEYS)
        .chain(NODE_TYPE_KEYS)
        .chain(CHILD_KEYS)
        .any(|key| map.contains_key(*key))
}

// ============================================================================
// Recursive descent
// ============================================================================

fn visit(value: &Value, parent: Option<&NodeId>, leaves: &mut Vec<AssetLeaf>) {
    match value {
        Value::Array(items) => {
            for item in items {
                visit(item, parent, leaves);
            }
        }
        Value::Object(map) => {
            let node_id = first_text(map, ID_KEYS).and_then(|raw| NodeId::new(raw).ok());
            if let Some(id) = node_id.as_ref() {
                if let Some(leaf) = leaf_from(map, id, parent) {
                    leaves.push(leaf);
                }
            }
            // Children are visited even when the node itself was skipped;
            // an id-less node passes its own parent through
            let next_parent = node_id.as_ref().or(parent);
            for key in CHILD_KEYS {
                if let Some(children) = map.get(*key) {
                    visit(children, next_parent, leaves);
                }
            }
        }
        _ => {}
    }
}

/// Builds a leaf from a node object, or None for grouping nodes
fn leaf_from(map: &Map<String, Value>, node_id: &NodeId, parent: Option<&NodeId>) -> Option<AssetLeaf> {
    let node_type =
        first_text(map, NODE_TYPE_KEYS).unwrap_or_else(|| DEFAULT_NODE_TYPE.to_string());
    if is_folder_like(&node_type) {
        return None;
    }

    // FileId::new rejects blank ids and the literal "null"
    let file_id = FileId::new(first_text(map, FILE_ID_KEYS)?).ok()?;

    let name = first_text(map, NAME_KEYS).unwrap_or_else(|| node_id.as_str().to_string());
    let file_type = first_text(map, FILE_TYPE_KEYS)
        .map(|t| t.to_ascii_lowercase())
        .or_else(|| extension_of(&name));
    let file_size = first_size(map, FILE_SIZE_KEYS);

    Some(AssetLeaf {
        node_id: node_id.clone(),
        parent_id: parent.cloned(),
        name,
        node_type,
        file_id,
        file_type,
        file_size,
    })
}

fn is_folder_like(node_type: &str) -> bool {
    let trimmed = node_type.trim();
    FOLDER_LIKE_TYPES
        .iter()
        .any(|folder| trimmed.eq_ignore_ascii_case(folder))
}

// ============================================================================
// Field extraction
// ============================================================================

/// First non-blank textual value under any of the given keys.
///
/// Numbers are accepted and stringified, since some payloads send ids
/// as JSON numbers.
fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match map.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.trim().to_string());
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First usable size under any of the given keys, accepting numbers and
/// numeric strings
fn first_size(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    for key in keys {
        match map.get(*key) {
            Some(Value::Number(n)) => {
                if let Some(size) = n.as_u64() {
                    return Some(size);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(size) = s.trim().parse::<u64>() {
                    return Some(size);
                }
            }
            _ => {}
        }
    }
    None
}

/// Case-folded filename extension, if the name has a plausible one
fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > 16
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

// ============================================================================
// Tests
// ============================================================================
