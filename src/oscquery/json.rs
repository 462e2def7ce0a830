//! The OSCQuery JSON tree document: translates between a [`Node`] subtree
//! and the `FULL_PATH`/`CONTENTS`/`TYPE`/... schema served over HTTP and
//! carried in `PATH_ADDED` events.

use crate::tree::parameter::{AccessMode, BoundingMode, Domain};
use crate::tree::Node;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeEntry {
    #[serde(rename = "MIN", skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(rename = "MAX", skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "VALS", skip_serializing_if = "Option::is_none")]
    pub vals: Option<Vec<Json>>,
}

/// One node of an OSCQuery JSON tree document. `CONTENTS` holds nested
/// documents keyed by child name; `serde_json`'s `preserve_order` feature
/// keeps that map in insertion order so a round trip preserves the
/// original child ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDocument {
    #[serde(rename = "FULL_PATH", skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
    #[serde(rename = "CONTENTS", skip_serializing_if = "Option::is_none")]
    pub contents: Option<Map<String, Json>>,
    #[serde(rename = "TYPE", skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    #[serde(rename = "VALUE", skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<Json>>,
    #[serde(rename = "RANGE", skip_serializing_if = "Option::is_none")]
    pub range: Option<Vec<RangeEntry>>,
    #[serde(rename = "UNIT", skip_serializing_if = "Option::is_none")]
    pub unit: Option<Vec<String>>,
    #[serde(rename = "ACCESS", skip_serializing_if = "Option::is_none")]
    pub access: Option<u8>,
    #[serde(rename = "DESCRIPTION", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "TAGS", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "EXTENDED_TYPE", skip_serializing_if = "Option::is_none")]
    pub extended_type: Option<String>,
    #[serde(rename = "CRITICAL", skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    #[serde(rename = "REFRESH_RATE", skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<f64>,
    #[serde(rename = "CLIPMODE", skip_serializing_if = "Option::is_none")]
    pub clipmode: Option<String>,
    #[serde(rename = "PRIORITY", skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

fn access_to_code(mode: AccessMode) -> u8 {
    match mode {
        AccessMode::Get => 1,
        AccessMode::Set => 2,
        AccessMode::Bi => 3,
    }
}

fn code_to_access(code: u8) -> Option<AccessMode> {
    match code {
        1 => Some(AccessMode::Get),
        2 => Some(AccessMode::Set),
        3 => Some(AccessMode::Bi),
        _ => None,
    }
}

fn bounding_to_clipmode(mode: BoundingMode) -> &'static str {
    match mode {
        BoundingMode::Free => "None",
        BoundingMode::Clip => "Both",
        BoundingMode::Low => "Low",
        BoundingMode::High => "High",
        BoundingMode::Wrap => "Wrap",
        BoundingMode::Fold => "Fold",
    }
}

fn clipmode_to_bounding(clipmode: &str) -> BoundingMode {
    match clipmode {
        "Both" => BoundingMode::Clip,
        "Low" => BoundingMode::Low,
        "High" => BoundingMode::High,
        "Wrap" => BoundingMode::Wrap,
        "Fold" => BoundingMode::Fold,
        _ => BoundingMode::Free,
    }
}

/// A single JSON value mirroring `value`'s shape, used for `PATH_CHANGED`
/// frames and `PATH_ADD` requests — as opposed to [`value_to_json_components`],
/// which flattens vector types for the `VALUE` array of a [`NodeDocument`].
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Impulse => Json::Null,
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Bool(b) => Json::Bool(*b),
        Value::Char(c) => Json::String(c.to_string()),
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Vec2f(v) => Json::Array(v.iter().map(|x| Json::from(*x)).collect()),
        Value::Vec3f(v) => Json::Array(v.iter().map(|x| Json::from(*x)).collect()),
        Value::Vec4f(v) => Json::Array(v.iter().map(|x| Json::from(*x)).collect()),
    }
}

/// The inverse of [`value_to_json`] for untyped `{address: value}` frames,
/// where there is no `TYPE` tag to disambiguate a fixed-size vector from a
/// plain list.
pub fn json_to_scalar_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Impulse,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n.as_i64().map(Value::Int).unwrap_or_else(|| Value::Float(n.as_f64().unwrap_or(0.0))),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(json_to_scalar_value).collect()),
        Json::Object(_) => Value::Impulse,
    }
}

fn osc_type_tag(value: &Value) -> &'static str {
    match value {
        Value::Impulse => "N",
        Value::Int(_) => "i",
        Value::Float(_) => "f",
        Value::Bool(true) => "T",
        Value::Bool(false) => "F",
        Value::Char(_) => "c",
        Value::String(_) => "s",
        Value::List(_) => "[",
        Value::Vec2f(_) => "ff",
        Value::Vec3f(_) => "fff",
        Value::Vec4f(_) => "ffff",
    }
}

fn value_to_json_components(value: &Value) -> Vec<Json> {
    match value {
        Value::Impulse => vec![Json::Null],
        Value::Int(i) => vec![Json::Number((*i).into())],
        Value::Float(f) => vec![Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null)],
        Value::Bool(b) => vec![Json::Bool(*b)],
        Value::Char(c) => vec![Json::String(c.to_string())],
        Value::String(s) => vec![Json::String(s.clone())],
        Value::List(items) => vec![Json::Array(items.iter().flat_map(value_to_json_components).collect())],
        Value::Vec2f(v) => v.iter().map(|x| Json::Number(Number::from_f64(*x as f64).unwrap())).collect(),
        Value::Vec3f(v) => v.iter().map(|x| Json::Number(Number::from_f64(*x as f64).unwrap())).collect(),
        Value::Vec4f(v) => v.iter().map(|x| Json::Number(Number::from_f64(*x as f64).unwrap())).collect(),
    }
}

fn json_to_value(tag: &str, components: &[Json]) -> Value {
    fn scalar_from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Impulse,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(scalar_from_json).collect()),
            Json::Object(_) => Value::Impulse,
        }
    }
    match tag {
        "ff" if components.len() == 2 => {
            let f: Vec<f32> = components.iter().map(|j| j.as_f64().unwrap_or(0.0) as f32).collect();
            Value::Vec2f([f[0], f[1]])
        }
        "fff" if components.len() == 3 => {
            let f: Vec<f32> = components.iter().map(|j| j.as_f64().unwrap_or(0.0) as f32).collect();
            Value::Vec3f([f[0], f[1], f[2]])
        }
        "ffff" if components.len() == 4 => {
            let f: Vec<f32> = components.iter().map(|j| j.as_f64().unwrap_or(0.0) as f32).collect();
            Value::Vec4f([f[0], f[1], f[2], f[3]])
        }
        _ => match components {
            [one] => scalar_from_json(one),
            many => Value::List(many.iter().map(scalar_from_json).collect()),
        },
    }
}

/// Encodes `node` (and its subtree) as a [`NodeDocument`], following JSON
/// insertion order of `Node::children_snapshot()`.
pub fn encode_node(node: &Node) -> NodeDocument {
    let mut doc = NodeDocument { full_path: Some(node.path()), ..Default::default() };

    let children = node.children_snapshot();
    if !children.is_empty() {
        let mut contents = Map::new();
        for child in &children {
            contents.insert(child.name(), serde_json::to_value(encode_node(child)).unwrap_or(Json::Null));
        }
        doc.contents = Some(contents);
    }

    node.with_parameter(|p| {
        doc.type_tag = Some(osc_type_tag(p.value()).to_string());
        doc.value = Some(value_to_json_components(p.value()));
        doc.access = Some(access_to_code(p.access()));
        doc.clipmode = Some(bounding_to_clipmode(p.bounding()).to_string());
        if let Some(unit) = p.unit() {
            doc.unit = Some(vec![format!("{unit:?}")]);
        }
        if let Domain::Range(lo, hi) = p.domain() {
            doc.range = Some(vec![RangeEntry { min: Some(*lo), max: Some(*hi), vals: None }]);
        } else if let Domain::Enumerated(values) = p.domain() {
            doc.range = Some(vec![RangeEntry { min: None, max: None, vals: Some(values.iter().flat_map(value_to_json_components).collect()) }]);
        }
    });

    let tags = node.tags();
    if !tags.is_empty() {
        doc.tags = Some(tags);
    }
    doc.description = node.description();
    doc.critical = Some(node.critical());
    doc.refresh_rate = node.refresh_rate();
    doc.priority = node.priority();
    doc
}

/// Builds (or updates) a subtree under `parent` from a decoded
/// [`NodeDocument`], recursing into `CONTENTS`. Returns the node created
/// or reused for `doc` itself.
pub fn decode_into_tree(doc: &NodeDocument, parent: &Node, name: &str) -> Node {
    let node = parent.find_child(name).unwrap_or_else(|| parent.create_node(name));

    if let Some(access_code) = doc.access {
        if let Some(access) = code_to_access(access_code) {
            let initial = match (&doc.type_tag, &doc.value) {
                (Some(tag), Some(values)) => json_to_value(tag, values),
                _ => Value::Impulse,
            };
            if !node.has_parameter() {
                node.set_parameter(crate::tree::parameter::Parameter::new(initial, access));
            } else {
                node.with_parameter_mut(|p| {
                    p.set_access(access);
                });
                node.push_value(initial);
            }
            if let Some(clipmode) = &doc.clipmode {
                node.with_parameter_mut(|p| p.set_bounding(clipmode_to_bounding(clipmode)));
            }
            if let Some(ranges) = &doc.range {
                if let Some(RangeEntry { min: Some(lo), max: Some(hi), .. }) = ranges.first() {
                    node.with_parameter_mut(|p| p.set_domain(Domain::Range(*lo, *hi)));
                }
            }
        }
    }

    if let Some(tags) = &doc.tags {
        node.set_tags(tags.clone());
    }
    if doc.description.is_some() {
        node.set_description(doc.description.clone());
    }
    if let Some(critical) = doc.critical {
        node.set_critical(critical);
    }
    if doc.refresh_rate.is_some() {
        node.set_refresh_rate(doc.refresh_rate);
    }
    if doc.priority.is_some() {
        node.set_priority(doc.priority);
    }

    if let Some(contents) = &doc.contents {
        for (child_name, child_json) in contents {
            if let Ok(child_doc) = serde_json::from_value::<NodeDocument>(child_json.clone()) {
                decode_into_tree(&child_doc, &node, child_name);
            }
        }
    }

    node
}

#[cfg(test)]
mod json_tests {
    use super::*;
    use crate::tree::parameter::Parameter;

    #[test]
    fn round_trips_a_leaf_parameter() {
        let root = Node::root("root");
        let freq = root.create_node("freq");
        freq.set_parameter(Parameter::new(Value::Float(440.0), AccessMode::Bi));

        let doc = encode_node(&root);
        let serialized = serde_json::to_string(&doc).unwrap();
        let decoded: NodeDocument = serde_json::from_str(&serialized).unwrap();

        let scratch = Node::root("scratch");
        let rebuilt = decode_into_tree(&decoded, &scratch, "root");
        let rebuilt_freq = rebuilt.find_child("freq").expect("freq should be decoded");
        assert_eq!(rebuilt_freq.with_parameter(|p| p.value().clone()), Some(Value::Float(440.0)));
        assert_eq!(rebuilt_freq.with_parameter(|p| p.access()), Some(AccessMode::Bi));
    }

    #[test]
    fn encode_preserves_child_order() {
        let root = Node::root("root");
        root.create_node("a");
        root.create_node("b");
        root.create_node("c");
        let doc = encode_node(&root);
        let contents = doc.contents.unwrap();
        let keys: Vec<&String> = contents.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn decode_builds_nested_structure_from_json() {
        let scratch = Node::root("scratch");
        let root_src = Node::root("root");
        let child = root_src.create_node("layer");
        child.set_parameter(Parameter::new(Value::Int(7), AccessMode::Get));
        let doc = encode_node(&root_src);

        let rebuilt = decode_into_tree(&doc, &scratch, "root");
        let layer = rebuilt.find_child("layer").expect("layer should be decoded");
        assert_eq!(layer.with_parameter(|p| p.value().clone()), Some(Value::Int(7)));
    }

    #[test]
    fn access_code_round_trips() {
        assert_eq!(code_to_access(access_to_code(AccessMode::Bi)), Some(AccessMode::Bi));
        assert_eq!(code_to_access(0), None);
    }
}
