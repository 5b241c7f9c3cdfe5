//! JSON document encoding of the entry graph.
//!
//! ```json
//! {
//!     "$id": 0,
//!     "$type": "0|PegboardParser+PegboardData, Assembly-CSharp",
//!     "name": "board",
//!     "transforms": { "$id": 1, "$type": "1|...", "$rlength": 0, "$rcontent": [] }
//! }
//! ```
//!
//! `$type` holds `"<id>|<name>"` the first time a type appears and the bare id
//! afterwards. Lists keep their items under `$rcontent`.
//!
//! Documents are never nested deeper than [`MAX_JSON_NESTING`] objects and
//! arrays, the most `serde_json` reads back.

use indexmap::IndexMap;
use log::trace;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::io::binary::ARRAY_FIELD;
use crate::io::binder::{TypeName, TypeNameBinder};
use crate::io::types::{slots_for, Entry, FieldSink, Node, MAX_DEPTH};
use crate::io::{Error, Result};

const ID_KEY: &str = "$id";
const TYPE_KEY: &str = "$type";
const LENGTH_KEY: &str = "$rlength";

/// Deepest object/array nesting written, matching the recursion limit of
/// `serde_json::from_slice`.
pub const MAX_JSON_NESTING: usize = 127;

fn enter(depth: usize) -> Result<()> {
    if depth > MAX_JSON_NESTING {
        return Err(Error::TooDeep { max: MAX_JSON_NESTING });
    }
    Ok(())
}

pub(crate) fn write_graph(root: &Node, binder: &dyn TypeNameBinder) -> Result<Vec<u8>> {
    let mut writer = JsonWriter {
        binder,
        types: IndexMap::new(),
        next_reference_id: 0,
    };
    let value = writer.node_to_value(root, 1)?;
    Ok(serde_json::to_vec_pretty(&value)?)
}

pub(crate) fn read_graph(bytes: &[u8], binder: &dyn TypeNameBinder) -> Result<Node> {
    let value: Value = serde_json::from_slice(bytes)?;
    let mut reader = JsonReader {
        binder,
        types: HashMap::new(),
    };
    match value {
        Value::Object(map) => reader.value_to_node(map, 0),
        other => Err(Error::InvalidJson(format!("root must be an object, found {other}"))),
    }
}

struct JsonWriter<'b> {
    binder: &'b dyn TypeNameBinder,
    types: IndexMap<String, i64>,
    next_reference_id: i64,
}

impl JsonWriter<'_> {
    fn node_to_value(&mut self, node: &Node, depth: usize) -> Result<Value> {
        enter(depth)?;
        let mut map = Map::new();

        if node.reference {
            map.insert(ID_KEY.into(), Value::from(self.next_reference_id));
            self.next_reference_id += 1;
        }

        if let Some(type_name) = node.type_name.as_deref() {
            let stored = self.binder.bind_to_name(&TypeName::parse(type_name));
            let value = match self.types.get(&stored) {
                Some(&id) => Value::from(id),
                None => {
                    let id = self.types.len() as i64;
                    trace!("[type] #{id} = {stored:?}");
                    let value = Value::from(format!("{id}|{stored}"));
                    self.types.insert(stored, id);
                    value
                }
            };
            map.insert(TYPE_KEY.into(), value);
        }

        for (field, entry) in node.fields.iter() {
            if let (ARRAY_FIELD, Entry::Array(items)) = (field.as_str(), entry) {
                map.insert(LENGTH_KEY.into(), Value::from(items.len()));
            }
            map.insert(field.clone(), self.entry_to_value(field, entry, depth + 1)?);
        }

        Ok(Value::Object(map))
    }

    fn entry_to_value(&mut self, field: &str, entry: &Entry, depth: usize) -> Result<Value> {
        Ok(match entry {
            Entry::Null => Value::Null,
            Entry::Bool(v) => Value::Bool(*v),
            Entry::Int(v) => Value::from(*v),
            Entry::Float(v) => Number::from_f64(f64::from(*v))
                .map(Value::Number)
                .ok_or_else(|| Error::InvalidJson(format!("field {field:?} holds non-finite float {v}")))?,
            Entry::String(v) => Value::String(v.clone()),
            Entry::Node(node) => self.node_to_value(node, depth)?,
            Entry::Array(items) => {
                enter(depth)?;
                Value::Array(
                    items
                        .iter()
                        .map(|item| self.entry_to_value(field, item, depth + 1))
                        .collect::<Result<_>>()?,
                )
            }
        })
    }
}

struct JsonReader<'b> {
    binder: &'b dyn TypeNameBinder,
    types: HashMap<i64, String>,
}

impl JsonReader<'_> {
    fn read_type(&mut self, value: Value) -> Result<String> {
        match value {
            Value::String(s) => {
                let (id, stored) = s
                    .split_once('|')
                    .ok_or_else(|| Error::InvalidJson(format!("malformed {TYPE_KEY} {s:?}")))?;
                let id: i64 = id
                    .parse()
                    .map_err(|_| Error::InvalidJson(format!("malformed type id in {s:?}")))?;
                let ty = self
                    .binder
                    .bind_to_type(stored)
                    .ok_or_else(|| Error::UnknownType(stored.to_string()))?;
                self.types.insert(id, ty.to_string());
                Ok(ty.to_string())
            }
            Value::Number(n) => {
                let id = n
                    .as_i64()
                    .ok_or_else(|| Error::InvalidJson(format!("malformed type id {n}")))?;
                let id_i32 = i32::try_from(id).unwrap_or(i32::MAX);
                self.types.get(&id).cloned().ok_or(Error::UnknownTypeId(id_i32))
            }
            other => Err(Error::InvalidJson(format!("malformed {TYPE_KEY} {other}"))),
        }
    }

    fn value_to_node(&mut self, mut map: Map<String, Value>, depth: usize) -> Result<Node> {
        if depth >= MAX_DEPTH {
            return Err(Error::TooDeep { max: MAX_DEPTH });
        }

        // `remove` would swap the last field to the front and break file order.
        let reference = map.shift_remove(ID_KEY).is_some();
        let type_name = map.shift_remove(TYPE_KEY).map(|v| self.read_type(v)).transpose()?;
        map.shift_remove(LENGTH_KEY);

        let slots: &[&str] = match type_name.as_deref() {
            Some(type_name) => slots_for(type_name),
            None => &[],
        };
        let mut sink = FieldSink::new(slots);
        for (field, value) in map {
            let entry = self.value_to_entry(value, depth + 1)?;
            sink.push(Some(field), entry);
        }

        Ok(Node {
            type_name,
            reference,
            fields: sink.fields,
        })
    }

    fn value_to_entry(&mut self, value: Value, depth: usize) -> Result<Entry> {
        Ok(match value {
            Value::Null => Entry::Null,
            Value::Bool(v) => Entry::Bool(v),
            Value::Number(n) => match n.as_i64().and_then(|v| i32::try_from(v).ok()) {
                Some(v) => Entry::Int(v),
                None => Entry::Float(n.as_f64().unwrap_or(f64::NAN) as f32),
            },
            Value::String(v) => Entry::String(v),
            Value::Object(map) => Entry::Node(self.value_to_node(map, depth)?),
            Value::Array(items) => {
                if depth >= MAX_DEPTH {
                    return Err(Error::TooDeep { max: MAX_DEPTH });
                }
                Entry::Array(
                    items
                        .into_iter()
                        .map(|item| self.value_to_entry(item, depth + 1))
                        .collect::<Result<_>>()?,
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::binder::{MscorlibBinder, COLOR_TYPE, PEGBOARD_TYPE, TRANSFORM_LIST_TYPE};

    fn sample() -> Node {
        let color = Node::structure(TypeName::runtime(COLOR_TYPE))
            .with("r", Entry::Float(0.1))
            .with("g", Entry::Float(1.0))
            .with("b", Entry::Float(0.0))
            .with("a", Entry::Float(1.0));
        let list = Node::reference(TypeName::runtime(TRANSFORM_LIST_TYPE))
            .with(ARRAY_FIELD, Entry::Array(vec![Entry::Node(color.clone()), Entry::Null]));
        Node::reference(TypeName::runtime(PEGBOARD_TYPE))
            .with("name", Entry::String("board".into()))
            .with("count", Entry::Int(3))
            .with("on", Entry::Bool(false))
            .with("tint", Entry::Node(color))
            .with("transforms", Entry::Node(list))
    }

    #[test]
    fn json_round_trip() {
        let bytes = write_graph(&sample(), &MscorlibBinder).unwrap();
        assert_eq!(read_graph(&bytes, &MscorlibBinder).unwrap(), sample());
    }

    #[test]
    fn json_layout() {
        let bytes = write_graph(&sample(), &MscorlibBinder).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["$id"], 0);
        assert_eq!(value["$type"], "0|PegboardParser+PegboardData, Assembly-CSharp");
        assert_eq!(value["tint"]["$type"], "1|UnityEngine.Color, UnityEngine.CoreModule");
        assert!(value["transforms"]["$type"].as_str().unwrap().ends_with(", mscorlib"));
        assert_eq!(value["transforms"]["$rlength"], 2);
        // Second use of the color type is by id.
        assert_eq!(value["transforms"]["$rcontent"][0]["$type"], 1);
    }

    #[test]
    fn whole_floats_stay_floats() {
        let bytes = write_graph(&sample(), &MscorlibBinder).unwrap();
        let node = read_graph(&bytes, &MscorlibBinder).unwrap();
        let Some(Entry::Node(tint)) = node.get("tint") else { panic!("no tint") };
        assert_eq!(tint.get("g"), Some(&Entry::Float(1.0)));
    }

    #[test]
    fn non_object_root_fails() {
        assert!(matches!(read_graph(b"[1, 2]", &MscorlibBinder), Err(Error::InvalidJson(_))));
        assert!(matches!(read_graph(b"{", &MscorlibBinder), Err(Error::Json(_))));
    }

    #[test]
    fn field_order_survives_metadata_keys() {
        let doc = br#"{ "$id": 0, "$type": "0|PegboardParser+PegboardData, Assembly-CSharp",
            "first": { "$type": "1|UnityEngine.Color, UnityEngine.CoreModule", "r": 1.0 },
            "middle": 2,
            "last": { "$type": 1, "g": 0.5 } }"#;
        let node = read_graph(doc, &MscorlibBinder).unwrap();
        let names: Vec<&str> = node.fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["first", "middle", "last"]);
        let Some(Entry::Node(last)) = node.get("last") else { panic!("no last") };
        assert!(last.type_name().starts_with(COLOR_TYPE));
    }

    #[test]
    fn nesting_limit_is_enforced_on_write() {
        let mut node = Node::structure(TypeName::runtime(COLOR_TYPE));
        for _ in 0..MAX_JSON_NESTING {
            node = Node::structure(TypeName::runtime(COLOR_TYPE)).with("inner", Entry::Node(node));
        }
        assert!(matches!(write_graph(&node, &MscorlibBinder), Err(Error::TooDeep { max: MAX_JSON_NESTING })));

        let mut node = Node::structure(TypeName::runtime(COLOR_TYPE));
        for _ in 1..MAX_JSON_NESTING {
            node = Node::structure(TypeName::runtime(COLOR_TYPE)).with("inner", Entry::Node(node));
        }
        let bytes = write_graph(&node, &MscorlibBinder).unwrap();
        assert_eq!(read_graph(&bytes, &MscorlibBinder).unwrap(), node);
    }

    #[test]
    fn undefined_type_id_fails() {
        let doc = br#"{ "$id": 0, "$type": 4 }"#;
        assert!(matches!(read_graph(doc, &MscorlibBinder), Err(Error::UnknownTypeId(4))));
    }
}
