//! Mapping between the tree model and the entry graph.

use log::debug;

use crate::io::binary::ARRAY_FIELD;
use crate::io::binder::{TypeName, PEGBOARD_TYPE, PREFAB_TYPE, TRANSFORM_LIST_TYPE};
use crate::io::types::{Entry, Node, MAX_DEPTH};
use crate::io::{Error, Result};
use crate::schema::{with_settings, Settings};
use crate::structs::*;

const COMPONENT_TYPE_FIELD: &str = "componentType";

fn enter(depth: usize) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(Error::TooDeep { max: MAX_DEPTH });
    }
    Ok(())
}

/// Builds the entry graph of a pegboard.
///
/// Depths are counted the way the readers count them, so anything written
/// here can be read back.
pub(crate) fn to_graph(data: &PegboardData) -> Result<Node> {
    Ok(Node::reference(TypeName::runtime(PEGBOARD_TYPE))
        .with("name", Entry::String(data.name.clone()))
        .with("transforms", Entry::Node(transform_list(&data.transforms, 1)?)))
}

fn transform_list(transforms: &[TransformData], depth: usize) -> Result<Node> {
    enter(depth)?;
    let items = transforms
        .iter()
        .map(|t| transform_node(t, depth + 1).map(Entry::Node))
        .collect::<Result<Vec<_>>>()?;
    Ok(Node::reference(TypeName::runtime(TRANSFORM_LIST_TYPE)).with(ARRAY_FIELD, Entry::Array(items)))
}

fn transform_node(transform: &TransformData, depth: usize) -> Result<Node> {
    enter(depth)?;
    let mut node = Node::reference(TypeName::runtime(TransformData::TYPE_NAME));
    for (name, entry) in transform.to_entries() {
        node.fields.insert(name.to_string(), entry);
    }

    let prefab = match &transform.prefab {
        Some(prefab) => Entry::Node(prefab_node(prefab, depth + 1)?),
        None => Entry::Null,
    };
    node.fields.insert("prefab".into(), prefab);
    node.fields.insert("child".into(), Entry::Node(transform_list(&transform.child, depth + 1)?));

    Ok(node)
}

fn prefab_node(prefab: &Prefab, depth: usize) -> Result<Node> {
    enter(depth)?;
    // Colors are one level below the prefab.
    enter(depth + 1)?;
    let tag = Entry::String(prefab.component_type().to_string());

    with_settings!(prefab,
        s => Ok(settings_node(s, tag)),
        Prefab::Unknown { type_name, fields, .. } => {
            let mut node = Node::reference(type_name.clone()).with(COMPONENT_TYPE_FIELD, tag);
            node.fields.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(node)
        }
    )
}

fn settings_node<S: Settings>(settings: &S, tag: Entry) -> Node {
    let mut node = Node::reference(TypeName::runtime(S::TYPE_NAME)).with(COMPONENT_TYPE_FIELD, tag);
    for (name, entry) in settings.to_entries() {
        node.fields.insert(name.to_string(), entry);
    }
    node
}

/// Rebuilds a pegboard from a decoded entry graph.
pub(crate) fn from_graph(root: &Node) -> Result<PegboardData> {
    expect_type(root, PEGBOARD_TYPE)?;

    let name = match root.get("name") {
        None | Some(Entry::Null) => String::new(),
        Some(Entry::String(s)) => s.clone(),
        Some(other) => return Err(mismatch("name", "string", other)),
    };

    Ok(PegboardData {
        name,
        transforms: read_transform_list(root.get("transforms"), "transforms")?,
    })
}

fn expect_type(node: &Node, full_name: &str) -> Result<()> {
    let ty = TypeName::parse(node.type_name());
    if ty.full_name != full_name {
        return Err(Error::UnexpectedEntry {
            expected: "known node type",
            found: format!("{} (expected {full_name})", node.type_name()),
        });
    }
    Ok(())
}

fn mismatch(field: &str, expected: &'static str, found: &Entry) -> Error {
    Error::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.kind(),
    }
}

fn read_transform_list(entry: Option<&Entry>, field: &str) -> Result<Vec<TransformData>> {
    let list = match entry {
        None | Some(Entry::Null) => return Ok(Vec::new()),
        Some(Entry::Node(list)) => list,
        Some(other) => return Err(mismatch(field, "node", other)),
    };
    expect_type(list, TRANSFORM_LIST_TYPE)?;

    let items = match list.get(ARRAY_FIELD) {
        None => return Ok(Vec::new()),
        Some(Entry::Array(items)) => items,
        Some(other) => return Err(mismatch(ARRAY_FIELD, "array", other)),
    };

    let mut transforms = Vec::with_capacity(items.len());
    for item in items.iter() {
        match item {
            Entry::Node(node) => transforms.push(read_transform(node)?),
            Entry::Null => debug!("[{field}] skipping null transform"),
            other => return Err(mismatch(field, "node", other)),
        }
    }
    Ok(transforms)
}

fn read_transform(node: &Node) -> Result<TransformData> {
    expect_type(node, TransformData::TYPE_NAME)?;

    let mut transform = TransformData::default();
    for (name, entry) in node.fields.iter() {
        match name.as_str() {
            "prefab" => transform.prefab = read_prefab(entry)?,
            "child" => transform.child = read_transform_list(Some(entry), "child")?,
            _ => {
                if !transform.read_entry(name, entry)? {
                    debug!("[transform] ignoring field {name:?}");
                }
            }
        }
    }
    Ok(transform)
}

fn read_prefab(entry: &Entry) -> Result<Option<Prefab>> {
    let node = match entry {
        Entry::Null => return Ok(None),
        Entry::Node(node) => node,
        other => return Err(mismatch("prefab", "node", other)),
    };

    let tag = match node.get(COMPONENT_TYPE_FIELD) {
        None | Some(Entry::Null) => String::new(),
        Some(Entry::String(s)) => s.clone(),
        Some(other) => return Err(mismatch(COMPONENT_TYPE_FIELD, "string", other)),
    };

    let Some(mut prefab) = Prefab::from_tag(&tag) else {
        debug!("[prefab] unmodelled component type {tag:?}");
        let mut fields = node.fields.clone();
        fields.shift_remove(COMPONENT_TYPE_FIELD);
        return Ok(Some(Prefab::Unknown {
            component_type: tag,
            type_name: node.type_name.clone().unwrap_or_else(|| TypeName::runtime(PREFAB_TYPE)),
            fields,
        }));
    };

    with_settings!(&mut prefab,
        s => read_settings(s, node)?,
        Prefab::Unknown { .. } => {}
    );
    Ok(Some(prefab))
}

fn read_settings<S: Settings>(settings: &mut S, node: &Node) -> Result<()> {
    for (name, entry) in node.fields.iter() {
        if name == COMPONENT_TYPE_FIELD {
            continue;
        }
        if !settings.read_entry(name, entry)? {
            debug!("[prefab] ignoring field {name:?}");
        }
    }
    Ok(())
}
