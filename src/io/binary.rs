//! Binary node-entry stream.
//!
//! Every entry starts with a tag byte. Named entries follow the tag with the
//! entry name, then the value. Composite values open with a start-of-node tag
//! and close with [`tags::END_OF_NODE`]. Type names are written in full the
//! first time and by id afterwards. All numbers are little-endian.

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use indexmap::IndexMap;
use log::{debug, trace, warn};
use num_traits::ToPrimitive;
use std::collections::HashMap;
use std::io::{Cursor, Write};

use crate::io::binder::{TypeName, TypeNameBinder};
use crate::io::types::{is_positional_key, slots_for, Entry, FieldSink, Node, MAX_DEPTH};
use crate::io::utils::{truncated, ReadUtils, WriteUtils};
use crate::io::{Error, Result};

pub mod tags {
    pub const NAMED_START_OF_REFERENCE_NODE: u8 = 0x01;
    pub const UNNAMED_START_OF_REFERENCE_NODE: u8 = 0x02;
    pub const NAMED_START_OF_STRUCT_NODE: u8 = 0x03;
    pub const UNNAMED_START_OF_STRUCT_NODE: u8 = 0x04;
    pub const END_OF_NODE: u8 = 0x05;
    pub const START_OF_ARRAY: u8 = 0x06;
    pub const END_OF_ARRAY: u8 = 0x07;
    pub const NAMED_INT: u8 = 0x17;
    pub const UNNAMED_INT: u8 = 0x18;
    pub const NAMED_FLOAT: u8 = 0x1F;
    pub const UNNAMED_FLOAT: u8 = 0x20;
    pub const NAMED_STRING: u8 = 0x27;
    pub const UNNAMED_STRING: u8 = 0x28;
    pub const NAMED_BOOLEAN: u8 = 0x2B;
    pub const UNNAMED_BOOLEAN: u8 = 0x2C;
    pub const NAMED_NULL: u8 = 0x2D;
    pub const UNNAMED_NULL: u8 = 0x2E;
    pub const TYPE_NAME: u8 = 0x2F;
    pub const TYPE_ID: u8 = 0x30;
    pub const END_OF_STREAM: u8 = 0x31;
}

use tags::*;

/// Field name given to the array held by a list node.
pub(crate) const ARRAY_FIELD: &str = "$rcontent";

pub(crate) fn write_graph<W: Write>(w: W, root: &Node, binder: &dyn TypeNameBinder) -> Result<()> {
    let mut writer = BinaryWriter {
        w,
        binder,
        types: IndexMap::new(),
        next_reference_id: 0,
    };
    writer.write_node(None, root)
}

pub(crate) fn read_graph(bytes: &[u8], binder: &dyn TypeNameBinder) -> Result<Node> {
    let mut reader = BinaryReader {
        r: Cursor::new(bytes),
        binder,
        types: HashMap::new(),
    };

    let tag = reader.read_tag()?;
    match tag {
        NAMED_START_OF_REFERENCE_NODE | UNNAMED_START_OF_REFERENCE_NODE | NAMED_START_OF_STRUCT_NODE
        | UNNAMED_START_OF_STRUCT_NODE => {
            let (_, entry) = reader.read_value(tag, 0)?;
            match entry {
                Entry::Node(node) => Ok(node),
                other => Err(Error::UnexpectedEntry {
                    expected: "root node",
                    found: other.kind().to_string(),
                }),
            }
        }
        _ => Err(Error::UnexpectedEntry {
            expected: "root node",
            found: format!("tag {tag:#04x}"),
        }),
    }
}

struct BinaryWriter<'b, W> {
    w: W,
    binder: &'b dyn TypeNameBinder,
    types: IndexMap<String, i32>,
    next_reference_id: i32,
}

impl<W: Write> BinaryWriter<'_, W> {
    fn write_tag(&mut self, named: u8, unnamed: u8, name: Option<&str>) -> Result<()> {
        match name {
            Some(name) => {
                self.w.write_u8(named)?;
                self.w.write_string_utf16(name)?;
            }
            None => self.w.write_u8(unnamed)?,
        }
        Ok(())
    }

    fn write_type(&mut self, type_name: Option<&str>) -> Result<()> {
        let Some(type_name) = type_name else {
            self.w.write_u8(UNNAMED_NULL)?;
            return Ok(());
        };

        let stored = self.binder.bind_to_name(&TypeName::parse(type_name));
        if let Some(&id) = self.types.get(&stored) {
            self.w.write_u8(TYPE_ID)?;
            self.w.write_i32::<LE>(id)?;
        } else {
            let id = self.types.len() as i32;
            trace!("[type] #{id} = {stored:?}");
            self.w.write_u8(TYPE_NAME)?;
            self.w.write_i32::<LE>(id)?;
            self.w.write_string_utf16(&stored)?;
            self.types.insert(stored, id);
        }
        Ok(())
    }

    fn write_node(&mut self, name: Option<&str>, node: &Node) -> Result<()> {
        if node.reference {
            self.write_tag(NAMED_START_OF_REFERENCE_NODE, UNNAMED_START_OF_REFERENCE_NODE, name)?;
            self.write_type(node.type_name.as_deref())?;
            self.w.write_i32::<LE>(self.next_reference_id)?;
            self.next_reference_id += 1;
        } else {
            self.write_tag(NAMED_START_OF_STRUCT_NODE, UNNAMED_START_OF_STRUCT_NODE, name)?;
            self.write_type(node.type_name.as_deref())?;
        }

        for (field, entry) in node.fields.iter() {
            let name = (!is_positional_key(field)).then_some(field.as_str());
            if let (Some(name), Entry::Array(_)) = (name, entry) {
                if name != ARRAY_FIELD {
                    warn!("[array] the stream cannot name arrays, {name:?} reads back as {ARRAY_FIELD:?}");
                }
            }
            self.write_entry(name, entry)?;
        }

        self.w.write_u8(END_OF_NODE)?;
        Ok(())
    }

    fn write_entry(&mut self, name: Option<&str>, entry: &Entry) -> Result<()> {
        match entry {
            Entry::Null => self.write_tag(NAMED_NULL, UNNAMED_NULL, name)?,
            Entry::Bool(v) => {
                self.write_tag(NAMED_BOOLEAN, UNNAMED_BOOLEAN, name)?;
                self.w.write_u8(*v as u8)?;
            }
            Entry::Int(v) => {
                self.write_tag(NAMED_INT, UNNAMED_INT, name)?;
                self.w.write_i32::<LE>(*v)?;
            }
            Entry::Float(v) => {
                self.write_tag(NAMED_FLOAT, UNNAMED_FLOAT, name)?;
                self.w.write_f32::<LE>(*v)?;
            }
            Entry::String(v) => {
                self.write_tag(NAMED_STRING, UNNAMED_STRING, name)?;
                self.w.write_string_utf16(v)?;
            }
            Entry::Node(node) => self.write_node(name, node)?,
            // Arrays are never named in the stream.
            Entry::Array(items) => {
                self.w.write_u8(START_OF_ARRAY)?;
                self.w.write_i64::<LE>(items.len() as i64)?;
                for item in items.iter() {
                    self.write_entry(None, item)?;
                }
                self.w.write_u8(END_OF_ARRAY)?;
            }
        }
        Ok(())
    }
}

struct BinaryReader<'a, 'b> {
    r: Cursor<&'a [u8]>,
    binder: &'b dyn TypeNameBinder,
    types: HashMap<i32, String>,
}

impl BinaryReader<'_, '_> {
    fn read_tag(&mut self) -> Result<u8> {
        Ok(self.r.read_u8().map_err(truncated("entry tag"))?)
    }

    fn remaining(&self) -> usize {
        self.r.get_ref().len().saturating_sub(self.r.position() as usize)
    }

    fn read_name(&mut self, named: bool) -> Result<Option<String>> {
        if named {
            Ok(Some(self.r.read_string_utf16("entry name")?))
        } else {
            Ok(None)
        }
    }

    fn read_type(&mut self) -> Result<Option<String>> {
        match self.read_tag()? {
            TYPE_NAME => {
                let id = self.r.read_i32::<LE>().map_err(truncated("type id"))?;
                let stored = self.r.read_string_utf16("type name")?;
                let ty = self
                    .binder
                    .bind_to_type(&stored)
                    .ok_or_else(|| Error::UnknownType(stored.clone()))?;
                trace!("[type] #{id} = {stored:?} -> {ty}");
                self.types.insert(id, ty.to_string());
                Ok(Some(ty.to_string()))
            }
            TYPE_ID => {
                let id = self.r.read_i32::<LE>().map_err(truncated("type id"))?;
                self.types.get(&id).cloned().map(Some).ok_or(Error::UnknownTypeId(id))
            }
            NAMED_NULL | UNNAMED_NULL => Ok(None),
            tag => Err(Error::UnexpectedEntry {
                expected: "type entry",
                found: format!("tag {tag:#04x}"),
            }),
        }
    }

    fn read_node_body(&mut self, reference: bool, depth: usize) -> Result<Node> {
        if depth >= MAX_DEPTH {
            return Err(Error::TooDeep { max: MAX_DEPTH });
        }

        let type_name = self.read_type()?;
        if reference {
            // Ids only matter for shared references, which the model never produces.
            self.r.read_i32::<LE>().map_err(truncated("reference id"))?;
        }

        let slots: &[&str] = match type_name.as_deref() {
            Some(type_name) => slots_for(type_name),
            None => &[],
        };
        let mut sink = FieldSink::new(slots);
        loop {
            let tag = self.read_tag()?;
            match tag {
                END_OF_NODE => break,
                START_OF_ARRAY => {
                    let items = self.read_array(depth + 1)?;
                    sink.push(Some(ARRAY_FIELD.to_string()), Entry::Array(items));
                }
                _ => {
                    let (name, entry) = self.read_value(tag, depth + 1)?;
                    sink.push(name, entry);
                }
            }
        }

        Ok(Node {
            type_name,
            reference,
            fields: sink.fields,
        })
    }

    fn read_array(&mut self, depth: usize) -> Result<Vec<Entry>> {
        let len = self.r.read_i64::<LE>().map_err(truncated("array length"))?;
        let len = len.to_usize().ok_or(Error::NegativeLength { what: "array", length: len })?;

        let mut items = Vec::with_capacity(len.min(self.remaining()));
        loop {
            let tag = self.read_tag()?;
            match tag {
                END_OF_ARRAY => break,
                START_OF_ARRAY => {
                    if depth >= MAX_DEPTH {
                        return Err(Error::TooDeep { max: MAX_DEPTH });
                    }
                    items.push(Entry::Array(self.read_array(depth + 1)?));
                }
                _ => items.push(self.read_value(tag, depth)?.1),
            }
        }

        if items.len() != len {
            debug!("[array] header says {len} items, found {}", items.len());
        }
        Ok(items)
    }

    fn read_value(&mut self, tag: u8, depth: usize) -> Result<(Option<String>, Entry)> {
        let named = matches!(
            tag,
            NAMED_START_OF_REFERENCE_NODE
                | NAMED_START_OF_STRUCT_NODE
                | NAMED_INT
                | NAMED_FLOAT
                | NAMED_STRING
                | NAMED_BOOLEAN
                | NAMED_NULL
        );

        let entry = match tag {
            NAMED_START_OF_REFERENCE_NODE | UNNAMED_START_OF_REFERENCE_NODE => {
                let name = self.read_name(named)?;
                return Ok((name, Entry::Node(self.read_node_body(true, depth)?)));
            }
            NAMED_START_OF_STRUCT_NODE | UNNAMED_START_OF_STRUCT_NODE => {
                let name = self.read_name(named)?;
                return Ok((name, Entry::Node(self.read_node_body(false, depth)?)));
            }
            NAMED_INT | UNNAMED_INT | NAMED_FLOAT | UNNAMED_FLOAT | NAMED_STRING | UNNAMED_STRING
            | NAMED_BOOLEAN | UNNAMED_BOOLEAN | NAMED_NULL | UNNAMED_NULL => tag,
            END_OF_NODE | END_OF_ARRAY | END_OF_STREAM | TYPE_NAME | TYPE_ID => {
                return Err(Error::UnexpectedEntry {
                    expected: "value",
                    found: format!("tag {tag:#04x}"),
                })
            }
            _ => {
                return Err(Error::UnknownEntry {
                    tag,
                    offset: self.r.position() - 1,
                })
            }
        };

        let name = self.read_name(named)?;
        let entry = match entry {
            NAMED_INT | UNNAMED_INT => Entry::Int(self.r.read_i32::<LE>().map_err(truncated("int"))?),
            NAMED_FLOAT | UNNAMED_FLOAT => Entry::Float(self.r.read_f32::<LE>().map_err(truncated("float"))?),
            NAMED_STRING | UNNAMED_STRING => Entry::String(self.r.read_string_utf16("string")?),
            NAMED_BOOLEAN | UNNAMED_BOOLEAN => Entry::Bool(self.r.read_u8().map_err(truncated("bool"))? != 0),
            _ => Entry::Null,
        };
        Ok((name, entry))
    }
}
