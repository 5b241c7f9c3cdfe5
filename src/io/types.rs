use indexmap::IndexMap;

/// Deepest node nesting accepted while decoding.
pub const MAX_DEPTH: usize = 256;

#[derive(Clone, Debug, PartialEq)]
/// A single value of the entry graph.
///
/// The entry graph is the format-neutral shape that both the binary and the
/// JSON encodings read and write. The tree model is mapped onto it in
/// [`crate::io::graph`].
pub enum Entry {
    Null,
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    Node(Node),
    Array(Vec<Entry>),
}

impl Entry {
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::Null => "null",
            Entry::Bool(_) => "bool",
            Entry::Int(_) => "int",
            Entry::Float(_) => "float",
            Entry::String(_) => "string",
            Entry::Node(_) => "node",
            Entry::Array(_) => "array",
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Entry::Float(v) => Some(v),
            Entry::Int(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Entry::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Entry::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Entry::String(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// A composite value: a class instance (`reference`) or a struct.
pub struct Node {
    /// Type name as written in the file, already resolved by the binder on read.
    pub type_name: Option<String>,

    /// Reference nodes carry an id in the stream, struct nodes do not.
    pub reference: bool,

    /// Named entries in stream order.
    pub fields: IndexMap<String, Entry>,
}

impl Node {
    pub fn reference(type_name: impl Into<String>) -> Self {
        Node {
            type_name: Some(type_name.into()),
            reference: true,
            fields: IndexMap::new(),
        }
    }

    pub fn structure(type_name: impl Into<String>) -> Self {
        Node {
            type_name: Some(type_name.into()),
            reference: false,
            fields: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: &str, entry: Entry) -> Self {
        self.fields.insert(name.to_string(), entry);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.fields.get(name)
    }

    pub fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or("")
    }
}

/// Collects fields of a node while reading.
///
/// Unnamed entries take the next free name from `slots`, then fall back to
/// a positional `$N` key. The binary rewrite pass turns named colour channels
/// into unnamed ones, and this is what reads them back in place.
pub(crate) struct FieldSink<'a> {
    slots: &'a [&'a str],
    next: usize,
    pub(crate) fields: IndexMap<String, Entry>,
}

impl<'a> FieldSink<'a> {
    pub(crate) fn new(slots: &'a [&'a str]) -> Self {
        FieldSink {
            slots,
            next: 0,
            fields: IndexMap::new(),
        }
    }

    pub(crate) fn push(&mut self, name: Option<String>, entry: Entry) {
        let name = match name {
            Some(name) => {
                if let Some(i) = self.slots.iter().position(|s| *s == name) {
                    self.next = self.next.max(i + 1);
                }
                name
            }
            None => {
                while self.next < self.slots.len() && self.fields.contains_key(self.slots[self.next]) {
                    self.next += 1;
                }
                match self.slots.get(self.next) {
                    Some(slot) => {
                        self.next += 1;
                        slot.to_string()
                    }
                    None => positional_key(self.fields.len()),
                }
            }
        };
        self.fields.insert(name, entry);
    }
}

/// Key given to an unnamed entry with no declared slot.
pub(crate) fn positional_key(index: usize) -> String {
    format!("${index}")
}

/// True for keys made by [`positional_key`]. Writers emit these entries unnamed.
pub(crate) fn is_positional_key(name: &str) -> bool {
    name.strip_prefix('$')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Field order of a type, used to place unnamed entries. Empty for
/// types that never carry unnamed entries.
pub(crate) fn slots_for(type_name: &str) -> &'static [&'static str] {
    if type_name.starts_with(crate::io::binder::COLOR_TYPE) {
        &["r", "g", "b", "a"]
    } else {
        &[]
    }
}
