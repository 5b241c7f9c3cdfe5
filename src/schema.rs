//! Compile-time field schema of the tree model.
//!
//! Every editable struct declares its fields once with `settings!`. The
//! declaration drives both the object-graph mapping (field name in the file,
//! entry kind) and string editing (`FieldKind`, parsing, display).

use crate::edit::EditError;
use crate::io::binder::{
    TypeName, BOMB_PREFAB_TYPE, BOUNCER_PREFAB_TYPE, COLOR_TYPE, MOVEMENT_PREFAB_TYPE, PEG_PREFAB_TYPE,
    ROTATION_PREFAB_TYPE, TRANSFORM_TYPE,
};
use crate::io::types::{Entry, Node};
use crate::io::{Error, Result};
use crate::structs::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Value type of an editable field.
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
    /// Variant names, indexed by stored value.
    Enum(&'static [&'static str]),
    Color,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Text => "string",
            FieldKind::Enum(_) => "enum",
            FieldKind::Color => "color",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name of the field in the file and in edit requests.
    pub name: &'static str,
    pub kind: FieldKind,
}

/// A Rust type that can sit in a schema field.
pub trait FieldValue: Sized {
    const KIND: FieldKind;

    fn to_entry(&self) -> Entry;
    fn from_entry(entry: &Entry) -> Option<Self>;
    /// Coerces user input. The error is a short human-readable reason.
    fn parse_field(raw: &str) -> std::result::Result<Self, String>;
    fn display(&self) -> String;
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_entry(&self) -> Entry {
        Entry::Bool(*self)
    }

    fn from_entry(entry: &Entry) -> Option<Self> {
        entry.as_bool()
    }

    fn parse_field(raw: &str) -> std::result::Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err("expected true/false".into()),
        }
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for i32 {
    const KIND: FieldKind = FieldKind::Int;

    fn to_entry(&self) -> Entry {
        Entry::Int(*self)
    }

    fn from_entry(entry: &Entry) -> Option<Self> {
        entry.as_i32()
    }

    fn parse_field(raw: &str) -> std::result::Result<Self, String> {
        raw.trim().parse().map_err(|e| format!("{e}"))
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_entry(&self) -> Entry {
        Entry::Float(*self)
    }

    fn from_entry(entry: &Entry) -> Option<Self> {
        entry.as_f32()
    }

    fn parse_field(raw: &str) -> std::result::Result<Self, String> {
        let v: f32 = raw.trim().parse().map_err(|e| format!("{e}"))?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err("value must be finite".into())
        }
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_entry(&self) -> Entry {
        Entry::String(self.clone())
    }

    fn from_entry(entry: &Entry) -> Option<Self> {
        match entry {
            Entry::String(s) => Some(s.clone()),
            Entry::Null => Some(String::new()),
            _ => None,
        }
    }

    fn parse_field(raw: &str) -> std::result::Result<Self, String> {
        Ok(raw.to_string())
    }

    fn display(&self) -> String {
        self.clone()
    }
}

impl FieldValue for Color {
    const KIND: FieldKind = FieldKind::Color;

    fn to_entry(&self) -> Entry {
        Entry::Node(
            Node::structure(TypeName::runtime(COLOR_TYPE))
                .with("r", Entry::Float(self.r))
                .with("g", Entry::Float(self.g))
                .with("b", Entry::Float(self.b))
                .with("a", Entry::Float(self.a)),
        )
    }

    fn from_entry(entry: &Entry) -> Option<Self> {
        let Entry::Node(node) = entry else { return None };
        let channel = |name: &str| match node.get(name) {
            None => Some(1.0),
            Some(entry) => entry.as_f32(),
        };
        Some(Color::new(channel("r")?, channel("g")?, channel("b")?, channel("a")?))
    }

    /// Accepts `r,g,b,a` / `r,g,b` floats or `#RRGGBB` / `#RRGGBBAA`.
    fn parse_field(raw: &str) -> std::result::Result<Self, String> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix('#') {
            if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
                return Err("expected #RRGGBB or #RRGGBBAA".into());
            }
            let byte = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map(|b| b as f32 / 255.0)
                    .map_err(|e| format!("{e}"))
            };
            let a = if hex.len() == 8 { byte(6)? } else { 1.0 };
            return Ok(Color::new(byte(0)?, byte(2)?, byte(4)?, a));
        }

        let channels = raw
            .split(',')
            .map(f32::parse_field)
            .collect::<std::result::Result<Vec<f32>, String>>()?;
        match channels[..] {
            [r, g, b] => Ok(Color::new(r, g, b, 1.0)),
            [r, g, b, a] => Ok(Color::new(r, g, b, a)),
            _ => Err("expected 3 or 4 channels".into()),
        }
    }

    fn display(&self) -> String {
        format!("{},{},{},{}", self.r, self.g, self.b, self.a)
    }
}

macro_rules! impl_enum_field_value {
    ($ty:ty) => {
        impl FieldValue for $ty {
            const KIND: FieldKind = FieldKind::Enum(<$ty as IndexedEnum>::NAMES);

            fn to_entry(&self) -> Entry {
                Entry::Int(self.index())
            }

            fn from_entry(entry: &Entry) -> Option<Self> {
                entry.as_i32().and_then(<$ty>::from_index)
            }

            /// Variant name (any case) or index.
            fn parse_field(raw: &str) -> std::result::Result<Self, String> {
                let raw = raw.trim();
                if let Ok(index) = raw.parse::<i32>() {
                    return <$ty>::from_index(index).ok_or_else(|| format!("no variant with index {index}"));
                }
                <$ty as IndexedEnum>::NAMES
                    .iter()
                    .position(|name| name.eq_ignore_ascii_case(raw))
                    .and_then(|i| <$ty>::from_index(i as i32))
                    .ok_or_else(|| format!("expected one of {:?}", <$ty as IndexedEnum>::NAMES))
            }

            fn display(&self) -> String {
                self.name().to_string()
            }
        }
    };
}

impl_enum_field_value!(PegType);
impl_enum_field_value!(LoopMode);

/// A struct whose fields are declared through `settings!`.
pub trait Settings {
    /// Runtime type name constant of the node this struct is stored as.
    const TYPE_NAME: &'static str;
    const FIELDS: &'static [FieldSpec];

    fn to_entries(&self) -> Vec<(&'static str, Entry)>;

    /// Stores `entry` into the field called `name`. `Ok(false)` when the
    /// struct has no such field.
    fn read_entry(&mut self, name: &str, entry: &Entry) -> Result<bool>;

    fn get_field(&self, name: &str) -> Option<String>;
    fn set_field(&mut self, name: &str, raw: &str) -> std::result::Result<(), EditError>;
}

macro_rules! settings {
    ($ty:ty, $type_name:expr, { $($field:ident : $fty:ty => $name:literal),+ $(,)? }) => {
        impl Settings for $ty {
            const TYPE_NAME: &'static str = $type_name;
            const FIELDS: &'static [FieldSpec] = &[
                $(FieldSpec { name: $name, kind: <$fty as FieldValue>::KIND }),+
            ];

            fn to_entries(&self) -> Vec<(&'static str, Entry)> {
                vec![$(($name, self.$field.to_entry())),+]
            }

            fn read_entry(&mut self, name: &str, entry: &Entry) -> Result<bool> {
                match name {
                    $($name => {
                        self.$field = <$fty as FieldValue>::from_entry(entry).ok_or_else(|| Error::TypeMismatch {
                            field: name.to_string(),
                            expected: <$fty as FieldValue>::KIND.name(),
                            found: entry.kind(),
                        })?;
                        Ok(true)
                    })+
                    _ => Ok(false),
                }
            }

            fn get_field(&self, name: &str) -> Option<String> {
                match name {
                    $($name => Some(self.$field.display()),)+
                    _ => None,
                }
            }

            fn set_field(&mut self, name: &str, raw: &str) -> std::result::Result<(), EditError> {
                match name {
                    $($name => {
                        self.$field = <$fty as FieldValue>::parse_field(raw).map_err(|reason| EditError::Coerce {
                            field: name.to_string(),
                            value: raw.to_string(),
                            reason,
                        })?;
                        Ok(())
                    })+
                    _ => Err(EditError::UnknownField(name.to_string())),
                }
            }
        }
    };
}

settings!(TransformData, TRANSFORM_TYPE, {
    name: String => "name",
    pos_x: f32 => "posX",
    pos_y: f32 => "posY",
    scale_x: f32 => "scaleX",
    scale_y: f32 => "scaleY",
    enabled: bool => "enabled",
});

settings!(PegSettings, PEG_PREFAB_TYPE, {
    peg_type: PegType => "pegType",
    color: Color => "color",
    can_crit: bool => "canCrit",
    can_refresh: bool => "canRefresh",
});

settings!(BombSettings, BOMB_PREFAB_TYPE, {
    color: Color => "color",
    hits_to_explode: i32 => "hitsToExplode",
    explosion_radius: f32 => "explosionRadius",
});

settings!(BouncerSettings, BOUNCER_PREFAB_TYPE, {
    color: Color => "color",
    bounce_force: f32 => "bounceForce",
});

settings!(MovementSettings, MOVEMENT_PREFAB_TYPE, {
    speed: f32 => "speed",
    distance_x: f32 => "distanceX",
    distance_y: f32 => "distanceY",
    loop_mode: LoopMode => "loopMode",
});

settings!(RotationSettings, ROTATION_PREFAB_TYPE, {
    radius: f32 => "radius",
    speed: f32 => "speed",
    clockwise: bool => "clockwise",
});

/// Runs `$body` with `$s` bound to the settings of a modelled prefab variant,
/// evaluates `$unknown` for [`Prefab::Unknown`].
macro_rules! with_settings {
    ($prefab:expr, $s:ident => $body:expr, $unknown:pat => $fallback:expr) => {
        match $prefab {
            Prefab::PegRegular($s)
            | Prefab::PegLong($s)
            | Prefab::PegSlimeOnly($s)
            | Prefab::IndestructiblePeg($s) => $body,
            Prefab::PegBomb($s) => $body,
            Prefab::BouncerPeg($s) => $body,
            Prefab::MovingPegLinear($s) => $body,
            Prefab::RotatingPegCircle($s) => $body,
            $unknown => $fallback,
        }
    };
}

pub(crate) use with_settings;
