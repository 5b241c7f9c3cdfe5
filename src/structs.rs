use indexmap::IndexMap;

use crate::io::types::Entry;

#[derive(Clone, Debug, Default, PartialEq)]
/// A whole pegboard level.
///
/// A `PegboardData` is a forest of transforms. Every import produces a fresh
/// value, nothing is shared with the previous one.
pub struct PegboardData {
    /// Identifier of the pegboard. Used as the default export file name.
    pub name: String,

    /// Root-level transforms, in file order.
    pub transforms: Vec<TransformData>,
}

#[derive(Clone, Debug, PartialEq)]
/// A placed game object.
///
/// Positions and scales are **absolute**: a child does not inherit the
/// transform of its parent, the hierarchy only groups objects.
pub struct TransformData {
    /// Object name as shown in the editor hierarchy.
    pub name: String,

    /// World-space X position.
    pub pos_x: f32,

    /// World-space Y position.
    pub pos_y: f32,

    /// Horizontal scale.
    pub scale_x: f32,

    /// Vertical scale.
    pub scale_y: f32,

    /// Disabled objects (and everything below them) are not drawn,
    /// but they are still written back on export.
    pub enabled: bool,

    /// Typed component data, if the object is a peg or an obstacle.
    pub prefab: Option<Prefab>,

    /// Nested transforms, in file order.
    pub child: Vec<TransformData>,
}

impl Default for TransformData {
    fn default() -> Self {
        TransformData {
            name: String::new(),
            pos_x: 0.0,
            pos_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            enabled: true,
            prefab: None,
            child: Vec::new(),
        }
    }
}

impl TransformData {
    pub fn new(name: impl Into<String>) -> Self {
        TransformData {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper used by demos and tests.
    pub fn at(mut self, pos_x: f32, pos_y: f32) -> Self {
        self.pos_x = pos_x;
        self.pos_y = pos_y;
        self
    }

    pub fn with_prefab(mut self, prefab: Prefab) -> Self {
        self.prefab = Some(prefab);
        self
    }

    pub fn with_child(mut self, child: TransformData) -> Self {
        self.child.push(child);
        self
    }

    /// `componentType` of the attached prefab, or `"unknown"` when there is none.
    pub fn component_type(&self) -> &str {
        self.prefab.as_ref().map_or("unknown", Prefab::component_type)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// RGBA color, every channel in `0.0..=1.0`.
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    pub fn channels(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Gameplay role of a regular peg. Serialized as its index.
pub enum PegType {
    #[default]
    Regular,
    Crit,
    Refresh,
    Gold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// How a moving peg behaves once it reaches the end of its path.
pub enum LoopMode {
    #[default]
    Once,
    PingPong,
    Loop,
}

/// Enums that are stored as plain integers and edited by name.
pub trait IndexedEnum: Sized + Copy {
    const NAMES: &'static [&'static str];

    fn from_index(index: i32) -> Option<Self>;
    fn index(self) -> i32;

    fn name(self) -> &'static str {
        Self::NAMES[self.index() as usize]
    }
}

macro_rules! impl_indexed_enum {
    ($ty:ty, [$($variant:ident => $name:literal),+ $(,)?]) => {
        impl IndexedEnum for $ty {
            const NAMES: &'static [&'static str] = &[$($name),+];

            fn from_index(index: i32) -> Option<Self> {
                const ALL: &[$ty] = &[$(<$ty>::$variant),+];
                usize::try_from(index).ok().and_then(|i| ALL.get(i).copied())
            }

            fn index(self) -> i32 {
                self as i32
            }
        }
    };
}

impl_indexed_enum!(PegType, [Regular => "Regular", Crit => "Crit", Refresh => "Refresh", Gold => "Gold"]);
impl_indexed_enum!(LoopMode, [Once => "Once", PingPong => "PingPong", Loop => "Loop"]);

#[derive(Clone, Debug, Default, PartialEq)]
/// Settings shared by the plain peg kinds.
pub struct PegSettings {
    pub peg_type: PegType,
    pub color: Color,
    pub can_crit: bool,
    pub can_refresh: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BombSettings {
    pub color: Color,
    /// Hits needed before the bomb goes off.
    pub hits_to_explode: i32,
    pub explosion_radius: f32,
}

impl Default for BombSettings {
    fn default() -> Self {
        BombSettings {
            color: Color::WHITE,
            hits_to_explode: 2,
            explosion_radius: 1.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BouncerSettings {
    pub color: Color,
    pub bounce_force: f32,
}

impl Default for BouncerSettings {
    fn default() -> Self {
        BouncerSettings {
            color: Color::WHITE,
            bounce_force: 10.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Linear movement attribute. Distances are relative to the start position.
pub struct MovementSettings {
    pub speed: f32,
    pub distance_x: f32,
    pub distance_y: f32,
    pub loop_mode: LoopMode,
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Parent that rotates its children around a circle.
pub struct RotationSettings {
    pub radius: f32,
    pub speed: f32,
    pub clockwise: bool,
}

#[derive(Clone, Debug, PartialEq)]
/// Component data attached to a transform.
///
/// The variant is selected by the `componentType` tag stored in the file.
/// Tags this crate does not model are kept as [`Prefab::Unknown`] so they
/// survive a load/save cycle untouched.
pub enum Prefab {
    PegRegular(PegSettings),
    PegLong(PegSettings),
    PegSlimeOnly(PegSettings),
    IndestructiblePeg(PegSettings),
    PegBomb(BombSettings),
    BouncerPeg(BouncerSettings),
    MovingPegLinear(MovementSettings),
    RotatingPegCircle(RotationSettings),

    /// Any other tag. `fields` holds every entry of the component node
    /// except `componentType`, in file order.
    Unknown {
        component_type: String,
        type_name: String,
        fields: IndexMap<String, Entry>,
    },
}

impl Prefab {
    /// Tags of every modelled variant, in declaration order.
    pub const KNOWN_TAGS: [&'static str; 8] = [
        "peg_regular",
        "peg_long",
        "peg_slime_only",
        "indestructible_peg",
        "peg_bomb",
        "bouncer_peg",
        "attr_moving_peg_linear",
        "parent_rotating_peg_circle",
    ];

    /// Creates a variant with default settings for a known tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "peg_regular" => Prefab::PegRegular(PegSettings::default()),
            "peg_long" => Prefab::PegLong(PegSettings::default()),
            "peg_slime_only" => Prefab::PegSlimeOnly(PegSettings::default()),
            "indestructible_peg" => Prefab::IndestructiblePeg(PegSettings::default()),
            "peg_bomb" => Prefab::PegBomb(BombSettings::default()),
            "bouncer_peg" => Prefab::BouncerPeg(BouncerSettings::default()),
            "attr_moving_peg_linear" => Prefab::MovingPegLinear(MovementSettings::default()),
            "parent_rotating_peg_circle" => Prefab::RotatingPegCircle(RotationSettings::default()),
            _ => return None,
        })
    }

    pub fn component_type(&self) -> &str {
        match self {
            Prefab::PegRegular(_) => "peg_regular",
            Prefab::PegLong(_) => "peg_long",
            Prefab::PegSlimeOnly(_) => "peg_slime_only",
            Prefab::IndestructiblePeg(_) => "indestructible_peg",
            Prefab::PegBomb(_) => "peg_bomb",
            Prefab::BouncerPeg(_) => "bouncer_peg",
            Prefab::MovingPegLinear(_) => "attr_moving_peg_linear",
            Prefab::RotatingPegCircle(_) => "parent_rotating_peg_circle",
            Prefab::Unknown { component_type, .. } => component_type,
        }
    }

    /// Color of the peg, for variants that have one.
    pub fn color(&self) -> Option<Color> {
        match self {
            Prefab::PegRegular(s)
            | Prefab::PegLong(s)
            | Prefab::PegSlimeOnly(s)
            | Prefab::IndestructiblePeg(s) => Some(s.color),
            Prefab::PegBomb(s) => Some(s.color),
            Prefab::BouncerPeg(s) => Some(s.color),
            _ => None,
        }
    }
}

impl PegboardData {
    pub fn new(name: impl Into<String>) -> Self {
        PegboardData {
            name: name.into(),
            transforms: Vec::new(),
        }
    }

    /// Total number of transforms, enabled or not.
    pub fn node_count(&self) -> usize {
        self.iter_all().count()
    }
}
