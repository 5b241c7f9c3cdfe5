//! Type-name binding.
//!
//! Type names are stored assembly-qualified (`Full.Name, Assembly`). Files
//! written by older runtimes name the core library `mscorlib`, newer runtimes
//! call it `System.Private.CoreLib`, and the game only understands the former.
//! A [`TypeNameBinder`] sits between the stream and the tree model and
//! translates in both directions.

use std::fmt;

use indexmap::IndexSet;
use once_cell::sync::Lazy;

pub const LEGACY_CORE_ASSEMBLY: &str = "mscorlib";
pub const RUNTIME_CORE_ASSEMBLY: &str = "System.Private.CoreLib";

const GAME_ASSEMBLY: &str = "Assembly-CSharp";
const ENGINE_ASSEMBLY: &str = "UnityEngine.CoreModule";

/// Version qualifier emitted for game types by the runtime, dropped on write.
const NEUTRAL_QUALIFIER: &str = ", Version=0.0.0.0, Culture=neutral, PublicKeyToken=null";

pub(crate) const PEGBOARD_TYPE: &str = "PegboardParser+PegboardData";
pub(crate) const TRANSFORM_TYPE: &str = "PegboardParser+TransformData";
pub(crate) const PREFAB_TYPE: &str = "PegboardParser+PrefabData";
pub(crate) const PEG_PREFAB_TYPE: &str = "PegboardParser+PegPrefabData";
pub(crate) const BOMB_PREFAB_TYPE: &str = "PegboardParser+BombPrefabData";
pub(crate) const BOUNCER_PREFAB_TYPE: &str = "PegboardParser+BouncerPrefabData";
pub(crate) const MOVEMENT_PREFAB_TYPE: &str = "PegboardParser+MovementPrefabData";
pub(crate) const ROTATION_PREFAB_TYPE: &str = "PegboardParser+RotationPrefabData";
pub(crate) const COLOR_TYPE: &str = "UnityEngine.Color";
pub(crate) const TRANSFORM_LIST_TYPE: &str =
    "System.Collections.Generic.List`1[[PegboardParser+TransformData, Assembly-CSharp]]";

/// Every type the tree model can produce, in runtime form.
static KNOWN_TYPES: Lazy<IndexSet<TypeName>> = Lazy::new(|| {
    [
        (PEGBOARD_TYPE, GAME_ASSEMBLY),
        (TRANSFORM_TYPE, GAME_ASSEMBLY),
        (PREFAB_TYPE, GAME_ASSEMBLY),
        (PEG_PREFAB_TYPE, GAME_ASSEMBLY),
        (BOMB_PREFAB_TYPE, GAME_ASSEMBLY),
        (BOUNCER_PREFAB_TYPE, GAME_ASSEMBLY),
        (MOVEMENT_PREFAB_TYPE, GAME_ASSEMBLY),
        (ROTATION_PREFAB_TYPE, GAME_ASSEMBLY),
        (COLOR_TYPE, ENGINE_ASSEMBLY),
        (TRANSFORM_LIST_TYPE, RUNTIME_CORE_ASSEMBLY),
    ]
    .into_iter()
    .map(|(full_name, assembly)| TypeName::new(full_name, assembly))
    .collect()
});

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// An assembly-qualified type name.
pub struct TypeName {
    pub full_name: String,
    /// Empty when the name carried no assembly part.
    pub assembly: String,
}

impl TypeName {
    pub fn new(full_name: impl Into<String>, assembly: impl Into<String>) -> Self {
        TypeName {
            full_name: full_name.into(),
            assembly: assembly.into(),
        }
    }

    /// Splits `Full.Name, Assembly[, Version=.., ..]` at its top-level commas.
    /// Commas inside generic argument brackets belong to the full name.
    pub fn parse(name: &str) -> Self {
        let mut parts = Vec::new();
        let (mut depth, mut start) = (0i32, 0usize);
        for (i, c) in name.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => depth -= 1,
                ',' if depth == 0 => {
                    parts.push(name[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
        parts.push(name[start..].trim());

        TypeName {
            full_name: parts[0].to_string(),
            assembly: parts.get(1).map(|s| s.to_string()).unwrap_or_default(),
        }
    }

    /// True when the registry of model types contains this name.
    pub fn is_known(&self) -> bool {
        KNOWN_TYPES.contains(self)
    }

    /// Runtime form of a model type constant.
    pub(crate) fn runtime(full_name: &str) -> String {
        KNOWN_TYPES
            .iter()
            .find(|t| t.full_name == full_name)
            .map(ToString::to_string)
            .unwrap_or_else(|| full_name.to_string())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.assembly.is_empty() {
            f.write_str(&self.full_name)
        } else {
            write!(f, "{}, {}", self.full_name, self.assembly)
        }
    }
}

/// Maps between runtime type names and the names stored in files.
///
/// Implementations must be symmetric: a name produced by `bind_to_name`
/// has to resolve back to the same type through `bind_to_type`.
pub trait TypeNameBinder {
    /// Name to store in the file for a runtime type.
    fn bind_to_name(&self, ty: &TypeName) -> String;

    /// Runtime type for a stored name, `None` when it cannot be resolved.
    fn bind_to_type(&self, name: &str) -> Option<TypeName>;
}

#[derive(Clone, Copy, Debug, Default)]
/// Writes the core library as `mscorlib` and reads `mscorlib` back as the
/// runtime core library.
pub struct MscorlibBinder;

impl TypeNameBinder for MscorlibBinder {
    fn bind_to_name(&self, ty: &TypeName) -> String {
        let full_name = ty.full_name.replace(NEUTRAL_QUALIFIER, "");
        let assembly = if ty.assembly == RUNTIME_CORE_ASSEMBLY {
            LEGACY_CORE_ASSEMBLY
        } else {
            ty.assembly.as_str()
        };
        TypeName::new(full_name, assembly).to_string()
    }

    fn bind_to_type(&self, name: &str) -> Option<TypeName> {
        let mut ty = TypeName::parse(name);
        if ty.assembly == LEGACY_CORE_ASSEMBLY {
            ty.assembly = RUNTIME_CORE_ASSEMBLY.to_string();
        }
        let ty = TypeName::new(ty.full_name.replace(NEUTRAL_QUALIFIER, ""), ty.assembly);
        ty.is_known().then_some(ty)
    }
}

#[derive(Clone, Copy, Debug, Default)]
/// Stores runtime names unchanged.
pub struct IdentityBinder;

impl TypeNameBinder for IdentityBinder {
    fn bind_to_name(&self, ty: &TypeName) -> String {
        ty.to_string()
    }

    fn bind_to_type(&self, name: &str) -> Option<TypeName> {
        let ty = TypeName::parse(name);
        ty.is_known().then_some(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_type() -> TypeName {
        TypeName::new(TRANSFORM_LIST_TYPE, RUNTIME_CORE_ASSEMBLY)
    }

    #[test]
    fn parse_keeps_generic_arguments_together() {
        let ty = TypeName::parse(&format!("{TRANSFORM_LIST_TYPE}, mscorlib"));
        assert_eq!(ty.full_name, TRANSFORM_LIST_TYPE);
        assert_eq!(ty.assembly, "mscorlib");
    }

    #[test]
    fn parse_drops_version_qualifiers() {
        let ty = TypeName::parse("PegboardParser+TransformData, Assembly-CSharp, Version=0.0.0.0, Culture=neutral");
        assert_eq!(ty, TypeName::new(TRANSFORM_TYPE, GAME_ASSEMBLY));
    }

    #[test]
    fn mscorlib_binder_is_symmetric() {
        let binder = MscorlibBinder;
        let stored = binder.bind_to_name(&list_type());
        assert!(stored.ends_with(", mscorlib"));
        assert_eq!(binder.bind_to_type(&stored), Some(list_type()));
    }

    #[test]
    fn identity_binder_rejects_legacy_alias() {
        let stored = MscorlibBinder.bind_to_name(&list_type());
        assert_eq!(IdentityBinder.bind_to_type(&stored), None);
        assert_eq!(IdentityBinder.bind_to_type(&list_type().to_string()), Some(list_type()));
    }

    #[test]
    fn unknown_types_do_not_resolve() {
        assert_eq!(MscorlibBinder.bind_to_type("PegboardParser+Nope, Assembly-CSharp"), None);
    }

    #[test]
    fn runtime_form_of_constants() {
        assert_eq!(TypeName::runtime(COLOR_TYPE), "UnityEngine.Color, UnityEngine.CoreModule");
    }
}
