//! String-driven field editing.
//!
//! Edit requests are `(field, value)` pairs of strings. A bare field name
//! targets the transform itself (`posX`, `enabled`, ...), a `prefab.` prefix
//! targets the attached prefab (`prefab.color`, `prefab.hitsToExplode`).
//! Every value is coerced through the field schema declared in
//! [`crate::schema`].

use log::{debug, warn};
use thiserror::Error;

use crate::io::binder::{TypeName, COLOR_TYPE};
use crate::io::types::Entry;
use crate::schema::{with_settings, FieldSpec, FieldValue, Settings};
use crate::structs::*;

/// Prefix of edit keys that target the prefab of a transform.
pub const PREFAB_PREFIX: &str = "prefab.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Cannot set {field:?} to {value:?}: {reason}.")]
    Coerce { field: String, value: String, reason: String },
    #[error("No field named {0:?}.")]
    UnknownField(String),
    #[error("Field {0:?} cannot be edited as text.")]
    ReadOnly(String),
    #[error("The transform has no prefab.")]
    NoPrefab,
}

#[derive(Clone, Debug, PartialEq)]
/// One rejected edit.
pub struct FieldError {
    pub field: String,
    pub error: EditError,
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Outcome of [`apply_edits`].
pub struct EditReport {
    /// Keys that were applied, in request order.
    pub applied: Vec<String>,
    pub failures: Vec<FieldError>,
}

impl EditReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Prefab {
    /// Declared fields of the variant. Empty for [`Prefab::Unknown`], whose
    /// fields are only known from the file (see [`Prefab::fields`]).
    pub fn schema(&self) -> &'static [FieldSpec] {
        fn of<S: Settings>(_: &S) -> &'static [FieldSpec] {
            S::FIELDS
        }
        with_settings!(self, s => of(s), Prefab::Unknown { .. } => &[])
    }

    /// Every field with its current value as text, in schema or file order.
    pub fn fields(&self) -> Vec<(String, String)> {
        match self {
            Prefab::Unknown { fields, .. } => fields
                .iter()
                .map(|(name, entry)| (name.clone(), display_raw(entry).unwrap_or_default()))
                .collect(),
            _ => self
                .schema()
                .iter()
                .filter_map(|spec| Some((spec.name.to_string(), self.get_field(spec.name)?)))
                .collect(),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<String> {
        with_settings!(self,
            s => s.get_field(name),
            Prefab::Unknown { fields, .. } => fields.get(name).and_then(display_raw)
        )
    }

    /// Coerces `raw` into the field called `name`.
    ///
    /// Unknown prefabs only accept values of the same kind as the entry
    /// already stored, and never gain new fields.
    pub fn set_field(&mut self, name: &str, raw: &str) -> Result<(), EditError> {
        with_settings!(self,
            s => s.set_field(name, raw),
            Prefab::Unknown { fields, .. } => {
                let entry = fields
                    .get_mut(name)
                    .ok_or_else(|| EditError::UnknownField(name.to_string()))?;
                *entry = coerce_raw(name, entry, raw)?;
                Ok(())
            }
        )
    }
}

fn is_color(entry: &Entry) -> bool {
    matches!(entry, Entry::Node(node) if node.type_name().starts_with(COLOR_TYPE))
}

fn display_raw(entry: &Entry) -> Option<String> {
    match entry {
        Entry::Bool(v) => Some(v.display()),
        Entry::Int(v) => Some(v.display()),
        Entry::Float(v) => Some(v.display()),
        Entry::String(v) => Some(v.clone()),
        e if is_color(e) => Color::from_entry(e).map(|c| c.display()),
        _ => None,
    }
}

fn coerce_raw(name: &str, current: &Entry, raw: &str) -> Result<Entry, EditError> {
    fn parse<T: FieldValue>(name: &str, raw: &str) -> Result<Entry, EditError> {
        T::parse_field(raw).map(|v| v.to_entry()).map_err(|reason| EditError::Coerce {
            field: name.to_string(),
            value: raw.to_string(),
            reason,
        })
    }

    match current {
        Entry::Bool(_) => parse::<bool>(name, raw),
        Entry::Int(_) => parse::<i32>(name, raw),
        Entry::Float(_) => parse::<f32>(name, raw),
        Entry::String(_) => parse::<String>(name, raw),
        Entry::Node(node) if is_color(current) => {
            // Keep the stored type name, only the channels change.
            let Entry::Node(mut parsed) = parse::<Color>(name, raw)? else {
                return Err(EditError::ReadOnly(name.to_string()));
            };
            parsed.type_name = node.type_name.clone().or_else(|| Some(TypeName::runtime(COLOR_TYPE)));
            Ok(Entry::Node(parsed))
        }
        _ => Err(EditError::ReadOnly(name.to_string())),
    }
}

impl TransformData {
    /// Reads a field of the transform or, with the `prefab.` prefix, of its prefab.
    pub fn get_field(&self, key: &str) -> Option<String> {
        match key.strip_prefix(PREFAB_PREFIX) {
            Some(name) => self.prefab.as_ref()?.get_field(name),
            None => Settings::get_field(self, key),
        }
    }

    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<(), EditError> {
        match key.strip_prefix(PREFAB_PREFIX) {
            Some(name) => self.prefab.as_mut().ok_or(EditError::NoPrefab)?.set_field(name, raw),
            None => Settings::set_field(self, key, raw),
        }
    }
}

/// Applies a batch of edits to one transform.
///
/// A failing edit leaves its field untouched and is reported; the rest of
/// the batch is still applied.
pub fn apply_edits<K, V>(transform: &mut TransformData, edits: &[(K, V)]) -> EditReport
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut report = EditReport::default();
    for (key, value) in edits {
        let (key, value) = (key.as_ref(), value.as_ref());
        match transform.set_field(key, value) {
            Ok(()) => {
                debug!("[edit] {}.{key} = {value:?}", transform.name);
                report.applied.push(key.to_string());
            }
            Err(error) => {
                warn!("[edit] {}: {error}", transform.name);
                report.failures.push(FieldError {
                    field: key.to_string(),
                    error,
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::binder::PREFAB_TYPE;
    use indexmap::IndexMap;

    fn bomb() -> TransformData {
        TransformData::new("bomb").with_prefab(Prefab::PegBomb(BombSettings::default()))
    }

    #[test]
    fn batch_continues_after_failure() {
        let mut t = bomb();
        let report = apply_edits(
            &mut t,
            &[
                ("posX", "4.5"),
                ("enabled", "maybe"),
                ("prefab.hitsToExplode", "5"),
                ("prefab.color", "#00FF00"),
                ("scaleZ", "1"),
            ],
        );

        assert_eq!(report.applied, ["posX", "prefab.hitsToExplode", "prefab.color"]);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0].error, EditError::Coerce { .. }));
        assert_eq!(report.failures[1].error, EditError::UnknownField("scaleZ".into()));

        assert_eq!(t.pos_x, 4.5);
        assert!(t.enabled);
        let Some(Prefab::PegBomb(s)) = &t.prefab else { panic!() };
        assert_eq!(s.hits_to_explode, 5);
        assert_eq!(s.color, Color::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn enum_fields_by_name() {
        let mut t = TransformData::new("p").with_prefab(Prefab::PegRegular(PegSettings::default()));
        t.set_field("prefab.pegType", "GOLD").unwrap();
        assert_eq!(t.get_field("prefab.pegType").as_deref(), Some("Gold"));
        assert!(t.set_field("prefab.pegType", "Silver").is_err());
    }

    #[test]
    fn prefab_edit_without_prefab() {
        let mut t = TransformData::new("empty");
        assert_eq!(t.set_field("prefab.color", "1,1,1"), Err(EditError::NoPrefab));
        assert_eq!(t.get_field("prefab.color"), None);
    }

    #[test]
    fn schema_and_fields_agree() {
        let prefab = Prefab::MovingPegLinear(MovementSettings::default());
        let names: Vec<String> = prefab.fields().into_iter().map(|(n, _)| n).collect();
        let declared: Vec<&str> = prefab.schema().iter().map(|f| f.name).collect();
        assert_eq!(names, declared);
    }

    #[test]
    fn unknown_prefab_keeps_entry_kinds() {
        let mut fields = IndexMap::new();
        fields.insert("radius".to_string(), Entry::Float(1.0));
        fields.insert("active".to_string(), Entry::Bool(true));
        fields.insert("tint".to_string(), Color::WHITE.to_entry());
        fields.insert("path".to_string(), Entry::Array(vec![]));
        let mut prefab = Prefab::Unknown {
            component_type: "obstacle_black_hole".into(),
            type_name: TypeName::runtime(PREFAB_TYPE),
            fields,
        };

        prefab.set_field("radius", "2.5").unwrap();
        prefab.set_field("tint", "0,0,1").unwrap();
        assert!(matches!(prefab.set_field("active", "2.5"), Err(EditError::Coerce { .. })));
        assert_eq!(prefab.set_field("path", "x"), Err(EditError::ReadOnly("path".into())));
        assert_eq!(prefab.set_field("missing", "1"), Err(EditError::UnknownField("missing".into())));

        assert_eq!(prefab.get_field("radius").as_deref(), Some("2.5"));
        assert_eq!(prefab.get_field("tint").as_deref(), Some("0,0,1,1"));
        assert!(prefab.schema().is_empty());
        assert_eq!(prefab.fields().len(), 4);
    }
}
