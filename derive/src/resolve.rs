//! Decides, per field, between a statically typed record accessor and the
//! generic `Object` accessor.
//!
//! The registry is built by a single ordered scan of the `constructors`
//! group. The first constructor seen for a result type becomes that type's
//! representative; a second constructor for the same result type turns the
//! entry generic. Lookups compare the case-normalized (first letter lowered)
//! declared type against the case-normalized result type. The representative
//! is therefore chosen by encounter order, not by name equality with the
//! declared type; fields where the two rules disagree are reported as
//! [`Divergence`]s and logged, but the registry answer is what gets compiled.

use crate::error::SchemaError;
use crate::schema::{Category, Constructor, ParamType, Parameter, Schema};
use std::collections::{HashMap, HashSet};

/// Primitive kinds understood by the runtime buffer primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Int,
    Long,
    Double,
    String,
    Bytes,
    Bool,
}

/// How one vector element is written and read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Raw primitive, no per-element tag.
    Scalar(Scalar),
    /// The named constructor's own codec, tag included.
    Record(String),
    /// Tag dispatch per element.
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Flags,
    Scalar(Scalar),
    /// A `true` field, implied by its flag bit.
    Presence,
    Record(String),
    Generic,
    Vector(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Representation {
    Single(String),
    Generic,
}

/// Result type (case-normalized) to its representation.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entries: HashMap<String, Representation>,
}

/// Lowers the first character, leaving the rest untouched.
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl TypeRegistry {
    /// Scans constructors in declaration order; methods are ignored.
    pub fn build<'a>(constructors: impl IntoIterator<Item = &'a Constructor>) -> Self {
        let mut entries = HashMap::new();
        for constructor in constructors
            .into_iter()
            .filter(|c| c.category == Category::Type)
        {
            entries
                .entry(lower_first(&constructor.result_type))
                .and_modify(|entry| *entry = Representation::Generic)
                .or_insert_with(|| Representation::Single(constructor.name.clone()));
        }
        let generic = entries
            .values()
            .filter(|r| **r == Representation::Generic)
            .count();
        tracing::debug!(
            types = entries.len(),
            generic,
            "built type registry"
        );
        TypeRegistry { entries }
    }

    /// The single constructor representing `declared`, if there is one.
    pub fn lookup(&self, declared: &str) -> Option<&str> {
        match self.representation(declared) {
            Some(Representation::Single(name)) => Some(name),
            _ => None,
        }
    }

    pub fn representation(&self, declared: &str) -> Option<&Representation> {
        self.entries.get(&lower_first(declared))
    }
}

/// A field whose registry resolution differs from naive name equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub constructor: String,
    pub field: String,
    pub declared: String,
    /// What the registry bound the field to (`None` = generic).
    pub registry: Option<String>,
    /// The constructor literally named like the declared type, if any.
    pub by_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedParam<'a> {
    pub param: &'a Parameter,
    pub kind: FieldKind,
}

#[derive(Debug, Clone)]
pub struct ResolvedConstructor<'a> {
    pub constructor: &'a Constructor,
    pub params: Vec<ResolvedParam<'a>>,
}

#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub constructors: Vec<ResolvedConstructor<'a>>,
    pub divergences: Vec<Divergence>,
}

struct Resolver<'a> {
    registry: TypeRegistry,
    type_names: HashSet<&'a str>,
    divergences: Vec<Divergence>,
}

impl<'a> Resolver<'a> {
    fn unsupported(constructor: &Constructor, param: &Parameter, ty: &str) -> SchemaError {
        SchemaError::UnsupportedType {
            constructor: constructor.name.clone(),
            field: param.name.clone(),
            ty: ty.to_string(),
        }
    }

    fn scalar(ty: &ParamType) -> Option<Scalar> {
        match ty {
            ParamType::Int => Some(Scalar::Int),
            ParamType::Long => Some(Scalar::Long),
            ParamType::Double => Some(Scalar::Double),
            ParamType::String => Some(Scalar::String),
            ParamType::Bytes => Some(Scalar::Bytes),
            ParamType::Bool => Some(Scalar::Bool),
            _ => None,
        }
    }

    /// `Some(constructor)` for a typed accessor, `None` for a generic one.
    fn named(
        &mut self,
        constructor: &Constructor,
        param: &Parameter,
        declared: &str,
    ) -> Result<Option<String>, SchemaError> {
        if self.registry.representation(declared).is_none()
            && declared.starts_with(|c: char| c.is_ascii_lowercase())
        {
            // Lowercase names missing from the registry are raw scalar kinds
            // (int128, ...) with no encoding here.
            return Err(Self::unsupported(constructor, param, declared));
        }
        let registry = self.registry.lookup(declared).map(str::to_string);

        let literal = lower_first(declared);
        let by_name = self
            .type_names
            .contains(literal.as_str())
            .then_some(literal);
        if registry != by_name {
            tracing::warn!(
                constructor = %constructor.name,
                field = %param.name,
                declared,
                registry = registry.as_deref().unwrap_or("<generic>"),
                by_name = by_name.as_deref().unwrap_or("<none>"),
                "type resolution differs from name equality"
            );
            self.divergences.push(Divergence {
                constructor: constructor.name.clone(),
                field: param.name.clone(),
                declared: declared.to_string(),
                registry: registry.clone(),
                by_name,
            });
        }
        Ok(registry)
    }

    fn element(
        &mut self,
        constructor: &Constructor,
        param: &Parameter,
        inner: &ParamType,
    ) -> Result<Element, SchemaError> {
        if let Some(scalar) = Self::scalar(inner) {
            // Only generic-element vectors could carry doubles, and the
            // runtime has no such accessor.
            if scalar == Scalar::Double {
                return Err(Self::unsupported(constructor, param, "Vector<double>"));
            }
            return Ok(Element::Scalar(scalar));
        }
        match inner {
            ParamType::Generic => Ok(Element::Generic),
            ParamType::Named(declared) => Ok(match self.named(constructor, param, declared)? {
                Some(record) => Element::Record(record),
                None => Element::Generic,
            }),
            other => Err(Self::unsupported(
                constructor,
                param,
                &format!("Vector<{:?}>", other),
            )),
        }
    }

    fn field(
        &mut self,
        constructor: &Constructor,
        param: &Parameter,
    ) -> Result<FieldKind, SchemaError> {
        if let Some(scalar) = Self::scalar(&param.ty) {
            return Ok(FieldKind::Scalar(scalar));
        }
        match &param.ty {
            ParamType::Flags => Ok(FieldKind::Flags),
            ParamType::True => Ok(FieldKind::Presence),
            ParamType::Generic => Ok(FieldKind::Generic),
            ParamType::Named(declared) => Ok(match self.named(constructor, param, declared)? {
                Some(record) => FieldKind::Record(record),
                None => FieldKind::Generic,
            }),
            ParamType::Vector(inner) => Ok(FieldKind::Vector(self.element(
                constructor,
                param,
                inner,
            )?)),
            ParamType::BareVector(inner) => Err(Self::unsupported(
                constructor,
                param,
                &format!("vector<{}>", inner),
            )),
            _ => Err(Self::unsupported(constructor, param, &format!("{:?}", param.ty))),
        }
    }
}

/// Resolves every field of every constructor and method.
///
/// Deterministic: the registry depends only on declaration order, and
/// constructors and divergences come out in declaration order.
pub fn resolve(schema: &Schema) -> Result<Resolution<'_>, SchemaError> {
    let mut resolver = Resolver {
        registry: TypeRegistry::build(&schema.constructors),
        type_names: schema.types().map(|c| c.name.as_str()).collect(),
        divergences: Vec::new(),
    };

    let mut constructors = Vec::with_capacity(schema.constructors.len());
    for constructor in &schema.constructors {
        let mut params = Vec::with_capacity(constructor.params.len());
        for param in &constructor.params {
            let kind = resolver.field(constructor, param)?;
            params.push(ResolvedParam { param, kind });
        }
        constructors.push(ResolvedConstructor {
            constructor,
            params,
        });
    }

    Ok(Resolution {
        constructors,
        divergences: resolver.divergences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    const SCHEMA: &str = r##"{
        "constructors": [
            {"id": "1", "predicate": "inputPeerEmpty", "params": [], "type": "InputPeer"},
            {"id": "2", "predicate": "inputPeerSelf", "params": [], "type": "InputPeer"},
            {"id": "3", "predicate": "config", "params": [{"name": "dc", "type": "int"}], "type": "Config"},
            {"id": "4", "predicate": "photoEmpty", "params": [], "type": "Photo"},
            {"id": "5", "predicate": "auth.authorization", "params": [], "type": "auth.Authorization"},
            {"id": "6", "predicate": "holder", "params": [
                {"name": "flags", "type": "#"},
                {"name": "peer", "type": "InputPeer"},
                {"name": "config", "type": "Config"},
                {"name": "photo", "type": "flags.0?Photo"},
                {"name": "auth", "type": "auth.Authorization"},
                {"name": "configs", "type": "Vector<Config>"},
                {"name": "peers", "type": "Vector<InputPeer>"},
                {"name": "ids", "type": "Vector<long>"},
                {"name": "any", "type": "!X"},
                {"name": "unknown", "type": "Unknown"},
                {"name": "seen", "type": "flags.1?true"}
            ], "type": "Holder"}
        ],
        "methods": [
            {"id": "7", "method": "getPhoto", "params": [], "type": "Holder"}
        ]
    }"##;

    fn kinds(resolution: &Resolution<'_>, name: &str) -> Vec<FieldKind> {
        resolution
            .constructors
            .iter()
            .find(|c| c.constructor.name == name)
            .map(|c| c.params.iter().map(|p| p.kind.clone()).collect())
            .unwrap()
    }

    #[test]
    fn test_registry_first_seen_wins() {
        let schema = parse_schema(SCHEMA).unwrap();
        let registry = TypeRegistry::build(&schema.constructors);
        assert_eq!(
            registry.representation("InputPeer"),
            Some(&Representation::Generic)
        );
        assert_eq!(registry.lookup("InputPeer"), None);
        assert_eq!(registry.lookup("Config"), Some("config"));
        assert_eq!(registry.lookup("Photo"), Some("photoEmpty"));
        // methods never register their result type
        assert_eq!(registry.lookup("Holder"), Some("holder"));
    }

    #[test]
    fn test_field_kinds() {
        let schema = parse_schema(SCHEMA).unwrap();
        let resolution = resolve(&schema).unwrap();
        assert_eq!(
            kinds(&resolution, "holder"),
            vec![
                FieldKind::Flags,
                FieldKind::Generic,
                FieldKind::Record("config".to_string()),
                FieldKind::Record("photoEmpty".to_string()),
                FieldKind::Record("auth_authorization".to_string()),
                FieldKind::Vector(Element::Record("config".to_string())),
                FieldKind::Vector(Element::Generic),
                FieldKind::Vector(Element::Scalar(Scalar::Long)),
                FieldKind::Generic,
                FieldKind::Generic,
                FieldKind::Presence,
            ]
        );
    }

    #[test]
    fn test_divergences_are_reported() {
        let schema = parse_schema(SCHEMA).unwrap();
        let resolution = resolve(&schema).unwrap();
        let fields: Vec<_> = resolution
            .divergences
            .iter()
            .map(|d| (d.field.as_str(), d.registry.as_deref(), d.by_name.as_deref()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("photo", Some("photoEmpty"), None),
                ("auth", Some("auth_authorization"), None),
            ]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let schema = parse_schema(SCHEMA).unwrap();
        let first: Vec<Vec<FieldKind>> = resolve(&schema)
            .unwrap()
            .constructors
            .iter()
            .map(|c| c.params.iter().map(|p| p.kind.clone()).collect())
            .collect();
        for _ in 0..16 {
            let again: Vec<Vec<FieldKind>> = resolve(&schema)
                .unwrap()
                .constructors
                .iter()
                .map(|c| c.params.iter().map(|p| p.kind.clone()).collect())
                .collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_lowercase_names_follow_the_registry() {
        let json = r#"{"constructors":[
            {"id":"1","predicate":"inputPeerEmpty","params":[],"type":"InputPeer"},
            {"id":"2","predicate":"inputPeerSelf","params":[],"type":"InputPeer"},
            {"id":"3","predicate":"config","params":[],"type":"Config"},
            {"id":"4","predicate":"h","params":[
                {"name":"a","type":"config"},
                {"name":"b","type":"inputPeer"},
                {"name":"c","type":"Vector<inputPeer>"}
            ],"type":"H"}],"methods":[]}"#;
        let schema = parse_schema(json).unwrap();
        let resolution = resolve(&schema).unwrap();
        assert_eq!(
            kinds(&resolution, "h"),
            vec![
                FieldKind::Record("config".to_string()),
                FieldKind::Generic,
                FieldKind::Vector(Element::Generic),
            ]
        );
    }

    #[test]
    fn test_vector_double_is_rejected() {
        let json = r#"{"constructors":[{"id":"1","predicate":"a","params":[{"name":"xs","type":"Vector<double>"}],"type":"A"}],"methods":[]}"#;
        let schema = parse_schema(json).unwrap();
        assert!(matches!(
            resolve(&schema),
            Err(SchemaError::UnsupportedType { ref ty, .. }) if ty == "Vector<double>"
        ));
    }

    #[test]
    fn test_nested_vector_is_rejected() {
        let json = r#"{"constructors":[{"id":"1","predicate":"a","params":[{"name":"xs","type":"Vector<Vector<int>>"}],"type":"A"}],"methods":[]}"#;
        let schema = parse_schema(json).unwrap();
        assert!(matches!(
            resolve(&schema),
            Err(SchemaError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_unknown_raw_scalar_is_rejected() {
        let json = r#"{"constructors":[{"id":"1","predicate":"a","params":[{"name":"nonce","type":"int128"}],"type":"A"}],"methods":[]}"#;
        let schema = parse_schema(json).unwrap();
        assert!(matches!(
            resolve(&schema),
            Err(SchemaError::UnsupportedType { ref ty, .. }) if ty == "int128"
        ));

        let json = r#"{"constructors":[{"id":"1","predicate":"a","params":[{"name":"xs","type":"vector<long>"}],"type":"A"}],"methods":[]}"#;
        let schema = parse_schema(json).unwrap();
        assert!(matches!(
            resolve(&schema),
            Err(SchemaError::UnsupportedType { .. })
        ));
    }
}
