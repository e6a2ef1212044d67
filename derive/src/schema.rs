//! In-memory form of the schema document.
//!
//! The document has two arrays, `constructors` and `methods`, whose entries
//! share one shape:
//!
//! ```json
//! { "id": "-1132882121", "predicate": "boolFalse", "params": [], "type": "Bool" }
//! ```
//!
//! Methods carry their name under `method` instead of `predicate`.

use crate::error::SchemaError;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

/// Which array of the document a definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// An entry of `constructors`. Its result type takes part in resolution.
    Type,
    /// An entry of `methods`. Its result type is never registered.
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    pub tag: u32,
    pub name: String,
    pub result_type: String,
    pub params: Vec<Parameter>,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: ParamType,
    pub flag: Option<Flag>,
}

/// Bit `bit` of the flags word named `word` gates this field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub word: String,
    pub bit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// `#`, the 32-bit flags word.
    Flags,
    Int,
    Long,
    Double,
    String,
    Bytes,
    /// `Bool`, written as one of two zero-field constructors.
    Bool,
    /// `true`, carried by a flag bit alone.
    True,
    /// `!X`, any polymorphic value.
    Generic,
    /// A bare type name, resolved later against the type registry.
    Named(String),
    /// `Vector<X>`.
    Vector(Box<ParamType>),
    /// `vector<X>`, the untagged form.
    BareVector(String),
}

impl ParamType {
    fn parse(ty: &str) -> Option<ParamType> {
        let parsed = match ty {
            "#" => ParamType::Flags,
            "int" => ParamType::Int,
            "long" => ParamType::Long,
            "double" => ParamType::Double,
            "string" => ParamType::String,
            "bytes" => ParamType::Bytes,
            "Bool" => ParamType::Bool,
            "true" => ParamType::True,
            _ if ty.starts_with('!') && is_identifier(&ty[1..]) => ParamType::Generic,
            _ => {
                if let Some(inner) = ty.strip_prefix("Vector<").and_then(|t| t.strip_suffix('>')) {
                    ParamType::Vector(Box::new(ParamType::parse(inner)?))
                } else if let Some(inner) =
                    ty.strip_prefix("vector<").and_then(|t| t.strip_suffix('>'))
                {
                    ParamType::BareVector(inner.to_string())
                } else if is_identifier(ty) {
                    ParamType::Named(ty.to_string())
                } else {
                    return None;
                }
            }
        };
        Some(parsed)
    }
}

/// The whole document, in declaration order: constructors first, then methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub constructors: Vec<Constructor>,
}

impl Schema {
    pub fn types(&self) -> impl Iterator<Item = &Constructor> {
        self.constructors
            .iter()
            .filter(|c| c.category == Category::Type)
    }
}

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default)]
    constructors: Vec<RawDefinition>,
    #[serde(default)]
    methods: Vec<RawDefinition>,
}

#[derive(Deserialize)]
struct RawDefinition {
    id: RawId,
    #[serde(alias = "method")]
    predicate: String,
    params: Vec<RawParam>,
    #[serde(rename = "type")]
    result_type: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// `flags_3?Type` after normalization: flags word, bit, real type.
const FLAG_MARKER: &str = r"^([A-Za-z][A-Za-z0-9]*)_(\d+)\?(.+)$";

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Replaces namespacing dots with underscores.
pub fn normalize(s: &str) -> String {
    s.replace('.', "_")
}

/// Normalizes a field name, prefixing reserved words with an underscore.
pub fn normalize_field(s: &str) -> String {
    let name = normalize(s);
    if RUST_KEYWORDS.contains(&name.as_str()) {
        format!("_{}", name)
    } else {
        name
    }
}

fn parse_tag(id: &RawId, name: &str) -> Result<u32, SchemaError> {
    let value = match id {
        RawId::Text(text) => text.trim().parse::<i64>().ok(),
        RawId::Number(n) => Some(*n),
    };
    match value {
        Some(v) if (i32::MIN as i64..=u32::MAX as i64).contains(&v) => Ok(v as u32),
        _ => Err(SchemaError::MalformedTag {
            id: match id {
                RawId::Text(text) => text.clone(),
                RawId::Number(n) => n.to_string(),
            },
            name: name.to_string(),
        }),
    }
}

fn parse_parameter(
    marker: &Regex,
    constructor: &str,
    raw: &RawParam,
    earlier: &[Parameter],
) -> Result<Parameter, SchemaError> {
    let name = normalize_field(&raw.name);
    if !is_identifier(&name) {
        return Err(SchemaError::MalformedName(raw.name.clone()));
    }
    let normalized = normalize(raw.ty.trim());

    let (flag, ty_text) = match marker.captures(&normalized) {
        None => (None, normalized.clone()),
        Some(caps) => {
            let word = normalize_field(&caps[1]);
            let bit: u32 = caps[2].parse().map_err(|_| SchemaError::MalformedType {
                constructor: constructor.to_string(),
                field: name.clone(),
                ty: raw.ty.clone(),
            })?;
            if bit >= 32 {
                return Err(SchemaError::FlagBitOutOfRange {
                    constructor: constructor.to_string(),
                    field: name,
                    bit,
                });
            }
            if !earlier
                .iter()
                .any(|p| p.name == word && p.ty == ParamType::Flags && p.flag.is_none())
            {
                return Err(SchemaError::UnknownFlagsWord {
                    constructor: constructor.to_string(),
                    field: name,
                    word,
                });
            }
            (Some(Flag { word, bit }), caps[3].to_string())
        }
    };

    let ty = ParamType::parse(&ty_text).ok_or_else(|| SchemaError::MalformedType {
        constructor: constructor.to_string(),
        field: name.clone(),
        ty: raw.ty.clone(),
    })?;

    match (&ty, &flag) {
        (ParamType::True, None) => Err(SchemaError::PresenceWithoutFlag {
            constructor: constructor.to_string(),
            field: name,
        }),
        (ParamType::Flags, Some(_)) => Err(SchemaError::UnsupportedType {
            constructor: constructor.to_string(),
            field: name,
            ty: raw.ty.clone(),
        }),
        _ => Ok(Parameter { name, ty, flag }),
    }
}

fn parse_definition(
    marker: &Regex,
    raw: &RawDefinition,
    category: Category,
) -> Result<Constructor, SchemaError> {
    let name = normalize(&raw.predicate);
    if !is_identifier(&name) {
        return Err(SchemaError::MalformedName(raw.predicate.clone()));
    }
    let tag = parse_tag(&raw.id, &name)?;

    let mut params: Vec<Parameter> = Vec::with_capacity(raw.params.len());
    for raw_param in &raw.params {
        let param = parse_parameter(marker, &name, raw_param, &params)?;
        if params.iter().any(|p| p.name == param.name) {
            return Err(SchemaError::DuplicateName(format!("{}.{}", name, param.name)));
        }
        params.push(param);
    }

    Ok(Constructor {
        tag,
        name,
        result_type: normalize(&raw.result_type),
        params,
        category,
    })
}

/// Parses a schema document into the constructor model.
///
/// The built-in `vector` constructor is skipped. Any malformed entry aborts
/// the whole parse.
pub fn parse_schema(json: &str) -> Result<Schema, SchemaError> {
    let raw: RawSchema = serde_json::from_str(json)?;
    let marker = Regex::new(FLAG_MARKER)?;

    let groups = [
        (&raw.constructors, Category::Type),
        (&raw.methods, Category::Function),
    ];
    let mut constructors = Vec::with_capacity(raw.constructors.len() + raw.methods.len());
    let mut seen_tags: HashMap<u32, String> = HashMap::new();

    for (definitions, category) in groups {
        for definition in definitions.iter() {
            let constructor = parse_definition(&marker, definition, category)?;
            if constructor.name == "vector" {
                continue;
            }
            if let Some(first) = seen_tags.insert(constructor.tag, constructor.name.clone()) {
                return Err(SchemaError::DuplicateTag {
                    tag: constructor.tag,
                    first,
                    second: constructor.name,
                });
            }
            constructors.push(constructor);
        }
    }

    if constructors.is_empty() {
        return Err(SchemaError::Empty);
    }

    tracing::debug!(
        constructors = constructors.len(),
        "parsed schema document"
    );
    Ok(Schema { constructors })
}
