//! Native column type classification.
//!
//! Everything here is a pure function of the catalog's type string. Two
//! separate tables classify a type: one for the language type a generated
//! property is declared with, one for the persistence type the mapping layer
//! stores it as. They bucket differently (`bigint` is an `int` property but a
//! `bigint` column) and are kept apart on purpose.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Type a generated property is declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageType {
    Int,
    Float,
    String,
    Bool,
    DateTime,
    Binary,
    Array,
}

impl LanguageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
            Self::DateTime => "datetime",
            Self::Binary => "binary",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for LanguageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type the mapping layer persists a column as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceType {
    SmallInt,
    Integer,
    BigInt,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Timestamp,
    Time,
    String,
    Text,
    Blob,
    Binary,
    Json,
}

impl PersistenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmallInt => "smallint",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::Time => "time",
            Self::String => "string",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }

    /// A point in time, as opposed to a bare date or time of day
    pub fn is_instant(&self) -> bool {
        matches!(self, Self::DateTime | Self::Timestamp)
    }
}

impl fmt::Display for PersistenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown persistence type: {0}")]
pub struct UnknownPersistenceType(pub String);

impl FromStr for PersistenceType {
    type Err = UnknownPersistenceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "smallint" => Self::SmallInt,
            "integer" => Self::Integer,
            "bigint" => Self::BigInt,
            "float" => Self::Float,
            "decimal" => Self::Decimal,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "timestamp" => Self::Timestamp,
            "time" => Self::Time,
            "string" => Self::String,
            "text" => Self::Text,
            "blob" => Self::Blob,
            "binary" => Self::Binary,
            "json" => Self::Json,
            _ => return Err(UnknownPersistenceType(s.to_string())),
        };
        Ok(ty)
    }
}

const MODIFIERS: [&str; 3] = ["unsigned", "signed", "zerofill"];

/// Lowercased base type with modifiers and the parameter list removed.
///
/// `"DECIMAL(5,2) UNSIGNED"` becomes `"decimal"`, `"enum('a','b')"` becomes
/// `"enum"`. A few multi-word spellings fold to their one-word equivalent.
pub fn base_type(native: &str) -> String {
    let lowered = native.trim().to_ascii_lowercase();
    let stripped = match (lowered.find('('), lowered.rfind(')')) {
        (Some(open), Some(close)) if close > open => {
            format!("{} {}", &lowered[..open], &lowered[close + 1..])
        }
        (Some(open), _) => lowered[..open].to_string(),
        _ => lowered,
    };

    let base = stripped
        .split_whitespace()
        .filter(|word| !MODIFIERS.contains(word))
        .collect::<Vec<_>>()
        .join(" ");

    match base.as_str() {
        "double precision" => "double".to_string(),
        "big int" | "unsigned big int" => "bigint".to_string(),
        "character varying" | "varying character" | "national varchar" => "varchar".to_string(),
        "character" | "national char" => "char".to_string(),
        _ => base,
    }
}

/// Language type for a native type string. Unknown types are strings.
pub fn language_type(native: &str) -> LanguageType {
    match base_type(native).as_str() {
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
            LanguageType::Int
        }
        "float" | "double" | "real" => LanguageType::Float,
        // Decimal columns usually hold money; a string keeps every digit.
        "decimal" | "numeric" | "dec" | "fixed" => LanguageType::String,
        "boolean" | "bool" | "bit" => LanguageType::Bool,
        "date" | "datetime" | "timestamp" | "time" => LanguageType::DateTime,
        "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" => {
            LanguageType::String
        }
        "tinyblob" | "blob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            LanguageType::Binary
        }
        "json" => LanguageType::Array,
        "enum" | "set" => LanguageType::String,
        _ => LanguageType::String,
    }
}

/// Persistence type for a native type string. Unknown types are strings.
pub fn persistence_type(native: &str) -> PersistenceType {
    known_persistence_type(&base_type(native)).unwrap_or(PersistenceType::String)
}

/// Persistence type of a base type name, or `None` when the name is not one
/// this mapper knows.
pub fn known_persistence_type(base: &str) -> Option<PersistenceType> {
    let ty = match base {
        "tinyint" | "smallint" | "year" => PersistenceType::SmallInt,
        "mediumint" | "int" | "integer" => PersistenceType::Integer,
        "bigint" => PersistenceType::BigInt,
        "float" | "double" | "real" => PersistenceType::Float,
        "decimal" | "numeric" | "dec" | "fixed" => PersistenceType::Decimal,
        "boolean" | "bool" | "bit" => PersistenceType::Boolean,
        "date" => PersistenceType::Date,
        "datetime" => PersistenceType::DateTime,
        "timestamp" => PersistenceType::Timestamp,
        "time" => PersistenceType::Time,
        "char" | "varchar" => PersistenceType::String,
        "tinytext" | "text" | "mediumtext" | "longtext" => PersistenceType::Text,
        "tinyblob" | "blob" | "mediumblob" | "longblob" => PersistenceType::Blob,
        "binary" | "varbinary" => PersistenceType::Binary,
        "json" => PersistenceType::Json,
        "enum" | "set" => PersistenceType::String,
        _ => return None,
    };
    Some(ty)
}

fn literal_list_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)^\s*(enum|set)\s*\((.*)\)\s*$").expect("literal list pattern")
    })
}

fn parameter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^(]*\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\)").expect("parameter pattern")
    })
}

/// Values of an `enum(...)` type, empty for anything else
pub fn enum_values(native: &str) -> Vec<String> {
    literal_values_of("enum", native)
}

/// Values of a `set(...)` type, empty for anything else
pub fn set_values(native: &str) -> Vec<String> {
    literal_values_of("set", native)
}

fn literal_values_of(kind: &str, native: &str) -> Vec<String> {
    match literal_list_pattern().captures(native) {
        Some(caps) if caps[1].eq_ignore_ascii_case(kind) => parse_literals(&caps[2]),
        _ => Vec::new(),
    }
}

/// Literal values of an `enum(...)` or `set(...)` type, in declaration order.
///
/// The list is read as one CSV record quoted with `'`, where a doubled `''`
/// stands for an apostrophe. Returns an empty list if `native` is not shaped
/// like either type.
pub fn literal_values(native: &str) -> Vec<String> {
    match literal_list_pattern().captures(native) {
        Some(caps) => parse_literals(&caps[2]),
        None => Vec::new(),
    }
}

fn parse_literals(list: &str) -> Vec<String> {
    let list = strip_separator_space(list);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .quote(b'\'')
        .double_quote(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(list.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

// The CSV reader only sees a quoted field when the quote is its first byte,
// so whitespace outside of quotes has to go first. A doubled `''` flips the
// state twice and stays inside the literal.
fn strip_separator_space(list: &str) -> String {
    let mut out = String::with_capacity(list.len());
    let mut quoted = false;
    for c in list.chars() {
        if c == '\'' {
            quoted = !quoted;
            out.push(c);
        } else if quoted || !c.is_whitespace() {
            out.push(c);
        }
    }
    out
}

/// Integer parameters of a type string: `varchar(255)` → `[255]`,
/// `decimal(5,2)` → `[5, 2]`, `text` → `[]`.
pub fn type_parameters(native: &str) -> Vec<u32> {
    let Some(caps) = parameter_pattern().captures(native) else {
        return Vec::new();
    };
    caps.iter()
        .skip(1)
        .flatten()
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Length, precision and scale a native type declares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeDimensions {
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

/// Dimensions of a native type. Only decimals carry precision and scale and
/// only character and binary strings carry a length; `int(11)` has neither.
pub fn type_dimensions(native: &str) -> TypeDimensions {
    let params = type_parameters(native);
    match persistence_type(native) {
        PersistenceType::Decimal => TypeDimensions {
            precision: params.first().copied(),
            scale: params.get(1).copied(),
            ..TypeDimensions::default()
        },
        PersistenceType::String | PersistenceType::Binary => TypeDimensions {
            length: params.first().copied(),
            ..TypeDimensions::default()
        },
        _ => TypeDimensions::default(),
    }
}

/// Identifier fragment for a constant or enum case.
///
/// Uppercases, collapses every run of non-alphanumeric characters to one
/// underscore and trims underscores at both ends. Never returns an empty or
/// digit-leading name.
pub fn constant_name(value: &str) -> String {
    let mut name = String::with_capacity(value.len());
    let mut pending_separator = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !name.is_empty() {
                name.push('_');
            }
            pending_separator = false;
            name.push(c.to_ascii_uppercase());
        } else {
            pending_separator = true;
        }
    }

    if name.is_empty() {
        "VALUE".to_string()
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("VALUE_{name}")
    } else {
        name
    }
}
