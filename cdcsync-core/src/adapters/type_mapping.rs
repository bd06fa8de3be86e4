//! MySQL native type to [`ColumnType`] conversion.
//!
//! The mapping is fixed and total over the types MySQL reports in
//! `INFORMATION_SCHEMA.COLUMNS`: anything it does not list is reported as
//! unrecognized (`None`) instead of being coerced to a catch-all type.
//! Unsigned integers are mapped one size up so that every unsigned value
//! still fits into the signed target type.

use crate::models::ColumnType;

/// Largest decimal precision kept as `DECIMAL`; wider values become strings.
pub const MAX_DECIMAL_PRECISION: u32 = 38;

const DEFAULT_DECIMAL_PRECISION: u32 = 10;

/// Maps a MySQL type name to a column type.
///
/// # Arguments
/// * `native_type` - Type name as reported by MySQL, optionally followed by
///   `unsigned` / `zerofill` (case-insensitive)
/// * `precision` - Character length, numeric precision or bit count
/// * `scale` - Numeric scale
///
/// # Returns
/// The corresponding `ColumnType`, or `None` if the type is not recognized
///
/// # Example
/// ```rust
/// use cdcsync_core::adapters::type_mapping::map_mysql_type;
/// use cdcsync_core::models::ColumnType;
///
/// let mapped = map_mysql_type("varchar", Some(255), None);
/// assert_eq!(mapped, Some(ColumnType::String { max_length: Some(255) }));
/// assert_eq!(map_mysql_type("INT UNSIGNED", None, None), Some(ColumnType::Integer { bits: 64 }));
/// assert_eq!(map_mysql_type("hyperloglog", None, None), None);
/// ```
pub fn map_mysql_type(
    native_type: &str,
    precision: Option<u32>,
    scale: Option<u32>,
) -> Option<ColumnType> {
    let type_lower = native_type.to_lowercase();
    let mut is_unsigned = false;
    let mut words = Vec::new();
    for word in type_lower.split_whitespace() {
        match word {
            // ZEROFILL implies UNSIGNED in MySQL
            "unsigned" | "zerofill" => is_unsigned = true,
            "signed" => {}
            other => words.push(other),
        }
    }
    let base_type = words.join(" ");

    let mapped = match base_type.as_str() {
        // Integer types
        "tinyint" => ColumnType::Integer {
            bits: if is_unsigned { 16 } else { 8 },
        },
        "smallint" => ColumnType::Integer {
            bits: if is_unsigned { 32 } else { 16 },
        },
        "mediumint" => ColumnType::Integer { bits: 32 },
        "int" | "integer" => ColumnType::Integer {
            bits: if is_unsigned { 64 } else { 32 },
        },
        "bigint" if is_unsigned => ColumnType::Decimal {
            precision: 20,
            scale: 0,
        },
        "bigint" => ColumnType::Integer { bits: 64 },
        "year" => ColumnType::Integer { bits: 32 },

        // Floating point types; FLOAT(p) with p > 24 is stored as DOUBLE
        "float" => ColumnType::Float {
            bits: if precision.is_some_and(|p| p > 24) {
                64
            } else {
                32
            },
        },
        "double" | "double precision" | "real" => ColumnType::Float { bits: 64 },

        // Fixed-point types
        "decimal" | "numeric" | "dec" | "fixed" => {
            let precision = precision.unwrap_or(DEFAULT_DECIMAL_PRECISION);
            let scale = scale.unwrap_or(0);
            match (u8::try_from(precision), u8::try_from(scale)) {
                (Ok(p), Ok(s)) if precision <= MAX_DECIMAL_PRECISION => ColumnType::Decimal {
                    precision: p,
                    scale: s,
                },
                _ => ColumnType::unbounded_string(),
            }
        }

        // Boolean and bit types
        "bool" | "boolean" => ColumnType::Boolean,
        "bit" => match precision {
            None | Some(1) => ColumnType::Boolean,
            Some(bits) => ColumnType::Binary {
                max_length: Some(bits.div_ceil(8)),
            },
        },

        // Character types
        "char" | "character" | "nchar" | "national char" => ColumnType::String {
            max_length: Some(precision.unwrap_or(1)),
        },
        "varchar" | "character varying" | "nvarchar" | "national varchar" => {
            ColumnType::String {
                max_length: precision,
            }
        }
        "tinytext" | "text" | "mediumtext" | "longtext" | "json" | "enum" | "set" => {
            ColumnType::unbounded_string()
        }

        // Binary types
        "binary" => ColumnType::Binary {
            max_length: Some(precision.unwrap_or(1)),
        },
        "varbinary" => ColumnType::Binary {
            max_length: precision,
        },
        "tinyblob" | "blob" | "mediumblob" | "longblob" => ColumnType::unbounded_binary(),

        // Spatial types travel as WKB
        "geometry" | "point" | "linestring" | "polygon" | "multipoint" | "multilinestring"
        | "multipolygon" | "geometrycollection" | "geomcollection" => {
            ColumnType::unbounded_binary()
        }

        // Date/Time types
        "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "datetime" => ColumnType::Timestamp {
            with_timezone: false,
        },
        "timestamp" => ColumnType::Timestamp {
            with_timezone: true,
        },

        _ => return None,
    };

    Some(mapped)
}

/// A DDL-style column type split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTypeSpec {
    /// Base type name including `unsigned` / `zerofill` modifiers
    pub native_type: String,
    /// First parenthesized argument
    pub precision: Option<u32>,
    /// Second parenthesized argument
    pub scale: Option<u32>,
}

/// Splits a column definition such as `decimal(10,2) unsigned` or
/// `varchar(64)` into type name, precision and scale.
///
/// Non-numeric arguments (the value lists of `enum(...)` / `set(...)`) are
/// dropped. Returns `None` for an empty or malformed definition.
pub fn parse_column_definition(definition: &str) -> Option<NativeTypeSpec> {
    let definition = definition.trim();
    if definition.is_empty() {
        return None;
    }

    let Some((base, rest)) = definition.split_once('(') else {
        return Some(NativeTypeSpec {
            native_type: definition.to_string(),
            precision: None,
            scale: None,
        });
    };

    let (arguments, modifiers) = rest.rsplit_once(')')?;
    let numbers: Vec<Option<u32>> = arguments
        .split(',')
        .map(|arg| arg.trim().parse::<u32>().ok())
        .collect();

    let (precision, scale) = match numbers.as_slice() {
        [Some(p)] => (Some(*p), None),
        [Some(p), Some(s)] => (Some(*p), Some(*s)),
        _ => (None, None),
    };

    let native_type = format!("{} {}", base.trim(), modifiers.trim());
    Some(NativeTypeSpec {
        native_type: native_type.trim().to_string(),
        precision,
        scale,
    })
}

/// Parses and maps a DDL-style column definition in one step.
pub fn map_column_definition(definition: &str) -> Option<ColumnType> {
    let spec = parse_column_definition(definition)?;
    map_mysql_type(&spec.native_type, spec.precision, spec.scale)
}

/// Native type names accepted by [`map_mysql_type`], for listings.
pub const SUPPORTED_MYSQL_TYPES: &[&str] = &[
    "tinyint", "smallint", "mediumint", "int", "integer", "bigint", "year", "float", "double",
    "double precision", "real", "decimal", "numeric", "dec", "fixed", "bool", "boolean", "bit",
    "char", "character", "nchar", "varchar", "character varying", "nvarchar", "tinytext", "text",
    "mediumtext", "longtext", "json", "enum", "set", "binary", "varbinary", "tinyblob", "blob",
    "mediumblob", "longblob", "geometry", "point", "linestring", "polygon", "multipoint",
    "multilinestring", "multipolygon", "geometrycollection", "date", "time", "datetime",
    "timestamp",
];
