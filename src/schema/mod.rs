//! The versioned catalog of tables and their column schemas.

mod builtin;

use std::{collections::BTreeMap, fmt::Display};

use crc32fast::Hasher;
use lazy_static::lazy_static;
use thiserror::Error;

use crate::codec::{self, CodecError, Precision, TypeTag, Value};

pub const OI_TARGET: &str = "OI_TARGET";
pub const OI_ARRAY: &str = "OI_ARRAY";
pub const OI_ARRAY_MOTION: &str = "OI_ARRAY_MOTION";
pub const OI_WAVELENGTH: &str = "OI_WAVELENGTH";
pub const OI_TRANSFER_MATRIX: &str = "OI_TRANSFER_MATRIX";
pub const OI_KERNEL_MATRIX: &str = "OI_KERNEL_MATRIX";
pub const OI_INPUT_PHASOR: &str = "OI_INPUT_PHASOR";
pub const OI_INTENSITY: &str = "OI_INTENSITY";
pub const OI_COVARIANCE: &str = "OI_COVARIANCE";
pub const OI_KERNEL_INTENSITY: &str = "OI_KERNEL_INTENSITY";
pub const OI_KERNEL_COVARIANCE: &str = "OI_KERNEL_COVARIANCE";

/// The newest format version this crate writes by default.
pub const CURRENT_FORMAT_VERSION: u32 = 2;

lazy_static! {
    /// The built-in registry. Built on first use and never modified.
    pub static ref REGISTRY: SchemaRegistry = SchemaRegistry::builtin();
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Table {table} is not registered for format version {version}")]
    UnknownTable { table: String, version: u32 },

    #[error("Format version {0} is not supported")]
    UnsupportedVersion(u32),

    #[error("Row {row} of {table} doesn't match its schema: {problem}")]
    SchemaMismatch {
        table: String,
        row: usize,
        problem: RowProblem,
    },

    #[error("{table} can't be represented in format version {version}{}", column_suffix(.column))]
    NotRepresentable {
        table: String,
        version: u32,
        column: Option<String>,
    },
}

fn column_suffix(column: &Option<String>) -> String {
    match column {
        Some(c) => format!(" (column {c})"),
        None => String::new(),
    }
}

/// Why a row was refused by a [`TableSchema`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowProblem {
    #[error("expected {expected} values, found {found}")]
    Length { expected: usize, found: usize },

    #[error("column {column} expects {expected}, found {found}")]
    Type {
        column: &'static str,
        expected: TypeTag,
        found: &'static str,
    },

    #[error("column {column} is not nullable")]
    Null { column: &'static str },

    #[error("column {column}: {source}")]
    Value {
        column: &'static str,
        source: CodecError,
    },
}

/// Units are mandatory for every column. [`Unit::Dimensionless`] is an
/// explicit declaration, not a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Dimensionless,
    Metre,
    SquareMetre,
    MetrePerSecond,
    Second,
    Year,
    Degree,
    DegreePerYear,
    Adu,
    AduSquared,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Dimensionless => "",
            Unit::Metre => "m",
            Unit::SquareMetre => "m^2",
            Unit::MetrePerSecond => "m/s",
            Unit::Second => "s",
            Unit::Year => "yr",
            Unit::Degree => "deg",
            Unit::DegreePerYear => "deg/yr",
            Unit::Adu => "ADU",
            Unit::AduSquared => "ADU^2",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Unit> {
        let unit = match symbol {
            "" => Unit::Dimensionless,
            "m" => Unit::Metre,
            "m^2" => Unit::SquareMetre,
            "m/s" => Unit::MetrePerSecond,
            "s" => Unit::Second,
            "yr" => Unit::Year,
            "deg" => Unit::Degree,
            "deg/yr" => Unit::DegreePerYear,
            "ADU" => Unit::Adu,
            "ADU^2" => Unit::AduSquared,
            _ => return None,
        };
        Some(unit)
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::Dimensionless => write!(f, "(dimensionless)"),
            u => write!(f, "{}", u.symbol()),
        }
    }
}

/// Whether a table describes the instrument (and so can be shared between
/// observations) or an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: &'static str,
    pub tag: TypeTag,
    pub nullable: bool,
    pub unit: Unit,
}

impl ColumnSchema {
    pub const fn new(name: &'static str, tag: TypeTag, unit: Unit) -> ColumnSchema {
        ColumnSchema {
            name,
            tag,
            nullable: false,
            unit,
        }
    }

    pub const fn nullable(self) -> ColumnSchema {
        ColumnSchema {
            nullable: true,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: &'static str,
    pub kind: TableKind,
    pub columns: Vec<ColumnSchema>,
    fingerprint: u32,
}

impl TableSchema {
    pub fn new(name: &'static str, kind: TableKind, columns: Vec<ColumnSchema>) -> TableSchema {
        let mut hasher = Hasher::new();
        hasher.update(name.as_bytes());
        for c in &columns {
            let description = format!(
                ";{}:{}:{}:{}",
                c.name,
                c.tag.code(),
                if c.nullable { "N" } else { "R" },
                c.unit.symbol()
            );
            hasher.update(description.as_bytes());
        }
        TableSchema {
            name,
            kind,
            columns,
            fingerprint: hasher.finalize(),
        }
    }

    /// A CRC32 over the canonical description of this schema. Two tables with
    /// the same fingerprint have the same columns, types, nullability and
    /// units.
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Check a single row: its shape, and that every value can be stored
    /// exactly when reals are written in `precision`.
    pub fn check_row(&self, values: &[Value], precision: Precision) -> Result<(), RowProblem> {
        if values.len() != self.columns.len() {
            return Err(RowProblem::Length {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        for (column, value) in self.columns.iter().zip(values) {
            match value {
                Value::Null if column.nullable => (),
                Value::Null => return Err(RowProblem::Null { column: column.name }),
                v if column.tag.accepts(v) => {
                    codec::check(v, column.tag, precision).map_err(|source| RowProblem::Value {
                        column: column.name,
                        source,
                    })?
                }
                v => {
                    return Err(RowProblem::Type {
                        column: column.name,
                        expected: column.tag,
                        found: v.kind(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Lay out named values in column order. Columns that aren't named are
    /// filled with nulls; named columns this schema doesn't have are dropped
    /// when null and refused otherwise.
    pub fn row_from_named(
        &self,
        version: u32,
        named: Vec<(&'static str, Value)>,
    ) -> Result<Vec<Value>, SchemaError> {
        let mut row = vec![Value::Null; self.columns.len()];
        for (name, value) in named {
            match self.column_index(name) {
                Some(i) => row[i] = value,
                None if value.is_null() => (),
                None => {
                    return Err(SchemaError::NotRepresentable {
                        table: self.name.to_string(),
                        version,
                        column: Some(name.to_string()),
                    })
                }
            }
        }
        Ok(row)
    }
}

/// An immutable mapping of (format version, table name) to [`TableSchema`].
///
/// Within a version, tables are kept in a canonical order; documents store
/// and report their tables in this order.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    versions: BTreeMap<u32, Vec<TableSchema>>,
}

impl SchemaRegistry {
    pub fn from_versions<I: IntoIterator<Item = (u32, Vec<TableSchema>)>>(
        versions: I,
    ) -> SchemaRegistry {
        SchemaRegistry {
            versions: versions.into_iter().collect(),
        }
    }

    /// The registry of all versions this crate knows about.
    pub fn builtin() -> SchemaRegistry {
        SchemaRegistry::from_versions([(1, builtin::version_1()), (2, builtin::version_2())])
    }

    pub fn supports(&self, version: u32) -> bool {
        self.versions.contains_key(&version)
    }

    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.versions.keys().copied()
    }

    /// All tables registered for `version`, in canonical order.
    pub fn tables(&self, version: u32) -> Result<&[TableSchema], SchemaError> {
        self.versions
            .get(&version)
            .map(|v| v.as_slice())
            .ok_or(SchemaError::UnsupportedVersion(version))
    }

    pub fn schema_for(&self, table_name: &str, version: u32) -> Result<&TableSchema, SchemaError> {
        self.tables(version)?
            .iter()
            .find(|s| s.name == table_name)
            .ok_or_else(|| SchemaError::UnknownTable {
                table: table_name.to_string(),
                version,
            })
    }

    /// The canonical position of a table within its version.
    pub fn position(&self, table_name: &str, version: u32) -> Option<usize> {
        self.versions
            .get(&version)?
            .iter()
            .position(|s| s.name == table_name)
    }
}
