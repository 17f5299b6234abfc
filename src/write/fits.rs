//! Exporting sealed documents as FITS files that OIFITS tooling can open.
//!
//! Nulls are NaN, empty text or [`INT_NULL`], and FITS pads text with spaces,
//! so some values can't be told apart from others once exported. Those are
//! refused with [`FitsError::Lossy`] rather than written.

use std::path::Path;

use fitsio::{
    tables::{ColumnDataType, ColumnDescription, ConcreteColumnDescription},
    FitsFile,
};
use log::{debug, trace};

use crate::{
    codec::{self, Precision, TypeTag, Value},
    document::{Document, Table, TableSource},
    read::fits::{FitsError, FORMAT_NAME, INT_NULL, PROVENANCE_TABLE},
    schema::{ColumnSchema, TableSchema, Unit},
};

/// One FITS column's worth of data.
enum ColumnData {
    Int(Vec<i32>),
    Double(Vec<f64>),
    Text(Vec<String>),
}

struct FitsColumn {
    name: String,
    data_type: ColumnDataType,
    repeat: usize,
    unit: Unit,
    data: ColumnData,
}

/// Write `document` to a new FITS file at `path`, replacing any file already
/// there. Empty tables are left out.
pub fn export<P: AsRef<Path>>(document: &Document, path: P) -> Result<(), FitsError> {
    let path = path.as_ref();

    // Check everything before creating the file.
    let mut tables = vec![];
    for table in document.tables().iter().filter(|t| !t.is_empty()) {
        tables.push((table.schema(), table_columns(table)?));
    }
    let provenance = document.provenance();
    for (row, (key, value)) in provenance.iter().enumerate() {
        for (column, text) in [("KEY", key), ("VALUE", value)] {
            if text.ends_with(' ') {
                return Err(lossy(PROVENANCE_TABLE, row, column, TRAILING_SPACES));
            }
        }
    }

    let mut fptr = FitsFile::create(path).overwrite().open()?;
    let header = document.header();
    let (centuries, nanoseconds) = header.epoch.to_tai_parts();
    let hdu = fptr.primary_hdu()?;
    hdu.write_key(&mut fptr, "FORMAT", FORMAT_NAME)?;
    hdu.write_key(&mut fptr, "NIFITSV", i64::from(header.format_version))?;
    hdu.write_key(&mut fptr, "REVISION", i64::from(header.revision))?;
    hdu.write_key(&mut fptr, "EPOCH_C", i64::from(centuries))?;
    // Nanoseconds within a century don't always fit in a FITS integer key.
    hdu.write_key(&mut fptr, "EPOCH_NS", nanoseconds.to_string())?;
    hdu.write_key(&mut fptr, "UNITS", header.units.as_str())?;

    for (schema, columns) in &tables {
        write_table(&mut fptr, schema, columns)?;
    }

    if !provenance.is_empty() {
        let keys: Vec<String> = provenance.keys().cloned().collect();
        let values: Vec<String> = provenance.values().cloned().collect();
        let hdu = fptr.create_table(
            PROVENANCE_TABLE,
            &[
                describe("KEY", ColumnDataType::String, text_width(&keys))?,
                describe("VALUE", ColumnDataType::String, text_width(&values))?,
            ],
        )?;
        hdu.write_col(&mut fptr, "KEY", &keys)?;
        hdu.write_col(&mut fptr, "VALUE", &values)?;
    }

    debug!("Exported {} tables to {}", tables.len(), path.display());
    Ok(())
}

const TRAILING_SPACES: &str = "FITS drops trailing spaces";

fn lossy(table: &str, row: usize, column: &str, reason: &'static str) -> FitsError {
    FitsError::Lossy {
        table: table.to_string(),
        row,
        column: column.to_string(),
        reason,
    }
}

fn describe(
    name: &str,
    data_type: ColumnDataType,
    repeat: usize,
) -> Result<ConcreteColumnDescription, FitsError> {
    let mut description = ColumnDescription::new(name);
    let description = description.with_type(data_type);
    let description = if repeat > 1 {
        description.that_repeats(repeat)
    } else {
        description
    };
    Ok(description.create()?)
}

fn text_width(texts: &[String]) -> usize {
    texts.iter().map(|s| s.len()).max().unwrap_or(0).max(1)
}

fn table_columns(table: &Table) -> Result<Vec<FitsColumn>, FitsError> {
    let schema = table.schema();
    let mut columns = vec![];
    for (i_col, column) in schema.columns.iter().enumerate() {
        let values: Vec<&Value> = table.rows().iter().map(|row| &row[i_col]).collect();
        for (row, value) in values.iter().enumerate() {
            check_value(schema, column, row, value)?;
        }
        match column.tag {
            TypeTag::I32 => {
                let ints = values
                    .iter()
                    .map(|v| match v {
                        Value::I32(i) => *i,
                        _ => INT_NULL,
                    })
                    .collect();
                columns.push(FitsColumn {
                    name: column.name.to_string(),
                    data_type: ColumnDataType::Int,
                    repeat: 1,
                    unit: column.unit,
                    data: ColumnData::Int(ints),
                });
            }
            TypeTag::F64 | TypeTag::Real | TypeTag::Timestamp => {
                let doubles = values
                    .iter()
                    .map(|v| match v {
                        Value::F64(f) | Value::Timestamp(f) => *f,
                        _ => f64::NAN,
                    })
                    .collect();
                columns.push(FitsColumn {
                    name: column.name.to_string(),
                    data_type: ColumnDataType::Double,
                    repeat: 1,
                    unit: column.unit,
                    data: ColumnData::Double(doubles),
                });
            }
            TypeTag::Complex => {
                let (re, im): (Vec<f64>, Vec<f64>) = values
                    .iter()
                    .map(|v| match v {
                        Value::Complex(c) => (c.re, c.im),
                        _ => (f64::NAN, f64::NAN),
                    })
                    .unzip();
                for (suffix, part) in [("RE", re), ("IM", im)] {
                    columns.push(FitsColumn {
                        name: format!("{}_{suffix}", column.name),
                        data_type: ColumnDataType::Double,
                        repeat: 1,
                        unit: column.unit,
                        data: ColumnData::Double(part),
                    });
                }
            }
            TypeTag::FixedText(width) => {
                let texts = values
                    .iter()
                    .map(|v| match v {
                        Value::Text(s) => s.clone(),
                        _ => String::new(),
                    })
                    .collect();
                columns.push(FitsColumn {
                    name: column.name.to_string(),
                    data_type: ColumnDataType::String,
                    repeat: width.max(1),
                    unit: column.unit,
                    data: ColumnData::Text(texts),
                });
            }
            tag => {
                return Err(FitsError::UnsupportedColumn {
                    table: schema.name.to_string(),
                    column: column.name.to_string(),
                    tag,
                })
            }
        }
    }
    Ok(columns)
}

/// Refuse a value that FITS would truncate, or that would read back as
/// something else.
fn check_value(
    schema: &TableSchema,
    column: &ColumnSchema,
    row: usize,
    value: &Value,
) -> Result<(), FitsError> {
    if !value.is_null() {
        codec::check(value, column.tag, Precision::Double).map_err(|source| FitsError::Value {
            table: schema.name.to_string(),
            row,
            column: column.name.to_string(),
            source,
        })?;
    }
    let reason = match value {
        Value::Text(s) if s.ends_with(' ') => Some(TRAILING_SPACES),
        Value::Text(s) if column.nullable && s.is_empty() => {
            Some("empty text reads back as null")
        }
        Value::I32(INT_NULL) if column.nullable => Some("the smallest i32 marks a null integer"),
        Value::F64(f) if column.nullable && f.is_nan() => Some("NaN reads back as null"),
        Value::Complex(c) if column.nullable && c.re.is_nan() && c.im.is_nan() => {
            Some("NaN reads back as null")
        }
        _ => None,
    };
    match reason {
        Some(reason) => Err(lossy(schema.name, row, column.name, reason)),
        None => Ok(()),
    }
}

fn write_table(
    fptr: &mut FitsFile,
    schema: &TableSchema,
    columns: &[FitsColumn],
) -> Result<(), FitsError> {
    let descriptions = columns
        .iter()
        .map(|c| describe(&c.name, c.data_type.clone(), c.repeat))
        .collect::<Result<Vec<_>, _>>()?;

    let hdu = fptr.create_table(schema.name, &descriptions)?;
    let mut num_rows = 0;
    for (i, FitsColumn { name, unit, data, .. }) in columns.iter().enumerate() {
        trace!("Exporting {}.{name}", schema.name);
        num_rows = match data {
            ColumnData::Int(v) => {
                hdu.write_col(fptr, name.as_str(), v)?;
                v.len()
            }
            ColumnData::Double(v) => {
                hdu.write_col(fptr, name.as_str(), v)?;
                v.len()
            }
            ColumnData::Text(v) => {
                hdu.write_col(fptr, name.as_str(), v)?;
                v.len()
            }
        };
        if *unit != Unit::Dimensionless {
            hdu.write_key(fptr, &format!("TUNIT{}", i + 1), unit.symbol())?;
        }
    }
    debug!("Exported {num_rows} rows of {}", schema.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::CodecError,
        schema::{OI_TARGET, REGISTRY},
    };

    #[test]
    fn text_is_never_truncated() {
        let schema = REGISTRY.schema_for(OI_TARGET, 2).unwrap();
        let column = &schema.columns[schema.column_index("TARGET").unwrap()];

        let long = Value::from("x".repeat(40));
        assert!(matches!(
            check_value(schema, column, 0, &long),
            Err(FitsError::Value {
                source: CodecError::TextTooLong { width: 32, len: 40 },
                ..
            })
        ));
        let nul = Value::from("eps\0Eri");
        assert!(matches!(
            check_value(schema, column, 0, &nul),
            Err(FitsError::Value {
                source: CodecError::TextContainsNul,
                ..
            })
        ));
        assert!(check_value(schema, column, 0, &Value::from("x".repeat(32))).is_ok());
    }
}
