//! Writing sealed documents to the binary container.

pub mod fits;

use std::collections::BTreeMap;

use log::{debug, trace};
use thiserror::Error;

use crate::{
    codec::{self, ByteWriter, CodecError, Layout, Precision, Value},
    container::{static_crc, Part, MAGIC, STATIC_CRC_KEY},
    document::{Document, Table, TableSource},
    schema::{RowProblem, SchemaError, TableKind, TableSchema},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteError {
    #[error("Couldn't encode {table} row {row} column {column}: {source}")]
    Value {
        table: &'static str,
        row: usize,
        column: &'static str,
        source: CodecError,
    },

    #[error("Couldn't encode the header: {0}")]
    Header(#[from] CodecError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Which tables go into a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableSelection {
    #[default]
    All,
    StaticOnly,
    DynamicOnly,
}

impl TableSelection {
    fn part(self) -> Part {
        match self {
            TableSelection::All => Part::Complete,
            TableSelection::StaticOnly => Part::Static,
            TableSelection::DynamicOnly => Part::Dynamic,
        }
    }

    fn includes(self, kind: TableKind) -> bool {
        match self {
            TableSelection::All => true,
            TableSelection::StaticOnly => kind == TableKind::Static,
            TableSelection::DynamicOnly => kind == TableKind::Dynamic,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Write under this format version instead of the document's own. Fails
    /// if the document uses anything the older version can't represent.
    pub format_version: Option<u32>,

    /// Override the document's declared endianness and precision.
    pub layout: Option<Layout>,

    pub selection: TableSelection,
}

/// Encode a document exactly as it declares itself.
pub fn encode(document: &Document) -> Result<Vec<u8>, WriteError> {
    encode_with(document, &WriteOptions::default())
}

pub fn encode_with(document: &Document, options: &WriteOptions) -> Result<Vec<u8>, WriteError> {
    encode_part(document, options, None)
}

/// Encode a document as a static part and a dynamic part. The dynamic part
/// records the checksum of the static part, so they can only be merged back
/// together with each other.
pub fn encode_split(
    document: &Document,
    options: &WriteOptions,
) -> Result<(Vec<u8>, Vec<u8>), WriteError> {
    let static_options = WriteOptions {
        selection: TableSelection::StaticOnly,
        ..options.clone()
    };
    let static_part = encode_part(document, &static_options, None)?;

    let dynamic_options = WriteOptions {
        selection: TableSelection::DynamicOnly,
        ..options.clone()
    };
    let crc = static_crc(&static_part);
    debug!("Static part is {} bytes (CRC {crc})", static_part.len());
    let dynamic_part = encode_part(document, &dynamic_options, Some(crc))?;
    Ok((static_part, dynamic_part))
}

fn encode_part(
    document: &Document,
    options: &WriteOptions,
    static_crc: Option<String>,
) -> Result<Vec<u8>, WriteError> {
    let header = document.header();
    let version = options.format_version.unwrap_or(header.format_version);
    let layout = options.layout.unwrap_or(header.layout);
    let registry = document.registry();
    if !registry.supports(version) {
        return Err(SchemaError::UnsupportedVersion(version).into());
    }

    // Work out what goes in before writing anything.
    let mut tables = vec![];
    for table in document.tables() {
        if !options.selection.includes(table.schema().kind) {
            continue;
        }
        if version == header.format_version {
            tables.push((table.schema(), table.rows().to_vec()));
            continue;
        }
        match registry.schema_for(table.name(), version) {
            Ok(schema) => tables.push((schema, downgrade(table, schema, version)?)),
            Err(SchemaError::UnknownTable { .. }) if table.is_empty() => {
                debug!("{} doesn't exist in version {version}; skipping it (empty)", table.name());
            }
            Err(SchemaError::UnknownTable { .. }) => {
                return Err(SchemaError::NotRepresentable {
                    table: table.name().to_string(),
                    version,
                    column: None,
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut provenance = document.provenance().clone();
    if let Some(crc) = static_crc {
        provenance.insert(STATIC_CRC_KEY.to_string(), crc);
    }

    let mut out = ByteWriter::new(layout);
    out.put_bytes(MAGIC);
    out.put_u8(layout.endianness.as_byte());
    out.put_u32(version);
    out.put_u8(options.selection.part().as_byte());
    out.put_u8(layout.precision.width());
    let (centuries, nanoseconds) = header.epoch.to_tai_parts();
    out.put_i16(centuries);
    out.put_u64(nanoseconds);
    out.put_text(&header.units)?;
    out.put_u32(header.revision);
    put_provenance(&mut out, &provenance)?;

    out.put_u32(count(tables.len())?);
    for (schema, rows) in &tables {
        put_table(&mut out, schema, rows)?;
    }

    let crc = crc32fast::hash(out.bytes());
    out.put_u32(crc);
    debug!(
        "Encoded {} tables as a {} container ({} bytes, version {version})",
        tables.len(),
        options.selection.part(),
        out.bytes().len()
    );
    Ok(out.into_bytes())
}

/// Re-shape a table's rows for an older schema of the same table.
fn downgrade(
    table: &Table,
    schema: &'static TableSchema,
    version: u32,
) -> Result<Vec<Vec<Value>>, SchemaError> {
    let current = table.schema();
    let mut rows = Vec::with_capacity(table.len());
    for values in table.rows() {
        let named = current
            .columns
            .iter()
            .map(|c| c.name)
            .zip(values.iter().cloned())
            .collect();
        let row = schema.row_from_named(version, named)?;
        // Reals are checked against the output precision by the encoder.
        schema.check_row(&row, Precision::Double).map_err(|problem| match problem {
            // A column the old version requires but this document left null.
            RowProblem::Null { column } => SchemaError::NotRepresentable {
                table: table.name().to_string(),
                version,
                column: Some(column.to_string()),
            },
            problem => SchemaError::SchemaMismatch {
                table: table.name().to_string(),
                row: rows.len(),
                problem,
            },
        })?;
        rows.push(row);
    }
    trace!("Downgraded {} rows of {} to version {version}", rows.len(), table.name());
    Ok(rows)
}

fn count(n: usize) -> Result<u32, CodecError> {
    n.try_into().map_err(|_| CodecError::LengthOverflow(n))
}

fn put_provenance(
    out: &mut ByteWriter,
    provenance: &BTreeMap<String, String>,
) -> Result<(), CodecError> {
    out.put_u32(count(provenance.len())?);
    for (key, value) in provenance {
        out.put_text(key)?;
        out.put_text(value)?;
    }
    Ok(())
}

fn put_table(
    out: &mut ByteWriter,
    schema: &'static TableSchema,
    rows: &[Vec<Value>],
) -> Result<(), WriteError> {
    out.put_text(schema.name)?;
    out.put_u64(rows.len() as u64);
    out.put_u32(schema.fingerprint());
    for (i_col, column) in schema.columns.iter().enumerate() {
        trace!("Writing {}.{} ({})", schema.name, column.name, column.tag);
        for (i_row, row) in rows.iter().enumerate() {
            let value = &row[i_col];
            if column.nullable {
                out.put_u8(u8::from(!value.is_null()));
                if value.is_null() {
                    continue;
                }
            }
            codec::encode(value, column.tag, out).map_err(|source| WriteError::Value {
                table: schema.name,
                row: i_row,
                column: column.name,
                source,
            })?;
        }
    }
    debug!("Wrote {} rows of {}", rows.len(), schema.name);
    Ok(())
}
