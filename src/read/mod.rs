//! Reading documents from the binary container.

pub mod fits;

use hifitime::Epoch;
use log::{debug, trace};
use thiserror::Error;

use crate::{
    codec::{self, ByteReader, CodecError, Endianness, Layout, Precision, Value},
    container::{static_crc, Part, MAGIC, STATIC_CRC_KEY, TRAILER_LEN},
    document::{DraftDocument, Document, Header, TableSource},
    schema::{SchemaError, REGISTRY},
    validate::ValidationReport,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error("Malformed container: {0}")]
    Structural(String),

    #[error("Unsupported NIFITS format version {0}")]
    UnsupportedVersion(u32),

    #[error("Expected a {expected} container, but this is a {found} part")]
    WrongPart { expected: Part, found: Part },

    #[error("The dynamic part was written against a static part with CRC {recorded}, not {actual}")]
    StaticMismatch { recorded: String, actual: String },

    #[error("The decoded document is not valid; {0}")]
    Invalid(ValidationReport),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<CodecError> for ReadError {
    fn from(e: CodecError) -> ReadError {
        ReadError::Structural(e.to_string())
    }
}

// Magic, endianness byte and trailer.
const MIN_LEN: usize = MAGIC.len() + 1 + TRAILER_LEN;

/// Decode any container into a draft, without validating it.
pub fn decode_draft(bytes: &[u8]) -> Result<(Part, DraftDocument), ReadError> {
    if bytes.len() < MIN_LEN {
        return Err(ReadError::Structural(format!(
            "only {} bytes; too short to be a container",
            bytes.len()
        )));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(ReadError::Structural("bad magic".to_string()));
    }
    let endianness = Endianness::from_byte(bytes[MAGIC.len()]).ok_or_else(|| {
        ReadError::Structural(format!("bad endianness marker {:#04x}", bytes[MAGIC.len()]))
    })?;

    // The trailer protects everything, so check it before trusting any of the
    // header.
    let (body, trailer) = bytes.split_at(bytes.len() - TRAILER_LEN);
    let mut trailer = ByteReader::new(
        trailer,
        Layout {
            endianness,
            precision: Precision::default(),
        },
    );
    let recorded = trailer.get_u32()?;
    let actual = crc32fast::hash(body);
    if recorded != actual {
        return Err(ReadError::Structural(format!(
            "checksum mismatch (recorded {recorded:08x}, computed {actual:08x})"
        )));
    }

    let mut input = ByteReader::new(
        body,
        Layout {
            endianness,
            precision: Precision::default(),
        },
    );
    input.take(MAGIC.len() + 1)?;
    let format_version = input.get_u32()?;
    if !REGISTRY.supports(format_version) {
        return Err(ReadError::UnsupportedVersion(format_version));
    }
    let part_byte = input.get_u8()?;
    let part = Part::from_byte(part_byte)
        .ok_or_else(|| ReadError::Structural(format!("unknown part kind {part_byte}")))?;
    let width = input.get_u8()?;
    let precision = Precision::from_width(width)
        .ok_or_else(|| ReadError::Structural(format!("unknown real width {width}")))?;
    let layout = Layout {
        endianness,
        precision,
    };
    input.set_layout(layout);

    let centuries = input.get_i16()?;
    let nanoseconds = input.get_u64()?;
    let header = Header {
        format_version,
        layout,
        epoch: Epoch::from_tai_parts(centuries, nanoseconds),
        units: input.get_text()?,
        revision: input.get_u32()?,
    };
    debug!(
        "Reading a {part} container: version {format_version}, revision {}, {endianness:?} endian",
        header.revision
    );

    let mut draft = DraftDocument::with_registry(header, &REGISTRY)?;
    let num_provenance = input.get_u32()?;
    for _ in 0..num_provenance {
        let key = input.get_text()?;
        let value = input.get_text()?;
        draft.set_provenance(key, value);
    }

    let num_tables = input.get_u32()?;
    for _ in 0..num_tables {
        read_table(&mut input, &mut draft, format_version)?;
    }

    match input.remaining() {
        0 => Ok((part, draft)),
        n => Err(ReadError::Structural(format!(
            "{n} unexpected bytes before the trailer"
        ))),
    }
}

fn read_table(
    input: &mut ByteReader,
    draft: &mut DraftDocument,
    version: u32,
) -> Result<(), ReadError> {
    let name = input.get_text()?;
    let schema = match REGISTRY.schema_for(&name, version) {
        Ok(s) => s,
        Err(SchemaError::UnknownTable { .. }) => {
            return Err(ReadError::Structural(format!(
                "table {name} is not part of version {version}"
            )))
        }
        Err(e) => return Err(e.into()),
    };
    if draft.table(schema.name).is_some() {
        return Err(ReadError::Structural(format!("table {name} appears twice")));
    }
    let num_rows = input.get_u64()?;
    let fingerprint = input.get_u32()?;
    if fingerprint != schema.fingerprint() {
        return Err(ReadError::Structural(format!(
            "table {name} has fingerprint {fingerprint:08x}; version {version} expects {:08x}",
            schema.fingerprint()
        )));
    }
    // Every value takes at least one byte, which bounds any honest row count.
    let num_rows = usize::try_from(num_rows)
        .ok()
        .filter(|&n| n <= input.remaining())
        .ok_or_else(|| {
            ReadError::Structural(format!("table {name} claims {num_rows} rows"))
        })?;

    let mut columns: Vec<std::vec::IntoIter<Value>> = Vec::with_capacity(schema.columns.len());
    for column in &schema.columns {
        trace!("Reading {name}.{} ({})", column.name, column.tag);
        let mut values = Vec::with_capacity(num_rows);
        for _ in 0..num_rows {
            if column.nullable {
                match input.get_u8()? {
                    0 => {
                        values.push(Value::Null);
                        continue;
                    }
                    1 => (),
                    b => {
                        return Err(ReadError::Structural(format!(
                            "bad presence byte {b} in {name}.{}",
                            column.name
                        )))
                    }
                }
            }
            values.push(codec::decode(input, column.tag)?);
        }
        columns.push(values.into_iter());
    }

    let rows = (0..num_rows)
        .map(|_| columns.iter_mut().flat_map(|c| c.next()).collect())
        .collect();
    draft.add_table(schema.name, rows)?;
    debug!("Read {num_rows} rows of {name}");
    Ok(())
}

/// Decode a complete container into a sealed document.
pub fn decode(bytes: &[u8]) -> Result<Document, ReadError> {
    let (part, draft) = decode_draft(bytes)?;
    if part != Part::Complete {
        return Err(ReadError::WrongPart {
            expected: Part::Complete,
            found: part,
        });
    }
    seal(draft)
}

/// Decode a static part and the dynamic part written with it into one sealed
/// document.
pub fn decode_merged(static_part: &[u8], dynamic_part: &[u8]) -> Result<Document, ReadError> {
    let (part, static_draft) = decode_draft(static_part)?;
    if part != Part::Static {
        return Err(ReadError::WrongPart {
            expected: Part::Static,
            found: part,
        });
    }
    let (part, dynamic_draft) = decode_draft(dynamic_part)?;
    if part != Part::Dynamic {
        return Err(ReadError::WrongPart {
            expected: Part::Dynamic,
            found: part,
        });
    }

    let actual = static_crc(static_part);
    let recorded = dynamic_draft
        .provenance()
        .get(STATIC_CRC_KEY)
        .cloned()
        .ok_or_else(|| {
            ReadError::Structural(format!("the dynamic part has no {STATIC_CRC_KEY}"))
        })?;
    if recorded != actual {
        return Err(ReadError::StaticMismatch { recorded, actual });
    }

    let (s, d) = (static_draft.header(), dynamic_draft.header());
    if s.format_version != d.format_version
        || s.revision != d.revision
        || s.units != d.units
        || s.epoch.to_tai_parts() != d.epoch.to_tai_parts()
    {
        return Err(ReadError::Structural(
            "the static and dynamic parts have different headers".to_string(),
        ));
    }

    let mut merged = DraftDocument::with_registry(d.clone(), &REGISTRY)?;
    for (key, value) in dynamic_draft.provenance() {
        if key != STATIC_CRC_KEY {
            merged.set_provenance(key.clone(), value.clone());
        }
    }
    for table in static_draft.tables().iter().chain(dynamic_draft.tables()) {
        merged.add_table(table.name(), table.rows().to_vec())?;
    }
    seal(merged)
}

fn seal(draft: DraftDocument) -> Result<Document, ReadError> {
    draft
        .seal()
        .map_err(|rejected| ReadError::Invalid(rejected.report))
}
