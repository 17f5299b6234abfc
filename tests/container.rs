//! Binary container: round trips, framing errors, version negotiation and the
//! static/dynamic split.

mod common;

use common::*;
use nifits::{
    codec::{CodecError, Endianness, Layout, Precision},
    container::{Part, STATIC_CRC_KEY},
    read::{self, ReadError},
    schema::{SchemaError, OI_ARRAY_MOTION, OI_KERNEL_MATRIX},
    tables::{ArrayRow, KernelMatrixEntry},
    write::{self, WriteError, WriteOptions},
    Document, TableSource, Vector3,
};

fn observation() -> Document {
    observation_draft().seal().unwrap()
}

/// Replace the trailer so that a deliberately edited container still passes
/// its checksum.
fn fix_trailer(bytes: &mut Vec<u8>) {
    let body = bytes.len() - 4;
    bytes.truncate(body);
    let crc = crc32fast::hash(bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
}

#[test]
fn decode_inverts_encode() {
    for document in [observation(), kernel_draft().seal().unwrap()] {
        let bytes = write::encode(&document).unwrap();
        let decoded = read::decode(&bytes).unwrap();
        assert_eq!(decoded, document);
        assert_eq!(decoded.catalog(), document.catalog());
        assert_eq!(write::encode(&decoded).unwrap(), bytes);
    }
}

#[test]
fn layout_can_be_overridden() {
    let document = observation();
    let options = WriteOptions {
        layout: Some(Layout {
            endianness: Endianness::Big,
            precision: Precision::Single,
        }),
        ..Default::default()
    };
    let bytes = write::encode_with(&document, &options).unwrap();
    assert_eq!(bytes[8], b'B');
    let decoded = read::decode(&bytes).unwrap();
    assert_eq!(decoded.header().layout.endianness, Endianness::Big);
    assert_eq!(decoded.catalog(), document.catalog());
}

#[test]
fn lossy_single_precision_is_refused() {
    let mut draft = instrument_draft();
    draft
        .add_records(&[ArrayRow::fixed(20, "AT1", "A0", 1.8, Vector3::default())])
        .unwrap();
    let document = draft.seal().unwrap();
    let options = WriteOptions {
        layout: Some(Layout {
            precision: Precision::Single,
            ..Default::default()
        }),
        ..Default::default()
    };
    let result = write::encode_with(&document, &options);
    assert!(matches!(
        result,
        Err(WriteError::Value {
            column: "DIAMETER",
            source: CodecError::LossyReal(_),
            ..
        })
    ));
}

#[test]
fn unknown_versions_are_reported_as_such() {
    let mut bytes = write::encode(&observation()).unwrap();
    bytes[9..13].copy_from_slice(&99u32.to_le_bytes());
    fix_trailer(&mut bytes);
    assert_eq!(read::decode(&bytes).unwrap_err(), ReadError::UnsupportedVersion(99));
}

#[test]
fn malformed_containers_are_structural_errors() {
    let bytes = write::encode(&observation()).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    let mut flipped = bytes.clone();
    let middle = flipped.len() / 2;
    flipped[middle] ^= 0xff;
    let truncated = bytes[..bytes.len() - 10].to_vec();
    let mut trailing = bytes.clone();
    trailing.insert(trailing.len() - 4, 0);
    fix_trailer(&mut trailing);
    let mut bad_fingerprint = bytes.clone();
    // The first table (OI_TARGET) starts after the fixed header and the
    // provenance; its fingerprint follows the name and row count.
    let name_at = find(&bad_fingerprint, b"OI_TARGET");
    bad_fingerprint[name_at + "OI_TARGET".len() + 8] ^= 0x01;
    fix_trailer(&mut bad_fingerprint);

    for (what, bytes) in [
        ("magic", bad_magic),
        ("checksum", flipped),
        ("truncated", truncated),
        ("trailing bytes", trailing),
        ("fingerprint", bad_fingerprint),
        ("empty", vec![]),
    ] {
        match read::decode(&bytes) {
            Err(ReadError::Structural(_)) => (),
            other => panic!("{what}: expected a structural error, got {other:?}"),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .unwrap()
}

#[test]
fn old_versions_are_written_when_representable() {
    // Only fixed stations: representable in version 1.
    let mut draft = nifits::begin();
    draft
        .add_records(&[
            ArrayRow::fixed(1, "UT1", "U1", 8.0, Vector3::default()),
            ArrayRow::fixed(2, "UT2", "U2", 8.0, Vector3::new(56.0, 24.0, 0.0)),
        ])
        .unwrap();
    draft.add_table(OI_KERNEL_MATRIX, vec![]).unwrap();
    let document = draft.seal().unwrap();

    let options = WriteOptions {
        format_version: Some(1),
        ..Default::default()
    };
    let bytes = write::encode_with(&document, &options).unwrap();
    let decoded = read::decode(&bytes).unwrap();
    assert_eq!(decoded.header().format_version, 1);
    assert_eq!(decoded.catalog().elements(), document.catalog().elements());
    assert!(decoded.table(OI_KERNEL_MATRIX).is_none());
}

#[test]
fn new_features_block_old_versions() {
    let options = WriteOptions {
        format_version: Some(1),
        ..Default::default()
    };

    // Moving stations need OI_ARRAY.INTERP.
    let result = write::encode_with(&observation(), &options);
    assert!(matches!(
        result,
        Err(WriteError::Schema(SchemaError::NotRepresentable { version: 1, .. }))
    ));

    // A non-empty table version 1 doesn't have at all.
    let mut draft = nifits::begin();
    draft
        .add_records(&[ArrayRow::fixed(1, "UT1", "U1", 8.0, Vector3::default())])
        .unwrap();
    draft
        .add_records(&[KernelMatrixEntry {
            kernel: 0,
            output: 0,
            coefficient: 1.0,
        }])
        .unwrap();
    let result = write::encode_with(&draft.seal().unwrap(), &options);
    assert_eq!(
        result,
        Err(WriteError::Schema(SchemaError::NotRepresentable {
            table: OI_KERNEL_MATRIX.to_string(),
            version: 1,
            column: None
        }))
    );
}

#[test]
fn split_parts_merge_back() {
    let document = observation();
    let (static_part, dynamic_part) =
        write::encode_split(&document, &WriteOptions::default()).unwrap();

    let (part, static_draft) = read::decode_draft(&static_part).unwrap();
    assert_eq!(part, Part::Static);
    assert!(static_draft.table(OI_ARRAY_MOTION).is_none());

    // The dynamic part records the static part's trailer.
    let (_, dynamic_draft) = read::decode_draft(&dynamic_part).unwrap();
    let trailer = &static_part[static_part.len() - 4..];
    let trailer = u32::from_le_bytes(trailer.try_into().unwrap());
    assert_eq!(
        dynamic_draft.provenance()[STATIC_CRC_KEY],
        format!("{trailer:08x}")
    );

    let merged = read::decode_merged(&static_part, &dynamic_part).unwrap();
    assert_eq!(merged, document);

    assert_eq!(
        read::decode(&static_part).unwrap_err(),
        ReadError::WrongPart {
            expected: Part::Complete,
            found: Part::Static
        }
    );
}

#[test]
fn dynamic_parts_only_merge_with_their_own_static_part() {
    let (_, dynamic_part) = write::encode_split(&observation(), &WriteOptions::default()).unwrap();

    let mut other = observation_draft();
    other.set_provenance("PIPELINE", "a different one");
    let (other_static, _) =
        write::encode_split(&other.seal().unwrap(), &WriteOptions::default()).unwrap();

    assert!(matches!(
        read::decode_merged(&other_static, &dynamic_part),
        Err(ReadError::StaticMismatch { .. })
    ));

    // Same for a different layout, where the trailer is big-endian.
    let options = WriteOptions {
        layout: Some(Layout {
            endianness: Endianness::Big,
            ..Default::default()
        }),
        ..Default::default()
    };
    let (big_static, big_dynamic) = write::encode_split(&observation(), &options).unwrap();
    assert!(read::decode_merged(&big_static, &big_dynamic).is_ok());
    assert!(matches!(
        read::decode_merged(&big_static, &dynamic_part),
        Err(ReadError::StaticMismatch { .. })
    ));
}

#[test]
fn well_formed_but_inconsistent_containers_are_invalid() {
    let mut bytes = write::encode(&observation()).unwrap();
    // OI_COVARIANCE is last, with one row: INDEX_A, INDEX_B, then COVAR as a
    // double, then the trailer. Point INDEX_B at INDEX_A.
    let index_b = bytes.len() - 4 - 8 - 4;
    bytes[index_b..index_b + 4].copy_from_slice(&0i32.to_le_bytes());
    fix_trailer(&mut bytes);

    match read::decode(&bytes) {
        Err(ReadError::Invalid(report)) => assert_eq!(report.len(), 1),
        other => panic!("expected an invalid document, got {other:?}"),
    }
    // Without sealing, the draft is still available.
    let (part, draft) = read::decode_draft(&bytes).unwrap();
    assert_eq!(part, Part::Complete);
    assert_eq!(draft.validate().len(), 1);
}
