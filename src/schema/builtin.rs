//! Table definitions for each format version.
//!
//! Column names follow OIFITS conventions where a classic table has an
//! equivalent column.

use super::{
    ColumnSchema as C, TableKind, TableSchema, Unit, OI_ARRAY, OI_ARRAY_MOTION, OI_COVARIANCE,
    OI_INPUT_PHASOR, OI_INTENSITY, OI_KERNEL_COVARIANCE, OI_KERNEL_INTENSITY, OI_KERNEL_MATRIX,
    OI_TARGET, OI_TRANSFER_MATRIX, OI_WAVELENGTH,
};
use crate::codec::TypeTag::*;

fn target() -> TableSchema {
    TableSchema::new(
        OI_TARGET,
        TableKind::Dynamic,
        vec![
            C::new("TARGET_ID", I32, Unit::Dimensionless),
            C::new("TARGET", FixedText(32), Unit::Dimensionless),
            C::new("RAEP0", F64, Unit::Degree),
            C::new("DECEP0", F64, Unit::Degree),
            C::new("EQUINOX", Real, Unit::Year),
            C::new("RA_ERR", Real, Unit::Degree).nullable(),
            C::new("DEC_ERR", Real, Unit::Degree).nullable(),
            C::new("SYSVEL", Real, Unit::MetrePerSecond).nullable(),
            C::new("PMRA", F64, Unit::DegreePerYear),
            C::new("PMDEC", F64, Unit::DegreePerYear),
            C::new("PMRA_ERR", Real, Unit::DegreePerYear).nullable(),
            C::new("PMDEC_ERR", Real, Unit::DegreePerYear).nullable(),
            C::new("PARALLAX", F64, Unit::Degree),
            C::new("PARA_ERR", Real, Unit::Degree).nullable(),
            C::new("SPECTYP", FixedText(16), Unit::Dimensionless).nullable(),
        ],
    )
}

fn wavelength() -> TableSchema {
    TableSchema::new(
        OI_WAVELENGTH,
        TableKind::Static,
        vec![
            C::new("WAVE_ID", I32, Unit::Dimensionless),
            C::new("EFF_WAVE", F64, Unit::Metre),
            C::new("EFF_BAND", F64, Unit::Metre),
        ],
    )
}

/// Classic OIFITS geometry: every station is fixed.
fn array_static() -> TableSchema {
    TableSchema::new(
        OI_ARRAY,
        TableKind::Static,
        vec![
            C::new("STA_INDEX", I32, Unit::Dimensionless),
            C::new("TEL_NAME", FixedText(16), Unit::Dimensionless),
            C::new("STA_NAME", FixedText(16), Unit::Dimensionless),
            C::new("DIAMETER", Real, Unit::Metre),
            C::new("STAXYZ_X", F64, Unit::Metre),
            C::new("STAXYZ_Y", F64, Unit::Metre),
            C::new("STAXYZ_Z", F64, Unit::Metre),
        ],
    )
}

/// A null `INTERP` marks a fixed station; otherwise the positions live in
/// `OI_ARRAY_MOTION` and `STAXYZ_*` are null.
fn array_extended() -> TableSchema {
    TableSchema::new(
        OI_ARRAY,
        TableKind::Static,
        vec![
            C::new("STA_INDEX", I32, Unit::Dimensionless),
            C::new("TEL_NAME", FixedText(16), Unit::Dimensionless),
            C::new("STA_NAME", FixedText(16), Unit::Dimensionless),
            C::new("DIAMETER", Real, Unit::Metre),
            C::new("STAXYZ_X", F64, Unit::Metre).nullable(),
            C::new("STAXYZ_Y", F64, Unit::Metre).nullable(),
            C::new("STAXYZ_Z", F64, Unit::Metre).nullable(),
            C::new("INTERP", FixedText(8), Unit::Dimensionless).nullable(),
        ],
    )
}

fn array_motion() -> TableSchema {
    TableSchema::new(
        OI_ARRAY_MOTION,
        TableKind::Dynamic,
        vec![
            C::new("STA_INDEX", I32, Unit::Dimensionless),
            C::new("TIME", Timestamp, Unit::Second),
            C::new("POS_X", F64, Unit::Metre),
            C::new("POS_Y", F64, Unit::Metre),
            C::new("POS_Z", F64, Unit::Metre),
            C::new("VEL_X", F64, Unit::MetrePerSecond).nullable(),
            C::new("VEL_Y", F64, Unit::MetrePerSecond).nullable(),
            C::new("VEL_Z", F64, Unit::MetrePerSecond).nullable(),
        ],
    )
}

fn transfer_matrix() -> TableSchema {
    TableSchema::new(
        OI_TRANSFER_MATRIX,
        TableKind::Static,
        vec![
            C::new("STA_INDEX", I32, Unit::Dimensionless),
            C::new("OUT_PORT", I32, Unit::Dimensionless),
            C::new("WAVE_ID", I32, Unit::Dimensionless),
            C::new("VALUE", Complex, Unit::Dimensionless),
        ],
    )
}

fn kernel_matrix() -> TableSchema {
    TableSchema::new(
        OI_KERNEL_MATRIX,
        TableKind::Static,
        vec![
            C::new("KERNEL", I32, Unit::Dimensionless),
            C::new("OUT_PORT", I32, Unit::Dimensionless),
            C::new("COEFF", F64, Unit::Dimensionless),
        ],
    )
}

fn input_phasor_columns() -> Vec<C> {
    vec![
        C::new("TIME", Timestamp, Unit::Second),
        C::new("INT_TIME", Real, Unit::Second),
        C::new("STA_INDEX", I32, Unit::Dimensionless),
        C::new("WAVE_ID", I32, Unit::Dimensionless),
        C::new("POLARIZ", FixedText(4), Unit::Dimensionless),
        C::new("REPRES", FixedText(8), Unit::Dimensionless),
        C::new("PHASOR", Complex, Unit::Dimensionless).nullable(),
        C::new("OPL_AIR", F64, Unit::Metre).nullable(),
        C::new("OPL_GLASS", F64, Unit::Metre).nullable(),
        C::new("OPL_GAS", F64, Unit::Metre).nullable(),
    ]
}

fn input_phasor() -> TableSchema {
    TableSchema::new(OI_INPUT_PHASOR, TableKind::Dynamic, input_phasor_columns())
}

/// Adds the target being observed and the collecting area of the input.
fn input_phasor_extended() -> TableSchema {
    let mut columns = input_phasor_columns();
    columns.push(C::new("TARGET_ID", I32, Unit::Dimensionless).nullable());
    columns.push(C::new("ARRCOL", Real, Unit::SquareMetre).nullable());
    TableSchema::new(OI_INPUT_PHASOR, TableKind::Dynamic, columns)
}

fn intensity() -> TableSchema {
    TableSchema::new(
        OI_INTENSITY,
        TableKind::Dynamic,
        vec![
            C::new("INT_INDEX", I32, Unit::Dimensionless),
            C::new("TIME", Timestamp, Unit::Second),
            C::new("INT_TIME", Real, Unit::Second),
            C::new("TARGET_ID", I32, Unit::Dimensionless),
            C::new("OUT_PORT", I32, Unit::Dimensionless),
            C::new("WAVE_ID", I32, Unit::Dimensionless),
            C::new("VALUE", Real, Unit::Adu),
            C::new("VARIANCE", Real, Unit::AduSquared),
        ],
    )
}

fn covariance() -> TableSchema {
    TableSchema::new(
        OI_COVARIANCE,
        TableKind::Dynamic,
        vec![
            C::new("INDEX_A", I32, Unit::Dimensionless),
            C::new("INDEX_B", I32, Unit::Dimensionless),
            C::new("COVAR", Real, Unit::AduSquared),
        ],
    )
}

/// Outputs combined through `OI_KERNEL_MATRIX`.
fn kernel_intensity() -> TableSchema {
    TableSchema::new(
        OI_KERNEL_INTENSITY,
        TableKind::Dynamic,
        vec![
            C::new("KI_INDEX", I32, Unit::Dimensionless),
            C::new("TIME", Timestamp, Unit::Second),
            C::new("INT_TIME", Real, Unit::Second),
            C::new("TARGET_ID", I32, Unit::Dimensionless),
            C::new("KERNEL", I32, Unit::Dimensionless),
            C::new("WAVE_ID", I32, Unit::Dimensionless),
            C::new("VALUE", Real, Unit::Adu),
            C::new("VARIANCE", Real, Unit::AduSquared),
        ],
    )
}

fn kernel_covariance() -> TableSchema {
    TableSchema::new(
        OI_KERNEL_COVARIANCE,
        TableKind::Dynamic,
        vec![
            C::new("INDEX_A", I32, Unit::Dimensionless),
            C::new("INDEX_B", I32, Unit::Dimensionless),
            C::new("COVAR", Real, Unit::AduSquared),
        ],
    )
}

pub(super) fn version_1() -> Vec<TableSchema> {
    vec![
        target(),
        array_static(),
        wavelength(),
        transfer_matrix(),
        input_phasor(),
        intensity(),
        covariance(),
    ]
}

pub(super) fn version_2() -> Vec<TableSchema> {
    vec![
        target(),
        array_extended(),
        array_motion(),
        wavelength(),
        transfer_matrix(),
        kernel_matrix(),
        input_phasor_extended(),
        intensity(),
        covariance(),
        kernel_intensity(),
        kernel_covariance(),
    ]
}
