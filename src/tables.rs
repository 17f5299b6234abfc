//! Typed rows for each registered table.
//!
//! Tables are stored and transported as generic rows of [`Value`]s checked
//! against a [`TableSchema`]. The types here are the views producers build
//! rows from and consumers read rows into. Columns are looked up by name, so
//! the same type reads every format version of its table.

use num_complex::Complex64;
use thiserror::Error;

use crate::{
    codec::Value,
    geometry::{Interpolation, PositionSample, Vector3},
    schema::{
        TableSchema, OI_ARRAY, OI_ARRAY_MOTION, OI_COVARIANCE, OI_INPUT_PHASOR, OI_INTENSITY,
        OI_KERNEL_COVARIANCE, OI_KERNEL_INTENSITY, OI_KERNEL_MATRIX, OI_TARGET,
        OI_TRANSFER_MATRIX, OI_WAVELENGTH,
    },
};

/// The speed of light in vacuum \[metres/second\].
pub const VEL_C: f64 = 299_792_458.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("column {0} is missing or null")]
    Missing(&'static str),

    #[error("column {column} holds a {found}, which doesn't fit this record")]
    WrongType {
        column: &'static str,
        found: &'static str,
    },

    #[error("column {column} holds an unknown tag '{tag}'")]
    InvalidTag { column: &'static str, tag: String },

    #[error("{0}")]
    Inconsistent(&'static str),
}

/// A schema-checked row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    schema: &'a TableSchema,
    values: &'a [Value],
}

impl<'a> RowView<'a> {
    pub fn new(schema: &'a TableSchema, values: &'a [Value]) -> RowView<'a> {
        RowView { schema, values }
    }

    /// The value of `column`, or `None` when the column is null or this
    /// version of the table doesn't have it.
    pub fn get(&self, column: &'static str) -> Option<&'a Value> {
        self.schema
            .column_index(column)
            .and_then(|i| self.values.get(i))
            .filter(|v| !v.is_null())
    }

    fn required(&self, column: &'static str) -> Result<&'a Value, RecordError> {
        self.get(column).ok_or(RecordError::Missing(column))
    }

    pub fn i32(&self, column: &'static str) -> Result<i32, RecordError> {
        match self.required(column)? {
            Value::I32(v) => Ok(*v),
            v => Err(wrong_type(column, v)),
        }
    }

    pub fn opt_i32(&self, column: &'static str) -> Result<Option<i32>, RecordError> {
        match self.get(column) {
            None => Ok(None),
            Some(_) => self.i32(column).map(Some),
        }
    }

    pub fn f64(&self, column: &'static str) -> Result<f64, RecordError> {
        match self.required(column)? {
            Value::F64(v) | Value::Timestamp(v) => Ok(*v),
            v => Err(wrong_type(column, v)),
        }
    }

    pub fn opt_f64(&self, column: &'static str) -> Result<Option<f64>, RecordError> {
        match self.get(column) {
            None => Ok(None),
            Some(_) => self.f64(column).map(Some),
        }
    }

    pub fn complex(&self, column: &'static str) -> Result<Complex64, RecordError> {
        match self.required(column)? {
            Value::Complex(c) => Ok(*c),
            v => Err(wrong_type(column, v)),
        }
    }

    pub fn opt_complex(&self, column: &'static str) -> Result<Option<Complex64>, RecordError> {
        match self.get(column) {
            None => Ok(None),
            Some(_) => self.complex(column).map(Some),
        }
    }

    pub fn text(&self, column: &'static str) -> Result<&'a str, RecordError> {
        match self.required(column)? {
            Value::Text(s) => Ok(s.as_str()),
            v => Err(wrong_type(column, v)),
        }
    }

    pub fn opt_text(&self, column: &'static str) -> Result<Option<&'a str>, RecordError> {
        match self.get(column) {
            None => Ok(None),
            Some(_) => self.text(column).map(Some),
        }
    }

    /// Three columns that are either all present or all null.
    fn opt_vector(
        &self,
        columns: [&'static str; 3],
    ) -> Result<Option<Vector3>, RecordError> {
        let [x, y, z] = columns;
        match (self.opt_f64(x)?, self.opt_f64(y)?, self.opt_f64(z)?) {
            (Some(x), Some(y), Some(z)) => Ok(Some(Vector3::new(x, y, z))),
            (None, None, None) => Ok(None),
            _ => Err(RecordError::Inconsistent(
                "vector components must be all present or all null",
            )),
        }
    }
}

fn wrong_type(column: &'static str, v: &Value) -> RecordError {
    RecordError::WrongType {
        column,
        found: v.kind(),
    }
}

/// A row type of a registered table.
pub trait TableRecord: Sized {
    const TABLE: &'static str;

    /// Column name/value pairs. Columns that aren't listed are null.
    fn to_named(&self) -> Vec<(&'static str, Value)>;

    fn from_row(row: &RowView) -> Result<Self, RecordError>;
}

/// An observed source (`OI_TARGET`).
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: i32,
    pub name: String,
    /// Right ascension at the mean equinox \[degrees\]
    pub ra: f64,
    /// Declination at the mean equinox \[degrees\]
    pub dec: f64,
    /// \[years\]
    pub equinox: f64,
    pub ra_err: Option<f64>,
    pub dec_err: Option<f64>,
    /// Systemic radial velocity \[metres/second\]
    pub sysvel: Option<f64>,
    /// Proper motion \[degrees/year\]
    pub pmra: f64,
    pub pmdec: f64,
    pub pmra_err: Option<f64>,
    pub pmdec_err: Option<f64>,
    /// \[degrees\]
    pub parallax: f64,
    pub para_err: Option<f64>,
    pub spectral_type: Option<String>,
}

impl Target {
    /// A J2000 target with no proper motion, parallax or uncertainties.
    pub fn new(id: i32, name: &str, ra: f64, dec: f64) -> Target {
        Target {
            id,
            name: name.to_string(),
            ra,
            dec,
            equinox: 2000.0,
            ra_err: None,
            dec_err: None,
            sysvel: None,
            pmra: 0.0,
            pmdec: 0.0,
            pmra_err: None,
            pmdec_err: None,
            parallax: 0.0,
            para_err: None,
            spectral_type: None,
        }
    }
}

impl TableRecord for Target {
    const TABLE: &'static str = OI_TARGET;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("TARGET_ID", self.id.into()),
            ("TARGET", self.name.as_str().into()),
            ("RAEP0", self.ra.into()),
            ("DECEP0", self.dec.into()),
            ("EQUINOX", self.equinox.into()),
            ("RA_ERR", self.ra_err.into()),
            ("DEC_ERR", self.dec_err.into()),
            ("SYSVEL", self.sysvel.into()),
            ("PMRA", self.pmra.into()),
            ("PMDEC", self.pmdec.into()),
            ("PMRA_ERR", self.pmra_err.into()),
            ("PMDEC_ERR", self.pmdec_err.into()),
            ("PARALLAX", self.parallax.into()),
            ("PARA_ERR", self.para_err.into()),
            ("SPECTYP", self.spectral_type.clone().into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<Target, RecordError> {
        Ok(Target {
            id: row.i32("TARGET_ID")?,
            name: row.text("TARGET")?.to_string(),
            ra: row.f64("RAEP0")?,
            dec: row.f64("DECEP0")?,
            equinox: row.f64("EQUINOX")?,
            ra_err: row.opt_f64("RA_ERR")?,
            dec_err: row.opt_f64("DEC_ERR")?,
            sysvel: row.opt_f64("SYSVEL")?,
            pmra: row.f64("PMRA")?,
            pmdec: row.f64("PMDEC")?,
            pmra_err: row.opt_f64("PMRA_ERR")?,
            pmdec_err: row.opt_f64("PMDEC_ERR")?,
            parallax: row.f64("PARALLAX")?,
            para_err: row.opt_f64("PARA_ERR")?,
            spectral_type: row.opt_text("SPECTYP")?.map(|s| s.to_string()),
        })
    }
}

/// A row of `OI_ARRAY`. A station with a fixed `position` and no
/// `interpolation` is static; otherwise its positions are in
/// `OI_ARRAY_MOTION`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRow {
    pub id: i32,
    pub tel_name: String,
    pub sta_name: String,
    pub diameter: f64,
    pub position: Option<Vector3>,
    pub interpolation: Option<Interpolation>,
}

impl ArrayRow {
    pub fn fixed(id: i32, tel_name: &str, sta_name: &str, diameter: f64, position: Vector3) -> ArrayRow {
        ArrayRow {
            id,
            tel_name: tel_name.to_string(),
            sta_name: sta_name.to_string(),
            diameter,
            position: Some(position),
            interpolation: None,
        }
    }

    pub fn moving(
        id: i32,
        tel_name: &str,
        sta_name: &str,
        diameter: f64,
        interpolation: Interpolation,
    ) -> ArrayRow {
        ArrayRow {
            id,
            tel_name: tel_name.to_string(),
            sta_name: sta_name.to_string(),
            diameter,
            position: None,
            interpolation: Some(interpolation),
        }
    }
}

impl TableRecord for ArrayRow {
    const TABLE: &'static str = OI_ARRAY;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("STA_INDEX", self.id.into()),
            ("TEL_NAME", self.tel_name.as_str().into()),
            ("STA_NAME", self.sta_name.as_str().into()),
            ("DIAMETER", self.diameter.into()),
            ("STAXYZ_X", self.position.map(|p| p.x).into()),
            ("STAXYZ_Y", self.position.map(|p| p.y).into()),
            ("STAXYZ_Z", self.position.map(|p| p.z).into()),
            ("INTERP", self.interpolation.map(|i| i.tag()).into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<ArrayRow, RecordError> {
        let interpolation = match row.opt_text("INTERP")? {
            None => None,
            Some(tag) => Some(Interpolation::from_tag(tag).ok_or_else(|| {
                RecordError::InvalidTag {
                    column: "INTERP",
                    tag: tag.to_string(),
                }
            })?),
        };
        Ok(ArrayRow {
            id: row.i32("STA_INDEX")?,
            tel_name: row.text("TEL_NAME")?.to_string(),
            sta_name: row.text("STA_NAME")?.to_string(),
            diameter: row.f64("DIAMETER")?,
            position: row.opt_vector(["STAXYZ_X", "STAXYZ_Y", "STAXYZ_Z"])?,
            interpolation,
        })
    }
}

/// A row of `OI_ARRAY_MOTION`: one sampled position of a moving station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionRow {
    pub id: i32,
    pub sample: PositionSample,
}

impl TableRecord for MotionRow {
    const TABLE: &'static str = OI_ARRAY_MOTION;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        let p = self.sample.position;
        let v = self.sample.velocity;
        vec![
            ("STA_INDEX", self.id.into()),
            ("TIME", Value::Timestamp(self.sample.time)),
            ("POS_X", p.x.into()),
            ("POS_Y", p.y.into()),
            ("POS_Z", p.z.into()),
            ("VEL_X", v.map(|v| v.x).into()),
            ("VEL_Y", v.map(|v| v.y).into()),
            ("VEL_Z", v.map(|v| v.z).into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<MotionRow, RecordError> {
        let position = row
            .opt_vector(["POS_X", "POS_Y", "POS_Z"])?
            .ok_or(RecordError::Missing("POS_X"))?;
        Ok(MotionRow {
            id: row.i32("STA_INDEX")?,
            sample: PositionSample {
                time: row.f64("TIME")?,
                position,
                velocity: row.opt_vector(["VEL_X", "VEL_Y", "VEL_Z"])?,
            },
        })
    }
}

/// A spectral channel (`OI_WAVELENGTH`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthBin {
    pub id: i32,
    /// Central wavelength \[metres\]
    pub wavelength: f64,
    /// \[metres\]
    pub bandwidth: f64,
}

impl WavelengthBin {
    /// Central frequency \[Hz\]
    pub fn frequency(&self) -> f64 {
        VEL_C / self.wavelength
    }

    /// The width of the channel in frequency \[Hz\]. First order in
    /// `bandwidth / wavelength`.
    pub fn frequency_width(&self) -> f64 {
        VEL_C * self.bandwidth / (self.wavelength * self.wavelength)
    }
}

impl TableRecord for WavelengthBin {
    const TABLE: &'static str = OI_WAVELENGTH;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("WAVE_ID", self.id.into()),
            ("EFF_WAVE", self.wavelength.into()),
            ("EFF_BAND", self.bandwidth.into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<WavelengthBin, RecordError> {
        Ok(WavelengthBin {
            id: row.i32("WAVE_ID")?,
            wavelength: row.f64("EFF_WAVE")?,
            bandwidth: row.f64("EFF_BAND")?,
        })
    }
}

/// One complex amplitude of the static combiner response from an input
/// (an array element) to an output port, in one spectral channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferMatrixEntry {
    /// `STA_INDEX` of the input.
    pub input: i32,
    pub output: i32,
    pub wavelength_id: i32,
    pub value: Complex64,
}

impl TransferMatrixEntry {
    pub fn from_polar(
        input: i32,
        output: i32,
        wavelength_id: i32,
        magnitude: f64,
        phase: f64,
    ) -> TransferMatrixEntry {
        TransferMatrixEntry {
            input,
            output,
            wavelength_id,
            value: Complex64::from_polar(magnitude, phase),
        }
    }
}

impl TableRecord for TransferMatrixEntry {
    const TABLE: &'static str = OI_TRANSFER_MATRIX;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("STA_INDEX", self.input.into()),
            ("OUT_PORT", self.output.into()),
            ("WAVE_ID", self.wavelength_id.into()),
            ("VALUE", self.value.into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<TransferMatrixEntry, RecordError> {
        Ok(TransferMatrixEntry {
            input: row.i32("STA_INDEX")?,
            output: row.i32("OUT_PORT")?,
            wavelength_id: row.i32("WAVE_ID")?,
            value: row.complex("VALUE")?,
        })
    }
}

/// A real coefficient of the post-processing matrix combining output
/// intensities into kernel (or differential) nulls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelMatrixEntry {
    pub kernel: i32,
    pub output: i32,
    pub coefficient: f64,
}

impl TableRecord for KernelMatrixEntry {
    const TABLE: &'static str = OI_KERNEL_MATRIX;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("KERNEL", self.kernel.into()),
            ("OUT_PORT", self.output.into()),
            ("COEFF", self.coefficient.into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<KernelMatrixEntry, RecordError> {
        Ok(KernelMatrixEntry {
            kernel: row.i32("KERNEL")?,
            output: row.i32("OUT_PORT")?,
            coefficient: row.f64("COEFF")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarization {
    Unpolarized,
    X,
    Y,
}

impl Polarization {
    pub fn tag(self) -> &'static str {
        match self {
            Polarization::Unpolarized => "NONE",
            Polarization::X => "X",
            Polarization::Y => "Y",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Polarization> {
        match tag {
            "NONE" => Some(Polarization::Unpolarized),
            "X" => Some(Polarization::X),
            "Y" => Some(Polarization::Y),
            _ => None,
        }
    }
}

/// Optical path lengths \[metres\] through each medium. Media that weren't
/// modelled are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OplDecomposition {
    pub air: Option<f64>,
    pub glass: Option<f64>,
    pub gas: Option<f64>,
}

/// How the time-varying perturbation of an input is described. Producers pick
/// whichever their instrument model gives them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputPerturbation {
    Phasor(Complex64),
    OpticalPath(OplDecomposition),
}

impl InputPerturbation {
    pub fn tag(&self) -> &'static str {
        match self {
            InputPerturbation::Phasor(_) => "PHASOR",
            InputPerturbation::OpticalPath(_) => "OPL",
        }
    }
}

/// One sample of the time-varying part of the instrument function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputPhasorSample {
    /// Seconds since the document epoch.
    pub time: f64,
    /// Exposure time \[seconds\]
    pub int_time: f64,
    /// `STA_INDEX` of the input.
    pub input: i32,
    pub wavelength_id: i32,
    pub polarization: Polarization,
    pub perturbation: InputPerturbation,
    /// `TARGET_ID` being observed, if the sample is specific to one.
    pub target_id: Option<i32>,
    /// Collecting area of the input \[square metres\]
    pub collecting_area: Option<f64>,
}

impl TableRecord for InputPhasorSample {
    const TABLE: &'static str = OI_INPUT_PHASOR;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        let mut named = vec![
            ("TIME", Value::Timestamp(self.time)),
            ("INT_TIME", self.int_time.into()),
            ("STA_INDEX", self.input.into()),
            ("WAVE_ID", self.wavelength_id.into()),
            ("POLARIZ", self.polarization.tag().into()),
            ("REPRES", self.perturbation.tag().into()),
            ("TARGET_ID", self.target_id.into()),
            ("ARRCOL", self.collecting_area.into()),
        ];
        match self.perturbation {
            InputPerturbation::Phasor(c) => named.push(("PHASOR", c.into())),
            InputPerturbation::OpticalPath(opl) => {
                named.push(("OPL_AIR", opl.air.into()));
                named.push(("OPL_GLASS", opl.glass.into()));
                named.push(("OPL_GAS", opl.gas.into()));
            }
        }
        named
    }

    fn from_row(row: &RowView) -> Result<InputPhasorSample, RecordError> {
        let polarization = row.text("POLARIZ")?;
        let polarization =
            Polarization::from_tag(polarization).ok_or_else(|| RecordError::InvalidTag {
                column: "POLARIZ",
                tag: polarization.to_string(),
            })?;
        let perturbation = match row.text("REPRES")? {
            "PHASOR" => InputPerturbation::Phasor(row.complex("PHASOR")?),
            "OPL" => {
                let opl = OplDecomposition {
                    air: row.opt_f64("OPL_AIR")?,
                    glass: row.opt_f64("OPL_GLASS")?,
                    gas: row.opt_f64("OPL_GAS")?,
                };
                if opl == OplDecomposition::default() {
                    return Err(RecordError::Inconsistent(
                        "an OPL perturbation needs at least one of OPL_AIR, OPL_GLASS, OPL_GAS",
                    ));
                }
                InputPerturbation::OpticalPath(opl)
            }
            tag => {
                return Err(RecordError::InvalidTag {
                    column: "REPRES",
                    tag: tag.to_string(),
                })
            }
        };
        Ok(InputPhasorSample {
            time: row.f64("TIME")?,
            int_time: row.f64("INT_TIME")?,
            input: row.i32("STA_INDEX")?,
            wavelength_id: row.i32("WAVE_ID")?,
            polarization,
            perturbation,
            target_id: row.opt_i32("TARGET_ID")?,
            collecting_area: row.opt_f64("ARRCOL")?,
        })
    }
}

/// One reduced intensity of an output port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityEstimate {
    /// `INT_INDEX`, referenced by `OI_COVARIANCE`.
    pub index: i32,
    /// Seconds since the document epoch.
    pub time: f64,
    pub int_time: f64,
    pub target_id: i32,
    pub output: i32,
    pub wavelength_id: i32,
    pub value: f64,
    pub variance: f64,
}

impl TableRecord for IntensityEstimate {
    const TABLE: &'static str = OI_INTENSITY;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("INT_INDEX", self.index.into()),
            ("TIME", Value::Timestamp(self.time)),
            ("INT_TIME", self.int_time.into()),
            ("TARGET_ID", self.target_id.into()),
            ("OUT_PORT", self.output.into()),
            ("WAVE_ID", self.wavelength_id.into()),
            ("VALUE", self.value.into()),
            ("VARIANCE", self.variance.into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<IntensityEstimate, RecordError> {
        Ok(IntensityEstimate {
            index: row.i32("INT_INDEX")?,
            time: row.f64("TIME")?,
            int_time: row.f64("INT_TIME")?,
            target_id: row.i32("TARGET_ID")?,
            output: row.i32("OUT_PORT")?,
            wavelength_id: row.i32("WAVE_ID")?,
            value: row.f64("VALUE")?,
            variance: row.f64("VARIANCE")?,
        })
    }
}

/// The covariance between two different intensity estimates. Variances (the
/// diagonal) live in [`IntensityEstimate::variance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovarianceEntry {
    pub index_a: i32,
    pub index_b: i32,
    pub covariance: f64,
}

impl TableRecord for CovarianceEntry {
    const TABLE: &'static str = OI_COVARIANCE;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("INDEX_A", self.index_a.into()),
            ("INDEX_B", self.index_b.into()),
            ("COVAR", self.covariance.into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<CovarianceEntry, RecordError> {
        Ok(CovarianceEntry {
            index_a: row.i32("INDEX_A")?,
            index_b: row.i32("INDEX_B")?,
            covariance: row.f64("COVAR")?,
        })
    }
}

/// One output of the kernel matrix: a linear combination of the output
/// intensities recorded at the same time, e.g. a kernel or differential null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelIntensityEstimate {
    /// `KI_INDEX`, referenced by `OI_KERNEL_COVARIANCE`.
    pub index: i32,
    /// Seconds since the document epoch.
    pub time: f64,
    pub int_time: f64,
    pub target_id: i32,
    /// `KERNEL` row of the kernel matrix.
    pub kernel: i32,
    pub wavelength_id: i32,
    pub value: f64,
    pub variance: f64,
}

impl TableRecord for KernelIntensityEstimate {
    const TABLE: &'static str = OI_KERNEL_INTENSITY;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("KI_INDEX", self.index.into()),
            ("TIME", Value::Timestamp(self.time)),
            ("INT_TIME", self.int_time.into()),
            ("TARGET_ID", self.target_id.into()),
            ("KERNEL", self.kernel.into()),
            ("WAVE_ID", self.wavelength_id.into()),
            ("VALUE", self.value.into()),
            ("VARIANCE", self.variance.into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<KernelIntensityEstimate, RecordError> {
        Ok(KernelIntensityEstimate {
            index: row.i32("KI_INDEX")?,
            time: row.f64("TIME")?,
            int_time: row.f64("INT_TIME")?,
            target_id: row.i32("TARGET_ID")?,
            kernel: row.i32("KERNEL")?,
            wavelength_id: row.i32("WAVE_ID")?,
            value: row.f64("VALUE")?,
            variance: row.f64("VARIANCE")?,
        })
    }
}

/// The covariance between two different kernel outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelCovarianceEntry {
    pub index_a: i32,
    pub index_b: i32,
    pub covariance: f64,
}

impl TableRecord for KernelCovarianceEntry {
    const TABLE: &'static str = OI_KERNEL_COVARIANCE;

    fn to_named(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("INDEX_A", self.index_a.into()),
            ("INDEX_B", self.index_b.into()),
            ("COVAR", self.covariance.into()),
        ]
    }

    fn from_row(row: &RowView) -> Result<KernelCovarianceEntry, RecordError> {
        Ok(KernelCovarianceEntry {
            index_a: row.i32("INDEX_A")?,
            index_b: row.i32("INDEX_B")?,
            covariance: row.f64("COVAR")?,
        })
    }
}
