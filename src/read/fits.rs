//! Importing documents exported as FITS files.
//!
//! The FITS layout: the primary HDU carries the header keys, each non-empty
//! table is a BINTABLE HDU named after it, and provenance is the
//! [`PROVENANCE_TABLE`] BINTABLE. FITS has no nulls, so null reals and
//! complex values are NaN, null integers are [`INT_NULL`] and null text is
//! empty. Trailing spaces of text are padding.

use std::{
    ffi::{CStr, CString},
    path::Path,
    ptr,
};

use fitsio::{hdu::*, FitsFile};
use hifitime::Epoch;
use log::{debug, trace};
use thiserror::Error;

use crate::{
    codec::{CodecError, TypeTag, Value},
    document::{begin_with, Document, Header},
    schema::{ColumnSchema, SchemaError, TableSchema, REGISTRY},
    validate::ValidationReport,
};

pub const PROVENANCE_TABLE: &str = "NI_PROVENANCE";

/// A null in a nullable integer column.
pub const INT_NULL: i32 = i32::MIN;

/// The value of `FORMAT` in the primary HDU.
pub(crate) const FORMAT_NAME: &str = "NIFITS";

/// cfitsio status codes for missing keys.
const KEY_NO_EXIST: i32 = 202;
const VALUE_UNDEFINED: i32 = 204;
/// cfitsio status code for an HDU that can't be found.
const BAD_HDU_NUM: i32 = 301;

#[derive(Error, Debug)]
pub enum FitsError {
    #[error("{0} is not a NIFITS FITS file")]
    NotNifits(String),

    #[error("Required key {0} is missing")]
    MissingKey(String),

    #[error("Couldn't parse the value of key {key} ({value:?})")]
    BadKey { key: String, value: String },

    #[error("Column {column} of {table} has {found} rows; expected {expected}")]
    RaggedColumn {
        table: String,
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("{table}.{column} holds {tag} values, which can't be stored in FITS")]
    UnsupportedColumn {
        table: String,
        column: String,
        tag: TypeTag,
    },

    #[error("Couldn't export {table} row {row} column {column}: {source}")]
    Value {
        table: String,
        row: usize,
        column: String,
        source: CodecError,
    },

    #[error("{table} row {row} column {column} wouldn't read back the same from FITS: {reason}")]
    Lossy {
        table: String,
        row: usize,
        column: String,
        reason: &'static str,
    },

    #[error("The imported document is not valid; {0}")]
    Invalid(ValidationReport),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),
}

/// Open a fits file.
pub(crate) fn fits_open<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    Ok(FitsFile::open(file.as_ref())?)
}

/// Open a fits file's HDU by name, if it exists.
pub(crate) fn fits_open_optional_hdu(
    fits_fptr: &mut FitsFile,
    name: &str,
) -> Result<Option<FitsHdu>, FitsError> {
    match fits_fptr.hdu(name) {
        Ok(hdu) => Ok(Some(hdu)),
        Err(fitsio::errors::Error::Fits(fe)) if fe.status == BAD_HDU_NUM => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type.
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, FitsError> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(fitsio::errors::Error::Fits(fe))
            if fe.status == KEY_NO_EXIST || fe.status == VALUE_UNDEFINED =>
        {
            return Ok(None)
        }
        Err(e) => return Err(e.into()),
    };

    match unparsed_value.trim().parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => Err(FitsError::BadKey {
            key: keyword.to_string(),
            value: unparsed_value,
        }),
    }
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword, pull out
/// the value of the keyword, parsing it into the desired type.
pub(crate) fn fits_get_required_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<T, FitsError> {
    fits_get_optional_key(fits_fptr, hdu, keyword)?
        .ok_or_else(|| FitsError::MissingKey(keyword.to_string()))
}

/// Get a column from a fits file's HDU.
pub(crate) fn fits_get_col<T: fitsio::tables::ReadsCol>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Vec<T>, FitsError> {
    Ok(hdu.read_col(fits_fptr, keyword)?)
}

/// Given a FITS file pointer, and a keyword to a long string keyword that may
/// or may not exist, pull out the long string of the keyword. This deals with
/// FITSs CONTINUE mechanism by calling a low level fits function.
///
/// The key is read from the current HDU of `fits_fptr`.
pub(crate) fn fits_get_optional_key_long_string(
    fits_fptr: &mut FitsFile,
    keyword: &str,
) -> Result<Option<String>, FitsError> {
    let keyword_ffi = CString::new(keyword).map_err(|_| FitsError::BadKey {
        key: keyword.to_string(),
        value: String::new(),
    })?;
    unsafe {
        let mut status = 0;
        let mut long_string_ptr = ptr::null_mut();
        // ffgkls = fits_read_key_longstr
        fitsio_sys::ffgkls(
            fits_fptr.as_raw(),
            keyword_ffi.as_ptr(),
            &mut long_string_ptr,
            ptr::null_mut(),
            &mut status,
        );
        match status {
            0 => {
                let long_string = CStr::from_ptr(long_string_ptr)
                    .to_str()
                    .map(|s| s.to_string());
                // Free the cfitsio-allocated string. The status code passed
                // isn't useful.
                // fffree = fits_free_memory
                fitsio_sys::fffree(long_string_ptr.cast(), &mut 0);
                long_string.map(Some).map_err(|_| FitsError::BadKey {
                    key: keyword.to_string(),
                    value: "<invalid UTF-8>".to_string(),
                })
            }
            KEY_NO_EXIST | VALUE_UNDEFINED => Ok(None),
            _ => Err(fitsio::errors::check_status(status)
                .err()
                .map(FitsError::from)
                .unwrap_or_else(|| FitsError::MissingKey(keyword.to_string()))),
        }
    }
}

/// Read a document written by [`crate::write::fits::export`] and seal it.
pub fn import<P: AsRef<Path>>(path: P) -> Result<Document, FitsError> {
    let path = path.as_ref();
    let mut fptr = fits_open(path)?;
    let hdu = fptr.primary_hdu()?;

    let format: Option<String> = fits_get_optional_key(&mut fptr, &hdu, "FORMAT")?;
    if format.as_deref() != Some(FORMAT_NAME) {
        return Err(FitsError::NotNifits(path.display().to_string()));
    }
    let format_version: u32 = fits_get_required_key(&mut fptr, &hdu, "NIFITSV")?;
    let revision: u32 = fits_get_required_key(&mut fptr, &hdu, "REVISION")?;
    let centuries: i16 = fits_get_required_key(&mut fptr, &hdu, "EPOCH_C")?;
    let nanoseconds: u64 = fits_get_required_key(&mut fptr, &hdu, "EPOCH_NS")?;
    let units = fits_get_optional_key_long_string(&mut fptr, "UNITS")?
        .ok_or_else(|| FitsError::MissingKey("UNITS".to_string()))?;
    debug!("Importing {} (version {format_version}, revision {revision})", path.display());

    let header = Header {
        format_version,
        revision,
        epoch: Epoch::from_tai_parts(centuries, nanoseconds),
        units,
        ..Header::default()
    };
    let mut draft = begin_with(header)?;

    for schema in REGISTRY.tables(format_version)? {
        let hdu = match fits_open_optional_hdu(&mut fptr, schema.name)? {
            Some(hdu) => hdu,
            None => continue,
        };
        let rows = read_rows(&mut fptr, &hdu, schema)?;
        debug!("Imported {} rows of {}", rows.len(), schema.name);
        draft.add_table(schema.name, rows)?;
    }

    if let Some(hdu) = fits_open_optional_hdu(&mut fptr, PROVENANCE_TABLE)? {
        let keys: Vec<String> = fits_get_col(&mut fptr, &hdu, "KEY")?;
        let values: Vec<String> = fits_get_col(&mut fptr, &hdu, "VALUE")?;
        for (key, value) in keys.iter().zip(&values) {
            draft.set_provenance(key.trim_end_matches(' '), value.trim_end_matches(' '));
        }
    }

    draft
        .seal()
        .map_err(|rejected| FitsError::Invalid(rejected.report))
}

fn read_rows(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    schema: &TableSchema,
) -> Result<Vec<Vec<Value>>, FitsError> {
    let num_rows = match &hdu.info {
        HduInfo::TableInfo { num_rows, .. } => *num_rows,
        _ => return Err(FitsError::NotNifits(format!("HDU {}", schema.name))),
    };
    let mut columns = Vec::with_capacity(schema.columns.len());
    for column in &schema.columns {
        trace!("Importing {}.{}", schema.name, column.name);
        let values = read_column(fptr, hdu, schema, column)?;
        if values.len() != num_rows {
            return Err(FitsError::RaggedColumn {
                table: schema.name.to_string(),
                column: column.name.to_string(),
                expected: num_rows,
                found: values.len(),
            });
        }
        columns.push(values.into_iter());
    }
    Ok((0..num_rows)
        .map(|_| columns.iter_mut().flat_map(|c| c.next()).collect())
        .collect())
}

fn read_column(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    schema: &TableSchema,
    column: &ColumnSchema,
) -> Result<Vec<Value>, FitsError> {
    let nullable = column.nullable;
    let real = |v: f64, wrap: fn(f64) -> Value| {
        if nullable && v.is_nan() {
            Value::Null
        } else {
            wrap(v)
        }
    };
    let values = match column.tag {
        TypeTag::I32 => fits_get_col::<i32>(fptr, hdu, column.name)?
            .into_iter()
            .map(|v| {
                if nullable && v == INT_NULL {
                    Value::Null
                } else {
                    Value::I32(v)
                }
            })
            .collect(),
        TypeTag::F64 | TypeTag::Real => fits_get_col::<f64>(fptr, hdu, column.name)?
            .into_iter()
            .map(|v| real(v, Value::F64))
            .collect(),
        TypeTag::Timestamp => fits_get_col::<f64>(fptr, hdu, column.name)?
            .into_iter()
            .map(|v| real(v, Value::Timestamp))
            .collect(),
        TypeTag::Complex => {
            let re: Vec<f64> = fits_get_col(fptr, hdu, &format!("{}_RE", column.name))?;
            let im: Vec<f64> = fits_get_col(fptr, hdu, &format!("{}_IM", column.name))?;
            re.into_iter()
                .zip(im)
                .map(|(re, im)| {
                    if nullable && re.is_nan() && im.is_nan() {
                        Value::Null
                    } else {
                        Value::Complex(num_complex::Complex64::new(re, im))
                    }
                })
                .collect()
        }
        TypeTag::FixedText(_) => fits_get_col::<String>(fptr, hdu, column.name)?
            .into_iter()
            .map(|s| {
                let s = s.trim_end_matches(' ');
                if nullable && s.is_empty() {
                    Value::Null
                } else {
                    Value::Text(s.to_string())
                }
            })
            .collect(),
        tag => {
            return Err(FitsError::UnsupportedColumn {
                table: schema.name.to_string(),
                column: column.name.to_string(),
                tag,
            })
        }
    };
    Ok(values)
}
