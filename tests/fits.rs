//! Export to and import from FITS.

mod common;

use common::*;
use nifits::{
    read::fits::{import, FitsError},
    tables::Target,
    write::fits::export,
    TableSource,
};
use tempfile::TempDir;

#[test]
fn fits_export_preserves_the_catalog() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("observation.fits");
    let document = kernel_draft().seal().unwrap();

    export(&document, &path).unwrap();
    let imported = import(&path).unwrap();

    assert_eq!(imported.catalog(), document.catalog());
    assert_eq!(imported.provenance(), document.provenance());
    assert_eq!(imported.header().revision, document.header().revision);
    assert_eq!(
        imported.header().epoch.to_tai_parts(),
        document.header().epoch.to_tai_parts()
    );
    assert_eq!(imported.catalog().kernel_intensities().len(), WAVE_IDS.len());
    assert_eq!(imported.catalog().kernel_covariances().len(), 1);
}

#[test]
fn nulls_and_values_survive_fits() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("observation.fits");
    export(&observation_draft().seal().unwrap(), &path).unwrap();
    let imported = import(&path).unwrap();
    let catalog = imported.catalog();

    // Text
    let targets = catalog.targets();
    assert_eq!(targets[0].spectral_type, None);
    assert_eq!(targets[1].spectral_type.as_deref(), Some("K2V"));
    // Reals
    assert_eq!(targets[0].ra_err, None);
    assert_eq!(targets[1].ra_err, Some(0.5));
    // Integers
    let phasors = catalog.input_phasors();
    assert_eq!(phasors[0].target_id, Some(TARGET_IDS[0]));
    assert_eq!(phasors[1].target_id, None);
    assert_eq!(phasors[0].collecting_area, Some(50.0));
    assert_eq!(phasors[1].collecting_area, None);
    // Station interpolation: null for fixed stations.
    let elements = catalog.elements();
    assert!(elements[0].is_static());
    assert!(!elements[2].is_static());
}

#[test]
fn exports_overwrite_existing_files() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("instrument.fits");
    let document = instrument_draft().seal().unwrap();
    export(&observation_draft().seal().unwrap(), &path).unwrap();
    export(&document, &path).unwrap();
    assert_eq!(import(&path).unwrap().catalog(), document.catalog());
}

/// A document whose second target has been modified by `change`.
fn with_target(change: impl FnOnce(&mut Target)) -> nifits::Document {
    let mut target = Target::new(3, "HD 10700", 26.02, -15.94);
    change(&mut target);
    let mut draft = instrument_draft();
    draft.add_records(&[target]).unwrap();
    draft.seal().unwrap()
}

#[test]
fn values_fits_cant_give_back_are_refused() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("refused.fits");

    let cases = [
        ("RA_ERR", with_target(|t| t.ra_err = Some(f64::NAN))),
        ("SPECTYP", with_target(|t| t.spectral_type = Some(String::new()))),
        ("SPECTYP", with_target(|t| t.spectral_type = Some("G8V ".to_string()))),
        ("TARGET", with_target(|t| t.name = "HD 10700  ".to_string())),
    ];
    for (expected, document) in cases {
        match export(&document, &path) {
            Err(FitsError::Lossy { table, row, column, .. }) => {
                assert_eq!((table.as_str(), row, column.as_str()), ("OI_TARGET", 2, expected));
            }
            other => panic!("{expected}: expected a lossy export, got {other:?}"),
        }
        assert!(!path.exists(), "{expected}: nothing is written");
    }

    // NaN is fine where it can't be mistaken for a null.
    let document = with_target(|t| t.parallax = f64::NAN);
    export(&document, &path).unwrap();
    assert!(import(&path).unwrap().catalog().targets()[2].parallax.is_nan());
}

#[test]
fn other_fits_files_are_refused() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plain.fits");
    fitsio::FitsFile::create(&path).open().unwrap();
    assert!(matches!(import(&path), Err(FitsError::NotNifits(_))));
}
