//! End-to-end: assemble, seal, query, revise.

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use nifits::{
    geometry::GeometryError,
    schema::{OI_INTENSITY, OI_WAVELENGTH},
    validate::Invariant,
    write, TableSource,
};

#[test]
fn observation_seals_and_answers_queries() {
    let document = observation_draft().seal().unwrap();
    let catalog = document.catalog();
    assert_eq!(catalog.targets().len(), 2);
    assert_eq!(catalog.elements().len(), 3);
    assert_eq!(catalog.wavelengths().len(), 4);
    assert_eq!(catalog.intensities().len(), WAVE_IDS.len() * intensities_per_bin());

    // Fixed stations are valid at every time.
    let fixed = document.position_at(STATIC_STATIONS[1], 1e6).unwrap();
    assert_eq!((fixed.x, fixed.y, fixed.z), (56.0, 24.0, 0.0));

    // The moving station returns its samples exactly and interpolates between
    // them.
    for &t in &SAMPLE_TIMES {
        assert_eq!(document.position_at(MOVING_STATION, t), Ok(moving_position(t)));
    }
    let between = document.position_at(MOVING_STATION, 25.0).unwrap();
    let expected = moving_position(25.0);
    assert_abs_diff_eq!(between.x, expected.x, epsilon = 1e-9);
    assert_abs_diff_eq!(between.z, expected.z, epsilon = 1e-9);

    let result = document.position_at(MOVING_STATION, 40.000001);
    assert!(matches!(result, Err(GeometryError::OutOfRange { .. })));

    let baseline = document
        .baseline_at(STATIC_STATIONS[0], MOVING_STATION, 10.0)
        .unwrap();
    assert_abs_diff_eq!(baseline.x, 120.0, epsilon = 1e-12);

    let cube = catalog.transfer_matrix_cube();
    assert_eq!(cube.values.dim(), (4, 2, 3));
    assert_abs_diff_eq!(cube.values[(3, 1, 2)].norm(), 0.5, epsilon = 1e-12);
}

#[test]
fn sealing_twice_changes_nothing() {
    let document = observation_draft().seal().unwrap();
    let once = write::encode(&document).unwrap();
    let twice = write::encode(&document.clone().seal()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn removing_a_wavelength_bin_invalidates_the_next_revision() {
    let document = observation_draft().seal().unwrap();
    let mut draft = document.revise();
    assert_eq!(draft.header().revision, 1);

    let removed = draft
        .retain_rows(OI_WAVELENGTH, |row| row.i32("WAVE_ID") != Ok(2))
        .unwrap();
    assert_eq!(removed, 1);

    let rejected = draft.seal().unwrap_err();
    let intensity_violations: Vec<_> = rejected.report.for_table(OI_INTENSITY).collect();
    assert_eq!(intensity_violations.len(), intensities_per_bin());
    for v in intensity_violations {
        assert_eq!(
            v.invariant,
            Invariant::DanglingReference {
                column: "WAVE_ID",
                id: 2
            }
        );
    }

    // The sealed revision is untouched.
    assert_eq!(document.catalog().wavelengths().len(), 4);
    assert_eq!(document.header().revision, 0);
}

#[test]
fn reports_are_ordered_and_repeatable() {
    let mut draft = observation_draft();
    draft
        .retain_rows(OI_WAVELENGTH, |row| row.i32("WAVE_ID") != Ok(0))
        .unwrap();
    let first = draft.validate();
    let second = draft.validate();
    assert_eq!(first, second);
    assert!(!first.is_empty());

    let tables: Vec<_> = first.violations().iter().map(|v| v.table).collect();
    let mut sorted = tables.clone();
    sorted.dedup();
    // Each table's violations are contiguous.
    assert_eq!(sorted.len(), tables.iter().collect::<std::collections::HashSet<_>>().len());
}
