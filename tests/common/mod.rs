//! A small but complete observation shared by the integration tests.
//!
//! All reals are exactly representable in single precision.

#![allow(dead_code)]

use nifits::{
    document::{begin, DraftDocument},
    geometry::{Interpolation, PositionSample, Vector3},
    tables::*,
};
use num_complex::Complex64;

pub const STATIC_STATIONS: [i32; 2] = [10, 11];
pub const MOVING_STATION: i32 = 12;
pub const WAVE_IDS: [i32; 4] = [0, 1, 2, 3];
pub const OUTPUTS: [i32; 2] = [0, 1];
pub const TARGET_IDS: [i32; 2] = [1, 2];
pub const INTENSITY_TIMES: [f64; 2] = [5.0, 15.0];
pub const SAMPLE_TIMES: [f64; 5] = [0.0, 10.0, 20.0, 30.0, 40.0];

pub fn moving_position(time: f64) -> Vector3 {
    Vector3::new(100.0 + 2.0 * time, -50.0, 0.5 * time)
}

/// Everything the instrument description needs: targets, three stations (one
/// moving), four wavelength bins and a full transfer matrix.
pub fn instrument_draft() -> DraftDocument {
    let mut draft = begin();
    draft.set_provenance("PIPELINE", "integration tests");

    draft
        .add_records(&[
            Target::new(TARGET_IDS[0], "eps Eri", 53.23, -9.46),
            Target {
                spectral_type: Some("K2V".to_string()),
                ra_err: Some(0.5),
                ..Target::new(TARGET_IDS[1], "tau Cet", 26.02, -15.94)
            },
        ])
        .unwrap();

    draft
        .add_records(&[
            ArrayRow::fixed(STATIC_STATIONS[0], "UT1", "U1", 8.0, Vector3::new(0.0, 0.0, 0.0)),
            ArrayRow::fixed(STATIC_STATIONS[1], "UT2", "U2", 8.0, Vector3::new(56.0, 24.0, 0.0)),
            ArrayRow::moving(MOVING_STATION, "SC1", "FREE1", 1.75, Interpolation::Linear),
        ])
        .unwrap();
    let samples: Vec<MotionRow> = SAMPLE_TIMES
        .iter()
        .map(|&time| MotionRow {
            id: MOVING_STATION,
            sample: PositionSample {
                time,
                position: moving_position(time),
                velocity: Some(Vector3::new(2.0, 0.0, 0.5)),
            },
        })
        .collect();
    draft.add_records(&samples).unwrap();

    let bins: Vec<WavelengthBin> = WAVE_IDS
        .iter()
        .map(|&id| WavelengthBin {
            id,
            wavelength: 3.5e-6 + f64::from(id) * 0.1e-6,
            bandwidth: 0.1e-6,
        })
        .collect();
    draft.add_records(&bins).unwrap();

    let mut transfer = vec![];
    for &wavelength_id in &WAVE_IDS {
        for &output in &OUTPUTS {
            for (i, &input) in STATIC_STATIONS.iter().chain([MOVING_STATION].iter()).enumerate() {
                transfer.push(TransferMatrixEntry::from_polar(
                    input,
                    output,
                    wavelength_id,
                    0.5,
                    std::f64::consts::PI * f64::from(output) * i as f64 / 3.0,
                ));
            }
        }
    }
    draft.add_records(&transfer).unwrap();
    draft
}

/// The instrument plus phasors, intensities and a covariance.
pub fn observation_draft() -> DraftDocument {
    let mut draft = instrument_draft();

    draft
        .add_records(&[
            InputPhasorSample {
                time: 5.0,
                int_time: 1.0,
                input: STATIC_STATIONS[0],
                wavelength_id: 0,
                polarization: Polarization::Unpolarized,
                perturbation: InputPerturbation::Phasor(Complex64::new(0.0, 1.0)),
                target_id: Some(TARGET_IDS[0]),
                collecting_area: Some(50.0),
            },
            InputPhasorSample {
                time: 5.0,
                int_time: 1.0,
                input: MOVING_STATION,
                wavelength_id: 0,
                polarization: Polarization::Unpolarized,
                perturbation: InputPerturbation::OpticalPath(OplDecomposition {
                    air: Some(1.5e-6),
                    glass: Some(-0.25e-6),
                    gas: None,
                }),
                target_id: None,
                collecting_area: None,
            },
        ])
        .unwrap();

    let mut intensities = vec![];
    let mut index = 0;
    for &target_id in &TARGET_IDS {
        for &time in &INTENSITY_TIMES {
            for &output in &OUTPUTS {
                for &wavelength_id in &WAVE_IDS {
                    intensities.push(IntensityEstimate {
                        index,
                        time,
                        int_time: 1.0,
                        target_id,
                        output,
                        wavelength_id,
                        value: 0.5 * f64::from(index),
                        variance: 0.25,
                    });
                    index += 1;
                }
            }
        }
    }
    draft.add_records(&intensities).unwrap();

    draft
        .add_records(&[CovarianceEntry {
            index_a: 0,
            index_b: 1,
            covariance: 0.125,
        }])
        .unwrap();
    draft
}

/// The observation plus a kernel matrix taking the difference of the two
/// outputs, and the kernel outputs computed from its intensities.
pub fn kernel_draft() -> DraftDocument {
    let mut draft = observation_draft();
    draft
        .add_records(&[
            KernelMatrixEntry {
                kernel: 0,
                output: OUTPUTS[0],
                coefficient: 1.0,
            },
            KernelMatrixEntry {
                kernel: 0,
                output: OUTPUTS[1],
                coefficient: -1.0,
            },
        ])
        .unwrap();

    let kernel_outputs: Vec<KernelIntensityEstimate> = WAVE_IDS
        .iter()
        .enumerate()
        .map(|(i, &wavelength_id)| KernelIntensityEstimate {
            index: i as i32,
            time: INTENSITY_TIMES[0],
            int_time: 1.0,
            target_id: TARGET_IDS[0],
            kernel: 0,
            wavelength_id,
            value: -2.0,
            variance: 0.5,
        })
        .collect();
    draft.add_records(&kernel_outputs).unwrap();
    draft
        .add_records(&[KernelCovarianceEntry {
            index_a: 0,
            index_b: 3,
            covariance: -0.0625,
        }])
        .unwrap();
    draft
}

/// How many intensity rows reference each wavelength bin.
pub fn intensities_per_bin() -> usize {
    TARGET_IDS.len() * INTENSITY_TIMES.len() * OUTPUTS.len()
}
