//! Cross-table consistency checks.
//!
//! Validation never fails: every problem found is a [`Violation`] in the
//! returned [`ValidationReport`]. The check is linear in the number of rows,
//! with one pass to index the identifier tables and one pass over each
//! dependent table, and the report is in a fixed order (registry table order,
//! then row, then check) so reports can be diffed.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt::Display,
};

use itertools::Itertools;

use crate::{
    document::{Catalog, TableSource},
    geometry::{ArrayElement, Interpolation, PositionSample, Trajectory},
    schema::{
        OI_ARRAY, OI_ARRAY_MOTION, OI_COVARIANCE, OI_INPUT_PHASOR, OI_INTENSITY,
        OI_KERNEL_COVARIANCE, OI_KERNEL_INTENSITY, OI_KERNEL_MATRIX, OI_TARGET,
        OI_TRANSFER_MATRIX, OI_WAVELENGTH,
    },
    tables::{
        ArrayRow, CovarianceEntry, InputPhasorSample, IntensityEstimate, KernelCovarianceEntry,
        KernelIntensityEstimate, KernelMatrixEntry, MotionRow, RecordError, RowView, TableRecord,
        Target, TransferMatrixEntry, WavelengthBin,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum Invariant {
    /// The row passed its schema but can't be read as a record.
    MalformedRow(RecordError),
    DuplicateId {
        column: &'static str,
        id: i32,
    },
    DanglingReference {
        column: &'static str,
        id: i32,
    },
    NonPositiveWavelength(f64),
    NonPositiveBandwidth(f64),
    NegativeVariance(f64),
    NonPositiveArea(f64),
    SelfCovariance {
        index: i32,
    },
    DuplicateCovariance {
        index_a: i32,
        index_b: i32,
    },
    DuplicateTransferEntry {
        input: i32,
        output: i32,
        wavelength_id: i32,
    },
    /// The output port doesn't appear in the transfer matrix.
    UnknownOutputPort(i32),
    MissingStaticPosition {
        id: i32,
    },
    /// A station has both a fixed position and an interpolation policy.
    AmbiguousGeometry {
        id: i32,
    },
    MissingMotionSamples {
        id: i32,
    },
    MotionForStaticElement {
        id: i32,
    },
    NonMonotonicTime {
        id: i32,
        previous: f64,
        time: f64,
    },
    MissingVelocity {
        id: i32,
        time: f64,
    },
}

impl Display for Invariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invariant::MalformedRow(e) => write!(f, "malformed row: {e}"),
            Invariant::DuplicateId { column, id } => write!(f, "duplicate {column} {id}"),
            Invariant::DanglingReference { column, id } => {
                write!(f, "{column} {id} does not exist")
            }
            Invariant::NonPositiveWavelength(w) => {
                write!(f, "central wavelength {w} m is not strictly positive")
            }
            Invariant::NonPositiveBandwidth(b) => {
                write!(f, "bandwidth {b} m is not strictly positive")
            }
            Invariant::NegativeVariance(v) => write!(f, "variance {v} is negative"),
            Invariant::NonPositiveArea(a) => {
                write!(f, "collecting area {a} m^2 is not strictly positive")
            }
            Invariant::SelfCovariance { index } => write!(
                f,
                "covariance of estimate {index} with itself (belongs in VARIANCE)"
            ),
            Invariant::DuplicateCovariance { index_a, index_b } => {
                write!(f, "covariance of ({index_a}, {index_b}) given more than once")
            }
            Invariant::DuplicateTransferEntry {
                input,
                output,
                wavelength_id,
            } => write!(
                f,
                "transfer entry (STA_INDEX {input}, OUT_PORT {output}, WAVE_ID {wavelength_id}) given more than once"
            ),
            Invariant::UnknownOutputPort(port) => {
                write!(f, "OUT_PORT {port} is not an output of the transfer matrix")
            }
            Invariant::MissingStaticPosition { id } => {
                write!(f, "static station {id} has no STAXYZ")
            }
            Invariant::AmbiguousGeometry { id } => write!(
                f,
                "station {id} has both STAXYZ and an interpolation policy"
            ),
            Invariant::MissingMotionSamples { id } => {
                write!(f, "moving station {id} has no OI_ARRAY_MOTION samples")
            }
            Invariant::MotionForStaticElement { id } => {
                write!(f, "station {id} is static but has motion samples")
            }
            Invariant::NonMonotonicTime { id, previous, time } => write!(
                f,
                "station {id} sample at {time} s does not come after {previous} s"
            ),
            Invariant::MissingVelocity { id, time } => write!(
                f,
                "station {id} uses HERMITE but the sample at {time} s has no velocity"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub table: &'static str,
    pub row: usize,
    pub invariant: Invariant,
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} row {}: {}", self.table, self.row, self.invariant)
    }
}

/// The ordered list of everything wrong with a document. Empty means valid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn for_table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.table == table)
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.violations.is_empty() {
            return write!(f, "no violations");
        }
        write!(
            f,
            "{} violation{}:\n{}",
            self.violations.len(),
            if self.violations.len() == 1 { "" } else { "s" },
            self.violations.iter().map(|v| format!("  {v}")).join("\n")
        )
    }
}

/// Check every invariant of `document`.
pub fn validate<S: TableSource + ?Sized>(document: &S) -> ValidationReport {
    analyse(document).1
}

struct Checker<'a, S: ?Sized> {
    source: &'a S,
    violations: Vec<Violation>,
}

impl<'a, S: TableSource + ?Sized> Checker<'a, S> {
    fn flag(&mut self, table: &'static str, row: usize, invariant: Invariant) {
        self.violations.push(Violation {
            table,
            row,
            invariant,
        });
    }

    /// Read every row of `T`'s table. Rows that can't be read are flagged and
    /// skipped; a table the document doesn't have reads as empty.
    fn records<T: TableRecord>(&mut self) -> Vec<(usize, T)> {
        let source = self.source;
        let table = match source.table(T::TABLE) {
            Some(t) => t,
            None => return vec![],
        };
        let schema = table.schema();
        let mut records = Vec::with_capacity(table.len());
        for (i, values) in table.rows().iter().enumerate() {
            match T::from_row(&RowView::new(schema, values)) {
                Ok(r) => records.push((i, r)),
                Err(e) => self.flag(schema.name, i, Invariant::MalformedRow(e)),
            }
        }
        records
    }

    /// Collect a table's primary identifiers, flagging repeats.
    fn index_ids(
        &mut self,
        table: &'static str,
        column: &'static str,
        ids: impl Iterator<Item = (usize, i32)>,
    ) -> HashSet<i32> {
        let mut seen = HashSet::new();
        for (row, id) in ids {
            if !seen.insert(id) {
                self.flag(table, row, Invariant::DuplicateId { column, id });
            }
        }
        seen
    }

    fn require(
        &mut self,
        table: &'static str,
        row: usize,
        column: &'static str,
        id: i32,
        index: &HashSet<i32>,
    ) {
        if !index.contains(&id) {
            self.flag(table, row, Invariant::DanglingReference { column, id });
        }
    }

    /// Both indices of every entry exist in `ids` and differ, and no
    /// unordered pair is given twice.
    fn check_covariances(
        &mut self,
        table: &'static str,
        ids: &HashSet<i32>,
        entries: impl Iterator<Item = (usize, i32, i32)>,
    ) {
        let mut pairs = HashSet::new();
        for (row, index_a, index_b) in entries {
            self.require(table, row, "INDEX_A", index_a, ids);
            self.require(table, row, "INDEX_B", index_b, ids);
            if index_a == index_b {
                self.flag(table, row, Invariant::SelfCovariance { index: index_a });
            } else if !pairs.insert((index_a.min(index_b), index_a.max(index_b))) {
                self.flag(
                    table,
                    row,
                    Invariant::DuplicateCovariance { index_a, index_b },
                );
            }
        }
    }
}

/// Validate `document` and, alongside the report, gather its readable records
/// into a [`Catalog`]. The catalog is only complete when the report is empty.
pub(crate) fn analyse<S: TableSource + ?Sized>(document: &S) -> (Catalog, ValidationReport) {
    let mut c = Checker {
        source: document,
        violations: vec![],
    };

    let targets = c.records::<Target>();
    let stations = c.records::<ArrayRow>();
    let motion = c.records::<MotionRow>();
    let wavelengths = c.records::<WavelengthBin>();
    let transfer = c.records::<TransferMatrixEntry>();
    let kernel = c.records::<KernelMatrixEntry>();
    let phasors = c.records::<InputPhasorSample>();
    let intensities = c.records::<IntensityEstimate>();
    let covariances = c.records::<CovarianceEntry>();
    let kernel_intensities = c.records::<KernelIntensityEstimate>();
    let kernel_covariances = c.records::<KernelCovarianceEntry>();

    // Independent tables first.
    let target_ids = c.index_ids(
        OI_TARGET,
        "TARGET_ID",
        targets.iter().map(|(row, t)| (*row, t.id)),
    );
    let station_ids = c.index_ids(
        OI_ARRAY,
        "STA_INDEX",
        stations.iter().map(|(row, s)| (*row, s.id)),
    );
    let wavelength_ids = c.index_ids(
        OI_WAVELENGTH,
        "WAVE_ID",
        wavelengths.iter().map(|(row, w)| (*row, w.id)),
    );
    for (row, w) in &wavelengths {
        if !(w.wavelength > 0.0) {
            c.flag(OI_WAVELENGTH, *row, Invariant::NonPositiveWavelength(w.wavelength));
        }
        if !(w.bandwidth > 0.0) {
            c.flag(OI_WAVELENGTH, *row, Invariant::NonPositiveBandwidth(w.bandwidth));
        }
    }

    // Motion samples, grouped by station in table order.
    let mut samples: BTreeMap<i32, Vec<(usize, PositionSample)>> = BTreeMap::new();
    for (row, m) in &motion {
        if station_ids.contains(&m.id) {
            samples.entry(m.id).or_default().push((*row, m.sample));
        } else {
            c.flag(
                OI_ARRAY_MOTION,
                *row,
                Invariant::DanglingReference {
                    column: "STA_INDEX",
                    id: m.id,
                },
            );
        }
    }

    let mut elements = vec![];
    let mut built = HashSet::new();
    for (row, s) in &stations {
        if !built.insert(s.id) {
            // Already flagged as a duplicate.
            continue;
        }
        let station_samples = samples.get(&s.id);
        let trajectory = match (s.position, s.interpolation) {
            (position, None) => {
                if let Some(station_samples) = station_samples {
                    for (motion_row, _) in station_samples {
                        c.flag(
                            OI_ARRAY_MOTION,
                            *motion_row,
                            Invariant::MotionForStaticElement { id: s.id },
                        );
                    }
                }
                match position {
                    Some(p) => Some(Trajectory::Static(p)),
                    None => {
                        c.flag(OI_ARRAY, *row, Invariant::MissingStaticPosition { id: s.id });
                        None
                    }
                }
            }
            (Some(_), Some(_)) => {
                c.flag(OI_ARRAY, *row, Invariant::AmbiguousGeometry { id: s.id });
                None
            }
            (None, Some(interpolation)) => match station_samples {
                None => {
                    c.flag(OI_ARRAY, *row, Invariant::MissingMotionSamples { id: s.id });
                    None
                }
                Some(station_samples) => check_motion(&mut c, s.id, interpolation, station_samples),
            },
        };
        if let Some(trajectory) = trajectory {
            elements.push(ArrayElement {
                id: s.id,
                tel_name: s.tel_name.clone(),
                sta_name: s.sta_name.clone(),
                diameter: s.diameter,
                trajectory,
            });
        }
    }

    // Dependent tables.
    let mut transfer_keys = HashSet::new();
    let mut output_ports = HashSet::new();
    for (row, e) in &transfer {
        c.require(OI_TRANSFER_MATRIX, *row, "STA_INDEX", e.input, &station_ids);
        c.require(OI_TRANSFER_MATRIX, *row, "WAVE_ID", e.wavelength_id, &wavelength_ids);
        if !transfer_keys.insert((e.input, e.output, e.wavelength_id)) {
            c.flag(
                OI_TRANSFER_MATRIX,
                *row,
                Invariant::DuplicateTransferEntry {
                    input: e.input,
                    output: e.output,
                    wavelength_id: e.wavelength_id,
                },
            );
        }
        output_ports.insert(e.output);
    }
    // Without a transfer matrix there is nothing to check ports against.
    let check_ports = !transfer.is_empty();

    let mut kernel_ids = HashSet::new();
    for (row, k) in &kernel {
        if check_ports && !output_ports.contains(&k.output) {
            c.flag(OI_KERNEL_MATRIX, *row, Invariant::UnknownOutputPort(k.output));
        }
        kernel_ids.insert(k.kernel);
    }

    for (row, p) in &phasors {
        c.require(OI_INPUT_PHASOR, *row, "STA_INDEX", p.input, &station_ids);
        c.require(OI_INPUT_PHASOR, *row, "WAVE_ID", p.wavelength_id, &wavelength_ids);
        if let Some(target_id) = p.target_id {
            c.require(OI_INPUT_PHASOR, *row, "TARGET_ID", target_id, &target_ids);
        }
        match p.collecting_area {
            Some(area) if !(area > 0.0) => {
                c.flag(OI_INPUT_PHASOR, *row, Invariant::NonPositiveArea(area))
            }
            _ => (),
        }
    }

    let intensity_ids = c.index_ids(
        OI_INTENSITY,
        "INT_INDEX",
        intensities.iter().map(|(row, i)| (*row, i.index)),
    );
    for (row, i) in &intensities {
        c.require(OI_INTENSITY, *row, "TARGET_ID", i.target_id, &target_ids);
        c.require(OI_INTENSITY, *row, "WAVE_ID", i.wavelength_id, &wavelength_ids);
        if check_ports && !output_ports.contains(&i.output) {
            c.flag(OI_INTENSITY, *row, Invariant::UnknownOutputPort(i.output));
        }
        if !(i.variance >= 0.0) {
            c.flag(OI_INTENSITY, *row, Invariant::NegativeVariance(i.variance));
        }
    }

    c.check_covariances(
        OI_COVARIANCE,
        &intensity_ids,
        covariances.iter().map(|(row, e)| (*row, e.index_a, e.index_b)),
    );

    // Kernel outputs always need their kernel; there is nothing to compute
    // them from otherwise.
    let kernel_intensity_ids = c.index_ids(
        OI_KERNEL_INTENSITY,
        "KI_INDEX",
        kernel_intensities.iter().map(|(row, k)| (*row, k.index)),
    );
    for (row, k) in &kernel_intensities {
        c.require(OI_KERNEL_INTENSITY, *row, "TARGET_ID", k.target_id, &target_ids);
        c.require(OI_KERNEL_INTENSITY, *row, "KERNEL", k.kernel, &kernel_ids);
        c.require(OI_KERNEL_INTENSITY, *row, "WAVE_ID", k.wavelength_id, &wavelength_ids);
        if !(k.variance >= 0.0) {
            c.flag(OI_KERNEL_INTENSITY, *row, Invariant::NegativeVariance(k.variance));
        }
    }

    c.check_covariances(
        OI_KERNEL_COVARIANCE,
        &kernel_intensity_ids,
        kernel_covariances.iter().map(|(row, e)| (*row, e.index_a, e.index_b)),
    );

    // Order by table position, then row. The sort is stable, so checks on the
    // same row keep the order they ran in.
    let version = document.header().format_version;
    let registry = document.registry();
    let positions: HashMap<&str, usize> = c
        .violations
        .iter()
        .map(|v| v.table)
        .unique()
        .map(|t| (t, registry.position(t, version).unwrap_or(usize::MAX)))
        .collect();
    let mut violations = c.violations;
    violations.sort_by_key(|v| (positions[v.table], v.row));

    let element_index = elements.iter().enumerate().map(|(i, e)| (e.id, i)).collect();
    let catalog = Catalog {
        targets: strip(targets),
        elements,
        element_index,
        wavelengths: strip(wavelengths),
        transfer_matrix: strip(transfer),
        kernel_matrix: strip(kernel),
        input_phasors: strip(phasors),
        intensities: strip(intensities),
        covariances: strip(covariances),
        kernel_intensities: strip(kernel_intensities),
        kernel_covariances: strip(kernel_covariances),
    };
    (catalog, ValidationReport { violations })
}

fn strip<T>(records: Vec<(usize, T)>) -> Vec<T> {
    records.into_iter().map(|(_, r)| r).collect()
}

/// Flag every problem with one station's samples. Returns the trajectory if
/// there were none.
fn check_motion<S: TableSource + ?Sized>(
    c: &mut Checker<S>,
    id: i32,
    interpolation: Interpolation,
    samples: &[(usize, PositionSample)],
) -> Option<Trajectory> {
    let before = c.violations.len();
    for pair in samples.windows(2) {
        let (_, previous) = pair[0];
        let (row, sample) = pair[1];
        if !(sample.time > previous.time) {
            c.flag(
                OI_ARRAY_MOTION,
                row,
                Invariant::NonMonotonicTime {
                    id,
                    previous: previous.time,
                    time: sample.time,
                },
            );
        }
    }
    if interpolation == Interpolation::Hermite {
        for (row, sample) in samples.iter().filter(|(_, s)| s.velocity.is_none()) {
            c.flag(
                OI_ARRAY_MOTION,
                *row,
                Invariant::MissingVelocity {
                    id,
                    time: sample.time,
                },
            );
        }
    }
    if c.violations.len() > before {
        return None;
    }
    Trajectory::sampled(samples.iter().map(|(_, s)| *s).collect(), interpolation).ok()
}

#[cfg(test)]
mod tests {
    use num_complex::Complex64;

    use super::*;
    use crate::{
        document::{begin, DraftDocument},
        geometry::Vector3,
        tables::*,
    };

    fn consistent_draft() -> DraftDocument {
        let mut draft = begin();
        draft
            .add_records(&[Target::new(1, "eps Eri", 53.23, -9.46)])
            .unwrap();
        draft
            .add_records(&[
                ArrayRow::fixed(10, "UT1", "U1", 8.2, Vector3::new(0.0, 0.0, 0.0)),
                ArrayRow::fixed(11, "UT2", "U2", 8.2, Vector3::new(40.0, 20.0, 0.0)),
            ])
            .unwrap();
        draft
            .add_records(&[WavelengthBin {
                id: 0,
                wavelength: 3.8e-6,
                bandwidth: 1e-7,
            }])
            .unwrap();
        let mut entries = vec![];
        for (input, output) in [(10, 0), (10, 1), (11, 0), (11, 1)] {
            entries.push(TransferMatrixEntry {
                input,
                output,
                wavelength_id: 0,
                value: Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0),
            });
        }
        draft.add_records(&entries).unwrap();
        draft
            .add_records(&[
                IntensityEstimate {
                    index: 0,
                    time: 0.0,
                    int_time: 1.0,
                    target_id: 1,
                    output: 0,
                    wavelength_id: 0,
                    value: 10.0,
                    variance: 1.0,
                },
                IntensityEstimate {
                    index: 1,
                    time: 0.0,
                    int_time: 1.0,
                    target_id: 1,
                    output: 1,
                    wavelength_id: 0,
                    value: 1000.0,
                    variance: 30.0,
                },
            ])
            .unwrap();
        draft
            .add_records(&[CovarianceEntry {
                index_a: 0,
                index_b: 1,
                covariance: 0.5,
            }])
            .unwrap();
        draft
    }

    #[test]
    fn consistent_document_has_no_violations() {
        let report = validate(&consistent_draft());
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn missing_station_gives_exactly_one_violation() {
        let mut draft = consistent_draft();
        draft
            .add_records(&[TransferMatrixEntry {
                input: 99,
                output: 0,
                wavelength_id: 0,
                value: Complex64::new(0.0, 1.0),
            }])
            .unwrap();
        let report = validate(&draft);
        assert_eq!(
            report.violations(),
            &[Violation {
                table: OI_TRANSFER_MATRIX,
                row: 4,
                invariant: Invariant::DanglingReference {
                    column: "STA_INDEX",
                    id: 99
                }
            }]
        );
    }

    #[test]
    fn covariance_never_on_the_diagonal() {
        let mut draft = consistent_draft();
        draft
            .add_records(&[
                CovarianceEntry {
                    index_a: 1,
                    index_b: 1,
                    covariance: 30.0,
                },
                CovarianceEntry {
                    index_a: 1,
                    index_b: 0,
                    covariance: 0.5,
                },
                CovarianceEntry {
                    index_a: 0,
                    index_b: 7,
                    covariance: 0.1,
                },
            ])
            .unwrap();
        let report = validate(&draft);
        let invariants: Vec<_> = report.for_table(OI_COVARIANCE).map(|v| &v.invariant).collect();
        assert_eq!(
            invariants,
            [
                &Invariant::SelfCovariance { index: 1 },
                &Invariant::DuplicateCovariance {
                    index_a: 1,
                    index_b: 0
                },
                &Invariant::DanglingReference {
                    column: "INDEX_B",
                    id: 7
                },
            ]
        );
    }

    #[test]
    fn kernel_outputs_reference_their_kernel() {
        let mut draft = consistent_draft();
        draft
            .add_records(&[
                KernelMatrixEntry {
                    kernel: 0,
                    output: 0,
                    coefficient: 1.0,
                },
                KernelMatrixEntry {
                    kernel: 0,
                    output: 1,
                    coefficient: -1.0,
                },
            ])
            .unwrap();
        let output = |index, kernel| KernelIntensityEstimate {
            index,
            time: 0.0,
            int_time: 1.0,
            target_id: 1,
            kernel,
            wavelength_id: 0,
            value: -990.0,
            variance: 31.0,
        };
        draft.add_records(&[output(0, 0), output(1, 4)]).unwrap();
        draft
            .add_records(&[
                KernelCovarianceEntry {
                    index_a: 0,
                    index_b: 1,
                    covariance: 0.5,
                },
                KernelCovarianceEntry {
                    index_a: 1,
                    index_b: 1,
                    covariance: 31.0,
                },
                KernelCovarianceEntry {
                    index_a: 0,
                    index_b: 2,
                    covariance: 0.5,
                },
            ])
            .unwrap();
        let report = validate(&draft);
        assert_eq!(
            report.violations(),
            &[
                Violation {
                    table: OI_KERNEL_INTENSITY,
                    row: 1,
                    invariant: Invariant::DanglingReference {
                        column: "KERNEL",
                        id: 4
                    }
                },
                Violation {
                    table: OI_KERNEL_COVARIANCE,
                    row: 1,
                    invariant: Invariant::SelfCovariance { index: 1 }
                },
                Violation {
                    table: OI_KERNEL_COVARIANCE,
                    row: 2,
                    invariant: Invariant::DanglingReference {
                        column: "INDEX_B",
                        id: 2
                    }
                },
            ]
        );

        // Without the kernel matrix, none of the kernel outputs stand.
        draft.remove_table(OI_KERNEL_MATRIX);
        assert_eq!(validate(&draft).for_table(OI_KERNEL_INTENSITY).count(), 2);
    }

    #[test]
    fn phasor_targets_and_areas_are_checked() {
        let mut draft = consistent_draft();
        let sample = |target_id, collecting_area| InputPhasorSample {
            time: 0.0,
            int_time: 1.0,
            input: 10,
            wavelength_id: 0,
            polarization: Polarization::Unpolarized,
            perturbation: InputPerturbation::Phasor(Complex64::new(1.0, 0.0)),
            target_id,
            collecting_area,
        };
        draft
            .add_records(&[
                sample(Some(1), Some(52.8)),
                sample(None, None),
                sample(Some(3), Some(0.0)),
            ])
            .unwrap();
        let invariants: Vec<_> = validate(&draft)
            .for_table(OI_INPUT_PHASOR)
            .map(|v| (v.row, v.invariant.clone()))
            .collect();
        assert_eq!(
            invariants,
            [
                (
                    2,
                    Invariant::DanglingReference {
                        column: "TARGET_ID",
                        id: 3
                    }
                ),
                (2, Invariant::NonPositiveArea(0.0)),
            ]
        );
    }

    #[test]
    fn wavelength_checks() {
        let mut draft = consistent_draft();
        draft
            .add_records(&[
                WavelengthBin {
                    id: 0,
                    wavelength: 4e-6,
                    bandwidth: 1e-7,
                },
                WavelengthBin {
                    id: 1,
                    wavelength: 0.0,
                    bandwidth: 1e-7,
                },
                WavelengthBin {
                    id: 2,
                    wavelength: f64::NAN,
                    bandwidth: -1e-7,
                },
            ])
            .unwrap();
        let report = validate(&draft);
        let rows: Vec<_> = report.for_table(OI_WAVELENGTH).map(|v| v.row).collect();
        // id 0 repeated, id 1 zero wavelength, id 2 NaN wavelength and
        // negative bandwidth.
        assert_eq!(rows, [1, 2, 3, 3]);
    }

    #[test]
    fn motion_samples_must_increase() {
        let mut draft = consistent_draft();
        draft
            .add_records(&[ArrayRow::moving(12, "SC1", "SC1", 2.0, Interpolation::Linear)])
            .unwrap();
        let sample = |time| MotionRow {
            id: 12,
            sample: PositionSample {
                time,
                position: Vector3::new(time, 0.0, 0.0),
                velocity: None,
            },
        };
        draft
            .add_records(&[sample(0.0), sample(10.0), sample(10.0), sample(5.0)])
            .unwrap();
        let report = validate(&draft);
        assert_eq!(
            report.violations(),
            &[
                Violation {
                    table: OI_ARRAY_MOTION,
                    row: 2,
                    invariant: Invariant::NonMonotonicTime {
                        id: 12,
                        previous: 10.0,
                        time: 10.0
                    }
                },
                Violation {
                    table: OI_ARRAY_MOTION,
                    row: 3,
                    invariant: Invariant::NonMonotonicTime {
                        id: 12,
                        previous: 10.0,
                        time: 5.0
                    }
                },
            ]
        );
    }

    #[test]
    fn geometry_declarations_must_agree_with_samples() {
        let mut draft = consistent_draft();
        draft
            .add_records(&[
                ArrayRow::moving(12, "SC1", "SC1", 2.0, Interpolation::Hermite),
                ArrayRow::moving(13, "SC2", "SC2", 2.0, Interpolation::Linear),
            ])
            .unwrap();
        draft
            .add_records(&[
                MotionRow {
                    id: 12,
                    sample: PositionSample {
                        time: 0.0,
                        position: Vector3::default(),
                        velocity: None,
                    },
                },
                MotionRow {
                    id: 10,
                    sample: PositionSample {
                        time: 0.0,
                        position: Vector3::default(),
                        velocity: None,
                    },
                },
            ])
            .unwrap();
        let report = validate(&draft);
        assert_eq!(
            report.violations(),
            &[
                Violation {
                    table: OI_ARRAY,
                    row: 3,
                    invariant: Invariant::MissingMotionSamples { id: 13 }
                },
                Violation {
                    table: OI_ARRAY_MOTION,
                    row: 0,
                    invariant: Invariant::MissingVelocity { id: 12, time: 0.0 }
                },
                Violation {
                    table: OI_ARRAY_MOTION,
                    row: 1,
                    invariant: Invariant::MotionForStaticElement { id: 10 }
                },
            ]
        );
    }

    #[test]
    fn reports_are_deterministic_and_printable() {
        let mut draft = consistent_draft();
        draft
            .add_records(&[IntensityEstimate {
                index: 0,
                time: 1.0,
                int_time: 1.0,
                target_id: 5,
                output: 9,
                wavelength_id: 3,
                value: 1.0,
                variance: -1.0,
            }])
            .unwrap();
        let first = validate(&draft);
        let second = validate(&draft);
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        let printed = first.to_string();
        assert!(printed.starts_with("5 violations:"));
        assert!(printed.contains("OI_INTENSITY row 2: duplicate INT_INDEX 0"));
        assert!(printed.contains("OI_INTENSITY row 2: TARGET_ID 5 does not exist"));
    }
}
