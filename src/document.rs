//! Assembling tables into documents.
//!
//! A [`DraftDocument`] is a mutable staging area. It can only become a
//! [`Document`] by [`DraftDocument::seal`]ing it, which succeeds only when the
//! validator has nothing to report. A sealed document can't be changed; a new
//! revision starts from [`Document::revise`].

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
};

use hifitime::Epoch;
use log::{debug, warn};
use ndarray::Array3;
use num_complex::Complex64;
use thiserror::Error;

use crate::{
    codec::{Layout, Precision, Value},
    geometry::{self, ArrayElement, GeometryError, Vector3},
    schema::{SchemaError, SchemaRegistry, TableKind, TableSchema, CURRENT_FORMAT_VERSION, REGISTRY},
    tables::{
        CovarianceEntry, InputPhasorSample, IntensityEstimate, KernelCovarianceEntry,
        KernelIntensityEstimate, KernelMatrixEntry, RecordError, RowView, TableRecord, Target,
        TransferMatrixEntry, WavelengthBin,
    },
    validate::{self, ValidationReport},
};

/// Document-wide declarations that apply to every table.
#[derive(Debug, Clone)]
pub struct Header {
    pub format_version: u32,
    pub layout: Layout,
    /// All timestamps are seconds since this epoch.
    pub epoch: Epoch,
    pub units: String,
    /// Incremented by every [`Document::revise`].
    pub revision: u32,
}

impl Header {
    pub fn new(epoch: Epoch) -> Header {
        Header {
            format_version: CURRENT_FORMAT_VERSION,
            layout: Layout::default(),
            epoch,
            units: "SI".to_string(),
            revision: 0,
        }
    }
}

impl Default for Header {
    fn default() -> Header {
        Header::new(Epoch::from_gregorian_utc_at_midnight(2000, 1, 1))
    }
}

// Epochs are compared by their TAI parts, which is what gets serialised; the
// time scale they were created in doesn't matter.
impl PartialEq for Header {
    fn eq(&self, other: &Header) -> bool {
        self.format_version == other.format_version
            && self.layout == other.layout
            && self.epoch.to_tai_parts() == other.epoch.to_tai_parts()
            && self.units == other.units
            && self.revision == other.revision
    }
}

/// The rows of one table, all checked against `schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: &'static TableSchema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub(crate) fn new(schema: &'static TableSchema) -> Table {
        Table {
            schema,
            rows: vec![],
        }
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<RowView> {
        self.rows.get(i).map(|values| RowView::new(self.schema, values))
    }

    /// Read every row as a `T`.
    pub fn records<T: TableRecord>(&self) -> Result<Vec<T>, RecordError> {
        self.rows
            .iter()
            .map(|values| T::from_row(&RowView::new(self.schema, values)))
            .collect()
    }

    /// Append rows after checking every one of them; nothing is appended if
    /// any row is refused.
    pub(crate) fn extend(
        &mut self,
        rows: Vec<Vec<Value>>,
        precision: Precision,
    ) -> Result<(), SchemaError> {
        for (i, row) in rows.iter().enumerate() {
            self.schema
                .check_row(row, precision)
                .map_err(|problem| SchemaError::SchemaMismatch {
                    table: self.schema.name.to_string(),
                    row: self.rows.len() + i,
                    problem,
                })?;
        }
        self.rows.extend(rows);
        Ok(())
    }
}

/// Anything holding a set of tables under a header: drafts and sealed
/// documents alike.
pub trait TableSource {
    fn header(&self) -> &Header;

    fn registry(&self) -> &'static SchemaRegistry;

    /// Tables in the registry's canonical order.
    fn tables(&self) -> &[Table];

    fn table(&self, name: &str) -> Option<&Table> {
        self.tables().iter().find(|t| t.name() == name)
    }
}

/// Start a draft in the current format version.
pub fn begin() -> DraftDocument {
    DraftDocument {
        header: Header::default(),
        provenance: BTreeMap::new(),
        registry: &REGISTRY,
        tables: vec![],
    }
}

/// Start a draft with a specific header. Fails if the built-in registry
/// doesn't know the header's format version.
pub fn begin_with(header: Header) -> Result<DraftDocument, SchemaError> {
    DraftDocument::with_registry(header, &REGISTRY)
}

#[derive(Debug, Clone)]
pub struct DraftDocument {
    header: Header,
    provenance: BTreeMap<String, String>,
    registry: &'static SchemaRegistry,
    tables: Vec<Table>,
}

impl DraftDocument {
    pub fn with_registry(
        header: Header,
        registry: &'static SchemaRegistry,
    ) -> Result<DraftDocument, SchemaError> {
        if !registry.supports(header.format_version) {
            return Err(SchemaError::UnsupportedVersion(header.format_version));
        }
        Ok(DraftDocument {
            header,
            provenance: BTreeMap::new(),
            registry,
            tables: vec![],
        })
    }

    pub fn provenance(&self) -> &BTreeMap<String, String> {
        &self.provenance
    }

    /// Record free-form provenance, e.g. the pipeline that produced the data.
    pub fn set_provenance<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.provenance.insert(key.into(), value.into());
    }

    /// Add rows to a table, creating it if needed. Fails without changing the
    /// draft if the table isn't registered for this format version or any row
    /// doesn't match the table's schema.
    pub fn add_table(&mut self, table_name: &str, rows: Vec<Vec<Value>>) -> Result<(), SchemaError> {
        let version = self.header.format_version;
        let schema = self.registry.schema_for(table_name, version)?;
        let precision = self.header.layout.precision;
        let num_rows = rows.len();
        match self.tables.iter_mut().find(|t| t.name() == schema.name) {
            Some(table) => table.extend(rows, precision)?,
            None => {
                let mut table = Table::new(schema);
                table.extend(rows, precision)?;
                // Keep canonical order.
                let position = |name| self.registry.position(name, version);
                let new_position = position(schema.name);
                let i = self
                    .tables
                    .iter()
                    .position(|t| position(t.name()) > new_position)
                    .unwrap_or(self.tables.len());
                self.tables.insert(i, table);
            }
        }
        debug!("Added {num_rows} rows to {table_name}");
        Ok(())
    }

    /// Add typed records to their table.
    pub fn add_records<T: TableRecord>(&mut self, records: &[T]) -> Result<(), SchemaError> {
        let version = self.header.format_version;
        let schema = self.registry.schema_for(T::TABLE, version)?;
        let rows = records
            .iter()
            .map(|r| schema.row_from_named(version, r.to_named()))
            .collect::<Result<Vec<_>, _>>()?;
        self.add_table(T::TABLE, rows)
    }

    /// Keep only the rows of a table for which `keep` returns true. Returns
    /// the number of rows removed.
    pub fn retain_rows<F: FnMut(RowView) -> bool>(
        &mut self,
        table_name: &str,
        mut keep: F,
    ) -> Result<usize, SchemaError> {
        let schema = self
            .registry
            .schema_for(table_name, self.header.format_version)?;
        let table = match self.tables.iter_mut().find(|t| t.name() == schema.name) {
            Some(t) => t,
            None => return Ok(0),
        };
        let before = table.rows.len();
        table.rows.retain(|values| keep(RowView::new(schema, values)));
        Ok(before - table.rows.len())
    }

    pub fn remove_table(&mut self, table_name: &str) -> Option<Table> {
        let i = self.tables.iter().position(|t| t.name() == table_name)?;
        Some(self.tables.remove(i))
    }

    pub fn validate(&self) -> ValidationReport {
        validate::validate(self)
    }

    /// Seal the draft if it is valid. Otherwise the report comes back with
    /// the draft, which can be corrected and sealed again.
    pub fn seal(self) -> Result<Document, Rejected> {
        let (catalog, report) = validate::analyse(&self);
        if !report.is_empty() {
            warn!("Refusing to seal a document with {} violations", report.len());
            return Err(Rejected {
                draft: self,
                report,
            });
        }
        debug!(
            "Sealed revision {} ({} tables)",
            self.header.revision,
            self.tables.len()
        );
        Ok(Document {
            header: self.header,
            provenance: self.provenance,
            registry: self.registry,
            tables: self.tables,
            catalog,
        })
    }
}

impl TableSource for DraftDocument {
    fn header(&self) -> &Header {
        &self.header
    }

    fn registry(&self) -> &'static SchemaRegistry {
        self.registry
    }

    fn tables(&self) -> &[Table] {
        &self.tables
    }
}

/// A draft that failed validation, returned with everything wrong with it.
#[derive(Error, Debug)]
#[error("The document is not valid; {report}")]
pub struct Rejected {
    pub draft: DraftDocument,
    pub report: ValidationReport,
}

/// A sealed, valid, immutable document.
#[derive(Debug, Clone)]
pub struct Document {
    header: Header,
    provenance: BTreeMap<String, String>,
    registry: &'static SchemaRegistry,
    tables: Vec<Table>,
    catalog: Catalog,
}

impl PartialEq for Document {
    fn eq(&self, other: &Document) -> bool {
        self.header == other.header
            && self.provenance == other.provenance
            && self.tables == other.tables
    }
}

impl Document {
    pub fn provenance(&self) -> &BTreeMap<String, String> {
        &self.provenance
    }

    /// Typed access to the document's content.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Sealing is terminal; sealing again returns the document untouched.
    pub fn seal(self) -> Document {
        self
    }

    /// Start the next revision: a draft holding a copy of this document's
    /// content.
    pub fn revise(&self) -> DraftDocument {
        let mut header = self.header.clone();
        header.revision += 1;
        DraftDocument {
            header,
            provenance: self.provenance.clone(),
            registry: self.registry,
            tables: self.tables.clone(),
        }
    }

    /// The same overview as this document's `Display`.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// The position of station `sta_index` at `time` seconds since the epoch.
    pub fn position_at(&self, sta_index: i32, time: f64) -> Result<Vector3, GeometryError> {
        self.catalog
            .element(sta_index)
            .ok_or(GeometryError::UnknownElement(sta_index))?
            .position_at(time)
    }

    /// The baseline from station `a` to station `b` at `time`.
    pub fn baseline_at(&self, a: i32, b: i32, time: f64) -> Result<Vector3, GeometryError> {
        let a = self.catalog.element(a).ok_or(GeometryError::UnknownElement(a))?;
        let b = self.catalog.element(b).ok_or(GeometryError::UnknownElement(b))?;
        geometry::baseline_at(a, b, time)
    }
}

impl TableSource for Document {
    fn header(&self) -> &Header {
        &self.header
    }

    fn registry(&self) -> &'static SchemaRegistry {
        self.registry
    }

    fn tables(&self) -> &[Table] {
        &self.tables
    }
}

/// A human-readable overview of the document.
impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let h = &self.header;
        writeln!(f, "NIFITS format version {}, revision {}", h.format_version, h.revision)?;
        writeln!(
            f,
            "Epoch {}, {:?} endian, {:?} precision reals, {} units",
            h.epoch, h.layout.endianness, h.layout.precision, h.units
        )?;
        for (key, value) in &self.provenance {
            writeln!(f, "  {key} = {value}")?;
        }
        for table in &self.tables {
            let kind = match table.schema().kind {
                TableKind::Static => "static",
                TableKind::Dynamic => "dynamic",
            };
            writeln!(f, "{:<20} {:>8} rows ({kind})", table.name(), table.len())?;
        }
        let moving = self.catalog.elements.iter().filter(|e| !e.is_static()).count();
        if moving > 0 {
            writeln!(f, "{moving} of {} stations are moving", self.catalog.elements.len())?;
        }
        Ok(())
    }
}

/// Every record of a document, read into typed form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    pub(crate) targets: Vec<Target>,
    pub(crate) elements: Vec<ArrayElement>,
    /// `STA_INDEX` to position in `elements`.
    pub(crate) element_index: HashMap<i32, usize>,
    pub(crate) wavelengths: Vec<WavelengthBin>,
    pub(crate) transfer_matrix: Vec<TransferMatrixEntry>,
    pub(crate) kernel_matrix: Vec<KernelMatrixEntry>,
    pub(crate) input_phasors: Vec<InputPhasorSample>,
    pub(crate) intensities: Vec<IntensityEstimate>,
    pub(crate) covariances: Vec<CovarianceEntry>,
    pub(crate) kernel_intensities: Vec<KernelIntensityEstimate>,
    pub(crate) kernel_covariances: Vec<KernelCovarianceEntry>,
}

impl Catalog {
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn elements(&self) -> &[ArrayElement] {
        &self.elements
    }

    pub fn element(&self, sta_index: i32) -> Option<&ArrayElement> {
        self.element_index
            .get(&sta_index)
            .and_then(|&i| self.elements.get(i))
    }

    pub fn wavelengths(&self) -> &[WavelengthBin] {
        &self.wavelengths
    }

    pub fn transfer_matrix(&self) -> &[TransferMatrixEntry] {
        &self.transfer_matrix
    }

    pub fn kernel_matrix(&self) -> &[KernelMatrixEntry] {
        &self.kernel_matrix
    }

    pub fn input_phasors(&self) -> &[InputPhasorSample] {
        &self.input_phasors
    }

    pub fn intensities(&self) -> &[IntensityEstimate] {
        &self.intensities
    }

    pub fn covariances(&self) -> &[CovarianceEntry] {
        &self.covariances
    }

    pub fn kernel_intensities(&self) -> &[KernelIntensityEstimate] {
        &self.kernel_intensities
    }

    pub fn kernel_covariances(&self) -> &[KernelCovarianceEntry] {
        &self.kernel_covariances
    }

    /// The transfer matrix as a dense `[wavelength][output][input]` array.
    /// Entries the table doesn't list are zero.
    pub fn transfer_matrix_cube(&self) -> TransferCube {
        let wavelength_ids: Vec<i32> = self.wavelengths.iter().map(|w| w.id).collect();
        let wavelength_index: HashMap<i32, usize> =
            wavelength_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut outputs: Vec<i32> = self.transfer_matrix.iter().map(|e| e.output).collect();
        outputs.sort_unstable();
        outputs.dedup();
        let mut inputs: Vec<i32> = self.transfer_matrix.iter().map(|e| e.input).collect();
        inputs.sort_unstable();
        inputs.dedup();

        let mut values = Array3::zeros((wavelength_ids.len(), outputs.len(), inputs.len()));
        for e in &self.transfer_matrix {
            let i_wl = wavelength_index.get(&e.wavelength_id).copied();
            let i_out = outputs.binary_search(&e.output).ok();
            let i_in = inputs.binary_search(&e.input).ok();
            if let (Some(i_wl), Some(i_out), Some(i_in)) = (i_wl, i_out, i_in) {
                values[(i_wl, i_out, i_in)] = e.value;
            }
        }
        TransferCube {
            wavelength_ids,
            outputs,
            inputs,
            values,
        }
    }
}

/// A dense transfer matrix with the identifiers labelling each axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferCube {
    /// `WAVE_ID`s in `OI_WAVELENGTH` order.
    pub wavelength_ids: Vec<i32>,
    /// `OUT_PORT`s, ascending.
    pub outputs: Vec<i32>,
    /// Input `STA_INDEX`es, ascending.
    pub inputs: Vec<i32>,
    pub values: Array3<Complex64>,
}
