//! Reading, writing and validating NIFITS documents: OIFITS extended with the
//! tables nulling interferometry needs.
//!
//! Build a document with [`document::begin`], add tables, and
//! [`seal`](document::DraftDocument::seal) it; only valid documents seal.
//! Sealed documents are written with [`write::encode`] and read back with
//! [`read::decode`].

pub mod codec;
pub mod container;
pub mod document;
pub mod geometry;
pub mod read;
pub mod schema;
pub mod tables;
pub mod validate;
pub mod write;

use thiserror::Error;

pub use codec::{TypeTag, Value};
pub use document::{begin, begin_with, Catalog, Document, DraftDocument, Header, TableSource};
pub use geometry::Vector3;
pub use validate::{validate, ValidationReport};

/// Everything that can go wrong, for callers that don't care which layer
/// failed.
#[derive(Error, Debug)]
pub enum NifitsError {
    #[error(transparent)]
    Read(#[from] read::ReadError),

    #[error(transparent)]
    Write(#[from] write::WriteError),

    #[error(transparent)]
    Fits(#[from] read::fits::FitsError),

    #[error(transparent)]
    Schema(#[from] schema::SchemaError),

    #[error(transparent)]
    Rejected(#[from] document::Rejected),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
