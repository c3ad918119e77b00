//! Read access to the ChEBI chemical ontology.
//!
//! The crate downloads the monthly flat-file release from EBI on demand,
//! caches it locally (filesystem or object-storage bucket), parses each
//! dataset into in-memory indices on first use, and answers per-compound
//! lookups through [`entity::ChebiEntity`].
//!
//! ```no_run
//! use libchebi::cache::ChebiCache;
//! use libchebi::entity::ChebiEntity;
//!
//! # fn main() -> Result<(), libchebi::error::ChebiError> {
//! let cache = ChebiCache::from_env()?;
//! let entity = ChebiEntity::new(&cache, "CHEBI:15903".parse()?)?;
//! println!("{:?}", entity.name()?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod domain;
pub mod entity;
pub mod error;
pub mod fs_util;
pub mod search;
pub mod store;

pub use cache::ChebiCache;
pub use config::ChebiConfig;
pub use domain::{
    ChebiId, Comment, CompoundOrigin, DatabaseAccession, Formula, Name, Reference, Relation,
    Structure, StructureKind,
};
pub use entity::ChebiEntity;
pub use error::ChebiError;
pub use search::search;
