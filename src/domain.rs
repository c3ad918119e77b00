use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ChebiError;

/// A ChEBI compound identifier. Canonical form is the bare integer; the
/// `CHEBI:` prefix is accepted on input and rendered on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChebiId(u32);

impl ChebiId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChebiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CHEBI:{}", self.0)
    }
}

impl FromStr for ChebiId {
    type Err = ChebiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("CHEBI:")
            .or_else(|| trimmed.strip_prefix("chebi:"))
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_| ChebiError::InvalidId(value.to_string()))
    }
}

impl From<u32> for ChebiId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Molecular formula, annotated with the database it came from. A compound
/// may carry several disagreeing formulae from different sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Formula {
    pub formula: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub category: String,
    pub subcategory: String,
    pub text: String,
    pub created_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompoundOrigin {
    pub species_text: Option<String>,
    pub species_accession: Option<String>,
    pub component_text: Option<String>,
    pub component_accession: Option<String>,
    pub strain_text: Option<String>,
    pub strain_accession: Option<String>,
    pub source_type: Option<String>,
    pub source_accession: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseAccession {
    pub accession_type: String,
    pub accession_number: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Name {
    pub name: String,
    pub name_type: String,
    pub source: String,
    pub adapted: bool,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub reference_id: String,
    pub reference_db_name: String,
    pub location_in_ref: Option<String>,
    pub reference_name: Option<String>,
}

/// One directed ontology edge. An outgoing relation stores the target id,
/// an incoming relation stores the source id; `other_id` is the compound at
/// the far end either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub relation_type: String,
    pub other_id: ChebiId,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StructureKind {
    InChIKey,
    Smiles,
    Mol,
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureKind::InChIKey => write!(f, "InChIKey"),
            StructureKind::Smiles => write!(f, "SMILES"),
            StructureKind::Mol => write!(f, "mol"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Structure {
    pub structure: String,
    pub kind: StructureKind,
    pub dimension: u32,
}

/// Translates the flat-file `null` sentinel to an absent value.
pub(crate) fn nullable(token: &str) -> Option<String> {
    if token == "null" {
        None
    } else {
        Some(token.to_string())
    }
}
