use std::collections::{HashMap, HashSet};
use std::io::Write;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;

use crate::config::ChebiConfig;
use crate::domain::{
    ChebiId, Comment, CompoundOrigin, DatabaseAccession, Formula, Name, Reference, Relation,
    Structure, StructureKind, nullable,
};
use crate::error::ChebiError;
use crate::fs_util;
use crate::store::{BlobStore, build_store};

pub const CHEMICAL_DATA_TSV: &str = "chemical_data.tsv";
pub const COMMENTS_TSV: &str = "comments.tsv";
pub const COMPOUND_ORIGINS_TSV: &str = "compound_origins.tsv";
pub const COMPOUNDS_TSV_GZ: &str = "compounds.tsv.gz";
pub const DATABASE_ACCESSION_TSV: &str = "database_accession.tsv";
pub const INCHI_TSV: &str = "chebiId_inchi.tsv";
pub const NAMES_TSV_GZ: &str = "names.tsv.gz";
pub const REFERENCE_TSV_GZ: &str = "reference.tsv.gz";
pub const RELATION_TSV: &str = "relation.tsv";
pub const STRUCTURES_CSV_GZ: &str = "structures.csv.gz";

const DATE_FORMAT: &str = "%Y-%m-%d";

// Mol candidate block start: `<row id>,<compound id>,<first mol line>`.
static MOL_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+),(\d+),").unwrap());
// Block end marker carrying the dimension and the default flag.
static MOL_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^",mol,(\d)D,([YN]),[YN]$"#).unwrap());

/// One session's worth of parsed release data. Each index populates at most
/// once, on first access; a failed population leaves its guard unset.
pub struct ChebiCache {
    store: Box<dyn BlobStore>,
    chemical_data: OnceCell<ChemicalData>,
    compounds: OnceCell<Compounds>,
    comments: OnceCell<HashMap<ChebiId, Vec<Comment>>>,
    origins: OnceCell<HashMap<ChebiId, Vec<CompoundOrigin>>>,
    accessions: OnceCell<HashMap<ChebiId, Vec<DatabaseAccession>>>,
    inchis: OnceCell<HashMap<ChebiId, String>>,
    names: OnceCell<HashMap<ChebiId, Vec<Name>>>,
    relations: OnceCell<Relations>,
    structures: OnceCell<Structures>,
}

#[derive(Default)]
struct ChemicalData {
    formulae: HashMap<ChebiId, Vec<Formula>>,
    masses: HashMap<ChebiId, f64>,
    charges: HashMap<ChebiId, i32>,
}

#[derive(Default)]
struct Compounds {
    statuses: HashMap<ChebiId, String>,
    sources: HashMap<ChebiId, String>,
    parents: HashMap<ChebiId, Option<ChebiId>>,
    // root id -> members in file-registration order; every compound
    // registers under itself, children additionally under their parent.
    groups: HashMap<ChebiId, Vec<ChebiId>>,
    names: HashMap<ChebiId, Option<String>>,
    definitions: HashMap<ChebiId, Option<String>>,
    modified_ons: HashMap<ChebiId, Option<NaiveDate>>,
    created_bys: HashMap<ChebiId, Option<String>>,
    stars: HashMap<ChebiId, Option<u8>>,
}

#[derive(Default)]
struct Relations {
    outgoings: HashMap<ChebiId, Vec<Relation>>,
    incomings: HashMap<ChebiId, Vec<Relation>>,
}

#[derive(Default)]
struct Structures {
    inchi_keys: HashMap<ChebiId, Structure>,
    smiles: HashMap<ChebiId, Structure>,
}

struct Row<'a> {
    file: &'static str,
    line: usize,
    tokens: Vec<&'a str>,
}

impl Row<'_> {
    fn col(&self, idx: usize) -> Result<&str, ChebiError> {
        self.tokens
            .get(idx)
            .copied()
            .ok_or_else(|| self.malformed(&format!("missing field {}", idx + 1)))
    }

    fn id(&self, idx: usize) -> Result<ChebiId, ChebiError> {
        let token = self.col(idx)?;
        token
            .parse()
            .map_err(|_| self.malformed(&format!("invalid compound id {token:?}")))
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn malformed(&self, detail: &str) -> ChebiError {
        ChebiError::MalformedRow {
            file: self.file.to_string(),
            line: self.line,
            detail: detail.to_string(),
        }
    }
}

fn rows<'a>(
    text: &'a str,
    file: &'static str,
    delimiter: char,
) -> impl Iterator<Item = Row<'a>> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim_end().is_empty())
        .map(move |(index, line)| Row {
            file,
            line: index + 1,
            tokens: line.trim_end().split(delimiter).collect(),
        })
}

// ChEBI writes negative charges with a trailing sign ("4-").
fn parse_charge(token: &str) -> Option<i32> {
    match token.strip_suffix('-') {
        Some(digits) if !digits.is_empty() => format!("-{digits}").parse().ok(),
        _ => token.parse().ok(),
    }
}

impl ChebiCache {
    pub fn new(config: &ChebiConfig) -> Result<Self, ChebiError> {
        Ok(Self::with_store(build_store(config)?))
    }

    pub fn from_env() -> Result<Self, ChebiError> {
        Self::new(&ChebiConfig::from_env())
    }

    pub fn with_store(store: Box<dyn BlobStore>) -> Self {
        Self {
            store,
            chemical_data: OnceCell::new(),
            compounds: OnceCell::new(),
            comments: OnceCell::new(),
            origins: OnceCell::new(),
            accessions: OnceCell::new(),
            inchis: OnceCell::new(),
            names: OnceCell::new(),
            relations: OnceCell::new(),
            structures: OnceCell::new(),
        }
    }

    fn read_file(&self, name: &str) -> Result<String, ChebiError> {
        let path = self.store.fetch(name)?;
        fs_util::read_text(&path)
    }

    // Chemical data: formulae accumulate per source database, mass and
    // charge overwrite.

    fn chemical_data(&self) -> Result<&ChemicalData, ChebiError> {
        self.chemical_data.get_or_try_init(|| {
            let text = self.read_file(CHEMICAL_DATA_TSV)?;
            let mut data = ChemicalData::default();
            for row in rows(&text, CHEMICAL_DATA_TSV, '\t') {
                match row.col(3)? {
                    "FORMULA" => {
                        // Contradictory formulae exist depending on the
                        // source database; keep them all.
                        data.formulae.entry(row.id(1)?).or_default().push(Formula {
                            formula: row.col(4)?.to_string(),
                            source: row.col(2)?.to_string(),
                        });
                    }
                    "MASS" => {
                        let mass = row
                            .col(4)?
                            .parse()
                            .map_err(|_| row.malformed("invalid mass"))?;
                        data.masses.insert(row.id(1)?, mass);
                    }
                    "CHARGE" => {
                        let charge = parse_charge(row.col(4)?)
                            .ok_or_else(|| row.malformed("invalid charge"))?;
                        data.charges.insert(row.id(1)?, charge);
                    }
                    _ => {}
                }
            }
            Ok(data)
        })
    }

    pub fn formulae(&self, id: ChebiId) -> Result<&[Formula], ChebiError> {
        Ok(self
            .chemical_data()?
            .formulae
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    pub fn mass(&self, id: ChebiId) -> Result<Option<f64>, ChebiError> {
        Ok(self.chemical_data()?.masses.get(&id).copied())
    }

    pub fn charge(&self, id: ChebiId) -> Result<Option<i32>, ChebiError> {
        Ok(self.chemical_data()?.charges.get(&id).copied())
    }

    // Compounds: the scalar attribute columns plus the parent/child
    // equivalence-group index.

    fn compounds(&self) -> Result<&Compounds, ChebiError> {
        self.compounds.get_or_try_init(|| {
            let text = self.read_file(COMPOUNDS_TSV_GZ)?;
            let mut data = Compounds::default();
            for row in rows(&text, COMPOUNDS_TSV_GZ, '\t') {
                let id = row.id(0)?;
                data.statuses.insert(id, row.col(1)?.to_string());
                data.sources.insert(id, row.col(3)?.to_string());

                let parent_token = row.col(4)?;
                let parent = if parent_token == "null" {
                    None
                } else {
                    Some(row.id(4)?)
                };
                data.parents.insert(id, parent);
                data.groups.entry(id).or_default().push(id);
                if let Some(parent) = parent {
                    data.groups.entry(parent).or_default().push(id);
                }

                data.names.insert(id, nullable(row.col(5)?));
                data.definitions.insert(id, nullable(row.col(6)?));
                let modified_on = match row.col(7)? {
                    "null" => None,
                    token => Some(
                        NaiveDate::parse_from_str(token, DATE_FORMAT)
                            .map_err(|_| row.malformed("invalid modified-on date"))?,
                    ),
                };
                data.modified_ons.insert(id, modified_on);
                // Nine-column rows predate the created-by column; the last
                // column is then the star rating.
                let created_by = if row.len() == 9 {
                    None
                } else {
                    nullable(row.col(8)?)
                };
                data.created_bys.insert(id, created_by);
                let star_token = row.col(if row.len() > 9 { 9 } else { 8 })?;
                let star = if star_token == "null" {
                    None
                } else {
                    Some(
                        star_token
                            .parse()
                            .map_err(|_| row.malformed("invalid star rating"))?,
                    )
                };
                data.stars.insert(id, star);
            }
            Ok(data)
        })
    }

    pub fn status(&self, id: ChebiId) -> Result<Option<&str>, ChebiError> {
        Ok(self.compounds()?.statuses.get(&id).map(String::as_str))
    }

    pub fn source(&self, id: ChebiId) -> Result<Option<&str>, ChebiError> {
        Ok(self.compounds()?.sources.get(&id).map(String::as_str))
    }

    pub fn parent_id(&self, id: ChebiId) -> Result<Option<ChebiId>, ChebiError> {
        Ok(self.compounds()?.parents.get(&id).copied().flatten())
    }

    /// Members registered under `root`, in file order.
    pub fn group_members(&self, root: ChebiId) -> Result<&[ChebiId], ChebiError> {
        Ok(self
            .compounds()?
            .groups
            .get(&root)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    pub fn name(&self, id: ChebiId) -> Result<Option<&str>, ChebiError> {
        Ok(self
            .compounds()?
            .names
            .get(&id)
            .and_then(|name| name.as_deref()))
    }

    pub fn definition(&self, id: ChebiId) -> Result<Option<&str>, ChebiError> {
        Ok(self
            .compounds()?
            .definitions
            .get(&id)
            .and_then(|definition| definition.as_deref()))
    }

    pub fn modified_on(&self, id: ChebiId) -> Result<Option<NaiveDate>, ChebiError> {
        Ok(self.compounds()?.modified_ons.get(&id).copied().flatten())
    }

    pub fn created_by(&self, id: ChebiId) -> Result<Option<&str>, ChebiError> {
        Ok(self
            .compounds()?
            .created_bys
            .get(&id)
            .and_then(|creator| creator.as_deref()))
    }

    pub fn star(&self, id: ChebiId) -> Result<Option<u8>, ChebiError> {
        Ok(self.compounds()?.stars.get(&id).copied().flatten())
    }

    pub fn comments(&self, id: ChebiId) -> Result<&[Comment], ChebiError> {
        let comments = self.comments.get_or_try_init(|| {
            let text = self.read_file(COMMENTS_TSV)?;
            let mut index: HashMap<ChebiId, Vec<Comment>> = HashMap::new();
            for row in rows(&text, COMMENTS_TSV, '\t') {
                let created_on = NaiveDate::parse_from_str(row.col(2)?, DATE_FORMAT)
                    .map_err(|_| row.malformed("invalid created-on date"))?;
                index.entry(row.id(1)?).or_default().push(Comment {
                    category: row.col(3)?.to_string(),
                    subcategory: row.col(4)?.to_string(),
                    text: row.col(5)?.to_string(),
                    created_on,
                });
            }
            Ok(index)
        })?;
        Ok(comments.get(&id).map(Vec::as_slice).unwrap_or_default())
    }

    pub fn compound_origins(&self, id: ChebiId) -> Result<&[CompoundOrigin], ChebiError> {
        let origins = self.origins.get_or_try_init(|| {
            let text = self.read_file(COMPOUND_ORIGINS_TSV)?;
            let mut index: HashMap<ChebiId, Vec<CompoundOrigin>> = HashMap::new();
            for row in rows(&text, COMPOUND_ORIGINS_TSV, '\t') {
                // Rows without the full column set carry no origin data.
                if row.len() <= 10 {
                    continue;
                }
                index.entry(row.id(1)?).or_default().push(CompoundOrigin {
                    species_text: nullable(row.col(2)?),
                    species_accession: nullable(row.col(3)?),
                    component_text: nullable(row.col(4)?),
                    component_accession: nullable(row.col(5)?),
                    strain_text: nullable(row.col(6)?),
                    strain_accession: nullable(row.col(7)?),
                    source_type: nullable(row.col(8)?),
                    source_accession: nullable(row.col(9)?),
                    comments: nullable(row.col(10)?),
                });
            }
            Ok(index)
        })?;
        Ok(origins.get(&id).map(Vec::as_slice).unwrap_or_default())
    }

    pub fn database_accessions(&self, id: ChebiId) -> Result<&[DatabaseAccession], ChebiError> {
        let accessions = self.accessions.get_or_try_init(|| {
            let text = self.read_file(DATABASE_ACCESSION_TSV)?;
            let mut index: HashMap<ChebiId, Vec<DatabaseAccession>> = HashMap::new();
            for row in rows(&text, DATABASE_ACCESSION_TSV, '\t') {
                index.entry(row.id(1)?).or_default().push(DatabaseAccession {
                    accession_type: row.col(3)?.to_string(),
                    accession_number: row.col(4)?.to_string(),
                    source: row.col(2)?.to_string(),
                });
            }
            Ok(index)
        })?;
        Ok(accessions.get(&id).map(Vec::as_slice).unwrap_or_default())
    }

    pub fn inchi(&self, id: ChebiId) -> Result<Option<&str>, ChebiError> {
        let inchis = self.inchis.get_or_try_init(|| {
            let text = self.read_file(INCHI_TSV)?;
            let mut index = HashMap::new();
            for row in rows(&text, INCHI_TSV, '\t') {
                index.insert(row.id(0)?, row.col(1)?.to_string());
            }
            Ok(index)
        })?;
        Ok(inchis.get(&id).map(String::as_str))
    }

    pub fn names(&self, id: ChebiId) -> Result<&[Name], ChebiError> {
        let names = self.names.get_or_try_init(|| {
            let text = self.read_file(NAMES_TSV_GZ)?;
            let mut index: HashMap<ChebiId, Vec<Name>> = HashMap::new();
            for row in rows(&text, NAMES_TSV_GZ, '\t') {
                index.entry(row.id(1)?).or_default().push(Name {
                    name: row.col(4)?.to_string(),
                    name_type: row.col(2)?.to_string(),
                    source: row.col(3)?.to_string(),
                    adapted: row.col(5)? == "T",
                    language: row.col(6)?.to_string(),
                });
            }
            Ok(index)
        })?;
        Ok(names.get(&id).map(Vec::as_slice).unwrap_or_default())
    }

    // Relations: one file feeds two indices. Each edge lands in the source's
    // outgoing list and the target's incoming list, referencing the far end.

    fn relations(&self) -> Result<&Relations, ChebiError> {
        self.relations.get_or_try_init(|| {
            let text = self.read_file(RELATION_TSV)?;
            let mut data = Relations::default();
            for row in rows(&text, RELATION_TSV, '\t') {
                let relation_type = row.col(1)?;
                let target: ChebiId = row
                    .col(2)?
                    .parse()
                    .map_err(|_| row.malformed("invalid target id"))?;
                let source: ChebiId = row
                    .col(3)?
                    .parse()
                    .map_err(|_| row.malformed("invalid source id"))?;
                let status = row.col(4)?;
                data.outgoings.entry(source).or_default().push(Relation {
                    relation_type: relation_type.to_string(),
                    other_id: target,
                    status: status.to_string(),
                });
                data.incomings.entry(target).or_default().push(Relation {
                    relation_type: relation_type.to_string(),
                    other_id: source,
                    status: status.to_string(),
                });
            }
            Ok(data)
        })
    }

    pub fn outgoings(&self, id: ChebiId) -> Result<&[Relation], ChebiError> {
        Ok(self
            .relations()?
            .outgoings
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    pub fn incomings(&self, id: ChebiId) -> Result<&[Relation], ChebiError> {
        Ok(self
            .relations()?
            .incomings
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    // Structures: InChIKey and SMILES are 1:1 per compound, later rows
    // overwrite earlier ones. Mol blocks are handled separately below.

    fn structures(&self) -> Result<&Structures, ChebiError> {
        self.structures.get_or_try_init(|| {
            let text = self.read_file(STRUCTURES_CSV_GZ)?;
            let mut data = Structures::default();
            for row in rows(&text, STRUCTURES_CSV_GZ, ',') {
                if row.len() != 7 {
                    continue;
                }
                let kind = match row.col(3)? {
                    "InChIKey" => StructureKind::InChIKey,
                    "SMILES" => StructureKind::Smiles,
                    _ => continue,
                };
                let structure = Structure {
                    structure: row.col(2)?.to_string(),
                    kind,
                    dimension: row
                        .col(4)?
                        .chars()
                        .next()
                        .and_then(|c| c.to_digit(10))
                        .ok_or_else(|| row.malformed("invalid dimension"))?,
                };
                let id = row.id(1)?;
                match kind {
                    StructureKind::InChIKey => data.inchi_keys.insert(id, structure),
                    _ => data.smiles.insert(id, structure),
                };
            }
            Ok(data)
        })
    }

    pub fn inchi_key(&self, id: ChebiId) -> Result<Option<&Structure>, ChebiError> {
        Ok(self.structures()?.inchi_keys.get(&id))
    }

    pub fn smiles(&self, id: ChebiId) -> Result<Option<&Structure>, ChebiError> {
        Ok(self.structures()?.smiles.get(&id))
    }

    /// Linear scan for the compound's default Mol block; the structures file
    /// is re-read on every call, never indexed.
    pub fn mol(&self, id: ChebiId) -> Result<Option<Structure>, ChebiError> {
        let text = self.read_file(STRUCTURES_CSV_GZ)?;
        let mut lines = text.lines();
        lines.next();

        let mut in_block = false;
        let mut block = String::new();
        for line in lines {
            let starts_with_digit = line.bytes().next().is_some_and(|b| b.is_ascii_digit());
            if !(in_block || starts_with_digit) {
                continue;
            }
            if starts_with_digit && is_mol_block_start(line, id) {
                in_block = true;
                block.clear();
                let payload = line.splitn(3, ',').nth(2).unwrap_or_default();
                block.push_str(&payload.replace('"', ""));
                block.push('\n');
            } else if in_block {
                if let Some(caps) = MOL_END_RE.captures(line) {
                    if &caps[2] == "Y" {
                        let first = line.split(',').next().unwrap_or_default();
                        block.push_str(&first.replace('"', ""));
                        let dimension =
                            caps[1].chars().next().and_then(|c| c.to_digit(10)).unwrap_or(0);
                        return Ok(Some(Structure {
                            structure: block,
                            kind: StructureKind::Mol,
                            dimension,
                        }));
                    }
                    block.clear();
                    in_block = false;
                } else {
                    block.push_str(line);
                    block.push('\n');
                }
            }
        }
        Ok(None)
    }

    /// Exports the default Mol block to a kept temp file; the caller owns it.
    pub fn mol_filename(&self, id: ChebiId) -> Result<Option<Utf8PathBuf>, ChebiError> {
        let Some(mol) = self.mol(id)? else {
            return Ok(None);
        };
        let mut temp = tempfile::Builder::new()
            .prefix(&format!("{}_", id.value()))
            .suffix(".mol")
            .tempfile()
            .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
        temp.write_all(mol.structure.as_bytes())
            .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
        let (_, path) = temp
            .keep()
            .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
        Utf8PathBuf::from_path_buf(path)
            .map(Some)
            .map_err(|_| ChebiError::Filesystem("non-utf8 temp path".to_string()))
    }

    /// Rescans the reference file for rows matching any of the given ids.
    pub fn references(&self, ids: &[ChebiId]) -> Result<Vec<Reference>, ChebiError> {
        let wanted: HashSet<String> = ids.iter().map(|id| id.value().to_string()).collect();
        let text = self.read_file(REFERENCE_TSV_GZ)?;
        let mut references = Vec::new();
        for row in rows(&text, REFERENCE_TSV_GZ, '\t') {
            if !wanted.contains(row.col(0)?) {
                continue;
            }
            let (location_in_ref, reference_name) = if row.len() > 3 {
                (
                    Some(row.col(3)?.to_string()),
                    Some(row.col(4)?.to_string()),
                )
            } else {
                (None, None)
            };
            references.push(Reference {
                reference_id: row.col(1)?.to_string(),
                reference_db_name: row.col(2)?.to_string(),
                location_in_ref,
                reference_name,
            });
        }
        Ok(references)
    }
}

fn is_mol_block_start(line: &str, id: ChebiId) -> bool {
    MOL_START_RE
        .captures(line)
        .is_some_and(|caps| caps[2].parse::<u32>().ok() == Some(id.value()))
}
