use camino::Utf8PathBuf;
use chrono::NaiveDate;
use once_cell::unsync::OnceCell;

use crate::cache::ChebiCache;
use crate::domain::{
    ChebiId, Comment, CompoundOrigin, DatabaseAccession, Formula, Name, Reference, Relation,
};
use crate::error::ChebiError;

/// Read-only view of one compound.
pub struct ChebiEntity<'c> {
    cache: &'c ChebiCache,
    id: ChebiId,
    group: OnceCell<Vec<ChebiId>>,
}

impl std::fmt::Debug for ChebiEntity<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChebiEntity")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<'c> ChebiEntity<'c> {
    /// Fails with `UnknownId` when no tier of the name fallback resolves.
    pub fn new(cache: &'c ChebiCache, id: ChebiId) -> Result<Self, ChebiError> {
        let entity = Self {
            cache,
            id,
            group: OnceCell::new(),
        };
        if entity.name()?.is_none() {
            return Err(ChebiError::UnknownId(id.to_string()));
        }
        Ok(entity)
    }

    pub fn id(&self) -> ChebiId {
        self.id
    }

    pub fn parent_id(&self) -> Result<Option<ChebiId>, ChebiError> {
        self.cache.parent_id(self.id)
    }

    // Root is the parent if one exists, else the id itself. Memoized.
    fn group(&self) -> Result<&[ChebiId], ChebiError> {
        self.group
            .get_or_try_init(|| {
                let root = self.cache.parent_id(self.id)?.unwrap_or(self.id);
                Ok(self.cache.group_members(root)?.to_vec())
            })
            .map(Vec::as_slice)
    }

    fn scalar_fallback<T>(
        &self,
        lookup: impl Fn(ChebiId) -> Result<Option<T>, ChebiError>,
    ) -> Result<Option<T>, ChebiError> {
        if let Some(value) = lookup(self.id)? {
            return Ok(Some(value));
        }
        if let Some(parent) = self.cache.parent_id(self.id)? {
            if let Some(value) = lookup(parent)? {
                return Ok(Some(value));
            }
        }
        for &member in self.group()? {
            if let Some(value) = lookup(member)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn collect_group<T>(
        &self,
        lookup: impl Fn(ChebiId) -> Result<Vec<T>, ChebiError>,
    ) -> Result<Vec<T>, ChebiError> {
        let mut all = Vec::new();
        for &member in self.group()? {
            all.extend(lookup(member)?);
        }
        Ok(all)
    }

    pub fn name(&self) -> Result<Option<String>, ChebiError> {
        self.scalar_fallback(|id| Ok(self.cache.name(id)?.map(str::to_string)))
    }

    pub fn definition(&self) -> Result<Option<String>, ChebiError> {
        self.scalar_fallback(|id| Ok(self.cache.definition(id)?.map(str::to_string)))
    }

    pub fn mass(&self) -> Result<Option<f64>, ChebiError> {
        self.scalar_fallback(|id| self.cache.mass(id))
    }

    pub fn charge(&self) -> Result<Option<i32>, ChebiError> {
        self.scalar_fallback(|id| self.cache.charge(id))
    }

    pub fn created_by(&self) -> Result<Option<String>, ChebiError> {
        self.scalar_fallback(|id| Ok(self.cache.created_by(id)?.map(str::to_string)))
    }

    pub fn inchi(&self) -> Result<Option<String>, ChebiError> {
        self.scalar_fallback(|id| Ok(self.cache.inchi(id)?.map(str::to_string)))
    }

    pub fn inchi_key(&self) -> Result<Option<String>, ChebiError> {
        self.scalar_fallback(|id| {
            Ok(self
                .cache
                .inchi_key(id)?
                .map(|structure| structure.structure.clone()))
        })
    }

    pub fn smiles(&self) -> Result<Option<String>, ChebiError> {
        self.scalar_fallback(|id| {
            Ok(self
                .cache
                .smiles(id)?
                .map(|structure| structure.structure.clone()))
        })
    }

    pub fn mol(&self) -> Result<Option<String>, ChebiError> {
        self.scalar_fallback(|id| {
            Ok(self.cache.mol(id)?.map(|structure| structure.structure))
        })
    }

    pub fn mol_filename(&self) -> Result<Option<Utf8PathBuf>, ChebiError> {
        self.scalar_fallback(|id| self.cache.mol_filename(id))
    }

    // Direct reads without fallback.

    pub fn status(&self) -> Result<Option<String>, ChebiError> {
        Ok(self.cache.status(self.id)?.map(str::to_string))
    }

    pub fn source(&self) -> Result<Option<String>, ChebiError> {
        Ok(self.cache.source(self.id)?.map(str::to_string))
    }

    pub fn star(&self) -> Result<Option<u8>, ChebiError> {
        self.cache.star(self.id)
    }

    // Group-union collections.

    pub fn formulae(&self) -> Result<Vec<Formula>, ChebiError> {
        self.collect_group(|id| Ok(self.cache.formulae(id)?.to_vec()))
    }

    pub fn formula(&self) -> Result<Option<String>, ChebiError> {
        Ok(self
            .formulae()?
            .first()
            .map(|formula| formula.formula.clone()))
    }

    pub fn names(&self) -> Result<Vec<Name>, ChebiError> {
        self.collect_group(|id| Ok(self.cache.names(id)?.to_vec()))
    }

    pub fn comments(&self) -> Result<Vec<Comment>, ChebiError> {
        self.collect_group(|id| Ok(self.cache.comments(id)?.to_vec()))
    }

    pub fn compound_origins(&self) -> Result<Vec<CompoundOrigin>, ChebiError> {
        self.collect_group(|id| Ok(self.cache.compound_origins(id)?.to_vec()))
    }

    pub fn database_accessions(&self) -> Result<Vec<DatabaseAccession>, ChebiError> {
        self.collect_group(|id| Ok(self.cache.database_accessions(id)?.to_vec()))
    }

    pub fn outgoings(&self) -> Result<Vec<Relation>, ChebiError> {
        self.collect_group(|id| Ok(self.cache.outgoings(id)?.to_vec()))
    }

    pub fn incomings(&self) -> Result<Vec<Relation>, ChebiError> {
        self.collect_group(|id| Ok(self.cache.incomings(id)?.to_vec()))
    }

    pub fn references(&self) -> Result<Vec<Reference>, ChebiError> {
        self.cache.references(self.group()?)
    }

    // Group maximum, not a fallback chain.
    pub fn modified_on(&self) -> Result<Option<NaiveDate>, ChebiError> {
        let mut latest = None;
        for &member in self.group()? {
            let date = self.cache.modified_on(member)?;
            if date > latest {
                latest = date;
            }
        }
        Ok(latest)
    }
}
