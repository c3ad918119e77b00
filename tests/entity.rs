mod common;

use assert_matches::assert_matches;
use camino::Utf8Path;
use chrono::NaiveDate;

use libchebi::cache::ChebiCache;
use libchebi::domain::ChebiId;
use libchebi::entity::ChebiEntity;
use libchebi::error::ChebiError;
use libchebi::search::{self, SearchClient};

fn id(value: u32) -> ChebiId {
    ChebiId::new(value)
}

fn entity(cache: &ChebiCache, value: u32) -> ChebiEntity<'_> {
    ChebiEntity::new(cache, id(value)).unwrap()
}

#[test]
fn unknown_id_is_rejected_at_construction() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());

    let err = ChebiEntity::new(&cache, id(999)).unwrap_err();
    assert_matches!(err, ChebiError::UnknownId(message) if message == "CHEBI:999");
}

#[test]
fn scalar_attributes_fall_back_to_the_parent() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());
    let child = entity(&cache, 200);

    // The child row has null name and definition; both resolve through the
    // parent compound.
    assert_eq!(child.name().unwrap().as_deref(), Some("water"));
    assert_eq!(
        child.definition().unwrap().as_deref(),
        Some("An oxygen hydride")
    );
    assert_eq!(child.mass().unwrap(), Some(18.0153));
    assert_eq!(child.charge().unwrap(), Some(0));
    assert_eq!(child.created_by().unwrap().as_deref(), Some("curator_a"));
    assert_eq!(
        child.inchi().unwrap().as_deref(),
        Some("InChI=1S/H2O/h1H2")
    );
    assert_eq!(
        child.inchi_key().unwrap().as_deref(),
        Some("XLYOFNOQVPJJNP-UHFFFAOYSA-N")
    );
    assert_eq!(child.smiles().unwrap().as_deref(), Some("O"));
}

#[test]
fn direct_attributes_never_fall_back() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());
    let child = entity(&cache, 200);

    assert_eq!(child.status().unwrap().as_deref(), Some("C"));
    assert_eq!(child.source().unwrap().as_deref(), Some("ChEBI"));
    assert_eq!(child.star().unwrap(), Some(3));
    assert_eq!(child.parent_id().unwrap(), Some(id(100)));
}

#[test]
fn collections_aggregate_over_the_group() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());
    let water = entity(&cache, 100);

    let formulae = water.formulae().unwrap();
    assert_eq!(formulae.len(), 2);
    assert_eq!(formulae[0].source, "ChEBI");
    assert_eq!(formulae[1].source, "KEGG COMPOUND");
    assert_eq!(water.formula().unwrap().as_deref(), Some("H2O"));

    let names = water.names().unwrap();
    assert_eq!(names.len(), 2);
    assert_eq!(names[0].name, "Water");
    assert!(!names[0].adapted);
    assert_eq!(names[1].name, "Aqua");
    assert!(names[1].adapted);
    assert_eq!(names[1].language, "la");

    assert_eq!(water.comments().unwrap().len(), 2);
    assert_eq!(water.database_accessions().unwrap().len(), 2);

    // The short origin row contributes nothing.
    let origins = water.compound_origins().unwrap();
    assert_eq!(origins.len(), 1);
    assert_eq!(origins[0].species_text.as_deref(), Some("Homo sapiens"));
    assert_eq!(origins[0].component_text, None);
}

#[test]
fn child_sees_the_same_group_as_the_parent() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());

    let from_parent = entity(&cache, 100).formulae().unwrap();
    let from_child = entity(&cache, 200).formulae().unwrap();
    assert_eq!(from_parent, from_child);
}

#[test]
fn relations_resolve_through_the_group() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());

    let acid = entity(&cache, 300);
    let outgoing = acid.outgoings().unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].relation_type, "is_conjugate_base_of");
    assert_eq!(outgoing[0].other_id, id(100));

    let water = entity(&cache, 100);
    let incoming = water.incomings().unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].other_id, id(300));
}

#[test]
fn references_cover_the_whole_group() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());

    let references = entity(&cache, 200).references().unwrap();
    assert_eq!(references.len(), 2);
    assert_eq!(references[0].reference_id, "12345");
    assert_eq!(references[1].reference_id, "99999");
}

#[test]
fn modified_on_is_the_latest_in_the_group() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());

    assert_eq!(
        entity(&cache, 200).modified_on().unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 5)
    );
    assert_eq!(
        entity(&cache, 100).modified_on().unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 5)
    );
    assert_eq!(
        entity(&cache, 300).modified_on().unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 1)
    );
}

#[test]
fn mol_block_falls_back_to_the_parent() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());

    let mol = entity(&cache, 200).mol().unwrap();
    assert_eq!(mol.as_deref(), Some("water-default\nM  END\n"));
    assert!(entity(&cache, 300).mol().unwrap().is_none());
}

struct StubSearch(Vec<ChebiId>);

impl SearchClient for StubSearch {
    fn search_ids(&self, _term: &str, _exact: bool) -> Result<Vec<ChebiId>, ChebiError> {
        Ok(self.0.clone())
    }
}

#[test]
fn search_drops_ids_missing_from_the_release() {
    let dir = tempfile::tempdir().unwrap();
    let cache = common::fixture_cache(Utf8Path::from_path(dir.path()).unwrap());

    let client = StubSearch(vec![id(100), id(999), id(300)]);
    let entities = search::search(&cache, &client, "water", false).unwrap();
    let ids: Vec<_> = entities.iter().map(ChebiEntity::id).collect();
    assert_eq!(ids, vec![id(100), id(300)]);
}
