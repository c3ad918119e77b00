#![allow(dead_code)]

use std::fs;

use camino::Utf8Path;

use libchebi::cache::ChebiCache;
use libchebi::config::ChebiConfig;
use libchebi::store::FileStore;

pub const COMPOUNDS: &str = "\
ID\tSTATUS\tCHEBI_ACCESSION\tSOURCE\tPARENT_ID\tNAME\tDEFINITION\tMODIFIED_ON\tCREATED_BY\tSTAR
100\tC\tCHEBI:100\tChEBI\tnull\twater\tAn oxygen hydride\t2024-01-10\tcurator_a\t3
200\tC\tCHEBI:200\tChEBI\t100\tnull\tnull\t2024-03-05\tnull\t3
300\tC\tCHEBI:300\tChEBI\tnull\tethanol\tnull\t2024-02-01\tcurator_b\t2
5\tC\tCHEBI:5\tChEBI\tnull\tacetic acid\tnull\t2024-02-01\tcurator_b\t3
9\tC\tCHEBI:9\tChEBI\tnull\tcarboxylic acid\tnull\t2024-02-01\tcurator_b\t3
";

pub const CHEMICAL_DATA: &str = "\
ID\tCOMPOUND_ID\tSOURCE\tTYPE\tCHEMICAL_DATA
1\t100\tChEBI\tFORMULA\tH2O
2\t100\tChEBI\tMASS\t18.01530
3\t100\tChEBI\tCHARGE\t0
4\t200\tKEGG COMPOUND\tFORMULA\tH2O
5\t300\tChEBI\tCHARGE\t4-
";

pub const NAMES: &str = "\
ID\tCOMPOUND_ID\tTYPE\tSOURCE\tNAME\tADAPTED\tLANGUAGE
1\t100\tSYNONYM\tKEGG COMPOUND\tWater\tF\ten
2\t200\tSYNONYM\tChEBI\tAqua\tT\tla
";

pub const COMMENTS: &str = "\
ID\tCOMPOUND_ID\tCREATED_ON\tDATATYPE_ID\tDATATYPE\tTEXT
1\t100\t2015-03-01\tDataTypeX\tGeneral\tCommon solvent
2\t200\t2016-07-09\tDataTypeY\tCuration\tMerged duplicate entry
";

pub const COMPOUND_ORIGINS: &str = "\
ID\tCOMPOUND_ID\tSPECIES_TEXT\tSPECIES_ACCESSION\tCOMPONENT_TEXT\tCOMPONENT_ACCESSION\tSTRAIN_TEXT\tSTRAIN_ACCESSION\tSOURCE_TYPE\tSOURCE_ACCESSION\tCOMMENTS
1\t100\tHomo sapiens\tNCBI:9606\tnull\tnull\tnull\tnull\tMetaboLights\tMTBLS1\tnull
2\t200\tshort row without origin columns
";

pub const DATABASE_ACCESSION: &str = "\
ID\tCOMPOUND_ID\tSOURCE\tTYPE\tACCESSION_NUMBER
1\t100\tKEGG COMPOUND\tKEGG COMPOUND accession\tC00001
2\t200\tMetaCyc\tMetaCyc accession\tWATER
";

pub const INCHI: &str = "\
CHEBI_ID\tInChI
100\tInChI=1S/H2O/h1H2
";

pub const RELATION: &str = "\
ID\tTYPE\tFINAL_ID\tINIT_ID\tSTATUS
1\tis_a\t9\t5\tC
2\tis_conjugate_base_of\t100\t300\tC
";

pub const REFERENCE: &str = "\
COMPOUND_ID\tREFERENCE_ID\tREFERENCE_DB_NAME\tLOCATION_IN_REF\tREFERENCE_NAME
100\t12345\tPubMed\tpage 1\tWater: a review
200\t99999\tCiteXplore
300\t55555\tPubMed\tpage 9\tEthanol toxicity
";

pub const STRUCTURES: &str = "\
ID,COMPOUND_ID,STRUCTURE,TYPE,DIMENSION,DEFAULT_STRUCTURE,AUTOGEN_STRUCTURE
1,100,XLYOFNOQVPJJNP-UHFFFAOYSA-N,InChIKey,1D,Y,N
2,100,O,SMILES,1D,Y,N
3,100,\"water-sketch
M  END
\",mol,2D,N,N
4,100,\"water-default
M  END
\",mol,2D,Y,N
";

/// Writes the decompressed fixture files into `dir`. A `FileStore` with
/// auto-update off serves them without touching the network.
pub fn write_fixtures(dir: &Utf8Path) {
    let files = [
        ("compounds.tsv", COMPOUNDS),
        ("chemical_data.tsv", CHEMICAL_DATA),
        ("names.tsv", NAMES),
        ("comments.tsv", COMMENTS),
        ("compound_origins.tsv", COMPOUND_ORIGINS),
        ("database_accession.tsv", DATABASE_ACCESSION),
        ("chebiId_inchi.tsv", INCHI),
        ("relation.tsv", RELATION),
        ("reference.tsv", REFERENCE),
        ("structures.csv", STRUCTURES),
    ];
    for (name, content) in files {
        fs::write(dir.join(name).as_std_path(), content).unwrap();
    }
}

pub fn fixture_store(dir: &Utf8Path) -> FileStore {
    let config = ChebiConfig::default()
        .with_download_dir(dir.to_owned())
        .with_auto_update(false);
    FileStore::new(&config).unwrap()
}

pub fn fixture_cache(dir: &Utf8Path) -> ChebiCache {
    write_fixtures(dir);
    ChebiCache::with_store(Box::new(fixture_store(dir)))
}
