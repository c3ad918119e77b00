use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use libchebi::cache::ChebiCache;
use libchebi::config::ChebiConfig;
use libchebi::entity::ChebiEntity;
use libchebi::error::ChebiError;
use libchebi::search::{OlsHttpClient, search};

#[derive(Parser)]
#[command(name = "chebi")]
#[command(about = "Look up compounds in the ChEBI chemical ontology")]
#[command(version, author)]
struct Cli {
    /// Directory for the cached flat-file release.
    #[arg(long, global = true)]
    download_dir: Option<Utf8PathBuf>,

    /// Trust existing cached files regardless of the release cadence.
    #[arg(long, global = true)]
    no_update: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Look up one compound by id")]
    Lookup {
        id: String,

        #[arg(long)]
        json: bool,
    },
    #[command(about = "Search the ontology by term")]
    Search {
        term: String,

        #[arg(long)]
        exact: bool,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct EntitySummary {
    id: String,
    name: Option<String>,
    definition: Option<String>,
    formula: Option<String>,
    mass: Option<f64>,
    charge: Option<i32>,
    star: Option<u8>,
    inchi: Option<String>,
    inchi_key: Option<String>,
    smiles: Option<String>,
    outgoing_relations: usize,
    incoming_relations: usize,
}

impl EntitySummary {
    fn build(entity: &ChebiEntity<'_>) -> Result<Self, ChebiError> {
        Ok(Self {
            id: entity.id().to_string(),
            name: entity.name()?,
            definition: entity.definition()?,
            formula: entity.formula()?,
            mass: entity.mass()?,
            charge: entity.charge()?,
            star: entity.star()?,
            inchi: entity.inchi()?,
            inchi_key: entity.inchi_key()?,
            smiles: entity.smiles()?,
            outgoing_relations: entity.outgoings()?.len(),
            incoming_relations: entity.incomings()?.len(),
        })
    }

    fn print_text(&self) {
        println!("{}", self.id);
        if let Some(name) = &self.name {
            println!("  name:       {name}");
        }
        if let Some(definition) = &self.definition {
            println!("  definition: {definition}");
        }
        if let Some(formula) = &self.formula {
            println!("  formula:    {formula}");
        }
        if let Some(mass) = self.mass {
            println!("  mass:       {mass}");
        }
        if let Some(charge) = self.charge {
            println!("  charge:     {charge}");
        }
        if let Some(star) = self.star {
            println!("  stars:      {star}");
        }
        if let Some(inchi_key) = &self.inchi_key {
            println!("  inchikey:   {inchi_key}");
        }
        if let Some(smiles) = &self.smiles {
            println!("  smiles:     {smiles}");
        }
        println!(
            "  relations:  {} outgoing, {} incoming",
            self.outgoing_relations, self.incoming_relations
        );
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ChebiError> {
    let mut config = ChebiConfig::from_env();
    if let Some(dir) = cli.download_dir {
        config = config.with_download_dir(dir);
    }
    if cli.no_update {
        config = config.with_auto_update(false);
    }
    let cache = ChebiCache::new(&config)?;

    match cli.command {
        Commands::Lookup { id, json } => {
            let entity = ChebiEntity::new(&cache, id.parse()?)?;
            let summary = EntitySummary::build(&entity)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary)
                        .map_err(|err| ChebiError::Filesystem(err.to_string()))?
                );
            } else {
                summary.print_text();
            }
        }
        Commands::Search { term, exact, json } => {
            let client = OlsHttpClient::new()?;
            let entities = search(&cache, &client, &term, exact)?;
            if json {
                let summaries = entities
                    .iter()
                    .map(EntitySummary::build)
                    .collect::<Result<Vec<_>, ChebiError>>()?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summaries)
                        .map_err(|err| ChebiError::Filesystem(err.to_string()))?
                );
            } else {
                for entity in &entities {
                    let name = entity.name()?.unwrap_or_default();
                    println!("{}\t{name}", entity.id());
                }
            }
        }
    }
    Ok(())
}
