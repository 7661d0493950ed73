//! Command-line interface for CCMM metadata.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;

use crate::config::DEFAULT_SCHEMA_NAME;
use crate::draft::DatasetDraft;
use crate::error::{CcmmError, Result};
use crate::handler::CcmmHandler;
use crate::model::{Agent, Identifier};
use crate::schema::SchemaResolver;
use crate::validate::check_document;
use crate::vocab::{
    AgentRole, AgentType, DistributionFormat, IdentifierScheme, Language, LocationType,
    ResourceType, SubjectScheme, TimeReferenceType, Vocabulary,
};

/// CCMM Metadata - Build and validate CCMM dataset metadata.
#[derive(Parser)]
#[command(name = "ccmm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the sample dataset and print or save it.
    Example {
        /// Write the document to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print single-line XML
        #[arg(long)]
        compact: bool,

        /// Skip validation before writing
        #[arg(long)]
        no_validate: bool,

        /// Directory holding the CCMM schemas (default: bundled)
        #[arg(long)]
        schema_dir: Option<PathBuf>,
    },

    /// Check an XML document against a CCMM schema.
    Validate {
        /// Document to check
        file: PathBuf,

        /// Schema name under the schema directory
        #[arg(short, long, default_value = DEFAULT_SCHEMA_NAME)]
        schema: String,

        /// Directory holding the CCMM schemas (default: bundled)
        #[arg(long)]
        schema_dir: Option<PathBuf>,

        /// Print violations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a dataset document with its elements in schema order.
    Reorder {
        /// Document to reorder
        file: PathBuf,

        /// Print single-line XML
        #[arg(long)]
        compact: bool,
    },

    /// List the allowed values of every vocabulary.
    Vocab,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Example {
            output,
            compact,
            no_validate,
            schema_dir,
        } => example_command(output.as_deref(), compact, !no_validate, schema_dir),
        Commands::Validate {
            file,
            schema,
            schema_dir,
            json,
        } => validate_command(&file, &schema, schema_dir, json),
        Commands::Reorder { file, compact } => reorder_command(&file, compact),
        Commands::Vocab => {
            vocab_command();
            Ok(())
        }
    }
}

fn resolver_for(schema_dir: Option<PathBuf>) -> SchemaResolver {
    schema_dir.map_or_else(SchemaResolver::bundled, SchemaResolver::with_root)
}

/// The sample dataset shown by `ccmm example`.
pub fn example_handler(resolver: SchemaResolver) -> Result<CcmmHandler> {
    let mut handler = CcmmHandler::with_resolver(resolver);

    handler.set_title("Ukázkový dataset CCMM")?;
    handler.set_publication_year(2024)?;
    handler.set_version("1.0")?;
    handler.add_identifier(
        "10.1234/example",
        IdentifierScheme::Doi,
        Some("https://doi.org/10.1234/example"),
    )?;
    handler.add_description(
        "Tento dataset obsahuje ukázková data pro testování CCMM metadat.",
        None,
        None,
    )?;
    handler.add_alternate_title("CCMM Example Dataset", Language::En, None, None)?;
    for keyword in ["metadata", "dataset"] {
        handler.add_subject(keyword, Language::Cs, None, Some(SubjectScheme::Keyword), None, None)?;
    }

    let creator = Agent::person("Roman Dvořák")?
        .with_identifier(Identifier::new("0000-0002-1825-0097", IdentifierScheme::Orcid)?)?;
    handler.add_agent_relationship(creator, AgentRole::Creator, None)?;
    handler.add_agent_relationship(Agent::person("Jan Novák")?, AgentRole::Contributor, None)?;
    handler.add_agent_relationship(
        Agent::organization("Národní repozitář")?,
        AgentRole::Publisher,
        None,
    )?;

    handler.add_distribution(
        "https://example.com/dataset.json",
        Some(DistributionFormat::Json),
        None,
        None,
        None,
    )?;
    handler.add_location("Praha, Česká republika", LocationType::Place, None)?;
    handler.add_time_reference("2024-01-01", TimeReferenceType::Created, None)?;

    let catalogued_by = handler.agent_relationships()[..1].to_vec();
    handler.add_metadata_record(catalogued_by, None, Vec::new(), vec![Language::Cs], None)?;
    handler.set_resource_type(ResourceType::Dataset);
    handler.set_primary_language(Language::Cs);
    handler.add_other_language(Language::En);

    Ok(handler)
}

fn example_command(
    output: Option<&Path>,
    compact: bool,
    validate: bool,
    schema_dir: Option<PathBuf>,
) -> Result<()> {
    let handler = example_handler(resolver_for(schema_dir))?;

    let Some(path) = output else {
        if validate {
            let report = handler.validation_report();
            if !report.is_valid() {
                return Err(CcmmError::validation("example dataset", report.reasons().join("; ")));
            }
        }
        print!("{}", handler.to_xml_string(!compact)?);
        if compact {
            println!();
        }
        return Ok(());
    };

    handler.save_to_file(path, validate)?;

    let summary = handler.summary();
    println!("  Title: {}", style(&summary.title).green());
    println!("  Identifiers: {}", summary.identifiers_count);
    println!("  Agents: {}", summary.agents_count);
    println!("  Subjects: {}", summary.subjects_count);
    println!("  Distributions: {}", summary.distributions_count);
    println!();
    println!("{} {}", style("Saved to:").green().bold(), path.display());

    Ok(())
}

fn validate_command(
    file: &Path,
    schema: &str,
    schema_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let xml = std::fs::read_to_string(file)?;
    let violations = check_document(&xml, &resolver_for(schema_dir), schema)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&violations)?);
    } else if violations.is_empty() {
        println!(
            "{} {} conforms to schema {}",
            style("Valid:").green().bold(),
            file.display(),
            style(schema).cyan()
        );
    } else {
        for violation in &violations {
            println!("  {} {violation}", style("-").red());
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(CcmmError::validation(
            file.display().to_string(),
            format!("{} schema violation(s)", violations.len()),
        ))
    }
}

fn reorder_command(file: &Path, compact: bool) -> Result<()> {
    let draft = DatasetDraft::load_from_file(file)?;
    let xml = draft.to_xml_string(!compact)?;
    print!("{xml}");
    if compact {
        println!();
    }
    Ok(())
}

fn print_vocabulary<T: Vocabulary>() {
    let values: Vec<&str> = T::ALL.iter().map(Vocabulary::as_str).collect();
    println!("{}: {}", style(T::NAME).bold(), values.join(", "));
}

fn vocab_command() {
    print_vocabulary::<Language>();
    print_vocabulary::<AgentType>();
    print_vocabulary::<AgentRole>();
    print_vocabulary::<IdentifierScheme>();
    print_vocabulary::<SubjectScheme>();
    print_vocabulary::<TimeReferenceType>();
    print_vocabulary::<LocationType>();
    print_vocabulary::<DistributionFormat>();
    print_vocabulary::<ResourceType>();
}
