use clap::{Parser, Subcommand, ValueEnum};
use octofhir_hl7v2::*;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hl7v2-schema")]
#[command(about = "Inspect HL7 v2 schema tables and build message skeletons")]
#[command(version)]
struct Cli {
    /// Model configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Additional schema documents to register
    #[arg(short, long, global = true)]
    schema: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered versions and their tables
    Info,
    /// Print the slot table of a message, group or segment
    Show {
        /// Structure name, e.g. ADT_A01 or PID
        name: String,
        /// HL7 version, e.g. 2.5
        #[arg(short = 'v', long)]
        hl7_version: Option<String>,
        /// Expand nested groups and segments
        #[arg(short, long)]
        tree: bool,
    },
    /// Build a message from path assignments and report what is missing
    Check {
        /// Message structure, e.g. ORU_R01
        message: String,
        #[arg(short = 'v', long)]
        hl7_version: Option<String>,
        /// Assignments of the form PATH=VALUE
        #[arg(short = 'a', long = "set")]
        assignments: Vec<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Materialize every required slot of a message and print the result
    Skeleton {
        message: String,
        #[arg(short = 'v', long)]
        hl7_version: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ModelConfig::from_json_file(path)?,
        None => ModelConfig::default(),
    };
    for path in &cli.schema {
        config = config.add_schema_path(path);
    }
    let registry = SchemaRegistry::from_config(config)?;

    match cli.command {
        Commands::Info => show_info(&registry)?,
        Commands::Show {
            name,
            hl7_version,
            tree,
        } => {
            let version = resolve_version(&registry, hl7_version.as_deref())?;
            show_structure(&registry, version, &name, tree)?;
        }
        Commands::Check {
            message,
            hl7_version,
            assignments,
            format,
        } => {
            let version = resolve_version(&registry, hl7_version.as_deref())?;
            check_message(&registry, version, &message, &assignments, format)?;
        }
        Commands::Skeleton {
            message,
            hl7_version,
        } => {
            let version = resolve_version(&registry, hl7_version.as_deref())?;
            print_skeleton(&registry, version, &message)?;
        }
    }

    Ok(())
}

fn resolve_version(registry: &SchemaRegistry, requested: Option<&str>) -> Result<Hl7Version> {
    match requested {
        Some(text) => text.parse(),
        None => Ok(registry.config().version),
    }
}

fn show_info(registry: &SchemaRegistry) -> Result<()> {
    if registry.is_empty() {
        println!("No schema libraries registered");
        return Ok(());
    }

    for version in registry.versions() {
        let library = registry.library(version)?;
        println!("{library}");
        println!("  Messages: {}", library.message_names().join(", "));
        println!("  Segments: {}", library.segment_names().join(", "));
    }
    Ok(())
}

fn show_structure(
    registry: &SchemaRegistry,
    version: Hl7Version,
    name: &str,
    tree: bool,
) -> Result<()> {
    let library = registry.library(version)?;
    let table = library
        .message(name)
        .or_else(|_| library.group(name))
        .or_else(|_| library.segment(name))?;

    if !tree {
        print!("{table}");
        return Ok(());
    }

    println!("{}", table.name());
    print_table_tree(&library, table, 1)
}

fn print_table_tree(library: &SchemaLibrary, table: &SlotTable, depth: usize) -> Result<()> {
    for slot in table {
        println!("{}{}", "  ".repeat(depth), slot);
        let nested = match &slot.kind {
            SlotKind::Segment(segment) => library.segment(segment)?,
            SlotKind::Group(group) => library.group(group)?,
            SlotKind::Field(_) => continue,
        };
        print_table_tree(library, nested, depth + 1)?;
    }
    Ok(())
}

fn check_message(
    registry: &SchemaRegistry,
    version: Hl7Version,
    structure: &str,
    assignments: &[String],
    format: OutputFormat,
) -> Result<()> {
    let mut message = registry.new_message(version, structure)?;

    for assignment in assignments {
        let (path, value) = assignment.split_once('=').ok_or_else(|| {
            Hl7Error::invalid_path(assignment.as_str(), "expected PATH=VALUE")
        })?;
        message.set(path.trim(), value)?;
    }

    let missing = message.missing_required();
    let violations = message.length_violations();

    match format {
        OutputFormat::Json => {
            let report = json!({
                "message": message.structure(),
                "version": version,
                "nodes": message.node_count(),
                "missingRequired": missing,
                "lengthViolations": violations,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} ({}): {} nodes materialized",
                message.structure(),
                version,
                message.node_count()
            );
            if missing.is_empty() && violations.is_empty() {
                println!("✅ No missing required slots or length violations");
            }
            for path in &missing {
                println!("❌ Missing required {path}");
            }
            for violation in &violations {
                println!(
                    "⚠️  {} ({}) has {} characters",
                    violation.path, violation.field, violation.length
                );
            }
        }
    }
    Ok(())
}

fn print_skeleton(registry: &SchemaRegistry, version: Hl7Version, structure: &str) -> Result<()> {
    let mut message = registry.new_message(version, structure)?;
    message.build_required()?;

    println!("{}", message.structure());
    for (depth, id) in message.descendants(message.root()) {
        let label = match message.node(id) {
            Node::Group(group) => group.name().to_string(),
            Node::Segment(segment) => segment.name().to_string(),
            Node::Field(field) => {
                let declaration = message.field_declaration(id)?;
                format!(
                    "{}-{} {} ({})",
                    message.segment(field.parent())?.name(),
                    field.number(),
                    declaration.name,
                    field.element().type_name()
                )
            }
        };
        println!("{}{}", "  ".repeat(depth), label);
    }
    Ok(())
}
