//! Control Narratives CLI
//!
//! Inspects and edits an OpenControl project from the command line. Every
//! command prints JSON.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use control_narratives::{
    component_comparison, component_families, control_catalog, control_detail, create_component,
    create_project, implementation_statistics, list_all_controls, list_all_evidence, load_component,
    load_component_controls, load_components, load_project, load_standards,
    narrative_source_files, save_narrative, EditMode, NarrativeEdit, Project, WorkbenchConfig,
};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "narratives")]
#[command(about = "Inspect and edit OpenControl compliance narratives")]
struct Cli {
    /// Project directory (or its opencontrol.yaml)
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Extra config file layered over the default locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print JSON on one line
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the project record
    Project,

    /// List the project's components
    Components,

    /// List the project's standards with their catalogs
    Standards,

    /// List every control in play, grouped by standard
    Controls,

    /// List every cataloged control
    Catalog,

    /// Show every narrative for one control
    Control {
        standard: String,
        control: String,
    },

    /// Show a component's narratives grouped by family
    Narratives {
        component: String,
    },

    /// List evidence across all components
    Evidence,

    /// Word and status statistics for a component
    Stats {
        component: String,
    },

    /// Update a narrative or add a new one
    Edit {
        component: String,
        #[arg(long)]
        standard: String,
        #[arg(long)]
        control: String,
        #[arg(long)]
        part: Option<String>,
        /// Narrative text
        #[arg(long)]
        text: String,
        /// Implementation status (empty clears it)
        #[arg(long, default_value = "")]
        status: String,
        #[arg(long, default_value = "update")]
        mode: EditMode,
        /// File to add a new narrative to (defaults to component.yaml)
        #[arg(long)]
        source_file: Option<PathBuf>,
    },

    /// Create a component and register it in the manifest
    AddComponent {
        /// Directory for the component, relative to the project
        path: String,
        name: String,
    },

    /// Line up narratives of several components by control part
    Compare {
        #[arg(required = true)]
        components: Vec<String>,
    },

    /// Create a new project in the --project directory
    NewProject {
        name: String,
        #[arg(long, default_value = "")]
        organization: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// List the configured projects
    Projects,

    /// List the components of every configured project
    AllComponents,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let out = Output {
        compact: cli.compact,
    };

    match &cli.command {
        Commands::Projects => {
            let config = WorkbenchConfig::load_from(cli.config.as_deref())
                .context("loading configuration")?;
            let projects = config.registry()?.projects()?;
            return out.print(&json!({
                "address": config.display_address(),
                "projects": projects,
            }));
        }
        Commands::AllComponents => {
            let config = WorkbenchConfig::load_from(cli.config.as_deref())
                .context("loading configuration")?;
            return out.print(&config.registry()?.all_components()?);
        }
        Commands::NewProject {
            name,
            organization,
            description,
        } => {
            return out.print(&create_project(&cli.project, name, organization, description)?);
        }
        _ => {}
    }

    let project = load_project(&cli.project)
        .with_context(|| format!("loading project at {}", cli.project.display()))?;

    match cli.command {
        Commands::Project => out.print(&project),

        Commands::Components => out.print(&load_components(&project)?),

        Commands::Standards => out.print(&load_standards(&project)?),

        Commands::Controls => out.print(&list_all_controls(&project)?),

        Commands::Catalog => {
            let standards = load_standards(&project)?;
            out.print(&control_catalog(&project, &standards))
        }

        Commands::Control { standard, control } => {
            out.print(&control_detail(&project, &standard, &control)?)
        }

        Commands::Narratives { component } => {
            let component = load_component(&project, &component)?;
            let standards = load_standards(&project)?;
            let implementations = load_component_controls(&component, &standards)?;
            out.print(&json!({
                "source_files": narrative_source_files(&component, &implementations),
                "families": component_families(&implementations),
                "component": component,
            }))
        }

        Commands::Evidence => out.print(&list_all_evidence(&project)?),

        Commands::Stats { component } => {
            let component = load_component(&project, &component)?;
            let standards = load_standards(&project)?;
            let implementations = load_component_controls(&component, &standards)?;
            out.print(&implementation_statistics(&implementations))
        }

        Commands::Edit {
            component,
            standard,
            control,
            part,
            text,
            status,
            mode,
            source_file,
        } => {
            let edit = NarrativeEdit {
                standard_key: standard,
                control_key: control,
                control_part: part.filter(|p| !p.is_empty()),
                narrative: text,
                implementation_status: status,
                source_file: source_file.map(|f| project_relative(&project.path, f)),
            };
            let saved = save_narrative(&project, &component, &edit, mode)?;
            out.print(&saved)
        }

        Commands::AddComponent { path, name } => out.print(&create_component(&project, &path, &name)?),

        Commands::Compare { components } => {
            let selected: Vec<(&Project, &str)> =
                components.iter().map(|id| (&project, id.as_str())).collect();
            out.print(&component_comparison(&selected)?)
        }

        Commands::Projects | Commands::AllComponents | Commands::NewProject { .. } => Ok(()),
    }
}

fn project_relative(root: &Path, file: PathBuf) -> PathBuf {
    if file.is_absolute() {
        file
    } else {
        root.join(file)
    }
}

struct Output {
    compact: bool,
}

impl Output {
    fn print<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let text = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        println!("{}", text);
        Ok(())
    }
}
