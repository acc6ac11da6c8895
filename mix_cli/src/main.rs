//! # Abamix CLI
//!
//! Command-line front end for the ABA mix calculator and the formula library
//! stored on the ERP persistence service.
//!
//! ```text
//! abamix calc --row HDPE:75:100 --row Filler:25:350 --quantity 1100
//! abamix fixed --quantity 1000 --raw-material HDPE
//! abamix config save --name "Film" --row HDPE:75:100 --default
//! abamix print --config 3 --quantity 2500 --output mix.html --open
//! ```
//!
//! Add `--json` to calculator commands for machine-readable output.

mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mix_core::calculations::{fixed_formula, recompute, scale_to_quantity, MaterialDistribution, MixTable};
use mix_core::config::{FormulaParameters, NewAbaMaterialConfig};
use mix_core::file_io::{export_config, import_config, ConfigFile};
use mix_core::formula::{ratio_from_parts, AbaFormula, FormulaMaterial};
use mix_core::persistence::{self, SaveConfigRequest};
use mix_core::report::render_print_html;
use mix_core::settings::{Settings, SETTINGS_FILE};
use mix_core::store::{MixStore, RestStore};
use mix_core::CalcError;

#[derive(Parser, Debug)]
#[command(name = "abamix", version, about = "ABA extrusion mix calculator")]
struct Cli {
    /// Settings file
    #[arg(long, global = true, env = "ABAMIX_SETTINGS", default_value = SETTINGS_FILE)]
    settings: PathBuf,

    /// Persistence service base URL (overrides settings)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Acting user id recorded on saves (overrides settings)
    #[arg(long, global = true)]
    user_id: Option<i64>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompute a mix table and optionally scale it to a quantity
    Calc(CalcArgs),
    /// Apply the built-in recipe for a job order's raw material
    Fixed(FixedArgs),
    /// Write the scaled mix as a printable HTML page
    Print(PrintArgs),
    /// Manage stored ABA material configs
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage stored ABA formulas
    #[command(subcommand)]
    Formula(FormulaCommand),
    /// List the raw material catalogue
    Materials,
    /// Create demo config and formula on the persistence service
    Seed,
}

#[derive(Args, Debug)]
struct RowArgs {
    /// Mix row as MATERIAL:A_KG:B_KG (repeatable)
    #[arg(long = "row", value_name = "MATERIAL:A:B", value_parser = parse_row)]
    rows: Vec<MaterialDistribution>,
}

#[derive(Args, Debug)]
struct CalcArgs {
    #[command(flatten)]
    rows: RowArgs,

    /// Target batch quantity in kg
    #[arg(long)]
    quantity: Option<f64>,

    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct FixedArgs {
    #[arg(long)]
    quantity: f64,

    #[arg(long)]
    raw_material: String,

    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PrintArgs {
    #[command(flatten)]
    rows: RowArgs,

    /// Use the rows of a stored config instead of --row
    #[arg(long, conflicts_with = "rows")]
    config: Option<i64>,

    #[arg(long)]
    quantity: f64,

    #[arg(long, default_value = "ABA Mix")]
    title: String,

    #[arg(long, short, default_value = "aba-mix.html")]
    output: PathBuf,

    /// Open the page with the system handler for printing
    #[arg(long)]
    open: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    List,
    Show { id: i64 },
    /// Show the current default config
    Default,
    Save(SaveArgs),
    SetDefault { id: i64 },
    /// Write a stored config to an .abamix file
    Export { id: i64, path: PathBuf },
    /// Save an .abamix file as a new config owned by the acting user
    Import {
        path: PathBuf,
        #[arg(long)]
        default: bool,
    },
}

#[derive(Args, Debug)]
struct SaveArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    description: Option<String>,

    #[command(flatten)]
    rows: RowArgs,

    /// Reference weight for screw A (defaults to the column total)
    #[arg(long)]
    a_total: Option<f64>,

    /// Reference weight for screw B (defaults to the column total)
    #[arg(long)]
    b_total: Option<f64>,

    /// Make the new config the default after saving
    #[arg(long)]
    default: bool,
}

#[derive(Subcommand, Debug)]
enum FormulaCommand {
    List,
    /// Create a formula from A/B parts and per-screw percentages
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        a_parts: f64,
        #[arg(long)]
        b_parts: f64,
        /// MATERIAL:SCREW_A_%:SCREW_B_% (repeatable)
        #[arg(long = "material", value_name = "MATERIAL:A%:B%", value_parser = parse_formula_material)]
        materials: Vec<FormulaMaterial>,
    },
    /// Derive a formula from a stored config
    FromConfig {
        id: i64,
        #[arg(long)]
        name: String,
    },
    /// Set a formula's A:B ratio from parts
    SetRatio {
        id: i64,
        #[arg(long)]
        a_parts: f64,
        #[arg(long)]
        b_parts: f64,
    },
    /// Expand a formula into kilograms for a batch
    Expand {
        id: i64,
        #[arg(long)]
        quantity: f64,
    },
    Delete { id: i64 },
}

/// Parse `MATERIAL:A:B`; the material label may itself contain ':'.
fn parse_row(raw: &str) -> Result<MaterialDistribution, String> {
    let (material, a, b) = split_triple(raw)?;
    Ok(MaterialDistribution::new(material, a, b))
}

fn parse_formula_material(raw: &str) -> Result<FormulaMaterial, String> {
    let (material, a, b) = split_triple(raw)?;
    Ok(FormulaMaterial::new(material, a, b))
}

fn split_triple(raw: &str) -> Result<(String, f64, f64), String> {
    let mut parts = raw.rsplitn(3, ':');
    let b = parts.next();
    let a = parts.next();
    let material = parts.next();
    match (material, a, b) {
        (Some(material), Some(a), Some(b)) if !material.trim().is_empty() => {
            let a: f64 = a.trim().parse().map_err(|_| format!("invalid number '{}'", a))?;
            let b: f64 = b.trim().parse().map_err(|_| format!("invalid number '{}'", b))?;
            Ok((material.trim().to_string(), a, b))
        }
        _ => Err(format!("expected MATERIAL:A:B, got '{}'", raw)),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(&cli.settings)
        .with_context(|| format!("loading settings from {}", cli.settings.display()))?;
    if let Some(url) = &cli.api_url {
        settings.api_base_url = url.clone();
    }
    if let Some(user_id) = cli.user_id {
        settings.user_id = Some(user_id);
    }
    debug!(api = %settings.api_base_url, user = ?settings.user_id, "settings loaded");
    Ok(settings)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn table_from(rows: &RowArgs) -> Result<MixTable> {
    if rows.rows.is_empty() {
        bail!("at least one --row is required");
    }
    Ok(MixTable::from_rows(rows.rows.clone())?)
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;

    match cli.command {
        Command::Calc(args) => {
            let table = table_from(&args.rows)?;
            let scaled = args
                .quantity
                .map(|q| scale_to_quantity(table.rows(), q))
                .transpose()?;

            if args.json {
                print_json(&serde_json::json!({
                    "materials": table.rows(),
                    "totals": table.totals(),
                    "scaled": scaled,
                }))?;
            } else {
                output::banner("ABA MIX");
                output::print_mix(table.rows(), &table.totals());
                if let Some(scaled) = scaled {
                    println!();
                    output::banner("SCALED");
                    output::print_scaled(&scaled);
                }
            }
        }
        Command::Fixed(args) => {
            let result = fixed_formula::calculate(&fixed_formula::FixedFormulaInput {
                quantity_kg: args.quantity,
                raw_material: args.raw_material,
            })?;
            if args.json {
                print_json(&result)?;
            } else {
                output::banner("FIXED FORMULA");
                output::print_fixed(&result);
            }
        }
        Command::Print(args) => {
            let rows = match args.config {
                Some(id) => {
                    let store = RestStore::from_settings(&settings)?;
                    persistence::load_config(&store, id, settings.formula_parameters)
                        .await?
                        .materials
                }
                None => table_from(&args.rows)?.into_rows(),
            };
            let scaled = scale_to_quantity(&rows, args.quantity)?;
            let html = render_print_html(&args.title, &scaled);
            std::fs::write(&args.output, html)
                .with_context(|| format!("writing {}", args.output.display()))?;
            println!("Wrote {}", args.output.display());
            if args.open {
                open::that(&args.output).with_context(|| format!("opening {}", args.output.display()))?;
            }
        }
        Command::Config(command) => {
            let store = RestStore::from_settings(&settings)?;
            run_config(&store, &settings, command).await?;
        }
        Command::Formula(command) => {
            let store = RestStore::from_settings(&settings)?;
            run_formula(&store, &settings, command).await?;
        }
        Command::Materials => {
            let store = RestStore::from_settings(&settings)?;
            output::print_raw_materials(&store.list_raw_materials().await?);
        }
        Command::Seed => {
            let store = RestStore::from_settings(&settings)?;
            let report = mix_core::seed::seed_demo(&store, settings.user_id).await?;
            println!(
                "Seeded config #{} (default) and formula #{}",
                report.config.id,
                report.formula.id.unwrap_or_default()
            );
        }
    }
    Ok(())
}

async fn run_config(store: &dyn MixStore, settings: &Settings, command: ConfigCommand) -> Result<()> {
    let fallback = settings.formula_parameters;
    match command {
        ConfigCommand::List => output::print_configs(&store.list_configs().await?),
        ConfigCommand::Show { id } => {
            let mut config = persistence::load_config(store, id, fallback).await?;
            let totals = recompute(&mut config.materials)?;
            output::print_loaded(&config, &totals);
        }
        ConfigCommand::Default => match persistence::load_default_config(store, fallback).await? {
            Some(mut config) => {
                let totals = recompute(&mut config.materials)?;
                output::print_loaded(&config, &totals);
            }
            None => println!("No default config is set."),
        },
        ConfigCommand::Save(args) => {
            let table = table_from(&args.rows)?;
            let totals = table.totals();
            let request = SaveConfigRequest {
                name: args.name,
                description: args.description,
                materials: table.into_rows(),
                formula_parameters: FormulaParameters {
                    a_total_weight: args.a_total.unwrap_or(totals.total_a_kg),
                    b_total_weight: args.b_total.unwrap_or(totals.total_b_kg),
                },
                make_default: args.default,
            };
            let saved = persistence::save_config(store, &request, settings.user_id).await?;
            println!(
                "Saved config #{} '{}'{}",
                saved.id,
                saved.name,
                if saved.is_default { " as default" } else { "" }
            );
        }
        ConfigCommand::SetDefault { id } => {
            persistence::set_default(store, id).await?;
            println!("Config #{} is now the default", id);
        }
        ConfigCommand::Export { id, path } => {
            let config = store.get_config(id).await?;
            // refuse to export something that would not load
            config.data()?;
            let file = ConfigFile::new(NewAbaMaterialConfig {
                name: config.name,
                description: config.description,
                created_by: config.created_by,
                is_default: false,
                config_data: config.config_data,
            });
            export_config(&file, &path)?;
            println!("Exported config #{} to {}", id, path.display());
        }
        ConfigCommand::Import { path, default } => {
            let saved = import_file(store, settings, &path, default).await?;
            println!("Imported {} as config #{}", path.display(), saved);
        }
    }
    Ok(())
}

async fn import_file(store: &dyn MixStore, settings: &Settings, path: &Path, make_default: bool) -> Result<i64> {
    let file = import_config(path)?;
    let data = mix_core::config::ConfigData::decode(&file.config.config_data)?;
    let (materials, formula_parameters) = data.into_parts(settings.formula_parameters);
    let request = SaveConfigRequest {
        name: file.config.name,
        description: file.config.description,
        materials,
        formula_parameters,
        make_default,
    };
    let saved = persistence::save_config(store, &request, settings.user_id).await?;
    Ok(saved.id)
}

async fn find_formula(store: &dyn MixStore, id: i64) -> Result<AbaFormula> {
    store
        .list_formulas()
        .await?
        .into_iter()
        .find(|f| f.id == Some(id))
        .ok_or_else(|| CalcError::not_found("ABA formula", id).into())
}

async fn run_formula(store: &dyn MixStore, settings: &Settings, command: FormulaCommand) -> Result<()> {
    match command {
        FormulaCommand::List => output::print_formulas(&store.list_formulas().await?),
        FormulaCommand::Create {
            name,
            description,
            a_parts,
            b_parts,
            materials,
        } => {
            let formula = AbaFormula {
                id: None,
                name,
                description,
                a_to_b: ratio_from_parts(a_parts, b_parts)?,
                materials,
            };
            let created = persistence::create_formula(store, &formula).await?;
            println!("Created formula #{}", created.id.unwrap_or_default());
        }
        FormulaCommand::FromConfig { id, name } => {
            let config = persistence::load_config(store, id, settings.formula_parameters).await?;
            let formula = AbaFormula::from_distribution(name, config.description, &config.materials)?;
            let created = persistence::create_formula(store, &formula).await?;
            println!(
                "Created formula #{} from config #{}",
                created.id.unwrap_or_default(),
                id
            );
        }
        FormulaCommand::SetRatio { id, a_parts, b_parts } => {
            let mut formula = find_formula(store, id).await?;
            formula.a_to_b = ratio_from_parts(a_parts, b_parts)?;
            let updated = persistence::update_formula(store, id, &formula).await?;
            println!("Formula #{} A:B = {:.4}", id, updated.a_to_b);
        }
        FormulaCommand::Expand { id, quantity } => {
            let formula = find_formula(store, id).await?;
            let table = MixTable::from_rows(formula.to_distribution(quantity)?)?;
            output::banner(&formula.name);
            output::print_mix(table.rows(), &table.totals());
        }
        FormulaCommand::Delete { id } => {
            persistence::delete_formula(store, id).await?;
            println!("Deleted formula #{}", id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(calc_error) = e.downcast_ref::<CalcError>() {
                if let Ok(json) = serde_json::to_string_pretty(calc_error) {
                    eprintln!();
                    eprintln!("Error JSON:");
                    eprintln!("{}", json);
                }
            }
            ExitCode::FAILURE
        }
    }
}
