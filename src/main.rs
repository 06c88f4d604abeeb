use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use invoice_synth::config::{
    config_dir, load_policy, load_request, resolve_request_path, POLICY_TEMPLATE, REQUEST_TEMPLATE,
};
use invoice_synth::error::{CliError, Result};
use invoice_synth::synth::{filter_catalog, Generation, Response, Synthesizer, TargetOutcome};

#[derive(Parser)]
#[command(name = "invoice-synth")]
#[command(version, about = "Target-driven invoice line synthesis", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.invoice-synth or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with policy and sample request
    Init,

    /// Synthesize invoice lines for a request
    Generate {
        /// Request file (TOML or .json), or a name inside the config directory
        #[arg(short, long, default_value = "request.toml")]
        request: String,

        /// Seed for the candidate pick; omit for a random run
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the JSON response instead of tables
        #[arg(long)]
        json: bool,

        /// Write the JSON response to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the catalog entries eligible for a request, per tax rate
    Catalog {
        /// Request file (TOML or .json), or a name inside the config directory
        #[arg(short, long, default_value = "request.toml")]
        request: String,
    },

    /// Show the effective search policy
    Policy,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Generate {
            request,
            seed,
            json,
            output,
        } => cmd_generate(&cfg_dir, &request, seed, json, output),
        Commands::Catalog { request } => cmd_catalog(&cfg_dir, &request),
        Commands::Policy => cmd_policy(&cfg_dir),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(CliError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("policy.toml"), POLICY_TEMPLATE)?;
    fs::write(cfg_dir.join("request.toml"), REQUEST_TEMPLATE)?;

    println!("Initialized invoice-synth config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Tune the search policy:     $EDITOR {}/policy.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Describe targets & catalog: $EDITOR {}/request.toml",
        cfg_dir.display()
    );
    println!();
    println!("Then synthesize lines:");
    println!("  invoice-synth generate --request request.toml --seed 7");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "PRODUCT")]
    product: String,
    #[tabled(rename = "QTY")]
    quantity: u32,
    #[tabled(rename = "UNIT NET")]
    unit_price: String,
    #[tabled(rename = "DISC %")]
    discount: String,
    #[tabled(rename = "RATE %")]
    rate: String,
    #[tabled(rename = "NET")]
    net: String,
    #[tabled(rename = "TAX")]
    tax: String,
    #[tabled(rename = "GROSS")]
    gross: String,
}

#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "RATE %")]
    rate: String,
    #[tabled(rename = "TARGET")]
    target: String,
    #[tabled(rename = "ACTUAL")]
    actual: String,
    #[tabled(rename = "DELTA")]
    delta: String,
    #[tabled(rename = "DEV %")]
    deviation: String,
    #[tabled(rename = "OUTCOME")]
    outcome: String,
}

#[derive(Tabled)]
struct CatalogRow {
    #[tabled(rename = "RATE %")]
    rate: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "NET")]
    net: String,
    #[tabled(rename = "GROSS")]
    gross: String,
    #[tabled(rename = "MAX DISC %")]
    max_discount: String,
    #[tabled(rename = "STOCK")]
    stock: String,
}

fn format_money(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let grouped = format_grouped_int(cents / 100);
    let sign = if cents < 0 && cents / 100 == 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, grouped, (cents % 100).unsigned_abs())
}

fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

fn outcome_label(outcome: TargetOutcome) -> &'static str {
    match outcome {
        TargetOutcome::Satisfied => "satisfied",
        TargetOutcome::Exhausted => "shortfall accepted",
        TargetOutcome::LineBudget => "line limit reached",
        TargetOutcome::Skipped => "skipped",
    }
}

fn print_generation(generation: &Generation) {
    let rows: Vec<LineRow> = generation
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| LineRow {
            index: idx + 1,
            product: match &line.reference {
                Some(reference) => format!("{} ({})", line.product_name, reference),
                None => line.product_name.clone(),
            },
            quantity: line.quantity,
            unit_price: format_money(line.unit_price_net),
            discount: format!("{:.1}", line.discount),
            rate: format!("{}", line.tax_rate),
            net: format_money(line.line_net),
            tax: format_money(line.line_tax),
            gross: format_money(line.line_gross),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    let summary = &generation.summary;
    let rows: Vec<TargetRow> = summary
        .targets
        .iter()
        .map(|t| TargetRow {
            rate: format!("{}", t.tax_rate),
            target: format_money(t.target_net),
            actual: format_money(t.actual_net),
            delta: format_money(t.delta),
            deviation: format!("{:.2}", t.deviation_pct),
            outcome: outcome_label(t.outcome).to_string(),
        })
        .collect();

    println!();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    println!();
    println!("Lines:    {}", summary.line_count);
    println!("Subtotal: {}", format_money(summary.subtotal_net));
    println!("Tax:      {}", format_money(summary.tax_total));
    println!("Total:    {}", format_money(summary.total_gross));
}

/// Synthesize lines for a request
fn cmd_generate(
    cfg_dir: &Path,
    request: &str,
    seed: Option<u64>,
    json: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let policy = load_policy(cfg_dir)?;
    let params = load_request(&resolve_request_path(request, cfg_dir)?)?;

    let mut synth = match seed {
        Some(seed) => Synthesizer::seeded(policy, seed),
        None => Synthesizer::from_entropy(policy),
    };

    if !json && output.is_none() {
        let generation = synth.generate(&params)?;
        print_generation(&generation);
        return Ok(());
    }

    let response = synth.respond(&params);
    let body =
        serde_json::to_string_pretty(&response).map_err(|e| CliError::Serialize(e.to_string()))?;

    match &output {
        Some(path) => {
            fs::write(path, body)?;
            println!("Saved:  {}", path.display());
        }
        None => println!("{body}"),
    }

    match response {
        Response::Success { .. } => Ok(()),
        Response::Failure { error, message, .. } => Err(CliError::Failed {
            kind: error,
            message,
        }),
    }
}

/// List eligible catalog entries
fn cmd_catalog(cfg_dir: &Path, request: &str) -> Result<()> {
    let params = load_request(&resolve_request_path(request, cfg_dir)?)?;
    let pools = filter_catalog(&params.catalog, &params.constraints)?;

    let rows: Vec<CatalogRow> = pools
        .iter()
        .flat_map(|(rate, entries)| {
            entries.iter().map(move |entry| CatalogRow {
                rate: format!("{rate}"),
                id: entry.id.clone(),
                name: entry.name.clone(),
                net: format_money(entry.unit_price_net),
                gross: format_money(entry.unit_price_gross),
                max_discount: format!("{:.1}", entry.discount_ceiling()),
                stock: if entry.unlimited_stock {
                    "unlimited".to_string()
                } else if entry.allow_backorder {
                    format!("{} (backorder)", entry.stock.unwrap_or(0))
                } else {
                    entry.stock.unwrap_or(0).to_string()
                },
            })
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!(
        "Eligible: {} of {} products",
        pools.product_count(),
        params.catalog.len()
    );

    Ok(())
}

/// Show the effective policy
fn cmd_policy(cfg_dir: &Path) -> Result<()> {
    let policy = load_policy(cfg_dir)?;
    let source = cfg_dir.join("policy.toml");

    if source.exists() {
        println!("# Policy from {}", source.display());
    } else {
        println!("# Default policy ({} not found)", source.display());
    }
    let body = toml::to_string_pretty(&policy).map_err(|e| CliError::Serialize(e.to_string()))?;
    print!("{body}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoice_synth::SynthError;

    #[test]
    fn money_is_grouped_with_cents() {
        assert_eq!(format_money(1234567.891), "1,234,567.89");
        assert_eq!(format_money(0.5), "0.50");
        assert_eq!(format_money(-0.25), "-0.25");
        assert_eq!(format_money(-1500.0), "-1,500.00");
    }

    #[test]
    fn synth_errors_surface_with_kind() {
        let err = CliError::from(SynthError::NoEligibleProducts);
        assert!(err.to_string().contains("no_eligible_products"));
    }

    #[test]
    fn failure_responses_keep_the_engine_wording() {
        let response = Response::from(SynthError::NoLinesGenerated);
        let Response::Failure { error, message, .. } = response else {
            panic!("expected a failure response");
        };
        let from_response = CliError::Failed {
            kind: error,
            message,
        };
        let direct = CliError::from(SynthError::NoLinesGenerated);
        assert_eq!(from_response.to_string(), direct.to_string());
    }
}
