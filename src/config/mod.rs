mod catalog;
mod policy;
mod request;

pub use catalog::CatalogEntry;
pub use policy::{Policy, SearchLimits, Tolerances};
pub use request::{Constraints, GenerationParameters, TargetAmount, TargetSpec};

use crate::error::{CliError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.invoice-synth/ or the XDG equivalent)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "invoice-synth") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.invoice-synth/
    let home = dirs_home().ok_or_else(|| {
        CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".invoice-synth"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Load policy.toml (defaults if missing)
pub fn load_policy(config_dir: &Path) -> Result<Policy> {
    let path = config_dir.join("policy.toml");
    if !path.exists() {
        tracing::debug!("no policy file at {}, using defaults", path.display());
        return Ok(Policy::default());
    }
    let content = fs::read_to_string(&path)?;
    let policy: Policy =
        toml::from_str(&content).map_err(|e| CliError::TomlParse { path, source: e })?;
    policy.validate().map_err(CliError::InvalidPolicy)?;
    Ok(policy)
}

/// Load a generation request. `.json` files are read as JSON, anything else as TOML.
pub fn load_request(path: &Path) -> Result<GenerationParameters> {
    if !path.exists() {
        return Err(CliError::RequestNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| CliError::JsonParse {
            path: path.to_path_buf(),
            source: e,
        })
    } else {
        toml::from_str(&content).map_err(|e| CliError::TomlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Resolve a request argument: existing paths win, bare names are looked up in the config dir.
pub fn resolve_request_path(arg: &str, config_dir: &Path) -> Result<PathBuf> {
    let direct = expand_path(arg);
    if direct.exists() {
        return Ok(direct);
    }
    if !config_dir.exists() {
        return Err(CliError::ConfigNotFound(config_dir.to_path_buf()));
    }
    Ok(config_dir.join(arg))
}

/// Template content for policy.toml
pub const POLICY_TEMPLATE: &str = r#"# Search policy for line synthesis. Every key is optional;
# missing keys fall back to the values shown here.

[tolerances]
pool_overshoot = 1.10       # unit price may exceed the remaining amount by 10%
selection_overshoot = 1.05  # a line may exceed the remaining amount by 5%
shortfall_threshold = 0.20  # up to 20% of a target may stay unallocated
epsilon = 0.01

[search]
discount_step = 0.5         # percentage points
max_attempts = 500          # per target
"#;

/// Template content for request.toml
pub const REQUEST_TEMPLATE: &str = r#"# A generation request: constraints, per-rate targets and the catalog snapshot.
#
# Example:
#   invoice-synth generate --request request.toml --seed 7

[constraints]
max_lines = 25
min_unit_price = 1.0    # tax-inclusive
max_unit_price = 500.0  # tax-inclusive
allowed_rates = [19.0, 7.0]
foreign_client = false

[[targets]]
tax_rate = 19.0
amount = { net = 1000.0 }

[[targets]]
tax_rate = 7.0
amount = { gross = 214.0 }  # net 200.00

[[catalog]]
id = "consulting"
name = "Technical Consulting"
unit_price_net = 100.0
unit_price_gross = 119.0
tax_rate = 19.0
max_discount = 10.0
unlimited_stock = true

[[catalog]]
id = "cable-kit"
name = "Cable Kit"
reference = "CK-200"
unit_price_net = 45.5
unit_price_gross = 54.15
tax_rate = 19.0
max_discount = 5.0
stock = 30

[[catalog]]
id = "server-rack"
name = "Server Rack"
unit_price_net = 900.0
unit_price_gross = 1071.0
tax_rate = 19.0
stock = 2

[[catalog]]
id = "handbook"
name = "Operations Handbook"
unit_price_net = 25.0
unit_price_gross = 26.75
tax_rate = 7.0
stock = 12

[[catalog]]
id = "newsletter"
name = "Newsletter Issue"
unit_price_net = 4.5
unit_price_gross = 4.82
tax_rate = 7.0
max_discount = 20.0
allow_backorder = true
stock = 0
"#;
