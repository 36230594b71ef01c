//! # errproto CLI
//!
//! Inspect error catalogs exported by services.
//!
//! Usage:
//!   errproto list <catalog.json>
//!   errproto lookup <catalog.json> <CODE>
//!   errproto explain <catalog.json> <MESSAGE>
//!   errproto parse <CODE>
//!   errproto check <catalog.json>
//!
//! Examples:
//!   errproto lookup tikv.json TiKV:ErrRegion:Unavailable
//!   errproto lookup tidb.json 1062
//!   errproto explain tidb.json "[ddl:ErrDupKeyName] duplicate key name idx1"

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use errproto_error::{Catalog, CatalogEntry, RfcCode};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "errproto")]
#[command(author, version, about = "errproto - inspect error catalogs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List every error in a catalog
    List {
        /// Path to the catalog JSON file
        catalog: String,
    },
    /// Look up an error by RFC code or numeric code
    Lookup {
        /// Path to the catalog JSON file
        catalog: String,
        /// RFC code (`TiKV:ErrRegion:Unavailable`) or numeric code (`1062`)
        code: String,
    },
    /// Find the catalog entry behind a displayed error message
    Explain {
        /// Path to the catalog JSON file
        catalog: String,
        /// A message such as `[ddl:ErrDupKeyName] duplicate key name idx1`
        message: String,
    },
    /// Split an RFC code into its fields
    Parse {
        code: String,
    },
    /// Report duplicate codes in a catalog
    Check {
        /// Path to the catalog JSON file
        catalog: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(path: impl AsRef<Path>) -> anyhow::Result<Catalog> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    let catalog = Catalog::from_json(&text)
        .with_context(|| format!("parsing catalog {}", path.display()))?;
    tracing::debug!(path = %path.display(), registry = %catalog.registry, errors = catalog.errors.len(), "loaded catalog");
    Ok(catalog)
}

/// Render one entry in the multi-line text format.
fn describe(entry: &CatalogEntry) -> String {
    let mut out = format!("{}\n    Code: {}\n    Message: {}\n", entry.rfc_code, entry.code, entry.message);
    if !entry.description.is_empty() {
        out.push_str(&format!("    Description: {}\n", entry.description));
    }
    if !entry.workaround.is_empty() {
        out.push_str(&format!("    Workaround: {}\n", entry.workaround));
    }
    out
}

fn print_entries(entries: &[&CatalogEntry], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
    } else {
        for entry in entries {
            print!("{}", describe(entry));
        }
    }
    Ok(())
}

/// Entries matching a code given on the command line.
///
/// A plain number matches numeric codes; anything else is an RFC code.
fn lookup<'a>(catalog: &'a Catalog, code: &str) -> anyhow::Result<Vec<&'a CatalogEntry>> {
    if let Ok(numeric) = code.parse::<i32>() {
        let found = catalog.find_numeric(numeric);
        if !found.is_empty() {
            return Ok(found);
        }
    }
    let rfc: RfcCode = code.parse().with_context(|| format!("invalid error code '{}'", code))?;
    Ok(catalog.find(&rfc).into_iter().collect())
}

/// Split the `[class:id]` prefix off a displayed error.
fn display_prefix(message: &str) -> Option<(&str, &str)> {
    let rest = message.trim_start().strip_prefix('[')?;
    let (prefix, _) = rest.split_once(']')?;
    prefix.rsplit_once(':')
}

fn explain<'a>(catalog: &'a Catalog, message: &str) -> anyhow::Result<Vec<&'a CatalogEntry>> {
    let Some((class, id)) = display_prefix(message) else {
        bail!("message has no [class:code] prefix: {}", message);
    };
    Ok(catalog
        .errors
        .iter()
        .filter(|e| e.rfc_code.class().unwrap_or("") == class && e.rfc_code.id() == id)
        .collect())
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::List { catalog } => {
            let catalog = load_catalog(&catalog)?;
            if cli.json {
                println!("{}", catalog.to_json()?);
            } else {
                for entry in &catalog.errors {
                    println!("{:<40} {:>6}  {}", entry.rfc_code.to_string(), entry.code, entry.message);
                }
            }
        }
        Commands::Lookup { catalog, code } => {
            let catalog = load_catalog(&catalog)?;
            let found = lookup(&catalog, &code)?;
            if found.is_empty() {
                eprintln!("No error with code {} in {}", code, catalog.registry);
                return Ok(ExitCode::FAILURE);
            }
            print_entries(&found, cli.json)?;
        }
        Commands::Explain { catalog, message } => {
            let catalog = load_catalog(&catalog)?;
            let found = explain(&catalog, &message)?;
            if found.is_empty() {
                eprintln!("No catalog entry matches: {}", message);
                return Ok(ExitCode::FAILURE);
            }
            print_entries(&found, cli.json)?;
        }
        Commands::Parse { code } => {
            let rfc: RfcCode = code.parse().with_context(|| format!("invalid error code '{}'", code))?;
            if cli.json {
                let value = serde_json::json!({
                    "component": rfc.component(),
                    "class": rfc.class(),
                    "id": rfc.id(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Component: {}", rfc.component().unwrap_or("-"));
                println!("Class: {}", rfc.class().unwrap_or("-"));
                println!("ID: {}", rfc.id());
            }
        }
        Commands::Check { catalog } => {
            let catalog = load_catalog(&catalog)?;
            let conflicts = catalog.conflicts();
            if conflicts.is_empty() {
                println!("{}: {} errors, no conflicts", catalog.registry, catalog.errors.len());
            } else {
                for conflict in &conflicts {
                    println!("{}", conflict);
                }
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errproto_error::Registry;
    use std::io::Write;

    fn sample_catalog() -> Catalog {
        let registry = Registry::new("TiDB");
        let ddl = registry.register_class(4, "ddl").unwrap();
        let exec = registry.register_class(5, "executor").unwrap();
        ddl.define_error()
            .textual_code("ErrDupKeyName")
            .numeric_code(1061)
            .message_template("duplicate key name %s")
            .workaround("Rename the index.")
            .build()
            .unwrap();
        exec.define_error()
            .numeric_code(1105)
            .message_template("unknown error")
            .build()
            .unwrap();
        registry.catalog()
    }

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_catalog().to_json().unwrap().as_bytes()).unwrap();

        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog, sample_catalog());
    }

    #[test]
    fn test_load_catalog_errors_name_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();

        let err = load_catalog(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing catalog"));

        let err = load_catalog("/nonexistent/catalog.json").unwrap_err();
        assert!(format!("{:#}", err).contains("reading catalog"));
    }

    #[test]
    fn test_lookup_by_rfc_and_numeric_code() {
        let catalog = sample_catalog();
        let found = lookup(&catalog, "TiDB:ddl:ErrDupKeyName").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, 1061);

        let found = lookup(&catalog, "1105").unwrap();
        assert_eq!(found[0].rfc_code.to_string(), "TiDB:executor:1105");

        assert!(lookup(&catalog, "TiDB:ddl:Missing").unwrap().is_empty());
    }

    #[test]
    fn test_explain_display_prefix() {
        let catalog = sample_catalog();
        let found = explain(&catalog, "[ddl:ErrDupKeyName] duplicate key name idx1").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].workaround, "Rename the index.");

        let found = explain(&catalog, "[executor:1105] unknown error").unwrap();
        assert_eq!(found.len(), 1);

        assert!(explain(&catalog, "plain message").is_err());
    }

    #[test]
    fn test_display_prefix_of_classless_error() {
        assert_eq!(display_prefix("[:8001] boom"), Some(("", "8001")));
    }

    #[test]
    fn test_describe() {
        let catalog = sample_catalog();
        let text = describe(&catalog.errors[0]);
        assert!(text.starts_with("TiDB:ddl:ErrDupKeyName\n"));
        assert!(text.contains("    Workaround: Rename the index.\n"));
        assert!(!text.contains("Description"));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["errproto", "--json", "lookup", "c.json", "1062"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Lookup { ref code, .. } if code == "1062"));
    }
}
