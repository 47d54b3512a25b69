use std::fs::File;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vitrine::catalog::{CatalogLoader, CatalogSource};
use vitrine::config::{self, Config};
use vitrine::doctor;
use vitrine::tui::{self, App, Watch};
use vitrine::watch::{KeyValueStore, MemoryStore, WatchState};

/// Command line: `vitrine [doctor] [--catalog <url|path>]`, in any order
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    doctor: bool,
    catalog: Option<String>,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "doctor" => parsed.doctor = true,
                "--catalog" => match args.next() {
                    Some(source) => parsed.catalog = Some(source),
                    None => return Err("--catalog needs a URL or path".to_string()),
                },
                other => return Err(format!("unknown argument: {}", other)),
            }
        }

        Ok(parsed)
    }
}

#[tokio::main]
async fn main() {
    // Log to file so output does not interfere with the TUI
    let log_file = File::create(std::env::temp_dir().join("vitrine.log")).ok();

    if let Some(file) = log_file {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .with_ansi(false)
            .with_writer(file)
            .init();
    } else {
        // Fallback to stderr if can't create log file
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_target(false)
            .init();
    }

    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            if let config::ConfigError::ParseError(_) | config::ConfigError::ValidationError(_) = &e
                && let Ok(path) = Config::config_path()
            {
                eprintln!("\nCheck the config file at: {}", path.display());
                eprintln!("\nExample config.toml:");
                eprintln!(
                    r#"
[catalog]
source = "https://example.com/data.json"

[player]
command = "mpv"
"#
                );
            }
            std::process::exit(1);
        }
    };

    if let Some(source) = args.catalog {
        config.catalog.source = source;
    }

    if args.doctor {
        let results = doctor::run_checks(&config).await;
        doctor::print_results(&results);
        return;
    }

    let source = match CatalogSource::parse(&config.catalog.source) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let store: Box<dyn KeyValueStore> = match config.storage.store() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "no data directory, watch state will not persist");
            Box::new(MemoryStore::new())
        }
    };
    let watch: Watch = WatchState::new(store);

    info!(source = %config.catalog.source, "starting vitrine");
    let app = App::new(&config, watch);

    if let Err(e) = tui::run(CatalogLoader::new(source), app).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        CliArgs::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_doctor_in_any_position() {
        assert!(parse(&["doctor"]).unwrap().doctor);

        let args = parse(&["--catalog", "x.json", "doctor"]).unwrap();
        assert!(args.doctor);
        assert_eq!(args.catalog.as_deref(), Some("x.json"));
    }

    #[test]
    fn test_catalog_value_named_doctor() {
        let args = parse(&["--catalog", "doctor"]).unwrap();
        assert!(!args.doctor);
        assert_eq!(args.catalog.as_deref(), Some("doctor"));
    }

    #[test]
    fn test_bad_arguments() {
        assert_eq!(parse(&[]).unwrap(), CliArgs::default());
        assert!(parse(&["--catalog"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }
}
