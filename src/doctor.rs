use crate::catalog::{CatalogLoader, CatalogSource};
use crate::config::Config;
use crate::watch::{KeyValueStore, WATCHED_KEY, WatchState};

pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
        }
    }

    fn warning(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
        }
    }

    fn error(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "✓",
            CheckStatus::Warning => "⚠",
            CheckStatus::Error => "✗",
        }
    }

    pub fn color(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "\x1b[32m",      // green
            CheckStatus::Warning => "\x1b[33m", // yellow
            CheckStatus::Error => "\x1b[31m",   // red
        }
    }
}

pub async fn run_checks(config: &Config) -> Vec<CheckResult> {
    vec![
        check_catalog(config).await,
        check_command("Player", &config.player.command, CheckStatus::Error),
        // Only embed links need the browser
        check_command("Browser", &config.browser.command, CheckStatus::Warning),
        check_storage(config),
    ]
}

async fn check_catalog(config: &Config) -> CheckResult {
    let source = match CatalogSource::parse(&config.catalog.source) {
        Ok(source) => source,
        Err(e) => return CheckResult::error("Catalog", &e.to_string()),
    };

    match CatalogLoader::new(source).load().await {
        Ok(catalog) if catalog.is_empty() => {
            CheckResult::warning("Catalog", "Loaded but contains no items")
        }
        Ok(catalog) => CheckResult::ok(
            "Catalog",
            &format!(
                "{} items ({} series, {} movies)",
                catalog.len(),
                catalog.series().len(),
                catalog.movies().len()
            ),
        ),
        Err(e) => CheckResult::error("Catalog", &format!("Failed to load: {}", e)),
    }
}

fn check_command(name: &str, command: &str, missing: CheckStatus) -> CheckResult {
    match which::which(command) {
        Ok(path) => CheckResult::ok(name, &format!("{} found at {}", command, path.display())),
        Err(_) => {
            let message = format!("'{}' not found in PATH", command);
            match missing {
                CheckStatus::Warning => CheckResult::warning(name, &message),
                _ => CheckResult::error(name, &message),
            }
        }
    }
}

fn check_storage(config: &Config) -> CheckResult {
    let store = match config.storage.store() {
        Ok(store) => store,
        Err(e) => return CheckResult::error("Storage", &e.to_string()),
    };

    let dir = store.dir().display().to_string();
    let corrupt = store
        .get(WATCHED_KEY)
        .is_some_and(|raw| serde_json::from_str::<serde_json::Value>(&raw).is_err());

    if let Err(e) = std::fs::create_dir_all(store.dir()) {
        return CheckResult::error("Storage", &format!("Cannot create {}: {}", dir, e));
    }

    // Check if writable
    let test_file = store.dir().join(".vitrine_test");
    if let Err(e) = std::fs::write(&test_file, "test") {
        return CheckResult::error("Storage", &format!("{} not writable: {}", dir, e));
    }
    let _ = std::fs::remove_file(&test_file);

    if corrupt {
        return CheckResult::warning(
            "Storage",
            &format!("Watch state in {} is unreadable and will be reset", dir),
        );
    }

    let watched = WatchState::new(store).snapshot().len();
    CheckResult::ok(
        "Storage",
        &format!("{} ({} watched episodes)", dir, watched),
    )
}

pub fn print_results(results: &[CheckResult]) {
    let reset = "\x1b[0m";

    println!("\nvitrine doctor\n");

    for result in results {
        println!(
            "  {}{} {}{}  {}",
            result.color(),
            result.icon(),
            result.name,
            reset,
            result.message
        );
    }

    println!();

    let errors = results
        .iter()
        .filter(|r| r.status == CheckStatus::Error)
        .count();
    let warnings = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warning)
        .count();

    if errors > 0 {
        println!("  {} error(s), {} warning(s)", errors, warnings);
        println!("  Fix errors above to use vitrine.\n");
    } else if warnings > 0 {
        println!(
            "  {} warning(s) - vitrine will work with limited features.\n",
            warnings
        );
    } else {
        println!("  All checks passed!\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_command_status() {
        let result = check_command("Browser", "vitrine-no-such-browser", CheckStatus::Warning);
        assert_eq!(result.status, CheckStatus::Warning);
        assert_eq!(result.icon(), "⚠");

        let result = check_command("Player", "vitrine-no-such-player", CheckStatus::Error);
        assert_eq!(result.status, CheckStatus::Error);
    }

    #[tokio::test]
    async fn test_catalog_check_reports_missing_file() {
        let mut config = Config::default();
        config.catalog.source = "/nonexistent/vitrine/data.json".to_string();
        let result = check_catalog(&config).await;
        assert_eq!(result.status, CheckStatus::Error);
    }

    #[test]
    fn test_storage_check_counts_entries() {
        let dir = std::env::temp_dir().join(format!("vitrine-doctor-{}", std::process::id()));
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.clone());

        let watch = WatchState::new(config.storage.store().unwrap());
        watch.mark_watched("Dark", 1, 1).unwrap();

        let result = check_storage(&config);
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.message.contains("1 watched"));
        assert!(!dir.join(".vitrine_test").exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_storage_check_reports_unusable_dir() {
        // A regular file where the data directory should be
        let blocker = std::env::temp_dir().join(format!("vitrine-blocker-{}", std::process::id()));
        std::fs::write(&blocker, "not a dir").unwrap();

        let mut config = Config::default();
        config.storage.data_dir = Some(blocker.join("data"));

        let result = check_storage(&config);
        assert_eq!(result.status, CheckStatus::Error);

        let _ = std::fs::remove_file(blocker);
    }

    #[test]
    fn test_storage_check_warns_on_corrupt_state() {
        let dir = std::env::temp_dir().join(format!("vitrine-doctor-corrupt-{}", std::process::id()));
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.clone());
        config.storage.store().unwrap().set(WATCHED_KEY, "{oops").unwrap();

        let result = check_storage(&config);
        assert_eq!(result.status, CheckStatus::Warning);

        let _ = std::fs::remove_dir_all(dir);
    }
}
