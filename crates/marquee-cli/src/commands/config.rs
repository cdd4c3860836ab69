use crate::output::{new_table, Output};
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use marquee_config::{mask_secret, Config, CredentialStore, PathManager, CATALOG_API_KEY_ENV};
use serde_json::json;

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show_config(output),
        ConfigCommands::Init { force } => init_config(force, output),
        ConfigCommands::SetApiKey { key } => set_api_key(key, output),
    }
}

fn load_credentials(path_manager: &PathManager) -> Result<CredentialStore> {
    let credentials_file = path_manager.credentials_file();
    let mut store = CredentialStore::new(credentials_file.clone());
    store
        .load()
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    Ok(store)
}

fn show_config(output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();
    let config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let credentials = load_credentials(&path_manager)?;

    let api_key = match credentials.resolve_catalog_api_key() {
        Some(key) if std::env::var(CATALOG_API_KEY_ENV).is_ok() => format!("{} (from {})", mask_secret(&key), CATALOG_API_KEY_ENV),
        Some(key) => mask_secret(&key),
        None => "not set".to_string(),
    };

    output.json(&json!({
        "config_file": config_file.display().to_string(),
        "config_file_exists": config_file.exists(),
        "config": config,
        "catalog_api_key": api_key,
    }));
    if !output.is_human() {
        return Ok(());
    }

    if !config_file.exists() {
        output.warn(format!(
            "No configuration file at {}; showing defaults. Run `marquee config init` to create one.",
            config_file.display()
        ));
    }

    let resolution = &config.resolution;
    let mut table = new_table(&["Setting", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("Config file", config_file.display().to_string()),
        ("listing.base_url", config.listing.base_url.clone()),
        ("listing.page_ceiling", config.listing.page_ceiling.to_string()),
        ("listing.page_size", config.listing.page_size.to_string()),
        ("catalog.base_url", config.catalog.base_url.clone()),
        ("catalog.language", config.catalog.language.clone()),
        ("catalog API key", api_key),
        ("resolution.cache_ttl_secs", resolution.cache_ttl_secs.to_string()),
        ("resolution.failure_cooldown_secs", resolution.failure_cooldown_secs.to_string()),
        ("resolution.max_concurrency", resolution.max_concurrency.to_string()),
        (
            "resolution.pending_deadline_ms",
            resolution
                .pending_deadline_ms
                .map(|ms| ms.to_string())
                .unwrap_or_else(|| "none".to_string()),
        ),
        ("resolution.persist_cache", resolution.persist_cache.to_string()),
        ("resolution.settle_timeout_secs", resolution.settle_timeout_secs.to_string()),
        ("retry.listing.max_attempts", config.retry.listing.max_attempts.to_string()),
        ("retry.catalog.max_attempts", config.retry.catalog.max_attempts.to_string()),
        ("window.size", config.window.size.to_string()),
        (
            "logging.file",
            config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stderr".to_string()),
        ),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }
    output.table(&table);

    if let Err(e) = config.validate() {
        output.warn(format!("Configuration problem: {}", e));
    }
    Ok(())
}

fn init_config(force: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;

    let config_file = path_manager.config_file();
    if config_file.exists() && !force {
        output.warn(format!(
            "Configuration already exists at {}. Use --force to overwrite it.",
            config_file.display()
        ));
        return Ok(());
    }

    Config::default()
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", config_file.display(), e))?;
    output.success(format!("Wrote default configuration to {}", config_file.display()));
    Ok(())
}

fn set_api_key(key: Option<String>, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;

    let key = match key {
        Some(key) => key,
        None => rpassword::prompt_password("TMDB API key: ")
            .map_err(|e| eyre!("Failed to read API key: {}", e))?,
    };
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(eyre!("The API key must not be empty"));
    }

    let mut credentials = load_credentials(&path_manager)?;
    credentials.set_catalog_api_key(key);
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;

    output.success(format!(
        "Stored TMDB API key in {}",
        path_manager.credentials_file().display()
    ));
    if std::env::var(CATALOG_API_KEY_ENV).is_ok() {
        output.warn(format!("{} is set and takes precedence over the stored key", CATALOG_API_KEY_ENV));
    }
    Ok(())
}
