use anyhow::Result;

use era5_auth::{CredentialsError, SecretStore, TokenSource};
use era5_catalog::{
    find_preset, is_known_palette, palette_colors, BandProvider, CatalogAccessor, CatalogBuilder,
    CatalogContext, EarthEngineProvider, CURATED,
};
use era5_core::{AppError, AuthError, Config, ConfigError};

#[tokio::main]
async fn main() -> Result<()> {
    era5_core::init()?;

    if let Err(e) = run().await {
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }
    Ok(())
}

async fn run() -> Result<(), AppError> {
    let (config, validation) = Config::load_validated().map_err(config_error)?;

    let credentials = match SecretStore::new(&config.credentials.secrets_path).load() {
        Ok(secret) => Some(TokenSource::new(secret)),
        Err(e) => {
            let notice = AppError::Auth(auth_error(e));
            tracing::warn!("{}; running from the cached catalog only", notice);
            eprintln!("{}", notice.user_message());
            None
        }
    };

    let provider = EarthEngineProvider::new(&config.provider, credentials)
        .map_err(|e| AppError::Service(e.to_string()))?;
    let builder = CatalogBuilder::configured(provider, &config.provider);
    let context = CatalogContext::new(&config.catalog.path, builder, config.catalog.max_age());

    let catalog = context.accessor().await;
    println!("ERA5 Dashboard - {}", context.builder().provider().collection());
    if !validation.warnings.is_empty() {
        println!("{} configuration warning(s), see log", validation.warnings.len());
    }
    println!("{}\n", catalog.status().description());
    print_curated(&catalog);
    print_catalog(&catalog);

    match context.builder().provider().temporal_extent().await {
        Ok(extent) => {
            let months = extent.months();
            if let (Some(first), Some(last)) = (months.first(), months.last()) {
                println!(
                    "\nMonths available: {} ({} to {})",
                    months.len(),
                    first.format("%Y-%m"),
                    last.format("%Y-%m")
                );
            }
        }
        Err(e) => {
            tracing::warn!("Month range unavailable: {}", e);
            println!("\nMonth range unavailable. {}", e.user_message());
        }
    }

    Ok(())
}

fn config_error(err: anyhow::Error) -> AppError {
    match err.downcast::<ConfigError>() {
        Ok(e) => AppError::Config(e),
        Err(e) => AppError::Other(e),
    }
}

fn auth_error(err: CredentialsError) -> AuthError {
    match err {
        CredentialsError::Missing(_) => AuthError::NotConfigured,
        CredentialsError::Expired => AuthError::TokenExpired,
        other => AuthError::Invalid(other.to_string()),
    }
}

fn print_curated(catalog: &CatalogAccessor) {
    if catalog.is_empty() {
        return;
    }

    println!("Variables:");
    for key in CURATED {
        if let Some(band) = catalog.resolve(key) {
            let label = find_preset(key).map_or(*key, |p| p.label);
            println!("  {:<28}  {}", label, band);
        }
    }

    let missing = catalog.missing_presets();
    if !missing.is_empty() {
        println!("Unavailable variables: {}", missing.join(", "));
    }
    println!();
}

fn print_catalog(catalog: &CatalogAccessor) {
    if catalog.is_empty() {
        println!("No variables known yet.");
        return;
    }

    let width = catalog.keys().map(str::len).max().unwrap_or(0);
    for key in catalog.keys() {
        let record = catalog.lookup(key);
        if !is_known_palette(&record.palette) {
            tracing::warn!(key, palette = %record.palette, "Unknown palette, drawing with the neutral ramp");
        }
        println!(
            "  {:<width$}  {:<28}  {:<8}  {:>12} .. {:<12}  {}",
            key,
            record.display_label(),
            record.unit,
            record.visual_min,
            record.visual_max,
            palette_colors(&record.palette).join(" "),
            width = width
        );
    }
}
