use chrono::NaiveDate;
use fitweather::{Aggregation, ProviderKind, WeatherCache, WeatherCacheError, WeatherConfig};
use std::env;

#[tokio::main]
async fn main() -> Result<(), WeatherCacheError> {
    configure_polars_display();

    // Reads the WeatherData section of the given settings file, or falls back
    // to Meteocat defaults. The API key is looked up in the system keyring.
    let cache = match env::args().nth(1) {
        Some(path) => WeatherCache::from_config_file(path).await?,
        None => WeatherCache::new(WeatherConfig::new(ProviderKind::Meteocat)).await?,
    };

    let dates: Vec<NaiveDate> = (1..=7)
        .filter_map(|d| NaiveDate::from_ymd_opt(2024, 5, d))
        .collect();

    let report = cache.backfill(&dates).await?;
    println!(
        "Fetched {} of {} dates ({} partial, {} failed)",
        report.filled.len() + report.partial.len(),
        report.missing.len(),
        report.partial.len(),
        report.failed.len()
    );
    for failure in &report.failures {
        println!("  {} {:?}: {}", failure.date, failure.variable, failure.reason);
    }

    let morning = cache
        .daily_weather()
        .dates(dates)
        .hour_range((8, 12))
        .aggregate(Aggregation::Mean)
        .call()
        .await?;
    println!("{}", morning.to_frame()?);

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    // show 20 rows
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
