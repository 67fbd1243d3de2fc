use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use avy_core::{AppError, Config};
use avy_nac::{RequestedTime, Synopsis, SynopsisClient};
use avy_weather::dates::format_timestamp;
use avy_weather::provider::check_center;
use avy_weather::zones::{known_zones, precipitation_sub_zones};
use avy_weather::{
    parse_forecast_document, utc_to_local_time_string, DayPart, ForecastDocument, ForecastPeriod,
    SubPeriod, WeatherCache, WeatherError, WeatherProvider,
};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "avy", author, version, about = "Mountain weather and avalanche synopses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the mountain-weather forecast
    Weather {
        /// Only show this zone (canonical name or the page's short name)
        #[arg(long)]
        zone: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Normalize a saved forecast page instead of fetching
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,

        /// Ignore the cached forecast
        #[arg(long)]
        refresh: bool,
    },
    /// List forecast zones and their precipitation stations
    Zones,
    /// Show the regional synopsis for a zone
    Synopsis {
        #[arg(long)]
        zone_id: u32,

        /// Archived synopsis published on this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Avalanche center id, defaults to the configured center
        #[arg(long)]
        center: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = avy_core::init() {
        eprintln!("{:#}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            match &e {
                AppError::Config(detail) => eprintln!("{} ({})", e.user_message(), detail),
                _ => eprintln!("{}", e.user_message()),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let (config, _) = Config::load_validated()?;

    match cli.command {
        Commands::Weather {
            zone,
            json,
            html,
            refresh,
        } => {
            let forecast = match html {
                Some(path) => load_forecast_file(&path)?,
                None => fetch_forecast(&config, refresh).await?,
            };
            if let Some(name) = zone.as_deref() {
                if forecast.zone(name).is_none() {
                    return Err(AppError::Service {
                        detail: format!("No forecast for zone {:?}", name),
                        user_message: "That zone has no forecast. Run `avy zones` to list zones.",
                    });
                }
            }
            if forecast.is_expired_at(Utc::now()) {
                tracing::warn!(
                    "Forecast expired {}",
                    format_timestamp(&forecast.expires_time)
                );
            }
            print!("{}", render_weather(&forecast, zone.as_deref(), json)?);
        }
        Commands::Zones => print!("{}", render_zones()),
        Commands::Synopsis {
            zone_id,
            date,
            center,
            json,
        } => {
            let center = center.unwrap_or_else(|| config.weather.center_id.clone());
            let requested = date.map_or(RequestedTime::Latest, RequestedTime::Archived);
            let client = SynopsisClient::new(&config.nac)?;
            let synopsis = client.fetch(&center, zone_id, requested).await?;
            if json {
                let json = serde_json::to_string_pretty(&synopsis)
                    .context("Failed to encode synopsis")?;
                println!("{}", json);
            } else {
                print!("{}", render_synopsis(&synopsis));
            }
        }
    }
    Ok(())
}

async fn fetch_forecast(config: &Config, refresh: bool) -> Result<ForecastDocument, WeatherError> {
    check_center(&config.weather.center_id)?;

    let provider = WeatherProvider::new(&config.weather)?;
    let ttl = chrono::Duration::hours(i64::from(config.weather.cache_ttl_hours));
    let mut cache = WeatherCache::load(&config.config_dir, ttl);
    let now = Utc::now();

    if refresh {
        cache.invalidate()?;
    }
    provider.latest(&mut cache, now).await
}

/// Normalize a saved forecast page
fn load_forecast_file(path: &Path) -> Result<ForecastDocument, AppError> {
    let html = std::fs::read_to_string(path)
        .inspect_err(|e| tracing::error!("Failed to read {}: {}", path.display(), e))?;
    Ok(parse_forecast_document(&html).map_err(WeatherError::from)?)
}

fn slot_name(period: DayPart, subperiod: SubPeriod) -> &'static str {
    match (period, subperiod) {
        (DayPart::Day, SubPeriod::Early) => "morning",
        (DayPart::Day, SubPeriod::Late) => "afternoon",
        (DayPart::Night, SubPeriod::Early) => "evening",
        (DayPart::Night, SubPeriod::Late) => "overnight",
    }
}

fn render_weather(forecast: &ForecastDocument, zone: Option<&str>, json: bool) -> Result<String> {
    let zones: Vec<(&str, &[ForecastPeriod])> = match zone {
        Some(name) => {
            let periods = forecast
                .zone(name)
                .with_context(|| format!("No forecast for zone {:?}", name))?;
            vec![(avy_weather::canonical_zone_name(name), periods)]
        }
        None => forecast
            .zones
            .iter()
            .map(|(name, periods)| (name.as_str(), periods.as_slice()))
            .collect(),
    };

    if json {
        let mut out = match zone {
            Some(_) => serde_json::to_string_pretty(&zones[0].1)?,
            None => serde_json::to_string_pretty(forecast)?,
        };
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    writeln!(out, "Mountain Weather Forecast by {}", forecast.author)?;
    writeln!(
        out,
        "Issued {}, expires {}",
        format_timestamp(&forecast.published_time),
        format_timestamp(&forecast.expires_time)
    )?;
    if let Some(synopsis) = &forecast.synopsis {
        writeln!(out, "\n{}", synopsis)?;
    }

    for (name, periods) in zones {
        writeln!(out, "\n== {} ==", name)?;
        for period in periods {
            render_period(&mut out, period)?;
        }
    }
    Ok(out)
}

fn render_period(out: &mut String, period: &ForecastPeriod) -> std::fmt::Result {
    writeln!(out, "{}: {}", period.label, period.forecast)?;

    if !period.snow_level.is_empty() {
        let levels: Vec<String> = period
            .snow_level
            .iter()
            .map(|s| format!("{}' ({})", s.level, slot_name(s.period, s.subperiod)))
            .collect();
        writeln!(out, "  Snow level: {}", levels.join(", "))?;
    }
    if let Some(t) = period.temperatures {
        writeln!(out, "  Temperatures: high {} / low {}", t.high, t.low)?;
    }
    if !period.winds.is_empty() {
        let winds: Vec<String> = period
            .winds
            .iter()
            .map(|w| format!("{} ({})", w.speed, slot_name(w.period, w.subperiod)))
            .collect();
        writeln!(out, "  Ridgeline winds: {}", winds.join(", "))?;
    }
    if !period.precipitation.is_empty() {
        let amounts: Vec<String> = period
            .precipitation
            .iter()
            .map(|(station, amount)| format!("{} {}", station, amount))
            .collect();
        writeln!(out, "  Precipitation: {}", amounts.join(", "))?;
    }
    Ok(())
}

fn render_zones() -> String {
    let mut out = String::new();
    for zone in known_zones() {
        let stations = precipitation_sub_zones(zone);
        if stations.is_empty() {
            out.push_str(&format!("{}\n", zone));
        } else {
            out.push_str(&format!("{} ({})\n", zone, stations.join(", ")));
        }
    }
    out
}

fn render_synopsis(synopsis: &Synopsis) -> String {
    let mut out = String::new();
    let author = synopsis.author.as_deref().unwrap_or("Unknown");
    out.push_str(&format!(
        "Synopsis by {}, published {}\n",
        author,
        utc_to_local_time_string(synopsis.published_time.as_deref())
    ));
    let sections = [
        ("Bottom line", &synopsis.bottom_line),
        ("Announcement", &synopsis.announcement),
        ("Hazard discussion", &synopsis.hazard_discussion),
        ("Weather discussion", &synopsis.weather_discussion),
    ];
    for (title, body) in sections {
        if let Some(body) = body.as_deref().filter(|b| !b.trim().is_empty()) {
            out.push_str(&format!("\n{}:\n{}\n", title, body.trim()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use avy_weather::{PeriodLabel, SnowLevel, Temperatures, WindSpeed};
    use chrono::{FixedOffset, TimeZone, Weekday};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const FORECAST_PAGE: &str = include_str!("../../avy-weather/tests/fixtures/forecast.html");

    fn forecast() -> ForecastDocument {
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        let mut period = ForecastPeriod::new(PeriodLabel::night(Weekday::Wed), "Mostly clear.");
        period.snow_level.push(SnowLevel {
            period: DayPart::Night,
            subperiod: SubPeriod::Early,
            level: 3000,
        });
        period.temperatures = Some(Temperatures { high: 34, low: 25 });
        period.winds.push(WindSpeed {
            period: DayPart::Night,
            subperiod: SubPeriod::Late,
            speed: "W 5-15".into(),
        });
        period
            .precipitation
            .insert("Mission Ridge".into(), "0.05".into());

        let mut zones = BTreeMap::new();
        zones.insert("East Slopes Central".to_string(), vec![period]);
        ForecastDocument {
            author: "Dennis D'Amico".into(),
            published_time: offset.with_ymd_and_hms(2023, 1, 25, 14, 0, 0).unwrap(),
            expires_time: offset.with_ymd_and_hms(2023, 1, 26, 7, 0, 0).unwrap(),
            synopsis: Some("High pressure.".into()),
            zones,
        }
    }

    #[test]
    fn test_cli_parses_weather_flags() {
        let cli = Cli::try_parse_from(["avy", "weather", "--zone", "Mt. Hood", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Weather { zone: Some(ref z), json: true, html: None, refresh: false } if z == "Mt. Hood"
        ));
    }

    #[test]
    fn test_cli_parses_synopsis_date() {
        let cli =
            Cli::try_parse_from(["avy", "synopsis", "--zone-id", "1128", "--date", "2023-01-25"])
                .unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 1, 25);
        assert!(matches!(
            cli.command,
            Commands::Synopsis { zone_id: 1128, date, center: None, json: false } if date == expected
        ));
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        assert!(Cli::try_parse_from(["avy", "synopsis", "--zone-id", "1", "--date", "soon"]).is_err());
    }

    #[test]
    fn test_render_weather_text() {
        let out = render_weather(&forecast(), None, false).unwrap();
        assert!(out.contains("Mountain Weather Forecast by Dennis D'Amico"));
        assert!(out.contains("Issued Wed, Jan 25, 2023 2:00 PM, expires Thu, Jan 26, 2023 7:00 AM"));
        assert!(out.contains("== East Slopes Central =="));
        assert!(out.contains("Wednesday Night: Mostly clear."));
        assert!(out.contains("Snow level: 3000' (evening)"));
        assert!(out.contains("Temperatures: high 34 / low 25"));
        assert!(out.contains("Ridgeline winds: W 5-15 (overnight)"));
        assert!(out.contains("Precipitation: Mission Ridge 0.05"));
    }

    #[test]
    fn test_render_weather_zone_by_alias() {
        let out = render_weather(&forecast(), Some("East Central"), true).unwrap();
        let periods: Vec<ForecastPeriod> = serde_json::from_str(&out).unwrap();
        assert_eq!(periods.len(), 1);
    }

    #[test]
    fn test_render_weather_unknown_zone() {
        assert!(render_weather(&forecast(), Some("Olympics"), false).is_err());
    }

    #[test]
    fn test_render_zones_lists_stations() {
        let out = render_zones();
        assert!(out.contains("Mt Hood (Timberline, Mt Hood Meadows)"));
        assert!(out.contains("Olympics (Hurricane Ridge)"));
    }

    #[test]
    fn test_render_synopsis_skips_empty_sections() {
        let synopsis = Synopsis {
            author: Some("Robert Hahn".into()),
            bottom_line: Some("Quiet weather.".into()),
            hazard_discussion: Some("  ".into()),
            ..Synopsis::default()
        };
        let out = render_synopsis(&synopsis);
        assert!(out.starts_with("Synopsis by Robert Hahn, published Unknown"));
        assert!(out.contains("Bottom line:\nQuiet weather."));
        assert!(!out.contains("Hazard discussion"));
    }

    #[test]
    fn test_load_forecast_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forecast.html");
        std::fs::write(&path, FORECAST_PAGE).unwrap();

        let forecast = load_forecast_file(&path).unwrap();
        assert_eq!(forecast.author, "Dennis D'Amico");
        assert!(forecast.zone("Mt. Hood").is_some());
    }

    #[test]
    fn test_unparseable_file_message_is_generic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("maintenance.html");
        std::fs::write(&path, "<html><body>Down for maintenance</body></html>").unwrap();

        let err = load_forecast_file(&path).unwrap_err();
        assert!(matches!(err, AppError::Service { .. }));
        assert_eq!(
            err.user_message(),
            "Weather data is unavailable right now. Please try again later."
        );
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load_forecast_file(&dir.path().join("missing.html")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
