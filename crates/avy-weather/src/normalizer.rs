//! Mountain-weather forecast page normalizer.
//!
//! Turns the forecast page into a [`ForecastDocument`] in five passes over a
//! shared zone -> periods map:
//!
//! 1. zone forecast blocks create the periods of every zone
//! 2. snow levels
//! 3. precipitation by sub-zone
//! 4. temperatures
//! 5. ridgeline winds
//!
//! Passes 2-5 only attach to periods created by pass 1. A reading for a zone
//! or period that does not exist is dropped with a diagnostic and counted in
//! the [`ParseReport`]; a missing top-level section fails the whole parse.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use tracing::instrument;

use crate::dates::{infer_expiry, parse_issued};
use crate::dom::{Document, Node};
use crate::error::{ParseError, Section};
use crate::period::{period_info, PeriodInfo, PeriodLabel};
use crate::repair::close_unterminated_rows;
use crate::types::{ForecastDocument, ForecastPeriod, SnowLevel, Temperatures, WindSpeed};
use crate::zones::{canonical_zone_name, forecast_zone_for_precipitation};

/// Forecast periods keyed by canonical zone name
pub type ZoneForecasts = BTreeMap<String, Vec<ForecastPeriod>>;

#[allow(clippy::expect_used)]
static TEMPERATURE_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d+)\s*/\s*(-?\d+)").expect("literal pattern"));

/// What happened to one table cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached,
    SkippedNoMatchingPeriod,
    SkippedUnknownZone,
    SkippedUnparseableValue,
}

/// Outcome counts for one enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub attached: usize,
    pub no_matching_period: usize,
    pub unknown_zone: usize,
    pub unparseable_value: usize,
    /// Data rows without a zone cell
    pub rows_without_zone: usize,
}

impl PassReport {
    pub fn record(&mut self, outcome: AttachOutcome) {
        match outcome {
            AttachOutcome::Attached => self.attached += 1,
            AttachOutcome::SkippedNoMatchingPeriod => self.no_matching_period += 1,
            AttachOutcome::SkippedUnknownZone => self.unknown_zone += 1,
            AttachOutcome::SkippedUnparseableValue => self.unparseable_value += 1,
        }
    }

    /// Cells that were read but not attached
    pub fn skipped(&self) -> usize {
        self.no_matching_period + self.unknown_zone + self.unparseable_value
    }
}

/// Diagnostics collected while normalizing one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub parser_warnings: usize,
    /// Zone forecast blocks whose id matches no tab
    pub orphan_blocks: usize,
    pub snow_level: PassReport,
    pub precipitation: PassReport,
    pub temperature: PassReport,
    pub wind: PassReport,
}

/// The required parts of the page, located before any pass runs
struct Sections<'a> {
    tabs: Node<'a>,
    snow_level: Node<'a>,
    precipitation: Node<'a>,
    temperatures: Node<'a>,
    winds: Node<'a>,
    forecaster: Node<'a>,
    synopsis: Node<'a>,
    issued: Node<'a>,
}

impl<'a> Sections<'a> {
    fn locate(root: Node<'a>) -> Result<Self, ParseError> {
        let by_class = |classes: &str, section: Section| {
            root.first_by_class(classes)
                .ok_or(ParseError::MissingSection(section))
        };

        let winds = root
            .element_by_id("free-winds-5k")
            .ok_or(ParseError::MissingSection(Section::WindHeading))?
            .next_sibling_by_tag("div")
            .ok_or(ParseError::MissingSection(Section::WindContainer))?
            .first_by_tag("table")
            .ok_or(ParseError::MissingSection(Section::WindTable))?;

        Ok(Self {
            tabs: by_class("forecast-tabs", Section::ZoneTabs)?,
            snow_level: by_class("desktop snow-level", Section::SnowLevelTable)?,
            precipitation: by_class("desktop precipitation", Section::PrecipitationTable)?,
            temperatures: by_class("desktop temperatures", Section::TemperatureTable)?,
            winds,
            forecaster: by_class("forecaster", Section::Forecaster)?,
            synopsis: by_class("synopsis", Section::Synopsis)?,
            issued: by_class("forecast-date", Section::IssuedDate)?,
        })
    }
}

/// Normalize the mountain-weather forecast page.
pub fn parse_forecast_document(html: &str) -> Result<ForecastDocument, ParseError> {
    parse_forecast_document_with_report(html).map(|(doc, _)| doc)
}

/// Normalize the forecast page and report what was skipped along the way.
#[instrument(skip_all, level = "debug")]
pub fn parse_forecast_document_with_report(
    html: &str,
) -> Result<(ForecastDocument, ParseReport), ParseError> {
    let fixed = close_unterminated_rows(html);
    let document = Document::parse(&fixed);
    let root = document.root();
    let sections = Sections::locate(root)?;

    let mut report = ParseReport {
        parser_warnings: document.warning_count(),
        ..ParseReport::default()
    };

    let published_time = parse_issued(&sections.issued.text_content())?;
    let expires_time = infer_expiry(published_time)?;

    let mut zones = extract_zone_periods(root, sections.tabs, &mut report);
    tracing::debug!("Extracted {} zone forecasts", zones.len());

    report.snow_level = attach_snow_levels(&mut zones, sections.snow_level);
    report.precipitation = attach_precipitation(&mut zones, sections.precipitation);
    report.temperature = attach_temperatures(&mut zones, sections.temperatures);
    report.wind = attach_winds(&mut zones, sections.winds);
    tracing::debug!("Forecast page normalized: {:?}", report);

    let author = sections.forecaster.text_content();
    let author = author
        .strip_prefix("by ")
        .unwrap_or(author.as_str())
        .trim()
        .to_string();

    let forecast = ForecastDocument {
        author,
        published_time,
        expires_time,
        synopsis: synopsis_text(sections.synopsis),
        zones,
    };
    Ok((forecast, report))
}

/// Attach a reading to the period labelled `label` in `zone`.
///
/// Leaves `zones` untouched when the zone or period does not exist.
pub fn attach_to_period<F>(
    zones: &mut ZoneForecasts,
    zone: &str,
    label: PeriodLabel,
    apply: F,
) -> AttachOutcome
where
    F: FnOnce(&mut ForecastPeriod),
{
    let Some(periods) = zones.get_mut(zone) else {
        tracing::debug!("No forecast for zone {}", zone);
        return AttachOutcome::SkippedUnknownZone;
    };

    match periods.iter_mut().find(|p| p.label == label) {
        Some(period) => {
            apply(period);
            AttachOutcome::Attached
        }
        None => {
            tracing::debug!("Could not find forecast for {} in {}", label, zone);
            AttachOutcome::SkippedNoMatchingPeriod
        }
    }
}

fn zone_name(cell: Node<'_>) -> String {
    canonical_zone_name(&cell.text_content()).to_string()
}

/// Column periods from a header row, skipping the leading zone column
fn header_periods(row: Node<'_>) -> Vec<PeriodInfo> {
    row.elements_by_tag("th")
        .into_iter()
        .skip(1)
        .map(|th| th.text_content())
        .filter(|text| !text.is_empty())
        .filter_map(|text| period_info(&text))
        .collect()
}

/// Header periods plus the data rows starting at `first_data_row`
fn read_table<'a>(table: Node<'a>, first_data_row: usize) -> (Vec<PeriodInfo>, Vec<Node<'a>>) {
    let rows = table.elements_by_tag("tr");
    let Some(header) = rows.first() else {
        tracing::warn!("Forecast table has no rows");
        return (Vec::new(), Vec::new());
    };
    let periods = header_periods(*header);
    let data = rows.into_iter().skip(first_data_row).collect();
    (periods, data)
}

fn extract_zone_periods(
    root: Node<'_>,
    tabs: Node<'_>,
    report: &mut ParseReport,
) -> ZoneForecasts {
    let names: HashMap<&str, String> = tabs
        .elements_by_tag("div")
        .into_iter()
        .filter_map(|tab| tab.attribute("data-mwr-id").map(|id| (id, zone_name(tab))))
        .collect();

    let mut zones = ZoneForecasts::new();
    for block in root.elements_by_class("mwr-forecast") {
        let Some(zone) = block.attribute("data-mwr-id").and_then(|id| names.get(id)) else {
            tracing::warn!(
                "Zone forecast block {:?} has no matching tab",
                block.attribute("data-mwr-id")
            );
            report.orphan_blocks += 1;
            continue;
        };

        let labels = block
            .elements_by_tag("th")
            .into_iter()
            .filter(|th| th.has_classes("row-header"))
            .filter_map(|th| period_info(&th.text_content()))
            .map(|info| info.label);
        let texts = block
            .elements_by_tag("td")
            .into_iter()
            .filter(|td| td.has_classes("description"))
            .map(|td| td.text_content());

        let periods = labels
            .zip(texts)
            .map(|(label, text)| ForecastPeriod::new(label, text));
        merge_periods(zones.entry(zone.clone()).or_default(), periods);
    }
    zones
}

/// Index-wise merge for a zone that appears in more than one block
fn merge_periods(existing: &mut Vec<ForecastPeriod>, incoming: impl Iterator<Item = ForecastPeriod>) {
    for (idx, period) in incoming.enumerate() {
        match existing.get_mut(idx) {
            Some(current) => {
                current.label = period.label;
                current.forecast = period.forecast;
            }
            None => existing.push(period),
        }
    }
}

fn attach_snow_levels(zones: &mut ZoneForecasts, table: Node<'_>) -> PassReport {
    let mut report = PassReport::default();
    let (periods, rows) = read_table(table, 1);

    for row in rows {
        let Some(zone) = row.first_by_tag("th").map(zone_name) else {
            report.rows_without_zone += 1;
            continue;
        };
        for (cell, info) in row.elements_by_tag("td").into_iter().zip(&periods) {
            let outcome = match digits_only(&cell.text_content()) {
                Some(level) => attach_to_period(zones, &zone, info.label, |p| {
                    p.snow_level.push(SnowLevel {
                        period: info.period,
                        subperiod: info.subperiod,
                        level,
                    })
                }),
                None => AttachOutcome::SkippedUnparseableValue,
            };
            report.record(outcome);
        }
    }
    report
}

fn attach_precipitation(zones: &mut ZoneForecasts, table: Node<'_>) -> PassReport {
    let mut report = PassReport::default();
    // second row is a units sub-header
    let (periods, rows) = read_table(table, 2);

    for row in rows {
        let Some(sub_zone) = row.first_by_tag("th").map(zone_name) else {
            report.rows_without_zone += 1;
            continue;
        };
        let Some(zone) = forecast_zone_for_precipitation(&sub_zone) else {
            tracing::trace!("Skipping unmapped precipitation zone {}", sub_zone);
            continue;
        };

        let cells = row
            .elements_by_tag("td")
            .into_iter()
            .map(|td| td.text_content())
            .filter(|text| !text.is_empty());
        for (amount, info) in cells.zip(&periods) {
            let outcome = attach_to_period(zones, zone, info.label, |p| {
                p.precipitation.insert(sub_zone.clone(), amount);
            });
            report.record(outcome);
        }
    }
    report
}

fn attach_temperatures(zones: &mut ZoneForecasts, table: Node<'_>) -> PassReport {
    let mut report = PassReport::default();
    let (periods, rows) = read_table(table, 2);

    for row in rows {
        let cells = row.elements_by_tag("td");
        let Some((zone_cell, values)) = cells.split_first() else {
            report.rows_without_zone += 1;
            continue;
        };
        let zone = zone_name(*zone_cell);

        for (cell, info) in values.iter().zip(&periods) {
            let outcome = match temperature_range(&cell.text_content()) {
                Some(range) => {
                    attach_to_period(zones, &zone, info.label, |p| p.temperatures = Some(range))
                }
                None => AttachOutcome::SkippedUnparseableValue,
            };
            report.record(outcome);
        }
    }
    report
}

fn attach_winds(zones: &mut ZoneForecasts, table: Node<'_>) -> PassReport {
    let mut report = PassReport::default();
    let (periods, rows) = read_table(table, 1);

    for row in rows {
        let Some(zone) = row.first_by_tag("th").map(zone_name) else {
            report.rows_without_zone += 1;
            continue;
        };
        for (cell, info) in row.elements_by_tag("td").into_iter().zip(&periods) {
            let speed = cell.text_content();
            let outcome = if speed.is_empty() {
                AttachOutcome::SkippedUnparseableValue
            } else {
                attach_to_period(zones, &zone, info.label, |p| {
                    p.winds.push(WindSpeed {
                        period: info.period,
                        subperiod: info.subperiod,
                        speed,
                    })
                })
            };
            report.record(outcome);
        }
    }
    report
}

/// Number made of every digit in `text` ("5,500'" -> 5500)
fn digits_only(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// First "<high> / <low>" pair in a temperature cell
fn temperature_range(text: &str) -> Option<Temperatures> {
    let caps = TEMPERATURE_PAIR.captures(text)?;
    Some(Temperatures {
        high: caps[1].parse().ok()?,
        low: caps[2].parse().ok()?,
    })
}

fn synopsis_text(container: Node<'_>) -> Option<String> {
    let paragraphs: Vec<String> = container
        .elements_by_tag("p")
        .into_iter()
        .map(|p| p.text_content())
        .filter(|text| !text.is_empty())
        .collect();
    (!paragraphs.is_empty()).then(|| paragraphs.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn zones_with(zone: &str, labels: &[PeriodLabel]) -> ZoneForecasts {
        let mut zones = ZoneForecasts::new();
        zones.insert(
            zone.to_string(),
            labels
                .iter()
                .map(|label| ForecastPeriod::new(*label, "text"))
                .collect(),
        );
        zones
    }

    #[test]
    fn test_attach_to_existing_period() {
        let monday = PeriodLabel::day(Weekday::Mon);
        let mut zones = zones_with("Olympics", &[monday]);

        let outcome = attach_to_period(&mut zones, "Olympics", monday, |p| {
            p.temperatures = Some(Temperatures { low: 20, high: 30 })
        });

        assert_eq!(outcome, AttachOutcome::Attached);
        assert_eq!(
            zones["Olympics"][0].temperatures,
            Some(Temperatures { low: 20, high: 30 })
        );
    }

    #[test]
    fn test_attach_to_missing_period_leaves_zones_untouched() {
        let mut zones = zones_with("Olympics", &[PeriodLabel::day(Weekday::Mon)]);
        let before = zones.clone();

        let outcome = attach_to_period(
            &mut zones,
            "Olympics",
            PeriodLabel::night(Weekday::Tue),
            |p| p.forecast.push_str("changed"),
        );

        assert_eq!(outcome, AttachOutcome::SkippedNoMatchingPeriod);
        assert_eq!(zones, before);
    }

    #[test]
    fn test_attach_to_unknown_zone_is_skipped() {
        let mut zones = zones_with("Olympics", &[PeriodLabel::day(Weekday::Mon)]);
        let before = zones.clone();

        let outcome = attach_to_period(&mut zones, "Mt Hood", PeriodLabel::day(Weekday::Mon), |p| {
            p.forecast.clear()
        });

        assert_eq!(outcome, AttachOutcome::SkippedUnknownZone);
        assert_eq!(zones, before);
    }

    #[test]
    fn test_pass_report_counts() {
        let mut report = PassReport::default();
        report.record(AttachOutcome::Attached);
        report.record(AttachOutcome::SkippedNoMatchingPeriod);
        report.record(AttachOutcome::SkippedUnparseableValue);
        assert_eq!(report.attached, 1);
        assert_eq!(report.skipped(), 2);
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("5,500'"), Some(5500));
        assert_eq!(digits_only(" 3000 ft "), Some(3000));
        assert_eq!(digits_only("--"), None);
    }

    #[test]
    fn test_temperature_range() {
        assert_eq!(
            temperature_range("Monday / 34 / 22"),
            Some(Temperatures { high: 34, low: 22 })
        );
        assert_eq!(
            temperature_range("41/30"),
            Some(Temperatures { high: 41, low: 30 })
        );
        assert_eq!(temperature_range("n/a"), None);
    }

    #[test]
    fn test_temperature_range_below_zero() {
        assert_eq!(
            temperature_range("Monday / -5 / -12"),
            Some(Temperatures { high: -5, low: -12 })
        );
        assert_eq!(
            temperature_range("34 / -2"),
            Some(Temperatures { high: 34, low: -2 })
        );
    }

    #[test]
    fn test_merge_periods_index_wise() {
        let mut existing = vec![ForecastPeriod::new(PeriodLabel::day(Weekday::Mon), "old")];
        let incoming = vec![
            ForecastPeriod::new(PeriodLabel::day(Weekday::Mon), "new"),
            ForecastPeriod::new(PeriodLabel::night(Weekday::Mon), "night"),
        ];
        merge_periods(&mut existing, incoming.into_iter());
        assert_eq!(existing.len(), 2);
        assert_eq!(existing[0].forecast, "new");
        assert_eq!(existing[1].label, PeriodLabel::night(Weekday::Mon));
    }
}
