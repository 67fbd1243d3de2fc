//! Zone vocabulary: aliases used by the forecast page and the precipitation
//! sub-zone lookup.

/// Names the forecast tables use in place of the canonical zone name
pub const ZONE_ALIASES: &[(&str, &str)] = &[
    ("East Central", "East Slopes Central"),
    ("East North", "East Slopes North"),
    ("East South", "East Slopes South"),
    ("West Central", "West Slopes Central"),
    ("West North", "West Slopes North"),
    ("West South", "West Slopes South"),
    ("Mt. Hood", "Mt Hood"),
];

/// Precipitation stations and the forecast zone each reports for
pub const PRECIPITATION_ZONES: &[(&str, &str)] = &[
    ("Hurricane Ridge", "Olympics"),
    ("Mt Baker Ski Area", "West Slopes North"),
    ("Mt. Loop - Barlow Pass", "West Slopes Central"),
    ("Crystal Mt", "West Slopes South"),
    ("Paradise", "West Slopes South"),
    ("White Pass", "West Slopes South"),
    ("Washington Pass", "East Slopes North"),
    ("Mission Ridge", "East Slopes Central"),
    ("Salmon la Sac - Gallagher Head", "East Slopes Central"),
    ("Tieton River - Darland Mt.", "East Slopes South"),
    ("Timberline", "Mt Hood"),
    ("Mt Hood Meadows", "Mt Hood"),
    ("Snoqualmie Pass", "Snoqualmie Pass"),
    ("Stevens Pass", "Stevens Pass"),
];

/// Canonical zone name for a raw label. Unknown names pass through unchanged.
pub fn canonical_zone_name(raw: &str) -> &str {
    ZONE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == raw)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(raw)
}

/// Forecast zone a precipitation sub-zone reports for, if it is a known station
pub fn forecast_zone_for_precipitation(sub_zone: &str) -> Option<&'static str> {
    PRECIPITATION_ZONES
        .iter()
        .find(|(station, _)| *station == sub_zone)
        .map(|(_, zone)| *zone)
}

/// Every canonical zone name that appears in the lookup tables, sorted
pub fn known_zones() -> Vec<&'static str> {
    let mut zones: Vec<&'static str> = ZONE_ALIASES
        .iter()
        .map(|(_, canonical)| *canonical)
        .chain(PRECIPITATION_ZONES.iter().map(|(_, zone)| *zone))
        .collect();
    zones.sort_unstable();
    zones.dedup();
    zones
}

/// Precipitation sub-zones reporting for a forecast zone
pub fn precipitation_sub_zones(zone: &str) -> Vec<&'static str> {
    let zone = canonical_zone_name(zone);
    PRECIPITATION_ZONES
        .iter()
        .filter(|(_, z)| *z == zone)
        .map(|(station, _)| *station)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_map_to_canonical_names() {
        assert_eq!(canonical_zone_name("East Central"), "East Slopes Central");
        assert_eq!(canonical_zone_name("Mt. Hood"), "Mt Hood");
        assert_eq!(canonical_zone_name("West South"), "West Slopes South");
    }

    #[test]
    fn test_unknown_names_pass_through() {
        assert_eq!(canonical_zone_name("Olympics"), "Olympics");
        assert_eq!(canonical_zone_name("Nowhere"), "Nowhere");
        assert_eq!(canonical_zone_name(""), "");
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        for (alias, _) in ZONE_ALIASES {
            let once = canonical_zone_name(alias);
            assert_eq!(canonical_zone_name(once), once);
        }
        for (station, _) in PRECIPITATION_ZONES {
            let once = canonical_zone_name(station);
            assert_eq!(canonical_zone_name(once), once);
        }
    }

    #[test]
    fn test_alias_table_has_unique_keys() {
        for (i, (alias, _)) in ZONE_ALIASES.iter().enumerate() {
            assert!(ZONE_ALIASES[i + 1..].iter().all(|(other, _)| other != alias));
        }
        for (i, (station, _)) in PRECIPITATION_ZONES.iter().enumerate() {
            assert!(PRECIPITATION_ZONES[i + 1..].iter().all(|(other, _)| other != station));
        }
    }

    #[test]
    fn test_precipitation_lookup() {
        assert_eq!(forecast_zone_for_precipitation("Paradise"), Some("West Slopes South"));
        assert_eq!(forecast_zone_for_precipitation("Timberline"), Some("Mt Hood"));
        assert_eq!(forecast_zone_for_precipitation("Mt Rainier Summit"), None);
    }

    #[test]
    fn test_sub_zones_by_zone() {
        let stations = precipitation_sub_zones("West South");
        assert_eq!(stations, vec!["Crystal Mt", "Paradise", "White Pass"]);
        assert!(precipitation_sub_zones("Nowhere").is_empty());
    }

    #[test]
    fn test_known_zones_are_canonical() {
        let zones = known_zones();
        assert!(zones.contains(&"Olympics"));
        assert!(zones.contains(&"East Slopes Central"));
        assert!(!zones.contains(&"East Central"));
        assert!(zones.iter().all(|z| canonical_zone_name(z) == *z));
    }
}
