//! Static catalog of Radio Record stations.

use volnabot_common::models::station::Station;

const BUILTIN_STATIONS: &[(&str, &str)] = &[
    ("record", "https://radiorecord.hostingradio.ru/rr_main96.aacp"),
    ("russian_mix", "https://radiorecord.hostingradio.ru/rus64.aacp"),
    ("hits-all-time", "https://radiorecord.hostingradio.ru/alltimers96.aacp"),
    ("russian_hits", "https://radiorecord.hostingradio.ru/russianhits96.aacp"),
    ("colbas_ceh", "https://radiorecord.hostingradio.ru/pump96.aacp"),
    ("festivals", "https://radiorecord.hostingradio.ru/livedjsets96.aacp"),
    ("deep", "https://radiorecord.hostingradio.ru/deep96.aacp"),
    ("chill-out", "https://radiorecord.hostingradio.ru/chil96.aacp"),
    ("shashliki", "https://radiorecord.hostingradio.ru/nashashlyki96.aacp"),
    ("megamix", "https://radiorecord.hostingradio.ru/mix96.aacp"),
    ("pirate_station", "https://radiorecord.hostingradio.ru/ps96.aacp"),
    ("rock", "https://radiorecord.hostingradio.ru/rock96.aacp"),
    ("liquid_funk", "https://radiorecord.hostingradio.ru/liquidfunk96.aacp"),
];

/// Ordered, immutable set of stations. The index into the catalog is the
/// canonical station identifier carried by playback state.
#[derive(Debug)]
pub struct StationCatalog {
    stations: Vec<Station>,
}

impl StationCatalog {
    /// Builds the default Radio Record catalog.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_STATIONS
                .iter()
                .map(|(name, url)| Station {
                    name: (*name).to_string(),
                    url: (*url).to_string(),
                })
                .collect(),
        )
    }

    pub fn new(stations: Vec<Station>) -> Self {
        Self { stations }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Case-insensitive name lookup. Stored case is preserved for display.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.stations
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn at(&self, index: usize) -> Option<&Station> {
        self.stations.get(index)
    }

    /// Next station index, wrapping past the end of the catalog.
    pub fn next(&self, index: usize) -> usize {
        (index + 1) % self.stations.len()
    }

    /// Previous station index, wrapping below zero.
    pub fn previous(&self, index: usize) -> usize {
        (index + self.stations.len() - 1) % self.stations.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stations.iter().map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StationCatalog {
        StationCatalog::new(vec![
            Station {
                name: "record".to_string(),
                url: "http://a".to_string(),
            },
            Station {
                name: "mix".to_string(),
                url: "http://b".to_string(),
            },
            Station {
                name: "deep".to_string(),
                url: "http://c".to_string(),
            },
        ])
    }

    #[test]
    fn next_and_previous_are_inverse_with_wraparound() {
        let catalog = catalog();
        for index in 0..catalog.len() {
            assert_eq!(catalog.next(catalog.previous(index)), index);
            assert_eq!(catalog.previous(catalog.next(index)), index);
        }
        assert_eq!(catalog.next(2), 0);
        assert_eq!(catalog.previous(0), 2);
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let catalog = catalog();
        assert_eq!(catalog.resolve("MIX"), Some(1));
        assert_eq!(catalog.resolve("Record"), Some(0));
        assert_eq!(catalog.resolve("unknown"), None);
    }

    #[test]
    fn builtin_catalog_starts_with_record() {
        let catalog = StationCatalog::builtin();
        assert_eq!(catalog.resolve("record"), Some(0));
        assert!(catalog.len() > 1);
    }
}
