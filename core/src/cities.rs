//! Built-in endpoint presets for cities with known Open311 deployments.
//!
//! The table carries whatever each deployment documents publicly; fields a
//! city does not publish stay `None`. Lookups are by the short identifier,
//! case-insensitive.

/// Preset connection details for one city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub endpoint: &'static str,
    pub discovery: Option<&'static str>,
    pub jurisdiction: Option<&'static str>,
    pub vendor: Option<&'static str>,
}

const CITIES: &[CityPreset] = &[
    CityPreset {
        id: "baltimore",
        name: "Baltimore, MD",
        endpoint: "http://311.baltimorecity.gov/open311/v2/",
        discovery: Some("http://311.baltimorecity.gov/open311/discovery.json"),
        jurisdiction: Some("baltimorecity.gov"),
        vendor: None,
    },
    CityPreset {
        id: "bloomington",
        name: "Bloomington, IN",
        endpoint: "https://bloomington.in.gov/crm/open311/v2/",
        discovery: None,
        jurisdiction: Some("bloomington.in.gov"),
        vendor: None,
    },
    CityPreset {
        id: "boston",
        name: "Boston, MA",
        endpoint: "https://mayors24.cityofboston.gov/open311/v2/",
        discovery: None,
        jurisdiction: None,
        vendor: Some("connected_bits"),
    },
    CityPreset {
        id: "brookline",
        name: "Brookline, MA",
        endpoint: "http://spot.brooklinema.gov/open311/v2/",
        discovery: None,
        jurisdiction: None,
        vendor: Some("spot"),
    },
    CityPreset {
        id: "chicago",
        name: "Chicago, IL",
        endpoint: "http://311api.cityofchicago.org/open311/v2/",
        discovery: Some("http://311api.cityofchicago.org/open311/discovery.json"),
        jurisdiction: Some("cityofchicago.org"),
        vendor: None,
    },
    CityPreset {
        id: "dc",
        name: "Washington, DC",
        endpoint: "http://app.311.dc.gov/CWI/Open311/v2/",
        discovery: None,
        jurisdiction: Some("dc.gov"),
        vendor: None,
    },
    CityPreset {
        id: "sf",
        name: "San Francisco, CA",
        endpoint: "https://open311.sfgov.org/v2/",
        discovery: None,
        jurisdiction: Some("sfgov.org"),
        vendor: Some("lagan"),
    },
    CityPreset {
        id: "toronto",
        name: "Toronto, ON",
        endpoint: "https://secure.toronto.ca/webwizard/ws/",
        discovery: None,
        jurisdiction: Some("toronto.ca"),
        vendor: None,
    },
];

/// Look up a city preset by identifier, case-insensitively.
pub fn lookup(city: &str) -> Option<&'static CityPreset> {
    CITIES.iter().find(|preset| preset.id.eq_ignore_ascii_case(city))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("Baltimore").unwrap().id, "baltimore");
        assert_eq!(lookup("DC").unwrap().jurisdiction, Some("dc.gov"));
    }

    #[test]
    fn unknown_city_is_none() {
        assert!(lookup("atlantis").is_none());
    }

    #[test]
    fn every_endpoint_carries_a_trailing_slash() {
        for preset in CITIES {
            assert!(preset.endpoint.ends_with('/'), "{}", preset.id);
        }
    }
}
