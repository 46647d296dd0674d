//! Per-state lookup data shared by the adapters.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

#[derive(Debug)]
pub struct StateInfo {
    pub name: &'static str,
    pub code: &'static str,
    pub zillow_region_id: u32,
    pub zillow_region_type: u32,
    pub zillow_search_term: &'static str,
    pub zillow_zoom: u8,
    pub zillow_bounds: MapBounds,
    pub redfin_market: &'static str,
    pub redfin_region_id: u32,
}

const fn bounds(west: f64, east: f64, south: f64, north: f64) -> MapBounds {
    MapBounds {
        west,
        east,
        south,
        north,
    }
}

pub static STATES: &[StateInfo] = &[
    StateInfo {
        name: "Alabama",
        code: "AL",
        zillow_region_id: 4,
        zillow_region_type: 2,
        zillow_search_term: "AL",
        zillow_zoom: 7,
        zillow_bounds: bounds(-90.00410075781248, -83.35737224218748, 28.78443604237234, 36.27742418787124),
        redfin_market: "alabama",
        redfin_region_id: 1,
    },
    StateInfo {
        name: "Georgia",
        code: "GA",
        zillow_region_id: 16,
        zillow_region_type: 2,
        zillow_search_term: "GA",
        zillow_zoom: 7,
        zillow_bounds: bounds(-86.5016612578125, -79.8549327421875, 28.887565985567665, 36.372274060530245),
        redfin_market: "atlanta",
        redfin_region_id: 21,
    },
    StateInfo {
        name: "Indiana",
        code: "IN",
        // Indianapolis metro rather than the whole state.
        zillow_region_id: 32149,
        zillow_region_type: 6,
        zillow_search_term: "Indianapolis, IN",
        zillow_zoom: 7,
        zillow_bounds: bounds(-86.55941203222658, -85.72857096777345, 39.35124490094822, 40.20610320259475),
        redfin_market: "indiana",
        redfin_region_id: 31,
    },
    StateInfo {
        name: "Kansas",
        code: "KS",
        zillow_region_id: 23,
        zillow_region_type: 2,
        zillow_search_term: "KS",
        zillow_zoom: 6,
        zillow_bounds: bounds(-104.96680651562501, -91.67334948437501, 31.223000210969545, 45.13621770837736),
        redfin_market: "kansas",
        redfin_region_id: 35,
    },
    StateInfo {
        name: "Kentucky",
        code: "KY",
        zillow_region_id: 24,
        zillow_region_type: 2,
        zillow_search_term: "KY",
        zillow_zoom: 6,
        zillow_bounds: bounds(-92.414968515625, -79.121511484375, 30.48004378587517, 44.52245955178839),
        redfin_market: "louisville",
        redfin_region_id: 37,
    },
    StateInfo {
        name: "Missouri",
        code: "MO",
        zillow_region_id: 32,
        zillow_region_type: 2,
        zillow_search_term: "MO",
        zillow_zoom: 6,
        zillow_bounds: bounds(-99.08382751562502, -85.79037048437502, 31.03387779085654, 44.980152055449224),
        redfin_market: "stlouis",
        redfin_region_id: 2,
    },
    StateInfo {
        name: "North Carolina",
        code: "NC",
        zillow_region_id: 36,
        zillow_region_type: 2,
        zillow_search_term: "NC",
        zillow_zoom: 6,
        zillow_bounds: bounds(-86.507722515625, -73.214265484375, 27.59603411133886, 42.12275628831205),
        redfin_market: "north-carolina",
        redfin_region_id: 18,
    },
    StateInfo {
        name: "Ohio",
        code: "OH",
        zillow_region_id: 44,
        zillow_region_type: 2,
        zillow_search_term: "OH",
        zillow_zoom: 7,
        zillow_bounds: bounds(-85.9926167578125, -79.3458882421875, 36.92048623298724, 43.696882601690376),
        redfin_market: "ohio",
        redfin_region_id: 22,
    },
    StateInfo {
        name: "South Carolina",
        code: "SC",
        zillow_region_id: 51,
        zillow_region_type: 2,
        zillow_search_term: "SC",
        zillow_zoom: 7,
        zillow_bounds: bounds(-84.24997875781249, -77.60325024218749, 29.856712933122687, 37.262567503914184),
        redfin_market: "south-carolina",
        redfin_region_id: 30,
    },
    StateInfo {
        name: "Tennessee",
        code: "TN",
        zillow_region_id: 53,
        zillow_region_type: 2,
        zillow_search_term: "TN",
        zillow_zoom: 6,
        zillow_bounds: bounds(-92.62532751562499, -79.33187048437499, 28.303750644995308, 42.71420640938294),
        redfin_market: "nashville",
        redfin_region_id: 34,
    },
    StateInfo {
        name: "Arkansas",
        code: "AR",
        zillow_region_id: 6,
        zillow_region_type: 2,
        zillow_search_term: "AR",
        zillow_zoom: 7,
        zillow_bounds: bounds(-95.4547427578125, -88.8080142421875, 31.035923877586246, 38.34331803373095),
        redfin_market: "little-rock",
        redfin_region_id: 7,
    },
    StateInfo {
        name: "Wisconsin",
        code: "WI",
        zillow_region_id: 60,
        zillow_region_type: 2,
        zillow_search_term: "WI",
        zillow_zoom: 7,
        zillow_bounds: bounds(-92.89285475781249, -86.24612624218749, 41.71609372623012, 48.01391413959192),
        redfin_market: "madison",
        redfin_region_id: 48,
    },
    StateInfo {
        name: "Michigan",
        code: "MI",
        zillow_region_id: 30,
        zillow_region_type: 2,
        zillow_search_term: "MI",
        zillow_zoom: 6,
        zillow_bounds: bounds(-92.91728201562502, -79.62382498437502, 38.47061013504879, 51.03433818295162),
        redfin_market: "detroit",
        redfin_region_id: 47,
    },
];

/// Case-insensitive lookup by full state name.
pub fn lookup(name: &str) -> Option<&'static StateInfo> {
    let name = name.trim();
    STATES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

pub fn all_state_names() -> Vec<String> {
    STATES.iter().map(|s| s.name.to_string()).collect()
}
