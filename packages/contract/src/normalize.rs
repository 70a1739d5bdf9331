//! Backend record → front-end shape.
//!
//! Pure field moves: storage ids, version counters, reference ids and
//! hypermedia links are dropped; every domain value is carried over as-is.

use postcode_map_search_models::{
    BackendBusStop, BackendCrime, BackendPostcode, BackendSearchResult, BusStop, Crime,
    NormalizedSearchResult, Postcode, SearchMetadata,
};

/// Converts a validated backend search record into the front-end shape.
#[must_use]
pub fn normalize(backend: BackendSearchResult) -> NormalizedSearchResult {
    let BackendSearchResult {
        search_id,
        latitude,
        longitude,
        northing,
        easting,
        reverse_lookup,
        postcode,
        bus_stops,
        crimes,
        ..
    } = backend;

    NormalizedSearchResult {
        metadata: SearchMetadata {
            search_id,
            latitude,
            longitude,
            northing,
            easting,
            reverse_lookup,
            postcode: normalize_postcode(postcode),
        },
        bus_stops: bus_stops.into_iter().map(normalize_bus_stop).collect(),
        crimes: crimes.into_iter().map(normalize_crime).collect(),
    }
}

fn normalize_postcode(p: BackendPostcode) -> Postcode {
    Postcode {
        postcode: p.postcode,
        eastings: p.eastings,
        northings: p.northings,
        country: p.country,
        longitude: p.longitude,
        latitude: p.latitude,
        region: p.region,
        parliamentary_constituency: p.parliamentary_constituency,
        admin_district: p.admin_district,
        admin_ward: p.admin_ward,
        parish: p.parish,
        admin_county: p.admin_county,
    }
}

fn normalize_bus_stop(s: BackendBusStop) -> BusStop {
    BusStop {
        atco_long: s.atco_long,
        atco_short: s.atco_short,
        common_name: s.common_name,
        street: s.street,
        longitude: s.longitude,
        latitude: s.latitude,
        northing: s.northing,
        easting: s.easting,
    }
}

fn normalize_crime(c: BackendCrime) -> Crime {
    Crime {
        crime_id: c.crime_id,
        latitude: c.latitude,
        longitude: c.longitude,
        crime_category: c.crime_category,
        crime_date: c.crime_date,
        outcome_category: c.outcome_category,
        outcome_date: c.outcome_date,
    }
}

