//! Backend response fixtures shared by tests across the workspace.

use serde_json::{Value, json};

/// A well-formed backend `/search` response for `SW1A 2AA` with the given
/// `searchID`.
#[must_use]
pub fn search_response(search_id: i64) -> Value {
    json!({
        "_id": "6720f1c2a9d3b1e4c8f0a001",
        "searchID": search_id,
        "latitude": 51.50354,
        "longitude": -0.127695,
        "Northing": "179645",
        "Easting": "530047",
        "reverseLookup": false,
        "Postcode": {
            "_id": "6720f1c2a9d3b1e4c8f0a002",
            "postcode": "SW1A 2AA",
            "eastings": 530047.0,
            "northings": 179645.0,
            "country": "England",
            "longitude": -0.127695,
            "latitude": 51.50354,
            "region": "London",
            "parliamentary_constituency": "Cities of London and Westminster",
            "admin_district": "Westminster",
            "admin_ward": "St James's",
            "admin_county": null,
            "__v": 0
        },
        "queryBusStops": [
            {
                "_id": "6720f1c2a9d3b1e4c8f0a003",
                "ATCO_long": "490000173RF",
                "ATCO_short": "73RF",
                "CommonName": "Parliament Square",
                "Street": "Parliament Street",
                "Longitude": "-0.12653",
                "Latitude": "51.50113",
                "Northing": "179380",
                "Easting": "530140",
                "__v": 0
            },
            {
                "_id": "6720f1c2a9d3b1e4c8f0a004",
                "ATCO_long": "490007273S",
                "Northing": "179790",
                "Easting": "530102"
            }
        ],
        "queryCrimes": [
            {
                "_id": "6720f1c2a9d3b1e4c8f0a005",
                "crimeID": 118923456,
                "latitude": 51.502641,
                "longitude": -0.126512,
                "crime_category": "anti-social-behaviour",
                "crime_date": "2025-08",
                "__v": 0
            },
            {
                "_id": "6720f1c2a9d3b1e4c8f0a006",
                "latitude": 51.504012,
                "longitude": -0.128844,
                "crime_category": "theft-from-the-person",
                "crime_date": "2025-08",
                "outcome_category": "Investigation complete; no suspect identified",
                "outcome_date": "2025-09"
            }
        ],
        "linkedATCO": "6720f1c2a9d3b1e4c8f0a010",
        "linkedCrimeList": "6720f1c2a9d3b1e4c8f0a011",
        "_links": {
            "self": { "href": format!("/search/{search_id}") },
            "postcode": { "href": "/postcodes/SW1A%202AA" }
        },
        "__v": 0
    })
}

/// A well-formed backend `/health` response.
#[must_use]
pub fn health_response() -> Value {
    json!({
        "status": "healthy",
        "timestamp": "2025-10-28T19:59:39.034Z",
        "uptime": 431_881.676_165_018,
        "database": { "connected": true, "status": "connected" }
    })
}
