//! Schema descriptions of the backend `/search` and `/health` responses.

use std::sync::LazyLock;

use crate::schema::{Field, Schema};

fn link() -> Schema {
    Schema::object(vec![Field::required("href", Schema::string())])
}

fn postcode() -> Schema {
    Schema::object(vec![
        Field::required("_id", Schema::string()),
        Field::required("postcode", Schema::string()),
        Field::optional("eastings", Schema::number()),
        Field::optional("northings", Schema::number()),
        Field::required("country", Schema::string()),
        Field::required("longitude", Schema::number()),
        Field::required("latitude", Schema::number()),
        Field::optional("region", Schema::string()),
        Field::optional("parliamentary_constituency", Schema::string()),
        Field::optional("admin_district", Schema::string()),
        Field::optional("admin_ward", Schema::string()),
        Field::optional("parish", Schema::string()),
        Field::required("admin_county", Schema::string().nullable()),
        Field::optional("__v", Schema::integer()),
    ])
}

fn bus_stop() -> Schema {
    Schema::object(vec![
        Field::required("_id", Schema::string()),
        Field::required("ATCO_long", Schema::string()),
        Field::optional("ATCO_short", Schema::string()),
        Field::optional("CommonName", Schema::string()),
        Field::optional("Street", Schema::string()),
        Field::optional("Longitude", Schema::string()),
        Field::optional("Latitude", Schema::string()),
        Field::required("Northing", Schema::string()),
        Field::required("Easting", Schema::string()),
        Field::optional("__v", Schema::integer()),
    ])
}

fn crime() -> Schema {
    Schema::object(vec![
        Field::required("_id", Schema::string()),
        Field::optional("crimeID", Schema::integer()),
        Field::required("latitude", Schema::number()),
        Field::required("longitude", Schema::number()),
        Field::optional("crime_category", Schema::string()),
        Field::optional("crime_date", Schema::string()),
        Field::optional("outcome_category", Schema::string()),
        Field::optional("outcome_date", Schema::string()),
        Field::optional("__v", Schema::integer()),
    ])
}

/// Schema of the backend `/search` response.
pub static SEARCH_RESPONSE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object(vec![
        Field::required("_id", Schema::string()),
        Field::required("searchID", Schema::integer()),
        Field::required("latitude", Schema::number()),
        Field::required("longitude", Schema::number()),
        Field::required("Northing", Schema::string()),
        Field::required("Easting", Schema::string()),
        Field::required("reverseLookup", Schema::boolean()),
        Field::required("Postcode", postcode()),
        Field::required("queryBusStops", Schema::array_of(bus_stop())),
        Field::required("queryCrimes", Schema::array_of(crime())),
        Field::optional("linkedATCO", Schema::string()),
        Field::optional("linkedCrimeList", Schema::string()),
        Field::optional(
            "_links",
            Schema::object(vec![
                Field::optional("self", link()),
                Field::optional("postcode", link()),
                Field::optional("alternate", link()),
            ]),
        ),
        Field::optional("__v", Schema::integer()),
    ])
});

/// Schema of the backend `/health` response.
pub static HEALTH_RESPONSE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object(vec![
        Field::required("status", Schema::one_of(&["healthy", "unhealthy"])),
        Field::required("timestamp", Schema::string()),
        Field::required("uptime", Schema::number()),
        Field::required(
            "database",
            Schema::object(vec![
                Field::required("connected", Schema::boolean()),
                Field::required("status", Schema::one_of(&["connected", "disconnected"])),
            ]),
        ),
    ])
});
