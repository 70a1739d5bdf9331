//! Plain-text rendering for terminal output.

use std::fmt::Write as _;

use postcode_map_history::HistoryEntry;
use postcode_map_pipeline::Submission;
use postcode_map_pipeline::status::StatusError;
use postcode_map_search_models::HealthResponse;
use postcode_map_view::{MapMarker, MapState, TableRow, format_timestamp, format_uptime};

const DATE_FORMAT: &str = "%-d %b %Y, %H:%M:%S";

/// One line for a success, the single-line message for most errors, and an
/// itemized list for contract violations.
pub fn submission(submission: &Submission) -> String {
    match &submission.outcome {
        Ok(result) => format!(
            "Found {} (search {}): {} bus stop(s), {} crime(s)",
            result.postcode(),
            result.search_id(),
            result.bus_stops.len(),
            result.crimes.len(),
        ),
        Err(e) => {
            let mut out = format!("Error: {}", e.user_message());
            for issue in e.issues().unwrap_or_default() {
                let _ = write!(out, "\n  - {issue}");
            }
            out
        }
    }
}

pub fn history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No searches yet.".to_string();
    }

    let mut out = format!("{:<8} {:<10} {:<24} {:<8}\n", "ID", "POSTCODE", "SEARCHED", "STATE");
    out.push_str(&"-".repeat(54));
    for entry in entries {
        let _ = write!(
            out,
            "\n{:<8} {:<10} {:<24} {:<8}",
            entry.search_id(),
            entry.response.postcode(),
            entry.created_at.format(DATE_FORMAT).to_string(),
            if entry.hidden { "hidden" } else { "visible" },
        );
    }
    out
}

pub fn table(rows: &[TableRow]) -> String {
    if rows.is_empty() {
        return "No searches yet.".to_string();
    }

    let mut out = format!(
        "{:<8} {:<10} {:>10} {:>11} {:<17} {:>5} {:>6}\n",
        "ID", "POSTCODE", "LAT", "LONG", "COUNTRY", "STOPS", "CRIMES"
    );
    out.push_str(&"-".repeat(73));
    for row in rows {
        let _ = write!(
            out,
            "\n{:<8} {:<10} {:>10.5} {:>11.5} {:<17} {:>5} {:>6}",
            row.id, row.postcode, row.lat, row.long, row.country, row.bus_stop_count, row.crime_count,
        );
        if row.hidden {
            out.push_str("  (hidden)");
        }
        for stop in row.stops.iter().flatten() {
            let _ = write!(out, "\n    stop:  {}", stop.label());
        }
        for crime in row.crimes.iter().flatten() {
            let _ = write!(
                out,
                "\n    crime: {} ({})",
                crime.crime_category.as_deref().unwrap_or("unknown"),
                crime.crime_date.as_deref().unwrap_or("undated"),
            );
        }
    }
    out
}

pub fn map(state: &MapState, markers: &[MapMarker]) -> String {
    let viewport = state.viewport();
    let mut out = format!(
        "Centre {:.5}, {:.5} at zoom {}{}",
        viewport.center.lat,
        viewport.center.lng,
        viewport.zoom,
        if state.is_manual() { " (moved by hand)" } else { "" },
    );

    if markers.is_empty() {
        out.push_str("\nNo markers.");
    }
    for marker in markers {
        let _ = write!(
            out,
            "\n{:<9} {:>10.5} {:>11.5}  {}",
            marker.kind.as_ref(),
            marker.position.lat,
            marker.position.lng,
            marker.popup.as_deref().unwrap_or_default(),
        );
    }
    out
}

pub fn health(health: &HealthResponse) -> String {
    format!(
        "Backend {} (database {})\nUp {}\nChecked {}",
        health.status,
        health.database.status,
        format_uptime(health.uptime),
        format_timestamp(&health.timestamp),
    )
}

pub fn status_error(e: &StatusError) -> String {
    match e {
        StatusError::Unavailable(_) => "Error: Failed to fetch health".to_string(),
        StatusError::Schema(v) => {
            let mut out = format!("Error: {}", v.message);
            for issue in v.rendered_issues() {
                let _ = write!(out, "\n  - {issue}");
            }
            out
        }
    }
}
