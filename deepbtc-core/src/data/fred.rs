//! FRED `series/observations` client. Requires an API key.

use super::http::HttpClient;
use super::provider::DataError;
use crate::domain::time::start_of_day;
use crate::domain::DateRange;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org";

/// Macro column name and FRED series id.
pub const FRED_SERIES: [(&str, &str); 6] = [
    ("fed_funds_rate", "DFF"),
    ("treasury_10y", "DGS10"),
    ("treasury_2y", "DGS2"),
    ("vix_fred", "VIXCLS"),
    ("oil_wti", "DCOILWTICO"),
    ("usd_eur", "DEXUSEU"),
];

#[derive(Debug, Deserialize)]
pub struct ObservationsResponse {
    #[serde(default)]
    observations: Option<Vec<Observation>>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

/// Observations as daily points. FRED marks missing values with `"."`;
/// those become NaN so the join forward-fills over them.
pub fn parse_observations(
    series_id: &str,
    resp: ObservationsResponse,
) -> Result<Vec<(NaiveDateTime, f64)>, DataError> {
    if let Some(msg) = resp.error_message {
        return Err(DataError::ResponseFormatChanged(format!("FRED {series_id}: {msg}")));
    }
    let observations = resp.observations.ok_or_else(|| {
        DataError::ResponseFormatChanged(format!("FRED {series_id}: no observations field"))
    })?;

    observations
        .into_iter()
        .map(|obs| {
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").map_err(|_| {
                DataError::ResponseFormatChanged(format!("FRED {series_id}: bad date {:?}", obs.date))
            })?;
            let value = match obs.value.trim() {
                "." | "" => f64::NAN,
                v => v.parse().map_err(|_| {
                    DataError::ResponseFormatChanged(format!(
                        "FRED {series_id}: non-numeric value {v:?}"
                    ))
                })?,
            };
            Ok((start_of_day(date), value))
        })
        .collect()
}

pub fn fetch_series(
    http: &HttpClient,
    base_url: &str,
    api_key: &str,
    series_id: &str,
    range: &DateRange,
) -> Result<Vec<(NaiveDateTime, f64)>, DataError> {
    let url = format!(
        "{}/fred/series/observations",
        base_url.trim_end_matches('/')
    );
    let query = [
        ("series_id", series_id.to_string()),
        ("api_key", api_key.to_string()),
        ("file_type", "json".to_string()),
        ("observation_start", range.start.date().to_string()),
        ("observation_end", range.end.date().to_string()),
    ];
    let resp: ObservationsResponse = http.get_json(&url, &query)?;
    parse_observations(series_id, resp)
}
