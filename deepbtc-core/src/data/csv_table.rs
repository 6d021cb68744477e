//! CSV encoding of a [`TimeSeriesTable`].
//!
//! First column `timestamp` (`%Y-%m-%d %H:%M:%S`, UTC), then one column per
//! series. Values use the shortest representation that parses back to the
//! same `f64`; a missing value is an empty cell.

use super::provider::DataError;
use crate::domain::time::{format_timestamp, parse_timestamp};
use crate::domain::TimeSeriesTable;
use std::io::{Read, Write};

pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Header names accepted for the time column when reading.
const TIMESTAMP_ALIASES: [&str; 3] = ["timestamp", "datetime", "date"];

pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

fn csv_err(e: csv::Error) -> DataError {
    DataError::StoreError(format!("csv: {e}"))
}

pub fn write_csv<W: Write>(table: &TimeSeriesTable, writer: W) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push(TIMESTAMP_COLUMN);
    header.extend(table.column_names());
    wtr.write_record(&header).map_err(csv_err)?;

    let mut record: Vec<String> = Vec::with_capacity(header.len());
    for (row, &ts) in table.timestamps().iter().enumerate() {
        record.clear();
        record.push(format_timestamp(ts));
        record.extend(table.columns().iter().map(|c| format_value(c.values[row])));
        wtr.write_record(&record).map_err(csv_err)?;
    }
    wtr.flush()
        .map_err(|e| DataError::StoreError(format!("csv flush: {e}")))?;
    Ok(())
}

pub fn to_csv_bytes(table: &TimeSeriesTable) -> Result<Vec<u8>, DataError> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

pub fn read_csv<R: Read>(reader: R) -> Result<TimeSeriesTable, DataError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers().map_err(csv_err)?.clone();

    let first = headers.get(0).unwrap_or_default();
    if !TIMESTAMP_ALIASES
        .iter()
        .any(|alias| first.eq_ignore_ascii_case(alias))
    {
        return Err(DataError::ValidationError(format!(
            "first column must be '{TIMESTAMP_COLUMN}', found '{first}'"
        )));
    }
    let names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut timestamps = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let cell = record.get(0).unwrap_or_default();
        let ts = parse_timestamp(cell).ok_or_else(|| {
            DataError::ValidationError(format!("row {}: invalid timestamp '{cell}'", row + 1))
        })?;
        timestamps.push(ts);

        for (j, values) in columns.iter_mut().enumerate() {
            let cell = record.get(j + 1).unwrap_or_default().trim();
            let value = if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                f64::NAN
            } else {
                cell.parse::<f64>().map_err(|_| {
                    DataError::ValidationError(format!(
                        "row {}, column '{}': invalid number '{cell}'",
                        row + 1,
                        names[j]
                    ))
                })?
            };
            values.push(value);
        }
    }

    Ok(TimeSeriesTable::from_columns(
        timestamps,
        names.into_iter().zip(columns).collect(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hour(h: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn writes_expected_layout() {
        let table = TimeSeriesTable::from_columns(
            vec![hour(0), hour(1)],
            vec![("close", vec![7195.24, f64::NAN]), ("volume", vec![0.1, 2.0])],
        )
        .unwrap();
        let text = String::from_utf8(to_csv_bytes(&table).unwrap()).unwrap();
        assert_eq!(
            text,
            "timestamp,close,volume\n\
             2020-01-01 00:00:00,7195.24,0.1\n\
             2020-01-01 01:00:00,,2\n"
        );
    }

    #[test]
    fn reads_back_exact_values() {
        let values = vec![0.1 + 0.2, 1e-300, -123456.789012345, f64::NAN];
        let table = TimeSeriesTable::from_columns(
            (0..4).map(hour).collect(),
            vec![("x", values)],
        )
        .unwrap();
        let back = read_csv(to_csv_bytes(&table).unwrap().as_slice()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn accepts_legacy_datetime_header() {
        let text = "Datetime,Open\n2020-01-01 00:00:00+00:00,7195.24\n";
        let table = read_csv(text.as_bytes()).unwrap();
        assert_eq!(table.timestamps(), &[hour(0)]);
        assert_eq!(table.column("Open").unwrap(), &[7195.24]);
    }

    #[test]
    fn rejects_bad_cells() {
        assert!(read_csv("when,x\n2020-01-01,1\n".as_bytes()).is_err());
        assert!(read_csv("timestamp,x\nnot-a-date,1\n".as_bytes()).is_err());
        let err = read_csv("timestamp,x\n2020-01-01,abc\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("'x'"));
    }
}
