use crate::error::{AnalyticsError, Result};
use crate::types::{RawRow, TransactionRecord, REQUIRED_COLUMNS};
use crate::util::{parse_date, parse_f64_strict};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub ignored_columns: Vec<String>,
}

pub fn load_records(path: &Path) -> Result<(Vec<TransactionRecord>, LoadReport)> {
    let input_err = |source| AnalyticsError::InputRead {
        path: path.to_path_buf(),
        source,
    };
    let rdr = ReaderBuilder::new().from_path(path).map_err(input_err)?;
    let (records, report) = read_records(rdr).map_err(|e| match e {
        AnalyticsError::Csv(source) => input_err(source),
        other => other,
    })?;
    info!(path = %path.display(), rows = report.total_rows, "loaded transaction records");
    Ok((records, report))
}

/// Reads and types every row. Any unparseable field aborts the load; no row is
/// skipped.
pub fn read_records<R: Read>(mut rdr: csv::Reader<R>) -> Result<(Vec<TransactionRecord>, LoadReport)> {
    let headers = rdr.headers()?.clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(AnalyticsError::MissingColumn(required.to_string()));
        }
    }
    let ignored_columns: Vec<String> = headers
        .iter()
        .filter(|h| !REQUIRED_COLUMNS.contains(h))
        .map(str::to_string)
        .collect();
    if !ignored_columns.is_empty() {
        debug!(columns = ?ignored_columns, "ignoring extra input columns");
    }

    let mut records = Vec::new();
    for (idx, result) in rdr.deserialize::<RawRow>().enumerate() {
        let row = result?;
        // header is line 1
        records.push(type_row(row, idx + 2)?);
    }

    let report = LoadReport {
        total_rows: records.len(),
        ignored_columns,
    };
    Ok((records, report))
}

fn date_field(value: &str, column: &'static str, line: usize) -> Result<NaiveDate> {
    parse_date(value).ok_or_else(|| AnalyticsError::DataFormat {
        line,
        column,
        value: value.to_string(),
    })
}

fn number_field(value: &str, column: &'static str, line: usize) -> Result<f64> {
    parse_f64_strict(value).ok_or_else(|| AnalyticsError::DataFormat {
        line,
        column,
        value: value.to_string(),
    })
}

fn type_row(row: RawRow, line: usize) -> Result<TransactionRecord> {
    Ok(TransactionRecord {
        date: date_field(&row.date, "Date", line)?,
        production_date: date_field(&row.production_date, "Production Date", line)?,
        expiration_date: date_field(&row.expiration_date, "Expiration Date", line)?,
        product_name: row.product_name.trim().to_string(),
        location: row.location.trim().to_string(),
        farm_size: row.farm_size.trim().to_string(),
        customer_location: row.customer_location.trim().to_string(),
        quantity_sold: number_field(&row.quantity_sold, "Quantity Sold (liters/kg)", line)?,
        quantity_in_stock: number_field(
            &row.quantity_in_stock,
            "Quantity in Stock (liters/kg)",
            line,
        )?,
        min_stock_threshold: number_field(
            &row.min_stock_threshold,
            "Minimum Stock Threshold (liters/kg)",
            line,
        )?,
        cost_price: number_field(&row.cost_price, "Price per Unit", line)?,
        sold_price: number_field(&row.sold_price, "Price per Unit (sold)", line)?,
        total_revenue: number_field(&row.total_revenue, "Approx. Total Revenue(INR)", line)?,
        num_cows: number_field(&row.num_cows, "Number of Cows", line)?,
        land_area: number_field(&row.land_area, "Total Land Area (acres)", line)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Location,Total Land Area (acres),Number of Cows,Farm Size,Date,Product Name,Price per Unit,Production Date,Expiration Date,Quantity Sold (liters/kg),Price per Unit (sold),Approx. Total Revenue(INR),Customer Location,Quantity in Stock (liters/kg),Minimum Stock Threshold (liters/kg)";

    fn reader(body: &str) -> csv::Reader<&[u8]> {
        ReaderBuilder::new().from_reader(body.as_bytes())
    }

    #[test]
    fn test_reads_typed_rows() {
        let csv = format!(
            "{HEADER}\nDelhi,100.5,40,Large,2024-01-15,Milk,20,2024-01-01,2024-01-31,\"1,000\",25,25000,Mumbai,500,100\n"
        );
        let (records, report) = read_records(reader(&csv)).unwrap();
        assert_eq!(report.total_rows, 1);
        assert!(report.ignored_columns.is_empty());
        let r = &records[0];
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(r.product_name, "Milk");
        assert_eq!(r.quantity_sold, 1000.0);
        assert_eq!(r.land_area, 100.5);
        assert_eq!(r.customer_location, "Mumbai");
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let csv = format!(
            "{HEADER},Brand\nDelhi,10,4,Small,2024-02-01,Curd,10,2024-01-20,2024-02-20,5,12,60,Pune,8,2,Amul\n"
        );
        let (records, report) = read_records(reader(&csv)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(report.ignored_columns, vec!["Brand".to_string()]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let header = HEADER.replace(",Customer Location", "");
        let csv = format!("{header}\n");
        match read_records(reader(&csv)) {
            Err(AnalyticsError::MissingColumn(c)) => assert_eq!(c, "Customer Location"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_date_names_line_and_column() {
        let csv = format!(
            "{HEADER}\nDelhi,10,4,Small,2024-02-01,Curd,10,2024-01-20,2024-02-20,5,12,60,Pune,8,2\nDelhi,10,4,Small,yesterday,Curd,10,2024-01-20,2024-02-20,5,12,60,Pune,8,2\n"
        );
        match read_records(reader(&csv)) {
            Err(AnalyticsError::DataFormat { line, column, value }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "Date");
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected data format error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_field_fails() {
        let csv = format!(
            "{HEADER}\nDelhi,10,many,Small,2024-02-01,Curd,10,2024-01-20,2024-02-20,5,12,60,Pune,8,2\n"
        );
        match read_records(reader(&csv)) {
            Err(AnalyticsError::DataFormat { column, .. }) => assert_eq!(column, "Number of Cows"),
            other => panic!("expected data format error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_input_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_records(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(AnalyticsError::InputRead { .. })));
    }

    #[test]
    fn test_ragged_row_is_input_read_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "Delhi,10,4").unwrap();
        let result = load_records(file.path());
        assert!(matches!(result, Err(AnalyticsError::InputRead { .. })));
    }
}
