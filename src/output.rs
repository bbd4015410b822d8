use crate::error::Result;
use crate::reports::Analysis;
use crate::types::{EnrichedExportRow, EnrichedRecord};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// One CSV per aggregate view, named after the view.
pub fn export_views(dir: &Path, analysis: &Analysis) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    write_csv(&dir.join("sales_trend.csv"), &analysis.sales_trend)?;
    write_csv(&dir.join("product_performance.csv"), &analysis.products)?;
    write_csv(&dir.join("farm_efficiency.csv"), &analysis.farms)?;
    write_csv(&dir.join("inventory_risk.csv"), &analysis.inventory)?;
    write_csv(&dir.join("customer_value.csv"), &analysis.customers)?;
    info!(dir = %dir.display(), "exported view CSVs");
    Ok(())
}

/// The enriched table, one line per input row with its derived fields.
pub fn export_enriched(path: &Path, data: &[EnrichedRecord]) -> Result<()> {
    let rows: Vec<EnrichedExportRow> = data.iter().map(EnrichedExportRow::from).collect();
    write_csv(path, &rows)?;
    info!(path = %path.display(), rows = rows.len(), "exported enriched rows");
    Ok(())
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}", table_str);
    if rows.len() > max_rows {
        println!("({} more rows in the workbook)", rows.len() - max_rows);
    }
    println!();
}

pub fn preview_analysis(analysis: &Analysis, max_rows: usize) {
    if max_rows == 0 {
        return;
    }
    preview_table("Executive Summary", &analysis.summary.kpis(), max_rows);
    preview_table("Sales Trend", &analysis.sales_trend, max_rows);
    preview_table("Product Performance", &analysis.products, max_rows);
    preview_table("Farm Efficiency", &analysis.farms, max_rows);
    preview_table("Inventory Risk", &analysis.inventory, max_rows);
    preview_table("Customer Value", &analysis.customers, max_rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::enrich;
    use crate::preprocess::tests::record;
    use crate::reports::analyze;

    #[test]
    fn test_export_views_writes_sentinels() {
        let mut r = record("Milk", 10.0, 500.0);
        r.num_cows = 0.0;
        let analysis = analyze(&enrich(vec![r]).unwrap()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        export_views(dir.path(), &analysis).unwrap();

        let farms = std::fs::read_to_string(dir.path().join("farm_efficiency.csv")).unwrap();
        let mut lines = farms.lines();
        assert!(lines.next().unwrap().starts_with("Location,Farm Size,Avg Cows"));
        assert!(lines.next().unwrap().contains("N/A"));
        for name in [
            "sales_trend.csv",
            "product_performance.csv",
            "inventory_risk.csv",
            "customer_value.csv",
        ] {
            assert!(dir.path().join(name).exists(), "{name}");
        }
    }

    #[test]
    fn test_export_enriched_rows() {
        let mut r = record("Milk", 10.0, 500.0);
        r.land_area = 0.0;
        let data = enrich(vec![r]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.csv");
        export_enriched(&path, &data).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Product Name,Location,Farm Size,Customer Location,Profit Margin,Stock Duration,Days to Expiry,Month,Season,Revenue per Cow,Revenue per Acre"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-15,Milk,Delhi,Large,Mumbai,25.0,30,16,1,Spring,50.0,N/A"
        );
    }

    #[test]
    fn test_write_json_summary() {
        let analysis = analyze(&enrich(vec![record("Milk", 10.0, 500.0)]).unwrap()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json(&path, &analysis.summary).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_revenue"], 500.0);
        assert_eq!(value["total_products"], 1);
    }
}
