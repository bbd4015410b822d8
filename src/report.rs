use crate::error::{AnalyticsError, Result};
use crate::reports::Analysis;
use crate::xlsx::{CellRange, CellStyle, LineChartSpec, Table, TableWriter};
use rust_xlsxwriter::FormatAlign;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const SUMMARY_SHEET: &str = "Executive Summary";
pub const TREND_SHEET: &str = "Sales Trend";
pub const PRODUCT_SHEET: &str = "Product Performance";
pub const FARM_SHEET: &str = "Farm Efficiency";
pub const INVENTORY_SHEET: &str = "Inventory Risk";
pub const CUSTOMER_SHEET: &str = "Customer Value";

/// Layout constants for the generated workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub output_path: PathBuf,
    /// Added to the longest rendered value of a column to get its width.
    pub width_padding: f64,
    pub header_fill: u32,
    pub number_format: String,
    pub chart_anchor: (u32, u16),
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            output_path: PathBuf::from("dairy_analysis_report.xlsx"),
            width_padding: 4.0,
            header_fill: 0x366092,
            number_format: "#,##0.00".to_string(),
            chart_anchor: (1, 7),
        }
    }
}

impl ReportOptions {
    fn header_style(&self) -> CellStyle {
        CellStyle {
            bold: true,
            font_color: Some(0xFFFFFF),
            font_size: Some(12.0),
            fill_color: Some(self.header_fill),
            align: Some(FormatAlign::Center),
            vertical_center: true,
            wrap_text: true,
            thin_border: true,
            number_format: None,
        }
    }

    fn data_style(&self) -> CellStyle {
        CellStyle {
            font_size: Some(11.0),
            align: Some(FormatAlign::Center),
            number_format: Some(self.number_format.clone()),
            ..CellStyle::default()
        }
    }
}

/// Write and format all six sheets in their fixed order.
pub fn assemble(analysis: &Analysis, options: &ReportOptions) -> Result<TableWriter> {
    let sheets: [(&str, Table); 6] = [
        (SUMMARY_SHEET, Table::from_rows(&analysis.summary.kpis())),
        (TREND_SHEET, Table::from_rows(&analysis.sales_trend)),
        (PRODUCT_SHEET, Table::from_rows(&analysis.products)),
        (FARM_SHEET, Table::from_rows(&analysis.farms)),
        (INVENTORY_SHEET, Table::from_rows(&analysis.inventory)),
        (CUSTOMER_SHEET, Table::from_rows(&analysis.customers)),
    ];

    let mut writer = TableWriter::new();
    for (name, table) in &sheets {
        write_formatted_sheet(&mut writer, name, table, options)?;
        if *name == TREND_SHEET && !table.rows.is_empty() {
            writer.add_line_chart(name, &trend_chart(table, options))?;
        }
    }
    debug!(sheets = ?writer.sheet_names(), "assembled workbook");
    Ok(writer)
}

/// Render the assembled workbook to bytes.
pub fn build_workbook(analysis: &Analysis, options: &ReportOptions) -> Result<Vec<u8>> {
    assemble(analysis, options)?.save_to_buffer()
}

fn write_formatted_sheet(
    writer: &mut TableWriter,
    name: &str,
    table: &Table,
    options: &ReportOptions,
) -> Result<()> {
    writer.write_sheet(name, table)?;
    let last_col = table.column_count().saturating_sub(1);
    writer.style_range(name, CellRange::new(0, 0, 0, last_col), &options.header_style())?;
    if !table.rows.is_empty() {
        let range = CellRange::new(1, 0, table.data_row_count(), last_col);
        writer.style_range(name, range, &options.data_style())?;
    }
    for (col, len) in table.max_display_lengths().into_iter().enumerate() {
        writer.set_column_width(name, col as u16, len as f64 + options.width_padding)?;
    }
    debug!(sheet = name, "formatted sheet");
    Ok(())
}

/// Revenue per month, months along the x-axis, one value label per point.
fn trend_chart(table: &Table, options: &ReportOptions) -> LineChartSpec {
    let last_row = table.data_row_count();
    LineChartSpec {
        title: "Monthly Sales Trend".to_string(),
        x_axis: "Month".to_string(),
        y_axis: "Sales".to_string(),
        name_cell: (0, 2),
        values: CellRange::column(2, 1, last_row),
        categories: CellRange::column(0, 1, last_row),
        show_values: true,
        show_legend: false,
        anchor: options.chart_anchor,
        style: 2,
        width: 1134,
        height: 567,
    }
}

/// Write `bytes` next to `path` and move them into place in one step, so a
/// failed run never leaves a partial file at `path`.
pub fn save_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let save_err = |source| AnalyticsError::ReportSave {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(save_err)?;
    tmp.write_all(bytes).map_err(save_err)?;
    tmp.as_file().sync_all().map_err(save_err)?;
    tmp.persist(path).map_err(|e| save_err(e.error))?;
    Ok(())
}

pub fn generate_report(analysis: &Analysis, options: &ReportOptions) -> Result<PathBuf> {
    let bytes = build_workbook(analysis, options)?;
    save_atomically(&options.output_path, &bytes)?;
    info!(path = %options.output_path.display(), bytes = bytes.len(), "saved report");
    Ok(options.output_path.clone())
}
