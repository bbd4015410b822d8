//! Spreadsheet writer used by the report assembler.
//!
//! Tables are written plain first; styling, widths and charts are applied
//! afterwards by explicit calls that name the target sheet and carry their own
//! style value, so no formatting state is shared between calls.

use crate::error::Result;
use crate::util::{Metric, NOT_AVAILABLE};
use rust_xlsxwriter::{
    Chart, ChartDataLabel, ChartType, Format, FormatAlign, FormatBorder, Workbook,
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    NotAvailable,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn metric(m: Metric) -> Self {
        match m {
            Some(v) => CellValue::Number(v),
            None => CellValue::NotAvailable,
        }
    }

    /// Length of the value as it reads in plain text, used for column sizing.
    pub fn display_len(&self) -> usize {
        match self {
            CellValue::Text(s) => s.chars().count(),
            CellValue::Number(v) => v.to_string().len(),
            CellValue::NotAvailable => NOT_AVAILABLE.len(),
        }
    }
}

/// A row type that knows its column headers and how to lay itself out as cells.
pub trait TableRow {
    fn headers() -> Vec<&'static str>;
    fn cells(&self) -> Vec<CellValue>;
}

/// Header plus data rows, in the order they are written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn from_rows<T: TableRow>(rows: &[T]) -> Self {
        Table {
            headers: T::headers().into_iter().map(str::to_string).collect(),
            rows: rows.iter().map(|r| r.cells()).collect(),
        }
    }

    pub fn column_count(&self) -> u16 {
        self.headers.len() as u16
    }

    pub fn data_row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Widest rendered value per column, header included.
    pub fn max_display_lengths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(CellValue::display_len)
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn cell(&self, row: u32, col: u16) -> Option<CellValue> {
        if row == 0 {
            return self.headers.get(col as usize).cloned().map(CellValue::Text);
        }
        self.rows
            .get(row as usize - 1)
            .and_then(|r| r.get(col as usize))
            .cloned()
    }
}

/// Inclusive, zero-based rectangle of cells on one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl CellRange {
    pub fn new(first_row: u32, first_col: u16, last_row: u32, last_col: u16) -> Self {
        CellRange {
            first_row,
            first_col,
            last_row,
            last_col,
        }
    }

    pub fn column(col: u16, first_row: u32, last_row: u32) -> Self {
        CellRange::new(first_row, col, last_row, col)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    pub bold: bool,
    pub font_color: Option<u32>,
    pub font_size: Option<f64>,
    pub fill_color: Option<u32>,
    pub align: Option<FormatAlign>,
    pub vertical_center: bool,
    pub wrap_text: bool,
    pub thin_border: bool,
    pub number_format: Option<String>,
}

impl CellStyle {
    fn format(&self) -> Format {
        let mut format = Format::new();
        if self.bold {
            format = format.set_bold();
        }
        if let Some(color) = self.font_color {
            format = format.set_font_color(color);
        }
        if let Some(size) = self.font_size {
            format = format.set_font_size(size);
        }
        if let Some(color) = self.fill_color {
            format = format.set_background_color(color);
        }
        if let Some(align) = self.align {
            format = format.set_align(align);
        }
        if self.vertical_center {
            format = format.set_align(FormatAlign::VerticalCenter);
        }
        if self.wrap_text {
            format = format.set_text_wrap();
        }
        if self.thin_border {
            format = format.set_border(FormatBorder::Thin);
        }
        if let Some(num_format) = &self.number_format {
            format = format.set_num_format(num_format);
        }
        format
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChartSpec {
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    /// Cell holding the series name.
    pub name_cell: (u32, u16),
    pub values: CellRange,
    pub categories: CellRange,
    pub show_values: bool,
    pub show_legend: bool,
    pub anchor: (u32, u16),
    pub style: u8,
    pub width: u32,
    pub height: u32,
}

pub struct TableWriter {
    workbook: Workbook,
    tables: Vec<(String, Table)>,
    charted: Vec<String>,
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableWriter {
    pub fn new() -> Self {
        TableWriter {
            workbook: Workbook::new(),
            tables: Vec::new(),
            charted: Vec::new(),
        }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.tables.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Sheets that received a chart, in insertion order.
    pub fn chart_sheets(&self) -> Vec<&str> {
        self.charted.iter().map(String::as_str).collect()
    }

    /// Append a sheet holding `table`, header in row 0, columns and rows in
    /// the order given.
    pub fn write_sheet(&mut self, name: &str, table: &Table) -> Result<()> {
        let sheet = self.workbook.add_worksheet();
        sheet.set_name(name)?;
        for (col, header) in table.headers.iter().enumerate() {
            sheet.write_string(0, col as u16, header)?;
        }
        for (idx, row) in table.rows.iter().enumerate() {
            let row_num = idx as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    CellValue::Text(s) => sheet.write_string(row_num, col, s)?,
                    CellValue::Number(v) => sheet.write_number(row_num, col, *v)?,
                    CellValue::NotAvailable => sheet.write_string(row_num, col, NOT_AVAILABLE)?,
                };
            }
        }
        self.tables.push((name.to_string(), table.clone()));
        debug!(sheet = name, rows = table.rows.len(), "wrote sheet");
        Ok(())
    }

    /// Re-write every cell of `range` with `style`. Cells outside the table are
    /// left empty but still carry the format.
    pub fn style_range(&mut self, sheet_name: &str, range: CellRange, style: &CellStyle) -> Result<()> {
        let format = style.format();
        let sheet = self.workbook.worksheet_from_name(sheet_name)?;
        let table = self
            .tables
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, t)| t);

        for row in range.first_row..=range.last_row {
            for col in range.first_col..=range.last_col {
                match table.and_then(|t| t.cell(row, col)) {
                    Some(CellValue::Text(s)) => {
                        sheet.write_string_with_format(row, col, s, &format)?;
                    }
                    Some(CellValue::Number(v)) => {
                        sheet.write_number_with_format(row, col, v, &format)?;
                    }
                    Some(CellValue::NotAvailable) => {
                        sheet.write_string_with_format(row, col, NOT_AVAILABLE, &format)?;
                    }
                    None => {
                        sheet.write_blank(row, col, &format)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn set_column_width(&mut self, sheet_name: &str, col: u16, width: f64) -> Result<()> {
        self.workbook
            .worksheet_from_name(sheet_name)?
            .set_column_width(col, width)?;
        Ok(())
    }

    pub fn add_line_chart(&mut self, sheet_name: &str, spec: &LineChartSpec) -> Result<()> {
        let mut chart = Chart::new(ChartType::Line);
        chart.set_style(spec.style);
        chart.set_width(spec.width);
        chart.set_height(spec.height);
        chart.title().set_name(&spec.title);
        chart.x_axis().set_name(&spec.x_axis);
        chart.y_axis().set_name(&spec.y_axis);
        if !spec.show_legend {
            chart.legend().set_hidden();
        }

        let mut label = ChartDataLabel::new();
        label.show_value();
        let series = chart
            .add_series()
            .set_name((sheet_name, spec.name_cell.0, spec.name_cell.1))
            .set_values((
                sheet_name,
                spec.values.first_row,
                spec.values.first_col,
                spec.values.last_row,
                spec.values.last_col,
            ))
            .set_categories((
                sheet_name,
                spec.categories.first_row,
                spec.categories.first_col,
                spec.categories.last_row,
                spec.categories.last_col,
            ));
        if spec.show_values {
            series.set_data_label(&label);
        }

        self.workbook
            .worksheet_from_name(sheet_name)?
            .insert_chart(spec.anchor.0, spec.anchor.1, &chart)?;
        self.charted.push(sheet_name.to_string());
        debug!(sheet = sheet_name, title = %spec.title, "added line chart");
        Ok(())
    }

    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>> {
        Ok(self.workbook.save_to_buffer()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;

    fn sample_table() -> Table {
        Table {
            headers: vec!["Month".to_string(), "Revenue".to_string()],
            rows: vec![
                vec![CellValue::text("2024-01"), CellValue::Number(1234.5)],
                vec![CellValue::text("2024-02"), CellValue::NotAvailable],
            ],
        }
    }

    #[test]
    fn test_max_display_lengths() {
        let table = sample_table();
        // "2024-01" vs "Month"; "1234.5" vs "Revenue"
        assert_eq!(table.max_display_lengths(), vec![7, 7]);
    }

    #[test]
    fn test_cell_lookup_includes_header_row() {
        let table = sample_table();
        assert_eq!(table.cell(0, 1), Some(CellValue::text("Revenue")));
        assert_eq!(table.cell(2, 1), Some(CellValue::NotAvailable));
        assert_eq!(table.cell(3, 0), None);
        assert_eq!(table.cell(1, 5), None);
    }

    #[test]
    fn test_metric_cells() {
        assert_eq!(CellValue::metric(Some(2.0)), CellValue::Number(2.0));
        assert_eq!(CellValue::metric(None), CellValue::NotAvailable);
        assert_eq!(CellValue::NotAvailable.display_len(), 3);
    }

    #[test]
    fn test_writes_styled_sheet_with_chart() {
        let mut writer = TableWriter::new();
        let table = sample_table();
        writer.write_sheet("Sales Trend", &table).unwrap();
        let header = CellStyle {
            bold: true,
            font_color: Some(0xFFFFFF),
            fill_color: Some(0x366092),
            align: Some(FormatAlign::Center),
            thin_border: true,
            ..CellStyle::default()
        };
        writer
            .style_range("Sales Trend", CellRange::new(0, 0, 0, 1), &header)
            .unwrap();
        writer.set_column_width("Sales Trend", 0, 11.0).unwrap();
        let chart = LineChartSpec {
            title: "Monthly Sales Trend".to_string(),
            x_axis: "Month".to_string(),
            y_axis: "Sales".to_string(),
            name_cell: (0, 1),
            values: CellRange::column(1, 1, 2),
            categories: CellRange::column(0, 1, 2),
            show_values: true,
            show_legend: false,
            anchor: (1, 7),
            style: 2,
            width: 1134,
            height: 567,
        };
        writer.add_line_chart("Sales Trend", &chart).unwrap();
        assert_eq!(writer.sheet_names(), vec!["Sales Trend"]);
        assert_eq!(writer.chart_sheets(), vec!["Sales Trend"]);

        let bytes = writer.save_to_buffer().unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_invalid_sheet_name_is_write_error() {
        let mut writer = TableWriter::new();
        let result = writer.write_sheet("bad[name]", &sample_table());
        assert!(matches!(result, Err(AnalyticsError::ReportWrite(_))));
    }

    #[test]
    fn test_styling_unknown_sheet_fails() {
        let mut writer = TableWriter::new();
        let result = writer.set_column_width("Missing", 0, 10.0);
        assert!(matches!(result, Err(AnalyticsError::ReportWrite(_))));
    }
}
