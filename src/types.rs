use crate::util::{display_metric, serialize_metric, Metric};
use crate::xlsx::{CellValue, TableRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Header names every input file must carry, in the order they are reported
/// when missing.
pub const REQUIRED_COLUMNS: [&str; 15] = [
    "Date",
    "Production Date",
    "Expiration Date",
    "Product Name",
    "Location",
    "Farm Size",
    "Customer Location",
    "Quantity Sold (liters/kg)",
    "Quantity in Stock (liters/kg)",
    "Minimum Stock Threshold (liters/kg)",
    "Price per Unit",
    "Price per Unit (sold)",
    "Approx. Total Revenue(INR)",
    "Number of Cows",
    "Total Land Area (acres)",
];

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Production Date")]
    pub production_date: String,
    #[serde(rename = "Expiration Date")]
    pub expiration_date: String,
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Farm Size")]
    pub farm_size: String,
    #[serde(rename = "Customer Location")]
    pub customer_location: String,
    #[serde(rename = "Quantity Sold (liters/kg)")]
    pub quantity_sold: String,
    #[serde(rename = "Quantity in Stock (liters/kg)")]
    pub quantity_in_stock: String,
    #[serde(rename = "Minimum Stock Threshold (liters/kg)")]
    pub min_stock_threshold: String,
    #[serde(rename = "Price per Unit")]
    pub cost_price: String,
    #[serde(rename = "Price per Unit (sold)")]
    pub sold_price: String,
    #[serde(rename = "Approx. Total Revenue(INR)")]
    pub total_revenue: String,
    #[serde(rename = "Number of Cows")]
    pub num_cows: String,
    #[serde(rename = "Total Land Area (acres)")]
    pub land_area: String,
}

/// One sales event, typed at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub production_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub product_name: String,
    pub location: String,
    pub farm_size: String,
    pub customer_location: String,
    pub quantity_sold: f64,
    pub quantity_in_stock: f64,
    pub min_stock_threshold: f64,
    pub cost_price: f64,
    pub sold_price: f64,
    pub total_revenue: f64,
    pub num_cows: f64,
    pub land_area: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Right-closed quarter bins over the month number: (0,3], (3,6], (6,9], (9,12].
    pub fn from_month(month: u32) -> Option<Season> {
        match month {
            1..=3 => Some(Season::Spring),
            4..=6 => Some(Season::Summer),
            7..=9 => Some(Season::Autumn),
            10..=12 => Some(Season::Winter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: TransactionRecord,
    pub profit_margin: f64,
    pub stock_duration_days: i64,
    pub days_to_expiry: i64,
    pub month: u32,
    pub season: Season,
    pub revenue_per_cow: Metric,
    pub revenue_per_acre: Metric,
}

/// Flat view of an enriched row for the optional CSV export.
#[derive(Debug, Serialize)]
pub struct EnrichedExportRow<'a> {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Product Name")]
    pub product_name: &'a str,
    #[serde(rename = "Location")]
    pub location: &'a str,
    #[serde(rename = "Farm Size")]
    pub farm_size: &'a str,
    #[serde(rename = "Customer Location")]
    pub customer_location: &'a str,
    #[serde(rename = "Profit Margin")]
    pub profit_margin: f64,
    #[serde(rename = "Stock Duration")]
    pub stock_duration_days: i64,
    #[serde(rename = "Days to Expiry")]
    pub days_to_expiry: i64,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Season")]
    pub season: Season,
    #[serde(rename = "Revenue per Cow", serialize_with = "serialize_metric")]
    pub revenue_per_cow: Metric,
    #[serde(rename = "Revenue per Acre", serialize_with = "serialize_metric")]
    pub revenue_per_acre: Metric,
}

impl<'a> From<&'a EnrichedRecord> for EnrichedExportRow<'a> {
    fn from(e: &'a EnrichedRecord) -> Self {
        EnrichedExportRow {
            date: e.record.date,
            product_name: &e.record.product_name,
            location: &e.record.location,
            farm_size: &e.record.farm_size,
            customer_location: &e.record.customer_location,
            profit_margin: e.profit_margin,
            stock_duration_days: e.stock_duration_days,
            days_to_expiry: e.days_to_expiry,
            month: e.month,
            season: e.season,
            revenue_per_cow: e.revenue_per_cow,
            revenue_per_acre: e.revenue_per_acre,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct SalesTrendRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub period: String,
    #[serde(rename = "Quantity Sold")]
    #[tabled(rename = "Quantity Sold")]
    pub quantity_sold: f64,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: f64,
    #[serde(rename = "Avg Profit Margin (%)")]
    #[tabled(rename = "Avg Profit Margin (%)")]
    pub avg_profit_margin: f64,
}

impl TableRow for SalesTrendRow {
    fn headers() -> Vec<&'static str> {
        vec!["Month", "Quantity Sold", "Revenue", "Avg Profit Margin (%)"]
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::text(&self.period),
            CellValue::Number(self.quantity_sold),
            CellValue::Number(self.revenue),
            CellValue::Number(self.avg_profit_margin),
        ]
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ProductPerformanceRow {
    #[serde(rename = "Product")]
    #[tabled(rename = "Product")]
    pub product: String,
    #[serde(rename = "Total Sold")]
    #[tabled(rename = "Total Sold")]
    pub total_quantity: f64,
    #[serde(rename = "Mean Sold")]
    #[tabled(rename = "Mean Sold")]
    pub mean_quantity: f64,
    #[serde(rename = "Sold Std Dev", serialize_with = "serialize_metric")]
    #[tabled(rename = "Sold Std Dev", display_with = "display_metric")]
    pub std_quantity: Metric,
    #[serde(rename = "Mean Price")]
    #[tabled(rename = "Mean Price")]
    pub mean_price: f64,
    #[serde(rename = "Min Price")]
    #[tabled(rename = "Min Price")]
    pub min_price: f64,
    #[serde(rename = "Max Price")]
    #[tabled(rename = "Max Price")]
    pub max_price: f64,
    #[serde(rename = "Mean Margin (%)")]
    #[tabled(rename = "Mean Margin (%)")]
    pub mean_margin: f64,
    #[serde(rename = "Min Margin (%)")]
    #[tabled(rename = "Min Margin (%)")]
    pub min_margin: f64,
    #[serde(rename = "Max Margin (%)")]
    #[tabled(rename = "Max Margin (%)")]
    pub max_margin: f64,
    #[serde(rename = "Total Revenue")]
    #[tabled(rename = "Total Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: f64,
    #[serde(rename = "Market Share (%)", serialize_with = "serialize_metric")]
    #[tabled(rename = "Market Share (%)", display_with = "display_metric")]
    pub market_share: Metric,
}

impl TableRow for ProductPerformanceRow {
    fn headers() -> Vec<&'static str> {
        vec![
            "Product",
            "Total Sold",
            "Mean Sold",
            "Sold Std Dev",
            "Mean Price",
            "Min Price",
            "Max Price",
            "Mean Margin (%)",
            "Min Margin (%)",
            "Max Margin (%)",
            "Total Revenue",
            "Rank",
            "Market Share (%)",
        ]
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::text(&self.product),
            CellValue::Number(self.total_quantity),
            CellValue::Number(self.mean_quantity),
            CellValue::metric(self.std_quantity),
            CellValue::Number(self.mean_price),
            CellValue::Number(self.min_price),
            CellValue::Number(self.max_price),
            CellValue::Number(self.mean_margin),
            CellValue::Number(self.min_margin),
            CellValue::Number(self.max_margin),
            CellValue::Number(self.total_revenue),
            CellValue::Number(self.rank),
            CellValue::metric(self.market_share),
        ]
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct FarmEfficiencyRow {
    #[serde(rename = "Location")]
    #[tabled(rename = "Location")]
    pub location: String,
    #[serde(rename = "Farm Size")]
    #[tabled(rename = "Farm Size")]
    pub farm_size: String,
    #[serde(rename = "Avg Cows")]
    #[tabled(rename = "Avg Cows")]
    pub avg_cows: f64,
    #[serde(rename = "Avg Land Area (acres)")]
    #[tabled(rename = "Avg Land Area (acres)")]
    pub avg_land_area: f64,
    #[serde(rename = "Revenue per Cow", serialize_with = "serialize_metric")]
    #[tabled(rename = "Revenue per Cow", display_with = "display_metric")]
    pub revenue_per_cow: Metric,
    #[serde(rename = "Revenue per Acre", serialize_with = "serialize_metric")]
    #[tabled(rename = "Revenue per Acre", display_with = "display_metric")]
    pub revenue_per_acre: Metric,
    #[serde(rename = "Total Sold")]
    #[tabled(rename = "Total Sold")]
    pub total_quantity: f64,
    #[serde(rename = "Total Revenue")]
    #[tabled(rename = "Total Revenue")]
    pub total_revenue: f64,
}

impl TableRow for FarmEfficiencyRow {
    fn headers() -> Vec<&'static str> {
        vec![
            "Location",
            "Farm Size",
            "Avg Cows",
            "Avg Land Area (acres)",
            "Revenue per Cow",
            "Revenue per Acre",
            "Total Sold",
            "Total Revenue",
        ]
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::text(&self.location),
            CellValue::text(&self.farm_size),
            CellValue::Number(self.avg_cows),
            CellValue::Number(self.avg_land_area),
            CellValue::metric(self.revenue_per_cow),
            CellValue::metric(self.revenue_per_acre),
            CellValue::Number(self.total_quantity),
            CellValue::Number(self.total_revenue),
        ]
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct InventoryRiskRow {
    #[serde(rename = "Product")]
    #[tabled(rename = "Product")]
    pub product: String,
    #[serde(rename = "Total Stock")]
    #[tabled(rename = "Total Stock")]
    pub total_stock: f64,
    #[serde(rename = "Mean Stock")]
    #[tabled(rename = "Mean Stock")]
    pub mean_stock: f64,
    #[serde(rename = "Mean Min Threshold")]
    #[tabled(rename = "Mean Min Threshold")]
    pub mean_min_threshold: f64,
    #[serde(rename = "Mean Days to Expiry")]
    #[tabled(rename = "Mean Days to Expiry")]
    pub mean_days_to_expiry: f64,
    #[serde(rename = "Min Days to Expiry")]
    #[tabled(rename = "Min Days to Expiry")]
    pub min_days_to_expiry: i64,
    /// Mean units per transaction times 30; an extrapolation, not a rolling
    /// 30-day sum.
    #[serde(rename = "Est. Monthly Sales")]
    #[tabled(rename = "Est. Monthly Sales")]
    pub monthly_sales_estimate: f64,
    #[serde(rename = "Stock to Sales", serialize_with = "serialize_metric")]
    #[tabled(rename = "Stock to Sales", display_with = "display_metric")]
    pub stock_to_sales: Metric,
    #[serde(rename = "Risk Index", serialize_with = "serialize_metric")]
    #[tabled(rename = "Risk Index", display_with = "display_metric")]
    pub risk_index: Metric,
}

impl TableRow for InventoryRiskRow {
    fn headers() -> Vec<&'static str> {
        vec![
            "Product",
            "Total Stock",
            "Mean Stock",
            "Mean Min Threshold",
            "Mean Days to Expiry",
            "Min Days to Expiry",
            "Est. Monthly Sales",
            "Stock to Sales",
            "Risk Index",
        ]
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::text(&self.product),
            CellValue::Number(self.total_stock),
            CellValue::Number(self.mean_stock),
            CellValue::Number(self.mean_min_threshold),
            CellValue::Number(self.mean_days_to_expiry),
            CellValue::Number(self.min_days_to_expiry as f64),
            CellValue::Number(self.monthly_sales_estimate),
            CellValue::metric(self.stock_to_sales),
            CellValue::metric(self.risk_index),
        ]
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CustomerValueRow {
    #[serde(rename = "Customer Location")]
    #[tabled(rename = "Customer Location")]
    pub customer_location: String,
    #[serde(rename = "Total Sold")]
    #[tabled(rename = "Total Sold")]
    pub total_quantity: f64,
    #[serde(rename = "Mean Sold")]
    #[tabled(rename = "Mean Sold")]
    pub mean_quantity: f64,
    #[serde(rename = "Total Revenue")]
    #[tabled(rename = "Total Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "Mean Revenue")]
    #[tabled(rename = "Mean Revenue")]
    pub mean_revenue: f64,
    #[serde(rename = "Mean Margin (%)")]
    #[tabled(rename = "Mean Margin (%)")]
    pub mean_margin: f64,
    #[serde(rename = "Market Share (%)", serialize_with = "serialize_metric")]
    #[tabled(rename = "Market Share (%)", display_with = "display_metric")]
    pub market_share: Metric,
}

impl TableRow for CustomerValueRow {
    fn headers() -> Vec<&'static str> {
        vec![
            "Customer Location",
            "Total Sold",
            "Mean Sold",
            "Total Revenue",
            "Mean Revenue",
            "Mean Margin (%)",
            "Market Share (%)",
        ]
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::text(&self.customer_location),
            CellValue::Number(self.total_quantity),
            CellValue::Number(self.mean_quantity),
            CellValue::Number(self.total_revenue),
            CellValue::Number(self.mean_revenue),
            CellValue::Number(self.mean_margin),
            CellValue::metric(self.market_share),
        ]
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_revenue: f64,
    pub total_quantity: f64,
    pub avg_profit_margin: f64,
    pub total_farms: usize,
    pub total_products: usize,
    pub avg_days_to_expiry: f64,
}

/// A labelled, pre-formatted headline figure for the summary sheet.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct Kpi {
    #[serde(rename = "Indicator")]
    #[tabled(rename = "Indicator")]
    pub label: &'static str,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

impl TableRow for Kpi {
    fn headers() -> Vec<&'static str> {
        vec!["Indicator", "Value"]
    }

    fn cells(&self) -> Vec<CellValue> {
        vec![CellValue::text(self.label), CellValue::text(&self.value)]
    }
}
