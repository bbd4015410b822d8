use crate::error::{AnalyticsError, Result};
use crate::types::{
    CustomerValueRow, EnrichedRecord, FarmEfficiencyRow, InventoryRiskRow, Kpi,
    ProductPerformanceRow, SalesTrendRow, SummaryStats,
};
use crate::util::{
    average, average_metric, average_rank_desc, format_int, format_number, market_share, max_of,
    min_of, ratio, round2, round_metric, sample_std_dev, Metric,
};
use chrono::Datelike;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Days used to extrapolate a per-transaction mean into a monthly figure.
const MONTH_DAYS: f64 = 30.0;

/// Every table the workbook is built from, computed in one pass over the data.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub summary: SummaryStats,
    pub sales_trend: Vec<SalesTrendRow>,
    pub products: Vec<ProductPerformanceRow>,
    pub farms: Vec<FarmEfficiencyRow>,
    pub inventory: Vec<InventoryRiskRow>,
    pub customers: Vec<CustomerValueRow>,
}

pub fn analyze(data: &[EnrichedRecord]) -> Result<Analysis> {
    let analysis = Analysis {
        summary: generate_summary(data)?,
        sales_trend: sales_trend(data),
        products: product_performance(data),
        farms: farm_efficiency(data),
        inventory: inventory_risk(data),
        customers: customer_value(data),
    };
    debug!(
        months = analysis.sales_trend.len(),
        products = analysis.products.len(),
        farms = analysis.farms.len(),
        customers = analysis.customers.len(),
        "aggregated views"
    );
    Ok(analysis)
}

fn group_by<'a, K, F>(data: &'a [EnrichedRecord], key: F) -> BTreeMap<K, Vec<&'a EnrichedRecord>>
where
    K: Ord,
    F: Fn(&EnrichedRecord) -> K,
{
    let mut map: BTreeMap<K, Vec<&EnrichedRecord>> = BTreeMap::new();
    for r in data {
        map.entry(key(r)).or_default().push(r);
    }
    map
}

fn column<F>(rows: &[&EnrichedRecord], f: F) -> Vec<f64>
where
    F: Fn(&EnrichedRecord) -> f64,
{
    rows.iter().map(|r| f(r)).collect()
}

// Groups are never empty, so the mean always exists.
fn mean(v: &[f64]) -> f64 {
    average(v).unwrap_or(0.0)
}

fn by_revenue_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Monthly totals keyed by `YYYY-MM`, oldest first.
pub fn sales_trend(data: &[EnrichedRecord]) -> Vec<SalesTrendRow> {
    group_by(data, |r| (r.record.date.year(), r.record.date.month()))
        .into_iter()
        .map(|((year, month), rows)| SalesTrendRow {
            period: format!("{:04}-{:02}", year, month),
            quantity_sold: round2(column(&rows, |r| r.record.quantity_sold).iter().sum()),
            revenue: round2(column(&rows, |r| r.record.total_revenue).iter().sum()),
            avg_profit_margin: round2(mean(&column(&rows, |r| r.profit_margin))),
        })
        .collect()
}

/// Per-product sales, price and margin statistics, highest revenue first.
///
/// Rank 1 is the highest total revenue; tied products share the average of
/// the positions they occupy.
pub fn product_performance(data: &[EnrichedRecord]) -> Vec<ProductPerformanceRow> {
    let mut rows: Vec<ProductPerformanceRow> = group_by(data, |r| r.record.product_name.clone())
        .into_iter()
        .map(|(product, rows)| {
            let quantities = column(&rows, |r| r.record.quantity_sold);
            let prices = column(&rows, |r| r.record.sold_price);
            let margins = column(&rows, |r| r.profit_margin);
            ProductPerformanceRow {
                product,
                total_quantity: quantities.iter().sum(),
                mean_quantity: mean(&quantities),
                std_quantity: sample_std_dev(&quantities),
                mean_price: mean(&prices),
                min_price: min_of(&prices),
                max_price: max_of(&prices),
                mean_margin: mean(&margins),
                min_margin: min_of(&margins),
                max_margin: max_of(&margins),
                total_revenue: column(&rows, |r| r.record.total_revenue).iter().sum(),
                rank: 0.0,
                market_share: None,
            }
        })
        .collect();

    let revenues: Vec<f64> = rows.iter().map(|r| r.total_revenue).collect();
    let total: f64 = revenues.iter().sum();
    for (row, rank) in rows.iter_mut().zip(average_rank_desc(&revenues)) {
        row.rank = rank;
        row.market_share = market_share(row.total_revenue, total);
    }
    rows.sort_by(|a, b| by_revenue_desc(a.total_revenue, b.total_revenue));
    rows
}

/// Per (location, farm size) averages and totals, in key order.
pub fn farm_efficiency(data: &[EnrichedRecord]) -> Vec<FarmEfficiencyRow> {
    group_by(data, |r| (r.record.location.clone(), r.record.farm_size.clone()))
        .into_iter()
        .map(|((location, farm_size), rows)| {
            let per_cow: Vec<Metric> = rows.iter().map(|r| r.revenue_per_cow).collect();
            let per_acre: Vec<Metric> = rows.iter().map(|r| r.revenue_per_acre).collect();
            FarmEfficiencyRow {
                location,
                farm_size,
                avg_cows: round2(mean(&column(&rows, |r| r.record.num_cows))),
                avg_land_area: round2(mean(&column(&rows, |r| r.record.land_area))),
                revenue_per_cow: round_metric(average_metric(&per_cow)),
                revenue_per_acre: round_metric(average_metric(&per_acre)),
                total_quantity: round2(column(&rows, |r| r.record.quantity_sold).iter().sum()),
                total_revenue: round2(column(&rows, |r| r.record.total_revenue).iter().sum()),
            }
        })
        .collect()
}

/// Per-product stock exposure against sales pace and remaining shelf life.
///
/// The monthly sales estimate scales the mean units per transaction by 30; it
/// is a rough extrapolation, not a rolling 30-day sum. Stock-to-sales and the
/// risk index are `None` when that estimate or the mean days to expiry is zero.
pub fn inventory_risk(data: &[EnrichedRecord]) -> Vec<InventoryRiskRow> {
    group_by(data, |r| r.record.product_name.clone())
        .into_iter()
        .map(|(product, rows)| {
            let stock = column(&rows, |r| r.record.quantity_in_stock);
            let expiry = column(&rows, |r| r.days_to_expiry as f64);
            let total_stock: f64 = stock.iter().sum();
            let mean_days_to_expiry = mean(&expiry);
            let monthly_sales_estimate = mean(&column(&rows, |r| r.record.quantity_sold)) * MONTH_DAYS;

            let stock_to_sales = round_metric(ratio(total_stock, monthly_sales_estimate));
            let risk_index = round_metric(
                stock_to_sales
                    .zip(ratio(MONTH_DAYS, mean_days_to_expiry))
                    .map(|(s, e)| s * e),
            );
            InventoryRiskRow {
                product,
                total_stock,
                mean_stock: mean(&stock),
                mean_min_threshold: mean(&column(&rows, |r| r.record.min_stock_threshold)),
                mean_days_to_expiry,
                min_days_to_expiry: rows.iter().map(|r| r.days_to_expiry).min().unwrap_or(0),
                monthly_sales_estimate,
                stock_to_sales,
                risk_index,
            }
        })
        .collect()
}

/// Per customer location totals and revenue share, highest revenue first.
pub fn customer_value(data: &[EnrichedRecord]) -> Vec<CustomerValueRow> {
    let mut rows: Vec<CustomerValueRow> =
        group_by(data, |r| r.record.customer_location.clone())
            .into_iter()
            .map(|(customer_location, rows)| {
                let quantities = column(&rows, |r| r.record.quantity_sold);
                let revenues = column(&rows, |r| r.record.total_revenue);
                CustomerValueRow {
                    customer_location,
                    total_quantity: quantities.iter().sum(),
                    mean_quantity: mean(&quantities),
                    total_revenue: revenues.iter().sum(),
                    mean_revenue: mean(&revenues),
                    mean_margin: mean(&column(&rows, |r| r.profit_margin)),
                    market_share: None,
                }
            })
            .collect();

    let total: f64 = rows.iter().map(|r| r.total_revenue).sum();
    for row in &mut rows {
        row.market_share = market_share(row.total_revenue, total);
    }
    rows.sort_by(|a, b| by_revenue_desc(a.total_revenue, b.total_revenue));
    rows
}

pub fn generate_summary(data: &[EnrichedRecord]) -> Result<SummaryStats> {
    let empty = || AnalyticsError::Computation("no records to summarize".to_string());
    let farms: BTreeSet<&str> = data.iter().map(|r| r.record.location.as_str()).collect();
    let products: BTreeSet<&str> = data.iter().map(|r| r.record.product_name.as_str()).collect();
    let margins: Vec<f64> = data.iter().map(|r| r.profit_margin).collect();
    let expiry: Vec<f64> = data.iter().map(|r| r.days_to_expiry as f64).collect();

    Ok(SummaryStats {
        total_revenue: data.iter().map(|r| r.record.total_revenue).sum(),
        total_quantity: data.iter().map(|r| r.record.quantity_sold).sum(),
        avg_profit_margin: average(&margins).ok_or_else(empty)?,
        total_farms: farms.len(),
        total_products: products.len(),
        avg_days_to_expiry: average(&expiry).ok_or_else(empty)?,
    })
}

impl SummaryStats {
    /// Headline figures as label/value pairs, in sheet order.
    pub fn kpis(&self) -> Vec<Kpi> {
        vec![
            Kpi {
                label: "Total Revenue (INR)",
                value: format_number(self.total_revenue, 2),
            },
            Kpi {
                label: "Total Quantity Sold (liters/kg)",
                value: format_number(self.total_quantity, 2),
            },
            Kpi {
                label: "Average Profit Margin (%)",
                value: format!("{:.2}", self.avg_profit_margin),
            },
            Kpi {
                label: "Active Farms",
                value: format_int(self.total_farms),
            },
            Kpi {
                label: "Products",
                value: format_int(self.total_products),
            },
            Kpi {
                label: "Average Days to Expiry",
                value: format!("{:.1}", self.avg_days_to_expiry),
            },
        ]
    }
}
