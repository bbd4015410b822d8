use crate::error::{AnalyticsError, Result};
use crate::types::{EnrichedRecord, Season, TransactionRecord};
use crate::util::{days_diff, ratio};
use chrono::Datelike;
use tracing::{info, warn};

/// Attach the derived per-row metrics. Row count and order are preserved.
///
/// A zero cost price leaves profit margin undefined for a row that feeds every
/// view, so it fails the run instead of becoming a sentinel.
pub fn enrich(records: Vec<TransactionRecord>) -> Result<Vec<EnrichedRecord>> {
    let mut missing_cows = 0usize;
    let mut missing_acres = 0usize;

    let enriched = records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            let profit_margin = ratio(record.sold_price - record.cost_price, record.cost_price)
                .map(|r| r * 100.0)
                .ok_or_else(|| {
                    AnalyticsError::Computation(format!(
                        "profit margin undefined for record {} ({}): cost price is {}",
                        idx + 1,
                        record.product_name,
                        record.cost_price
                    ))
                })?;
            let month = record.date.month();
            let season = Season::from_month(month).ok_or_else(|| {
                AnalyticsError::Computation(format!("month {month} outside 1..=12"))
            })?;
            let revenue_per_cow = ratio(record.total_revenue, record.num_cows);
            let revenue_per_acre = ratio(record.total_revenue, record.land_area);
            missing_cows += usize::from(revenue_per_cow.is_none());
            missing_acres += usize::from(revenue_per_acre.is_none());

            Ok(EnrichedRecord {
                profit_margin,
                stock_duration_days: days_diff(record.production_date, record.expiration_date),
                days_to_expiry: days_diff(record.date, record.expiration_date),
                month,
                season,
                revenue_per_cow,
                revenue_per_acre,
                record,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if missing_cows > 0 || missing_acres > 0 {
        warn!(
            zero_cows = missing_cows,
            zero_acres = missing_acres,
            "per-cow/per-acre revenue not available for some rows"
        );
    }
    info!(rows = enriched.len(), "enriched records");
    Ok(enriched)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// A plain record; tests override what they care about.
    pub(crate) fn record(product: &str, quantity_sold: f64, revenue: f64) -> TransactionRecord {
        TransactionRecord {
            date: date("2024-01-15"),
            production_date: date("2024-01-01"),
            expiration_date: date("2024-01-31"),
            product_name: product.to_string(),
            location: "Delhi".to_string(),
            farm_size: "Large".to_string(),
            customer_location: "Mumbai".to_string(),
            quantity_sold,
            quantity_in_stock: 100.0,
            min_stock_threshold: 20.0,
            cost_price: 40.0,
            sold_price: 50.0,
            total_revenue: revenue,
            num_cows: 10.0,
            land_area: 20.0,
        }
    }

    #[test]
    fn test_profit_margin_formula() {
        let mut r = record("Milk", 10.0, 500.0);
        r.cost_price = 37.5;
        r.sold_price = 41.25;
        let e = enrich(vec![r]).unwrap();
        assert_eq!(e[0].profit_margin, (41.25 - 37.5) / 37.5 * 100.0);
    }

    #[test]
    fn test_date_differences() {
        let e = enrich(vec![record("Milk", 10.0, 500.0)]).unwrap();
        assert_eq!(e[0].stock_duration_days, 30);
        assert_eq!(e[0].days_to_expiry, 16);
        assert_eq!(e[0].month, 1);
    }

    #[test]
    fn test_season_buckets() {
        use Season::*;
        let expected = [
            Spring, Spring, Spring, Summer, Summer, Summer, Autumn, Autumn, Autumn, Winter,
            Winter, Winter,
        ];
        for (i, season) in expected.iter().enumerate() {
            let month = i as u32 + 1;
            assert_eq!(Season::from_month(month), Some(*season), "month {month}");
        }
        assert_eq!(Season::from_month(0), None);
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn test_season_assigned_from_transaction_month() {
        let mut r = record("Milk", 10.0, 500.0);
        r.date = date("2024-12-31");
        r.expiration_date = date("2025-01-10");
        let e = enrich(vec![r]).unwrap();
        assert_eq!(e[0].season, Season::Winter);
    }

    #[test]
    fn test_revenue_per_cow_and_acre() {
        let e = enrich(vec![record("Milk", 10.0, 500.0)]).unwrap();
        assert_eq!(e[0].revenue_per_cow, Some(50.0));
        assert_eq!(e[0].revenue_per_acre, Some(25.0));
    }

    #[test]
    fn test_zero_cows_yields_sentinel() {
        let mut r = record("Milk", 10.0, 500.0);
        r.num_cows = 0.0;
        r.land_area = 0.0;
        let e = enrich(vec![r]).unwrap();
        assert_eq!(e[0].revenue_per_cow, None);
        assert_eq!(e[0].revenue_per_acre, None);
    }

    #[test]
    fn test_zero_cost_price_fails() {
        let mut r = record("Milk", 10.0, 500.0);
        r.cost_price = 0.0;
        assert!(matches!(enrich(vec![r]), Err(AnalyticsError::Computation(_))));
    }

    #[test]
    fn test_row_order_preserved() {
        let rows = vec![
            record("B", 1.0, 1.0),
            record("A", 2.0, 2.0),
            record("C", 3.0, 3.0),
        ];
        let names: Vec<String> = enrich(rows)
            .unwrap()
            .into_iter()
            .map(|e| e.record.product_name)
            .collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }
}
