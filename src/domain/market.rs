use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closing price for one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
}

/// Chronological daily closes for a single symbol.
///
/// Dates are strictly increasing; weekends and holidays are simply absent,
/// there is no gap filling.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    bars: Vec<DailyBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<DailyBar>) -> Self {
        debug_assert!(
            bars.windows(2).all(|w| w[0].date < w[1].date),
            "price series must be strictly increasing by date"
        );
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Closing prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Last observed close, i.e. the "current" price of the series.
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Dates formatted `%Y-%m-%d` for the chart payload.
    pub fn dates(&self) -> Vec<String> {
        self.bars
            .iter()
            .map(|b| b.date.format("%Y-%m-%d").to_string())
            .collect()
    }
}
