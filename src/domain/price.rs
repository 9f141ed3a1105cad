//! Daily close price series and the trading calendar derived from it.

use crate::domain::error::DcasimError;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Date-ordered close prices with O(1) lookup by date.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    /// Sorts the points by date. Fails on an empty input, a repeated date, or
    /// a close that is not a finite positive number.
    pub fn new(mut points: Vec<PricePoint>) -> Result<Self, DcasimError> {
        if points.is_empty() {
            return Err(DcasimError::NoPriceData);
        }
        if let Some(bad) = points
            .iter()
            .find(|p| !p.close.is_finite() || p.close <= 0.0)
        {
            return Err(DcasimError::Data {
                reason: format!("invalid close {} on {}", bad.close, bad.date),
            });
        }
        points.sort_by_key(|p| p.date);

        let mut date_index = HashMap::with_capacity(points.len());
        for (i, point) in points.iter().enumerate() {
            if date_index.insert(point.date, i).is_some() {
                return Err(DcasimError::Data {
                    reason: format!("duplicate price date {}", point.date),
                });
            }
        }

        Ok(Self { points, date_index })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.date_index.get(&date).map(|&i| self.points[i].close)
    }

    /// Every priced date, ascending.
    pub fn trading_calendar(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}
