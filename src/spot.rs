use std::io::BufRead;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::ParseError,
    quotes::{parse_date, parse_price},
};

/// A named index level shown as a card, e.g. `VIX` or `VIX9D`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotMetric {
    pub name: String,
    pub value: f64,
}

impl SpotMetric {
    /// Most recent close of `history`, if it has any points.
    pub fn latest(name: &str, history: &SpotHistory) -> Option<Self> {
        history.last().map(|p| Self {
            name: name.to_string(),
            value: p.close,
        })
    }
}

/// Pull each named index out of a flattened label/value quote table.
///
/// The value is the cell right after the first cell whose text equals the
/// name, ignoring ASCII case. Results keep the order of `names`.
pub fn spot_metrics(cells: &[String], names: &[String]) -> Result<Vec<SpotMetric>, ParseError> {
    names
        .iter()
        .map(|name| -> Result<SpotMetric, ParseError> {
            let at = cells
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| ParseError::MissingMetric(name.clone()))?;
            let raw = cells
                .get(at + 1)
                .ok_or_else(|| ParseError::MissingMetric(name.clone()))?;
            let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
            let value = parse_price(&cleaned).ok_or_else(|| ParseError::BadMetric {
                name: name.clone(),
                value: raw.clone(),
            })?;
            Ok(SpotMetric {
                name: name.clone(),
                value,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily spot-VIX closes in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotHistory {
    pub points: Vec<HistoryPoint>,
}

impl SpotHistory {
    /// Parse `date,close` records.
    ///
    /// Blank lines are skipped, as is a first record whose close is not a
    /// number (a header). Extra columns after the close are ignored.
    pub fn parse_from_reader<R: BufRead>(reader: R) -> Result<Self, ParseError> {
        let mut points = Vec::new();

        for (idx, line_result) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line_result.map_err(|e| ParseError::History {
                line: line_no,
                reason: e.to_string(),
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut fields = trimmed.split(',').map(str::trim);
            let (Some(date_raw), Some(close_raw)) = (fields.next(), fields.next()) else {
                return Err(ParseError::History {
                    line: line_no,
                    reason: format!("expected date,close but got {trimmed:?}"),
                });
            };

            let Some(close) = parse_price(close_raw) else {
                if points.is_empty() && parse_date(date_raw).is_none() {
                    continue;
                }
                return Err(ParseError::History {
                    line: line_no,
                    reason: format!("bad close {close_raw:?}"),
                });
            };
            let date = parse_date(date_raw).ok_or_else(|| ParseError::History {
                line: line_no,
                reason: format!("bad date {date_raw:?}"),
            })?;
            points.push(HistoryPoint { date, close });
        }
        Ok(Self { points })
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&HistoryPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&HistoryPoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}
