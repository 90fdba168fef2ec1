//! VX futures quote rows and the stride-9 table normalizer.
//!
//! The futures page lists every contract as nine consecutive `<td>` cells.
//! [`normalize`] turns that flat list back into typed rows, dropping weekly
//! contracts and, optionally, a trailing front month that has not traded yet.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Cells per contract on the quote page.
pub const STRIDE: usize = 9;

/// Monthly VX symbols are exactly this long; anything else is a weekly.
pub const MONTHLY_SYMBOL_LEN: usize = 5;

pub const COLUMNS: [&str; STRIDE] = [
    "Symbol",
    "Expiration",
    "Last",
    "Change",
    "High",
    "Low",
    "Settlement",
    "Volume",
    "Open Int",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub last: f64,
    pub change: f64,
    pub high: f64,
    pub low: f64,
    pub settlement: f64,
    pub volume: u64,
    pub open_interest: u64,
}

/// Contracts in page order, which is expiration order on the source page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteTable {
    pub rows: Vec<QuoteRow>,
}

impl QuoteTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_prices(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.last).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Drop the final row when its last price is exactly zero.
    pub drop_untraded_front: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            drop_untraded_front: true,
        }
    }
}

/// Split a flat cell list into `STRIDE` columns: column `k` holds every
/// `STRIDE`-th cell starting at offset `k`.
pub fn deinterleave<T: Clone>(cells: &[T]) -> Result<Vec<Vec<T>>, ParseError> {
    if cells.len() % STRIDE != 0 {
        return Err(ParseError::RaggedCells {
            len: cells.len(),
            stride: STRIDE,
        });
    }
    Ok((0..STRIDE)
        .map(|k| cells.iter().skip(k).step_by(STRIDE).cloned().collect())
        .collect())
}

/// Inverse of [`deinterleave`]. Every column must hold the same number of rows.
pub fn interleave<T: Clone>(columns: &[Vec<T>]) -> Result<Vec<T>, ParseError> {
    let rows = columns.first().map(Vec::len).unwrap_or(0);
    if let Some(col) = columns.iter().find(|c| c.len() != rows) {
        return Err(ParseError::UnevenColumns {
            expected: rows,
            found: col.len(),
        });
    }
    let mut out = Vec::with_capacity(rows * columns.len());
    for r in 0..rows {
        for col in columns {
            out.push(col[r].clone());
        }
    }
    Ok(out)
}

pub fn normalize(cells: &[String], opts: NormalizeOptions) -> Result<QuoteTable, ParseError> {
    let cols = deinterleave(cells)?;
    let n = cols[0].len();

    let mut rows = Vec::with_capacity(n);
    let mut weeklies = 0usize;
    for r in 0..n {
        let symbol = cols[0][r].trim();
        if symbol.chars().count() != MONTHLY_SYMBOL_LEN {
            weeklies += 1;
            continue;
        }
        rows.push(QuoteRow {
            symbol: symbol.to_string(),
            expiration: parse_date(&cols[1][r]).ok_or_else(|| coerce_err(r, 1, &cols[1][r]))?,
            last: parse_price(&cols[2][r]).ok_or_else(|| coerce_err(r, 2, &cols[2][r]))?,
            change: parse_price(&cols[3][r]).ok_or_else(|| coerce_err(r, 3, &cols[3][r]))?,
            high: parse_price(&cols[4][r]).ok_or_else(|| coerce_err(r, 4, &cols[4][r]))?,
            low: parse_price(&cols[5][r]).ok_or_else(|| coerce_err(r, 5, &cols[5][r]))?,
            settlement: parse_price(&cols[6][r]).ok_or_else(|| coerce_err(r, 6, &cols[6][r]))?,
            volume: parse_count(&cols[7][r]).ok_or_else(|| coerce_err(r, 7, &cols[7][r]))?,
            open_interest: parse_count(&cols[8][r]).ok_or_else(|| coerce_err(r, 8, &cols[8][r]))?,
        });
    }

    let mut dropped_front = false;
    if opts.drop_untraded_front && rows.last().is_some_and(|r| r.last == 0.0) {
        rows.pop();
        dropped_front = true;
    }

    log::info!(
        "normalize.done rows={} dropped_weeklies={} dropped_front={}",
        rows.len(),
        weeklies,
        dropped_front
    );
    Ok(QuoteTable { rows })
}

fn coerce_err(row: usize, col: usize, value: &str) -> ParseError {
    ParseError::Coerce {
        row,
        field: COLUMNS[col],
        value: value.to_string(),
    }
}

pub fn parse_price(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Counts use `,` as a thousands separator on the page.
pub fn parse_count(s: &str) -> Option<u64> {
    let digits: String = s.trim().chars().filter(|c| *c != ',').collect();
    digits.parse::<u64>().ok()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let fmt = if s.contains('-') {
        "%Y-%m-%d"
    } else if s.rsplit('/').next().is_some_and(|y| y.len() == 2) {
        "%m/%d/%y"
    } else {
        "%m/%d/%Y"
    };
    NaiveDate::parse_from_str(s, fmt).ok()
}
