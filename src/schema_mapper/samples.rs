//! Range/shape heuristics run on sample rows.
//!
//! Only numeric columns give evidence. A column is numeric when every non-missing sample
//! parses as a finite number and there is at least one of them.
use crate::conversion::is_missing_marker;
use crate::records::RawRecord;

use super::StandardField;

/// Summary statistics of the numeric samples of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnShape {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ColumnShape {
    /// Collect the shape of `column` over `rows`, or `None` if the column is not numeric.
    pub fn from_samples(column: &str, rows: &[RawRecord]) -> Option<ColumnShape> {
        let mut count = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for row in rows {
            let Some(value) = row.get(column) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let text_missing = value
                .as_text()
                .is_some_and(|t| is_missing_marker(&t));
            if text_missing {
                continue;
            }
            let v = value.as_f64().filter(|v| v.is_finite())?;
            count += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }

        (count > 0).then(|| ColumnShape {
            count,
            min,
            max,
            mean: sum / count as f64,
        })
    }

    /// Values span [0, 360) with a mean above 90°.
    pub fn looks_like_ra(&self) -> bool {
        self.min >= 0.0 && self.max < 360.0 && self.mean > 90.0
    }

    pub fn looks_like_dec(&self) -> bool {
        self.min >= -90.0 && self.max <= 90.0
    }

    /// Small positive values, read as milliarcseconds.
    pub fn looks_like_parallax(&self) -> bool {
        self.min > 0.0 && self.max <= 100.0
    }

    /// Typical apparent magnitudes, from the brightest stars to deep surveys.
    pub fn looks_like_magnitude(&self) -> bool {
        self.min >= -2.0 && self.max <= 30.0
    }

    /// Standard fields this shape is compatible with, in [`StandardField::ALL`] order.
    pub fn compatible_fields(&self) -> Vec<StandardField> {
        StandardField::ALL
            .iter()
            .copied()
            .filter(|field| match field {
                StandardField::Ra => self.looks_like_ra(),
                StandardField::Dec => self.looks_like_dec(),
                StandardField::Parallax => self.looks_like_parallax(),
                StandardField::Magnitude => self.looks_like_magnitude(),
                _ => false,
            })
            .collect()
    }

    pub fn describe(&self) -> String {
        format!(
            "{} numeric samples in [{:.3}, {:.3}], mean {:.3}",
            self.count, self.min, self.max, self.mean
        )
    }
}
