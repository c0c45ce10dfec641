//! Scalar reducers applied per bucket
//!
//! A closed set of strategies rather than an arbitrary callable, so the
//! numeric contract is explicit and exhaustively testable.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Strategy collapsing a bucket's collected values to one scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    /// Sum of all values; 0 for an empty bucket
    #[default]
    Sum,
    /// Arithmetic mean; 0 for an empty bucket, never a division by zero
    Average,
    /// Number of collected values
    Count,
}

impl Reducer {
    /// Reduce a bucket's values to one scalar
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Reducer::Sum => values.iter().sum(),
            Reducer::Average => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            Reducer::Count => values.len() as f64,
        }
    }
}

impl FromStr for Reducer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Reducer::Sum),
            "average" | "avg" => Ok(Reducer::Average),
            "count" => Ok(Reducer::Count),
            other => Err(format!("Unknown reducer: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum() {
        assert_eq!(Reducer::Sum.apply(&[]), 0.0);
        assert_eq!(Reducer::Sum.apply(&[1.0, 2.0, 3.0]), 6.0);
    }

    #[test]
    fn test_average() {
        // Empty input is 0, never a division by zero
        assert_eq!(Reducer::Average.apply(&[]), 0.0);
        assert_eq!(Reducer::Average.apply(&[2.0, 4.0, 6.0]), 4.0);
        assert_eq!(Reducer::Average.apply(&[5.0]), 5.0);
    }

    #[test]
    fn test_count() {
        assert_eq!(Reducer::Count.apply(&[]), 0.0);
        assert_eq!(Reducer::Count.apply(&[0.0, 0.0, 7.5]), 3.0);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("sum".parse::<Reducer>().unwrap(), Reducer::Sum);
        assert_eq!("average".parse::<Reducer>().unwrap(), Reducer::Average);
        assert_eq!("avg".parse::<Reducer>().unwrap(), Reducer::Average);
        assert_eq!("count".parse::<Reducer>().unwrap(), Reducer::Count);
        assert!("median".parse::<Reducer>().is_err());
    }

    #[test]
    fn test_serde_tags() {
        assert_eq!(serde_json::to_string(&Reducer::Average).unwrap(), "\"average\"");
        let r: Reducer = serde_json::from_str("\"count\"").unwrap();
        assert_eq!(r, Reducer::Count);
    }
}
