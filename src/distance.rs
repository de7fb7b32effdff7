//! Distance
//!
//! Distances between the mean prediction and the empirical label frequencies of a bin.
use crate::errors::CalibrationError;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type DistanceFn = fn(&[f64], &[f64]) -> f64;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distance {
    /// Half of the L1 distance.
    #[default]
    TotalVariation,
    Cityblock,
    Euclidean,
    SqEuclidean,
}

impl FromStr for Distance {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TotalVariation" => Ok(Distance::TotalVariation),
            "Cityblock" => Ok(Distance::Cityblock),
            "Euclidean" => Ok(Distance::Euclidean),
            "SqEuclidean" => Ok(Distance::SqEuclidean),

            _ => Err(CalibrationError::ParseString(
                s.to_string(),
                "Distance".to_string(),
                items_to_strings(vec!["TotalVariation", "Cityblock", "Euclidean", "SqEuclidean"]),
            )),
        }
    }
}

impl Distance {
    pub fn callable(&self) -> DistanceFn {
        match self {
            Distance::TotalVariation => total_variation,
            Distance::Cityblock => cityblock,
            Distance::Euclidean => euclidean,
            Distance::SqEuclidean => sq_euclidean,
        }
    }

    pub fn evaluate(&self, x: &[f64], y: &[f64]) -> f64 {
        (self.callable())(x, y)
    }
}

pub fn cityblock(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| (a - b).abs()).sum()
}

pub fn total_variation(x: &[f64], y: &[f64]) -> f64 {
    cityblock(x, y) / 2.0
}

pub fn sq_euclidean(x: &[f64], y: &[f64]) -> f64 {
    crate::utils::sq_euclidean(x, y)
}

pub fn euclidean(x: &[f64], y: &[f64]) -> f64 {
    sq_euclidean(x, y).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        let x = [0.2, 0.8];
        let y = [0.5, 0.5];
        assert!((Distance::TotalVariation.evaluate(&x, &y) - 0.3).abs() < 1e-12);
        assert!((Distance::Cityblock.evaluate(&x, &y) - 0.6).abs() < 1e-12);
        assert!((Distance::SqEuclidean.evaluate(&x, &y) - 0.18).abs() < 1e-12);
        assert!((Distance::Euclidean.evaluate(&x, &y) - 0.18f64.sqrt()).abs() < 1e-12);
        assert_eq!(Distance::Euclidean.evaluate(&x, &x), 0.0);
    }

    #[test]
    fn test_parse_distance() {
        assert_eq!(Distance::from_str("Cityblock").unwrap(), Distance::Cityblock);
        assert_eq!(Distance::default(), Distance::TotalVariation);
        assert!(matches!(
            Distance::from_str("Manhattan"),
            Err(CalibrationError::ParseString(..))
        ));
    }
}
