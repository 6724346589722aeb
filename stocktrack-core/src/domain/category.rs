//! Market-cap bands.
//!
//! Each band is closed at its floor and open at the next band's floor:
//! `[2B, 20B)` mid, `[20B, 200B)` large, `[200B, ∞)` mega.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest market cap admitted into a snapshot.
pub const MID_CAP_FLOOR: f64 = 2_000_000_000.0;
pub const LARGE_CAP_FLOOR: f64 = 20_000_000_000.0;
pub const MEGA_CAP_FLOOR: f64 = 200_000_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CapCategory {
    MidCap,
    LargeCap,
    MegaCap,
}

impl CapCategory {
    pub const ALL: [CapCategory; 3] = [Self::MidCap, Self::LargeCap, Self::MegaCap];

    /// Display label, as shown in the dashboard's category badge.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MidCap => "Mid Cap",
            Self::LargeCap => "Large Cap",
            Self::MegaCap => "Mega Cap",
        }
    }

    /// Inclusive lower bound of the band.
    pub fn floor(&self) -> f64 {
        match self {
            Self::MidCap => MID_CAP_FLOOR,
            Self::LargeCap => LARGE_CAP_FLOOR,
            Self::MegaCap => MEGA_CAP_FLOOR,
        }
    }

    /// Exclusive upper bound of the band (`None` for mega caps).
    pub fn ceiling(&self) -> Option<f64> {
        match self {
            Self::MidCap => Some(LARGE_CAP_FLOOR),
            Self::LargeCap => Some(MEGA_CAP_FLOOR),
            Self::MegaCap => None,
        }
    }
}

impl fmt::Display for CapCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CapCategory {
    type Err = String;

    /// Accepts `mid`, `Mid Cap`, `mid_cap`, `MidCap` and the like.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.trim_end_matches("cap") {
            "mid" => Ok(Self::MidCap),
            "large" => Ok(Self::LargeCap),
            "mega" => Ok(Self::MegaCap),
            _ => Err(format!("unknown cap category: {s:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_contiguous() {
        assert_eq!(CapCategory::MidCap.ceiling(), Some(CapCategory::LargeCap.floor()));
        assert_eq!(CapCategory::LargeCap.ceiling(), Some(CapCategory::MegaCap.floor()));
        assert_eq!(CapCategory::MegaCap.ceiling(), None);
    }

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("mid".parse::<CapCategory>().unwrap(), CapCategory::MidCap);
        assert_eq!("Large Cap".parse::<CapCategory>().unwrap(), CapCategory::LargeCap);
        assert_eq!("mega_cap".parse::<CapCategory>().unwrap(), CapCategory::MegaCap);
        assert_eq!("MegaCap".parse::<CapCategory>().unwrap(), CapCategory::MegaCap);
        assert!("small".parse::<CapCategory>().is_err());
    }

    #[test]
    fn labels_match_dashboard_badges() {
        let labels: Vec<&str> = CapCategory::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["Mid Cap", "Large Cap", "Mega Cap"]);
    }
}
