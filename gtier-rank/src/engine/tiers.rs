//! Tier mapping
//!
//! Turns a final order into `rank = position + 1` and a tier label chosen by
//! percentile bands. Pure and deterministic.

use gtier_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One percentile band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    pub label: String,
    /// Share of the list in percent; ignored for the last band
    pub share: f64,
}

/// Ordered list of bands, best tier first
///
/// Every band except the last takes `⌈n·share/100⌉` items (clamped to what is
/// left); the last band takes the remainder. Deserialization applies the same
/// checks as `parse`, so a stored policy always has at least one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTierPolicy")]
pub struct TierPolicy {
    bands: Vec<TierBand>,
}

#[derive(Deserialize)]
struct RawTierPolicy {
    bands: Vec<TierBand>,
}

impl TryFrom<RawTierPolicy> for TierPolicy {
    type Error = Error;

    fn try_from(raw: RawTierPolicy) -> Result<Self> {
        TierPolicy::from_bands(raw.bands)
    }
}

impl Default for TierPolicy {
    /// S 10%, A 20%, B 30%, C 25%, D rest
    fn default() -> Self {
        let band = |label: &str, share: f64| TierBand {
            label: label.to_string(),
            share,
        };
        Self {
            bands: vec![
                band("S", 10.0),
                band("A", 20.0),
                band("B", 30.0),
                band("C", 25.0),
                band("D", 0.0),
            ],
        }
    }
}

impl TierPolicy {
    /// Parse `"S:10,A:20,B:30,C:25,D"`
    ///
    /// The last band may omit its share.
    pub fn parse(raw: &str) -> Result<Self> {
        let entries: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .collect();

        if entries.is_empty() {
            return Err(Error::Config("Tier policy has no bands".to_string()));
        }

        let last = entries.len() - 1;
        let mut bands = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let (label, share) = match entry.split_once(':') {
                Some((label, share)) => (label.trim(), Some(share.trim())),
                None => (entry.trim(), None),
            };

            if label.is_empty() {
                return Err(Error::Config(format!("Tier band '{}' has no label", entry)));
            }

            let share = match share {
                Some(s) => {
                    let value: f64 = s.parse().map_err(|_| {
                        Error::Config(format!("Tier band '{}' has non-numeric share", entry))
                    })?;
                    if !value.is_finite() || value < 0.0 {
                        return Err(Error::Config(format!(
                            "Tier band '{}' has an invalid share",
                            entry
                        )));
                    }
                    value
                }
                None if idx == last => 0.0,
                None => {
                    return Err(Error::Config(format!(
                        "Tier band '{}' needs a share (only the last band may omit it)",
                        entry
                    )))
                }
            };

            bands.push(TierBand {
                label: label.to_string(),
                share,
            });
        }

        Self::from_bands(bands)
    }

    /// Build from explicit bands, rejecting an empty list or a bad band
    pub fn from_bands(bands: Vec<TierBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::Config("Tier policy has no bands".to_string()));
        }
        for band in &bands {
            if band.label.trim().is_empty() {
                return Err(Error::Config("Tier band has no label".to_string()));
            }
            if !band.share.is_finite() || band.share < 0.0 {
                return Err(Error::Config(format!(
                    "Tier band '{}' has an invalid share",
                    band.label
                )));
            }
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[TierBand] {
        &self.bands
    }

    /// Tier label for each position of a list of `n` items
    pub fn assign(&self, n: usize) -> Vec<String> {
        let mut labels = Vec::with_capacity(n);
        let last = self.bands.len().saturating_sub(1);

        for (idx, band) in self.bands.iter().enumerate() {
            let remaining = n - labels.len();
            let take = if idx == last {
                remaining
            } else {
                ((n as f64 * band.share / 100.0).ceil() as usize).min(remaining)
            };
            labels.extend(std::iter::repeat(band.label.clone()).take(take));
        }

        labels
    }
}

impl FromStr for TierPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TierPolicy::parse(s)
    }
}

impl fmt::Display for TierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.bands.len().saturating_sub(1);
        for (idx, band) in self.bands.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            if idx == last {
                write!(f, "{}", band.label)?;
            } else {
                write!(f, "{}:{}", band.label, band.share)?;
            }
        }
        Ok(())
    }
}
