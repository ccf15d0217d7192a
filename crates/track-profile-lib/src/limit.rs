//! Value range limits for the elevation axis

use crate::ProfileError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the axis range comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LimitMode {
    /// Range of the plotted data
    #[default]
    Auto,
    /// Range chosen for this plot
    User,
    /// Range shared by all plots of the application
    Sys,
}

/// Range override for one plot axis
///
/// A plain value: after changing it, hand it to [`crate::ProfileView::set_limits`]
/// to update the view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Limit {
    mode: LimitMode,
    user_min: Option<f64>,
    user_max: Option<f64>,
    sys_min: Option<f64>,
    sys_max: Option<f64>,
}

impl Limit {
    /// Follow the data range
    pub fn auto() -> Self {
        Self::default()
    }

    /// Fixed user range
    pub fn user(min: f64, max: f64) -> Self {
        Self {
            mode: LimitMode::User,
            user_min: Some(min),
            user_max: Some(max),
            ..Self::default()
        }
    }

    /// Attach the application wide range used in [`LimitMode::Sys`]
    pub fn with_system_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.sys_min = min;
        self.sys_max = max;
        self
    }

    #[inline]
    pub fn mode(&self) -> LimitMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LimitMode) {
        self.mode = mode;
    }

    /// Set the lower user bound
    pub fn set_min(&mut self, min: Option<f64>) {
        self.user_min = min;
    }

    /// Set the upper user bound
    pub fn set_max(&mut self, max: Option<f64>) {
        self.user_max = max;
    }

    /// Lower bound overriding the data, `None` to keep the data minimum
    pub fn min(&self) -> Option<f64> {
        match self.mode {
            LimitMode::Auto => None,
            LimitMode::User => self.user_min,
            LimitMode::Sys => self.sys_min,
        }
    }

    /// Upper bound overriding the data, `None` to keep the data maximum
    pub fn max(&self) -> Option<f64> {
        match self.mode {
            LimitMode::Auto => None,
            LimitMode::User => self.user_max,
            LimitMode::Sys => self.sys_max,
        }
    }

    /// Resolve the range to display for data spanning `data_min..=data_max`
    pub fn apply(&self, data_min: f64, data_max: f64) -> (f64, f64) {
        (
            self.min().unwrap_or(data_min),
            self.max().unwrap_or(data_max),
        )
    }
}

impl fmt::Display for LimitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::User => "user",
            Self::Sys => "sys",
        };
        f.write_str(name)
    }
}

impl FromStr for LimitMode {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "user" => Ok(Self::User),
            "sys" | "system" => Ok(Self::Sys),
            _ => Err(ProfileError::UnknownVariant {
                kind: "limit mode",
                value: s.to_string(),
            }),
        }
    }
}
