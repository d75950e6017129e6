//! Named sensor parameters.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A value that can be requested from the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Parameter {
    /// Temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Battery level in percent.
    Battery,
}

impl Parameter {
    /// All parameters.
    pub const ALL: [Parameter; 3] = [Self::Temperature, Self::Humidity, Self::Battery];

    /// The parameter's name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Battery => "battery",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidParameter {
                name: "parameter".to_string(),
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_names() {
        for parameter in Parameter::ALL {
            assert_eq!(parameter.to_string().parse::<Parameter>().unwrap(), parameter);
        }
        assert_eq!("Humidity".parse::<Parameter>().unwrap(), Parameter::Humidity);
    }

    #[test]
    fn test_unknown_parameter() {
        let err = "pressure".parse::<Parameter>().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { value, .. } if value == "pressure"));
    }
}
