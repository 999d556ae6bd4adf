//! Network configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Holds raw network config parsed from YAML file.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
struct RawNetworkConfig {
    pub link_selection_policy: Option<String>,
    pub grant_surplus_bandwidth: Option<bool>,
    pub time_series_max_age: Option<f64>,
    pub monitoring_interval: Option<f64>,
    pub transmission_timeout: Option<f64>,
    pub seed: Option<u64>,
}

/// Represents network configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Link selection policy used for path construction, e.g. `DestinationHash` or `Random[seed=1]`.
    pub link_selection_policy: String,
    /// Whether dedicated channels get a share of capacity left unrequested on their path.
    pub grant_surplus_bandwidth: bool,
    /// Samples older than this (relative to the newest one) are dropped from monitoring series.
    pub time_series_max_age: f64,
    /// Period in seconds between monitoring ticks.
    pub monitoring_interval: f64,
    /// Transmissions not completed within this time are reported as timed out.
    pub transmission_timeout: Option<f64>,
    /// Seed for randomized policies.
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::from_raw(RawNetworkConfig::default())
    }
}

impl NetworkConfig {
    fn from_raw(raw: RawNetworkConfig) -> Self {
        Self {
            link_selection_policy: raw
                .link_selection_policy
                .unwrap_or_else(|| "DestinationHash".to_string()),
            grant_surplus_bandwidth: raw.grant_surplus_bandwidth.unwrap_or(false),
            time_series_max_age: raw.time_series_max_age.unwrap_or(3600.),
            monitoring_interval: raw.monitoring_interval.unwrap_or(60.),
            transmission_timeout: raw.transmission_timeout,
            seed: raw.seed.unwrap_or(123),
        }
    }

    /// Parses config from YAML string, using default values for absent parameters.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let raw: RawNetworkConfig = serde_yaml::from_str(yaml)?;
        Ok(Self::from_raw(raw))
    }

    /// Creates network config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Self {
        Self::from_yaml(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
        .unwrap_or_else(|_| panic!("Can't parse YAML from file {}", file_name))
    }
}

/// Parses config value string, which consists of two parts - name and options.
/// Example: `Random[seed=5]` parts are name `Random` and options string `seed=5`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.to_string(), Some(r.replace(']', ""))),
        None => (config_str.to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    options_str
        .split(',')
        .filter_map(|option| option.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_for_absent_values() {
        let config = NetworkConfig::from_yaml("grant_surplus_bandwidth: true\nseed: 7\n").unwrap();
        assert!(config.grant_surplus_bandwidth);
        assert_eq!(config.seed, 7);
        assert_eq!(config.link_selection_policy, "DestinationHash");
        assert_eq!(config.time_series_max_age, 3600.);
        assert_eq!(config.transmission_timeout, None);
    }

    #[test]
    fn config_values_with_options() {
        assert_eq!(
            parse_config_value("Random[seed=5]"),
            ("Random".to_string(), Some("seed=5".to_string()))
        );
        assert_eq!(parse_config_value("First"), ("First".to_string(), None));
        let options = parse_options("a=1, b=x,broken");
        assert_eq!(options.get("a").unwrap(), "1");
        assert_eq!(options.get("b").unwrap(), "x");
        assert_eq!(options.len(), 2);
    }
}
