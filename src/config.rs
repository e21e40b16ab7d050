//! Session configuration: scan parameters and the characteristic the I/O controller talks to.

use crate::api::{DiscoveryRequest, ScanOptions, StartOptions};
use crate::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;
use std::time::Duration;
use uuid::{uuid, Uuid};

/// Service exposing [`DEFAULT_CHARACTERISTIC_UUID`].
pub const DEFAULT_SERVICE_UUID: Uuid = uuid!("4fafc201-1fb5-459e-8fcc-c5c9c331914b");
/// Characteristic read and written by [`crate::central::CharacteristicIo`].
pub const DEFAULT_CHARACTERISTIC_UUID: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26a8");
pub const DEFAULT_SCAN_SECONDS: u32 = 1;

/// When a new scan session discards the results of the previous one.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", rename_all = "snake_case")
)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ClearPolicy {
    /// Clear as soon as the scan is requested. A scan that then fails to start leaves the
    /// registry empty.
    #[default]
    BeforeStart,
    /// Clear only once the radio stack acknowledged the scan, so a failed start keeps the
    /// previous results.
    AfterStart,
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", default)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub duration_secs: u32,
    /// Services to filter discovery and connected peripheral retrieval on. Empty means all.
    pub service_filters: Vec<Uuid>,
    pub allow_duplicates: bool,
    pub options: ScanOptions,
    pub clear_policy: ClearPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            duration_secs: DEFAULT_SCAN_SECONDS,
            service_filters: vec![],
            allow_duplicates: true,
            options: ScanOptions::default(),
            clear_policy: ClearPolicy::default(),
        }
    }
}

impl ScanConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs.into())
    }

    pub(crate) fn discovery_request(&self) -> DiscoveryRequest {
        DiscoveryRequest {
            service_filters: self.service_filters.clone(),
            duration_secs: self.duration_secs,
            allow_duplicates: self.allow_duplicates,
            options: self.options.clone(),
        }
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", default)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralConfig {
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub scan: ScanConfig,
    /// Ask the platform to prompt the user when the radio is off.
    pub show_alert: bool,
}

impl Default for CentralConfig {
    fn default() -> Self {
        CentralConfig {
            service_uuid: DEFAULT_SERVICE_UUID,
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID,
            scan: ScanConfig::default(),
            show_alert: false,
        }
    }
}

impl CentralConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scan.duration_secs == 0 {
            return Err(Error::InvalidConfig(
                "scan duration must be at least one second".to_string(),
            ));
        }
        if self.service_uuid.is_nil() || self.characteristic_uuid.is_nil() {
            return Err(Error::InvalidConfig(
                "service and characteristic UUIDs must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn start_options(&self) -> StartOptions {
        StartOptions {
            show_alert: self.show_alert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scan_everything_briefly() {
        let config = CentralConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan.duration(), Duration::from_secs(1));
        assert!(config.scan.service_filters.is_empty());
        assert!(config.scan.allow_duplicates);
        assert_eq!(config.scan.clear_policy, ClearPolicy::BeforeStart);
        assert!(!config.start_options().show_alert);
    }

    #[test]
    fn discovery_request_mirrors_scan_config() {
        let mut scan = ScanConfig::default();
        scan.duration_secs = 5;
        scan.service_filters = vec![DEFAULT_SERVICE_UUID];
        let request = scan.discovery_request();
        assert_eq!(request.duration_secs, 5);
        assert_eq!(request.service_filters, vec![DEFAULT_SERVICE_UUID]);
        assert!(request.allow_duplicates);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut config = CentralConfig::default();
        config.scan.duration_secs = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn nil_characteristic_is_rejected() {
        let config = CentralConfig {
            characteristic_uuid: Uuid::nil(),
            ..CentralConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_partial_toml() {
        let config: CentralConfig = toml::from_str(
            r#"
            show_alert = true

            [scan]
            duration_secs = 3
            clear_policy = "after_start"
            "#,
        )
        .unwrap();
        assert!(config.show_alert);
        assert_eq!(config.scan.duration_secs, 3);
        assert_eq!(config.scan.clear_policy, ClearPolicy::AfterStart);
        assert!(config.scan.allow_duplicates);
        assert_eq!(config.characteristic_uuid, DEFAULT_CHARACTERISTIC_UUID);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip_keeps_uuids() {
        let config = CentralConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("4fafc201-1fb5-459e-8fcc-c5c9c331914b"));
        let back: CentralConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
