//! Peripheral identity and the records kept for each known peripheral.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;
use uuid::Uuid;

/// Placeholder name for peripherals that report neither a local name nor a device name.
pub const NO_NAME: &str = "NO NAME";

/// Opaque, stable identifier handed out by the radio stack for a peripheral. Depending on the
/// platform this is a MAC address or a platform UUID, so it is kept as a string.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", transparent)
)]
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PeripheralId(String);

impl PeripheralId {
    pub fn new(id: impl Into<String>) -> Self {
        PeripheralId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PeripheralId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<&str> for PeripheralId {
    fn from(id: &str) -> Self {
        PeripheralId::new(id)
    }
}

impl From<String> for PeripheralId {
    fn from(id: String) -> Self {
        PeripheralId(id)
    }
}

/// Data from the last advertisement seen for a peripheral. Only `local_name` is interpreted by
/// this crate; the rest is carried along for consumers.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", default)
)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdvertisingData {
    pub local_name: Option<String>,
    pub tx_power_level: Option<i16>,
    pub is_connectable: Option<bool>,
    /// Advertisement data specific to a manufacturer, keyed by its company ID.
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    /// Advertisement data for services, keyed by service UUID.
    pub service_data: HashMap<Uuid, Vec<u8>>,
    /// Services advertised by the peripheral.
    pub services: Vec<Uuid>,
    #[cfg_attr(feature = "serde", serde(with = "serde_bytes"))]
    pub raw_data: Vec<u8>,
}

/// A peripheral as reported by the radio stack, either from a discovery event or from the list
/// of currently connected peripherals.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralSnapshot {
    pub id: PeripheralId,
    /// Name reported by the device itself, if any.
    pub name: Option<String>,
    pub rssi: i16,
    pub advertising: Option<AdvertisingData>,
}

impl PeripheralSnapshot {
    pub fn new(id: impl Into<PeripheralId>, rssi: i16) -> Self {
        PeripheralSnapshot {
            id: id.into(),
            name: None,
            rssi,
            advertising: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_local_name(mut self, local_name: impl Into<String>) -> Self {
        self.advertising
            .get_or_insert_with(AdvertisingData::default)
            .local_name = Some(local_name.into());
        self
    }
}

/// The registry's view of one peripheral.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralRecord {
    pub id: PeripheralId,
    /// Device reported name, never empty: missing names are stored as [`NO_NAME`].
    pub name: String,
    /// Most recent signal strength sample. May be stale between scans.
    pub rssi: i16,
    pub advertising: Option<AdvertisingData>,
    /// True between a confirmed connect and a confirmed disconnect.
    pub connected: bool,
}

impl PeripheralRecord {
    /// Builds a disconnected record from a snapshot, normalizing a missing name.
    pub fn from_snapshot(snapshot: PeripheralSnapshot) -> Self {
        let name = match snapshot.name {
            Some(name) if !name.is_empty() => name,
            _ => NO_NAME.to_string(),
        };
        PeripheralRecord {
            id: snapshot.id,
            name,
            rssi: snapshot.rssi,
            advertising: snapshot.advertising,
            connected: false,
        }
    }

    /// The name to show for this peripheral: the advertised local name if there is one, otherwise
    /// the device name.
    pub fn display_name(&self) -> &str {
        self.advertising
            .as_ref()
            .and_then(|advertising| advertising.local_name.as_deref())
            .filter(|local_name| !local_name.is_empty())
            .unwrap_or(&self.name)
    }
}

impl Display for PeripheralRecord {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let connected = if self.connected { " connected" } else { "" };
        write!(
            f,
            "{} {} (rssi {}){}",
            self.id,
            self.display_name(),
            self.rssi,
            connected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_local_name() {
        let record = PeripheralRecord::from_snapshot(
            PeripheralSnapshot::new("AA", -40)
                .with_name("Raw")
                .with_local_name("Sensor1"),
        );
        assert_eq!(record.display_name(), "Sensor1");
    }

    #[test]
    fn display_name_falls_back_to_device_name() {
        let record =
            PeripheralRecord::from_snapshot(PeripheralSnapshot::new("AA", -40).with_name("Raw"));
        assert_eq!(record.display_name(), "Raw");
    }

    #[test]
    fn display_name_falls_back_to_placeholder() {
        let record = PeripheralRecord::from_snapshot(PeripheralSnapshot::new("AA", -40));
        assert_eq!(record.name, NO_NAME);
        assert_eq!(record.display_name(), NO_NAME);
    }

    #[test]
    fn empty_names_are_treated_as_missing() {
        let record = PeripheralRecord::from_snapshot(
            PeripheralSnapshot::new("AA", -40)
                .with_name("")
                .with_local_name(""),
        );
        assert_eq!(record.name, NO_NAME);
        assert_eq!(record.display_name(), NO_NAME);
    }

    #[test]
    fn advertising_without_local_name_uses_device_name() {
        let mut snapshot = PeripheralSnapshot::new("AA", -40).with_name("Raw");
        snapshot.advertising = Some(AdvertisingData {
            tx_power_level: Some(4),
            ..AdvertisingData::default()
        });
        let record = PeripheralRecord::from_snapshot(snapshot);
        assert_eq!(record.display_name(), "Raw");
    }

    #[test]
    fn new_records_start_disconnected() {
        let record = PeripheralRecord::from_snapshot(PeripheralSnapshot::new("AA", -71));
        assert!(!record.connected);
        assert_eq!(record.rssi, -71);
        assert_eq!(record.to_string(), "AA NO NAME (rssi -71)");
    }
}
