// blecentral Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The `api` module contains the data model shared by the controllers and the traits through
//! which the crate talks to the platform radio stack.

pub mod peripheral;

use async_trait::async_trait;
use bitflags::bitflags;
use futures::stream::Stream;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;
use std::pin::Pin;
use uuid::Uuid;

pub use self::peripheral::{
    AdvertisingData, PeripheralId, PeripheralRecord, PeripheralSnapshot, NO_NAME,
};
use crate::Result;

bitflags! {
    /// A set of properties that indicate what operations are supported by a Characteristic.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct CharPropFlags: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

/// A characteristic exposed by one of a peripheral's services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub service_uuid: Uuid,
    pub uuid: Uuid,
    pub properties: CharPropFlags,
}

/// The GATT layout of a connected peripheral, as reported by the radio stack.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PeripheralServices {
    pub services: Vec<Uuid>,
    pub characteristics: Vec<CharacteristicInfo>,
}

impl PeripheralServices {
    pub fn characteristic(&self, service_uuid: Uuid, uuid: Uuid) -> Option<&CharacteristicInfo> {
        self.characteristics
            .iter()
            .find(|c| c.service_uuid == service_uuid && c.uuid == uuid)
    }
}

/// Power/latency trade-off requested from the radio while scanning. Stacks that have no such
/// knob ignore it.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    LowPower,
    Balanced,
    LowLatency,
}

/// Platform specific scan tuning passed through to the radio stack untouched.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", default)
)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub scan_mode: Option<ScanMode>,
    /// Batch advertisement reports for this many milliseconds. `None` reports immediately.
    pub report_delay_ms: Option<u32>,
}

/// A duration bounded discovery request. The radio stack stops on its own once
/// `duration_secs` have elapsed and reports it with [`RadioEvent::ScanStopped`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    /// Only report peripherals advertising one of these services. Empty means everything.
    pub service_filters: Vec<Uuid>,
    pub duration_secs: u32,
    /// Report every advertisement rather than only the first one per peripheral, so that RSSI
    /// keeps refreshing.
    pub allow_duplicates: bool,
    pub options: ScanOptions,
}

/// Options for bringing up the radio stack.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StartOptions {
    /// Let the platform prompt the user when the radio is switched off.
    pub show_alert: bool,
}

/// Events emitted by the radio stack, independently of any command issued to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// An advertisement was received. Repeats for the same peripheral while duplicates are
    /// allowed.
    Discovered(PeripheralSnapshot),
    /// The duration of the running scan elapsed.
    ScanStopped,
    /// A connection was lost, whether we asked for it or not.
    Disconnected(PeripheralId),
}

/// Notifications about changes of the state this crate maintains. A consumer rebuilds its view
/// (see [`crate::view::project`]) whenever one arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CentralEvent {
    PeripheralUpdated(PeripheralId),
    PeripheralsCleared,
    ScanStarted,
    ScanStopped,
    ConnectedOnlyChanged(bool),
    CharacteristicRead { id: PeripheralId, value: String },
}

/// The platform BLE driver. Every operation is asynchronous; asynchronous notifications are
/// delivered through [`RadioStack::events`].
#[async_trait]
pub trait RadioStack: Send + Sync + 'static {
    /// Initializes the stack. Called once when a session is activated.
    async fn start(&self, options: StartOptions) -> Result<()>;

    /// Retrieve a stream of `RadioEvent`s. Each call returns an independent subscription.
    async fn events(&self) -> Result<Pin<Box<dyn Stream<Item = RadioEvent> + Send>>>;

    /// Starts a duration bounded scan. Resolves once the stack accepted the request, not when the
    /// scan ends.
    async fn start_discovery(&self, request: &DiscoveryRequest) -> Result<()>;

    /// Returns the peripherals the system is currently connected to.
    async fn connected_peripherals(
        &self,
        service_filters: &[Uuid],
    ) -> Result<Vec<PeripheralSnapshot>>;

    async fn connect(&self, id: &PeripheralId) -> Result<()>;

    /// Terminates a connection. Completion is reported through [`RadioEvent::Disconnected`].
    async fn disconnect(&self, id: &PeripheralId) -> Result<()>;

    /// Discovers the services and characteristics of a connected peripheral.
    async fn retrieve_services(&self, id: &PeripheralId) -> Result<PeripheralServices>;

    async fn read(
        &self,
        id: &PeripheralId,
        service_uuid: Uuid,
        characteristic_uuid: Uuid,
    ) -> Result<Vec<u8>>;

    async fn write(
        &self,
        id: &PeripheralId,
        service_uuid: Uuid,
        characteristic_uuid: Uuid,
        data: &[u8],
    ) -> Result<()>;
}
