// blecentral Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! blecentral keeps track of the Bluetooth LE peripherals a central client knows about and
//! drives scanning, connection and characteristic I/O against a platform radio stack.
//!
//! The radio stack itself is not part of this crate. It is reached through the
//! [`api::RadioStack`] trait, and everything it reports asynchronously (discoveries, the end of
//! a scan, lost connections) is folded into a single [`PeripheralRegistry`] by the
//! [`central::EventReconciler`]. User actions go through the scan, connection and
//! characteristic controllers, all bundled by [`central::Central`]. Consumers render
//! [`view::project`] and rebuild it whenever a [`api::CentralEvent`] arrives.
//!
//! ```rust,ignore
//! use blecentral::{central::Central, config::CentralConfig};
//! use futures::StreamExt;
//!
//! let central = Central::new(radio, CentralConfig::default())?;
//! let mut changes = central.events();
//! central.activate().await?;
//! central.start_scan().await?;
//!
//! while changes.next().await.is_some() {
//!     for item in central.peripherals() {
//!         println!("{} {}", item.display_name, item.record.rssi);
//!     }
//! }
//! ```

pub mod api;
pub mod central;
pub mod codec;
mod common;
pub mod config;
pub mod permission;
pub mod view;

#[cfg(test)]
mod fake;

pub use common::registry::PeripheralRegistry;

use std::result;
use std::time::Duration;

/// The main error type returned by most methods in blecentral.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Not connected")]
    NotConnected,

    #[error("Radio stack error: {0}")]
    Radio(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Characteristic I/O failed: {0}")]
    Io(String),

    #[error("Timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience type for a result using the blecentral [`Error`] type.
pub type Result<T> = result::Result<T, Error>;
