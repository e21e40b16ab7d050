// blecentral Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::{
    api::{PeripheralId, PeripheralRecord, RadioStack},
    common::registry::PeripheralRegistry,
    Result,
};
use log::{debug, info, warn};
use std::sync::Arc;

/// What [`ConnectionController::toggle_connection`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    /// There was no peripheral to act on.
    Ignored,
    /// A disconnect was handed to the radio stack. The registry changes once the stack reports
    /// the disconnection.
    DisconnectRequested,
    /// The connection was established. `applied` is false when the peripheral had left the
    /// registry by the time it completed, in which case nothing was recorded.
    Connected { applied: bool },
}

/// Connects to and disconnects from peripherals on the user's behalf.
///
/// Overlapping toggles for the same peripheral are not serialized: each resolves on its own and
/// whichever continuation runs last determines the recorded state.
pub struct ConnectionController<R: RadioStack> {
    radio: Arc<R>,
    registry: Arc<PeripheralRegistry>,
}

impl<R: RadioStack> ConnectionController<R> {
    pub(crate) fn new(radio: Arc<R>, registry: Arc<PeripheralRegistry>) -> Self {
        ConnectionController { radio, registry }
    }

    /// Disconnects `peripheral` if it is connected, connects to it otherwise.
    ///
    /// A disconnect is fire-and-forget: the record keeps showing the peripheral as connected
    /// until the radio stack's disconnect event arrives. A connect is awaited and recorded only
    /// once it succeeded; a failed connect is returned and leaves the registry untouched.
    pub async fn toggle_connection(
        &self,
        peripheral: Option<&PeripheralRecord>,
    ) -> Result<ConnectionAction> {
        let peripheral = match peripheral {
            Some(peripheral) => peripheral,
            None => return Ok(ConnectionAction::Ignored),
        };

        if peripheral.connected {
            self.request_disconnect(peripheral.id.clone());
            return Ok(ConnectionAction::DisconnectRequested);
        }

        if let Err(e) = self.radio.connect(&peripheral.id).await {
            warn!("Connection error for {}: {}", peripheral.id, e);
            return Err(e);
        }
        info!("Connected to {}", peripheral.id);

        let applied = self
            .registry
            .update(&peripheral.id, |record| record.connected = true);
        if !applied {
            debug!(
                "{} left the registry while connecting, dropping update",
                peripheral.id
            );
        }
        Ok(ConnectionAction::Connected { applied })
    }

    /// [`toggle_connection`](Self::toggle_connection) for the registry's current record of `id`.
    /// Unknown ids are ignored.
    pub async fn toggle(&self, id: &PeripheralId) -> Result<ConnectionAction> {
        let record = self.registry.get(id);
        self.toggle_connection(record.as_ref()).await
    }

    fn request_disconnect(&self, id: PeripheralId) {
        debug!("Requesting disconnect from {}", id);
        let radio = self.radio.clone();
        tokio::spawn(async move {
            if let Err(e) = radio.disconnect(&id).await {
                warn!("Disconnect from {} failed: {}", id, e);
            }
        });
    }
}
