// blecentral Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::{
    api::{CentralEvent, PeripheralRecord, RadioStack},
    common::registry::PeripheralRegistry,
    config::{ClearPolicy, ScanConfig},
    Result,
};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    #[default]
    Idle,
    /// A discovery request was issued and the radio stack has not acknowledged it yet.
    Starting,
    Scanning,
}

/// Scan state and the connected-only view flag, shared between the scan controller and the
/// event reconciler.
#[derive(Debug, Default)]
pub(crate) struct ScanStatus {
    state: Mutex<ScanState>,
    connected_only: AtomicBool,
}

impl ScanStatus {
    pub(crate) fn state(&self) -> ScanState {
        *self.state.lock().unwrap()
    }

    /// Idle -> Starting. False if a scan is already starting or running.
    fn try_begin(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state != ScanState::Idle {
            return false;
        }
        *state = ScanState::Starting;
        true
    }

    /// Starting -> Scanning. False if the scan already stopped in the meantime.
    fn acknowledge(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state != ScanState::Starting {
            return false;
        }
        *state = ScanState::Scanning;
        true
    }

    fn fail(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == ScanState::Starting {
            *state = ScanState::Idle;
        }
    }

    /// Any -> Idle, returning the state we left.
    pub(crate) fn stop(&self) -> ScanState {
        std::mem::take(&mut *self.state.lock().unwrap())
    }

    pub(crate) fn connected_only(&self) -> bool {
        self.connected_only.load(Ordering::SeqCst)
    }

    /// Returns true if the flag changed.
    fn set_connected_only(&self, connected_only: bool) -> bool {
        self.connected_only.swap(connected_only, Ordering::SeqCst) != connected_only
    }
}

/// Starts duration bounded scans and refreshes the registry from the peripherals the system is
/// already connected to.
pub struct ScanController<R: RadioStack> {
    radio: Arc<R>,
    registry: Arc<PeripheralRegistry>,
    status: Arc<ScanStatus>,
    config: ScanConfig,
}

impl<R: RadioStack> ScanController<R> {
    pub(crate) fn new(
        radio: Arc<R>,
        registry: Arc<PeripheralRegistry>,
        status: Arc<ScanStatus>,
        config: ScanConfig,
    ) -> Self {
        ScanController {
            radio,
            registry,
            status,
            config,
        }
    }

    pub fn state(&self) -> ScanState {
        self.status.state()
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == ScanState::Scanning
    }

    /// Whether the registry currently holds the result of
    /// [`retrieve_connected_peripherals`](Self::retrieve_connected_peripherals) rather than of a
    /// scan.
    pub fn connected_only(&self) -> bool {
        self.status.connected_only()
    }

    fn set_connected_only(&self, connected_only: bool) {
        if self.status.set_connected_only(connected_only) {
            self.registry
                .emit(CentralEvent::ConnectedOnlyChanged(connected_only));
        }
    }

    /// Starts a new scan session, discarding the results of the previous one.
    ///
    /// Does nothing while a scan is starting or running. The scan ends by itself after the
    /// configured duration, which the event reconciler picks up from the radio stack.
    pub async fn start_scan(&self) -> Result<()> {
        if !self.status.try_begin() {
            debug!("Scan already in progress, ignoring start request");
            return Ok(());
        }

        let mark = self.registry.mark();
        if self.config.clear_policy == ClearPolicy::BeforeStart {
            self.set_connected_only(false);
            self.registry.clear();
        }

        let request = self.config.discovery_request();
        if let Err(e) = self.radio.start_discovery(&request).await {
            self.status.fail();
            error!("Failed to start scan: {}", e);
            return Err(e);
        }

        if self.config.clear_policy == ClearPolicy::AfterStart {
            // Discoveries may have been delivered before the acknowledgement.
            self.set_connected_only(false);
            self.registry.clear_before(mark);
        }
        if self.status.acknowledge() {
            info!("Scanning for {}s", request.duration_secs);
            self.registry.emit(CentralEvent::ScanStarted);
        } else {
            debug!("Scan stopped before its start was acknowledged");
        }
        Ok(())
    }

    /// Replaces the registry content with the peripherals the system is connected to and
    /// switches the view to connected-only if there are any. Returns how many were found.
    ///
    /// On failure the registry and the view flag are left as they were.
    pub async fn retrieve_connected_peripherals(&self) -> Result<usize> {
        let peripherals = match self
            .radio
            .connected_peripherals(&self.config.service_filters)
            .await
        {
            Ok(peripherals) => peripherals,
            Err(e) => {
                warn!("Failed to retrieve connected peripherals: {}", e);
                return Err(e);
            }
        };

        self.registry.clear();
        let count = peripherals.len();
        if count == 0 {
            info!("No connected peripherals");
        }
        self.set_connected_only(count > 0);

        for snapshot in peripherals {
            let mut record = PeripheralRecord::from_snapshot(snapshot);
            record.connected = true;
            self.registry.upsert(record);
        }
        Ok(count)
    }
}
