// blecentral Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use super::scan::ScanStatus;
use crate::{
    api::{CentralEvent, PeripheralRecord, RadioEvent, RadioStack},
    common::registry::PeripheralRegistry,
    Result,
};
use futures::stream::StreamExt;
use log::{debug, info, trace};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Folds the radio stack's unsolicited events into the registry.
#[derive(Clone, Debug)]
pub struct EventReconciler {
    registry: Arc<PeripheralRegistry>,
    status: Arc<ScanStatus>,
}

impl EventReconciler {
    pub(crate) fn new(registry: Arc<PeripheralRegistry>, status: Arc<ScanStatus>) -> Self {
        EventReconciler { registry, status }
    }

    /// Applies a single event. Events must be applied in the order the radio stack delivered
    /// them; for the same peripheral the last one wins.
    pub fn apply(&self, event: RadioEvent) {
        match event {
            RadioEvent::Discovered(snapshot) => {
                trace!("Got ble peripheral {:?}", snapshot);
                let record = PeripheralRecord::from_snapshot(snapshot);
                self.registry.upsert_with(record, |previous, record| {
                    record.connected = previous.connected;
                });
            }
            RadioEvent::ScanStopped => {
                let previous = self.status.stop();
                debug!("Scan is stopped, was {:?}", previous);
                self.registry.emit(CentralEvent::ScanStopped);
            }
            RadioEvent::Disconnected(id) => {
                if self.registry.update(&id, |record| record.connected = false) {
                    info!("Disconnected from {}", id);
                } else {
                    debug!("Disconnected from unknown peripheral {}, ignoring", id);
                }
            }
        }
    }

    /// Subscribes to `radio`'s events and applies them on a spawned task until the returned
    /// subscription is deactivated or dropped.
    pub async fn activate<R: RadioStack + ?Sized>(&self, radio: &R) -> Result<Subscription> {
        let mut events = radio.events().await?;
        let reconciler = self.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                reconciler.apply(event);
            }
            debug!("Radio event stream ended");
        });
        Ok(Subscription { task: Some(task) })
    }
}

/// Handle to an active event subscription.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops applying events. Calling it again does nothing.
    pub fn deactivate(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Radio event subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.deactivate();
    }
}
