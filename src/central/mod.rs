// blecentral Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The controllers driving a central session, and [`Central`], which wires them to one registry
//! and one radio stack.

mod characteristic;
mod connection;
mod reconciler;
mod scan;

pub use self::characteristic::CharacteristicIo;
pub use self::connection::{ConnectionAction, ConnectionController};
pub use self::reconciler::{EventReconciler, Subscription};
pub use self::scan::{ScanController, ScanState};

use self::scan::ScanStatus;
use crate::{
    api::{CentralEvent, PeripheralId, PeripheralRecord, PeripheralServices, RadioStack},
    codec::{ByteCodec, Utf8Codec},
    common::registry::PeripheralRegistry,
    config::CentralConfig,
    view::{self, PeripheralView},
    Result,
};
use futures::stream::Stream;
use log::{debug, info};
use static_assertions::assert_impl_all;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

assert_impl_all!(PeripheralRegistry: Send, Sync);
assert_impl_all!(PeripheralRecord: Clone, Send, Sync);
assert_impl_all!(PeripheralId: Clone, Send, Sync);
assert_impl_all!(EventReconciler: Clone, Send, Sync);
assert_impl_all!(Subscription: Send, Sync);

/// A central session: one registry, the controllers acting on it, and the subscription feeding
/// it radio events.
pub struct Central<R: RadioStack, C: ByteCodec = Utf8Codec> {
    radio: Arc<R>,
    config: CentralConfig,
    registry: Arc<PeripheralRegistry>,
    scan: ScanController<R>,
    reconciler: EventReconciler,
    connection: ConnectionController<R>,
    io: CharacteristicIo<R, C>,
    session: Mutex<Session>,
}

#[derive(Debug, Default)]
struct Session {
    started: bool,
    subscription: Option<Subscription>,
}

impl<R: RadioStack> Central<R> {
    /// Creates an inactive session exchanging characteristic values as UTF-8 text.
    pub fn new(radio: Arc<R>, config: CentralConfig) -> Result<Self> {
        Self::with_codec(radio, config, Utf8Codec)
    }
}

impl<R: RadioStack, C: ByteCodec> Central<R, C> {
    pub fn with_codec(radio: Arc<R>, config: CentralConfig, codec: C) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(PeripheralRegistry::new());
        let status = Arc::new(ScanStatus::default());
        Ok(Central {
            scan: ScanController::new(
                radio.clone(),
                registry.clone(),
                status.clone(),
                config.scan.clone(),
            ),
            reconciler: EventReconciler::new(registry.clone(), status),
            connection: ConnectionController::new(radio.clone(), registry.clone()),
            io: CharacteristicIo::new(
                radio.clone(),
                registry.clone(),
                codec,
                config.service_uuid,
                config.characteristic_uuid,
            ),
            session: Mutex::new(Session::default()),
            radio,
            config,
            registry,
        })
    }

    /// Starts the radio stack and subscribes to its events. Activating an active session does
    /// nothing, so the radio stack is started and subscribed to exactly once per session. When
    /// subscribing fails after the stack started, a retry only subscribes.
    pub async fn activate(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.subscription.as_ref().is_some_and(Subscription::is_active) {
            debug!("Central already active");
            return Ok(());
        }
        if !session.started {
            self.radio.start(self.config.start_options()).await?;
            session.started = true;
        }
        session.subscription = Some(self.reconciler.activate(self.radio.as_ref()).await?);
        info!("Central activated");
        Ok(())
    }

    /// Releases the event subscription and ends the session. The registry keeps its contents.
    pub async fn deactivate(&self) {
        let mut session = self.session.lock().await;
        session.started = false;
        if let Some(mut subscription) = session.subscription.take() {
            subscription.deactivate();
            info!("Central deactivated");
        }
    }

    pub async fn is_active(&self) -> bool {
        self.session
            .lock()
            .await
            .subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    pub fn config(&self) -> &CentralConfig {
        &self.config
    }

    pub fn registry(&self) -> &PeripheralRegistry {
        &self.registry
    }

    pub fn scan(&self) -> &ScanController<R> {
        &self.scan
    }

    pub fn reconciler(&self) -> &EventReconciler {
        &self.reconciler
    }

    pub fn connection(&self) -> &ConnectionController<R> {
        &self.connection
    }

    pub fn characteristic(&self) -> &CharacteristicIo<R, C> {
        &self.io
    }

    /// Stream of changes to the session. Consumers re-project on every item.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = CentralEvent> + Send>> {
        self.registry.events()
    }

    /// The current list for the presentation layer.
    pub fn peripherals(&self) -> Vec<PeripheralView> {
        view::project(&self.registry, self.scan.connected_only())
    }

    pub fn is_scanning(&self) -> bool {
        self.scan.is_scanning()
    }

    pub fn connected_only(&self) -> bool {
        self.scan.connected_only()
    }

    pub async fn start_scan(&self) -> Result<()> {
        let result = self.scan.start_scan().await;
        self.io.forget_unknown();
        result
    }

    pub async fn retrieve_connected_peripherals(&self) -> Result<usize> {
        let count = self.scan.retrieve_connected_peripherals().await?;
        self.io.forget_unknown();
        Ok(count)
    }

    pub async fn toggle_connection(&self, id: &PeripheralId) -> Result<ConnectionAction> {
        self.connection.toggle(id).await
    }

    pub async fn retrieve_services(&self, id: &PeripheralId) -> Result<PeripheralServices> {
        self.io.retrieve_services(id).await
    }

    pub async fn read_characteristic(&self, id: &PeripheralId) -> Result<String> {
        self.io.read(id).await
    }

    pub async fn write_characteristic(&self, id: &PeripheralId, text: &str) -> Result<()> {
        self.io.write(id, text).await
    }

    pub fn last_read_value(&self, id: &PeripheralId) -> Option<String> {
        self.io.last_read_value(id)
    }
}
