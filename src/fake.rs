//! Scriptable in-memory radio stack used by the unit tests.

use crate::api::{
    DiscoveryRequest, PeripheralId, PeripheralServices, PeripheralSnapshot, RadioEvent,
    RadioStack, StartOptions,
};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Mutex;
use tokio::sync::{broadcast, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

pub(crate) fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Yields to the runtime until `condition` holds, so spawned tasks get to run.
pub(crate) async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Start(StartOptions),
    Events,
    StartDiscovery(DiscoveryRequest),
    ConnectedPeripherals(Vec<Uuid>),
    Connect(PeripheralId),
    Disconnect(PeripheralId),
    RetrieveServices(PeripheralId),
    Read(PeripheralId, Uuid, Uuid),
    Write(PeripheralId, Uuid, Uuid, Vec<u8>),
}

enum Reply<T> {
    Now(Result<T>),
    Later(oneshot::Receiver<Result<T>>),
}

/// Queue of replies for one operation. An empty queue answers `Ok(T::default())`.
pub(crate) struct Script<T> {
    replies: Mutex<VecDeque<Reply<T>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Script {
            replies: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T: Default> Script<T> {
    pub(crate) fn push(&self, reply: Result<T>) {
        self.replies.lock().unwrap().push_back(Reply::Now(reply));
    }

    /// Queues a reply that stays pending until the returned sender fires.
    pub(crate) fn defer(&self) -> oneshot::Sender<Result<T>> {
        let (sender, receiver) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Reply::Later(receiver));
        sender
    }

    async fn next(&self) -> Result<T> {
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            None => Ok(T::default()),
            Some(Reply::Now(result)) => result,
            Some(Reply::Later(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(Error::Radio("reply dropped".to_string()))),
        }
    }
}

pub(crate) struct FakeRadio {
    events: broadcast::Sender<RadioEvent>,
    calls: Mutex<Vec<Call>>,
    pub(crate) start: Script<()>,
    pub(crate) subscribe: Script<()>,
    pub(crate) discovery: Script<()>,
    pub(crate) connected: Script<Vec<PeripheralSnapshot>>,
    pub(crate) connect: Script<()>,
    pub(crate) disconnect: Script<()>,
    pub(crate) services: Script<PeripheralServices>,
    pub(crate) read: Script<Vec<u8>>,
    pub(crate) write: Script<()>,
}

impl FakeRadio {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        FakeRadio {
            events,
            calls: Mutex::new(vec![]),
            start: Script::default(),
            subscribe: Script::default(),
            discovery: Script::default(),
            connected: Script::default(),
            connect: Script::default(),
            disconnect: Script::default(),
            services: Script::default(),
            read: Script::default(),
            write: Script::default(),
        }
    }

    pub(crate) fn emit(&self, event: RadioEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn subscribers(&self) -> usize {
        self.events.receiver_count()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RadioStack for FakeRadio {
    async fn start(&self, options: StartOptions) -> Result<()> {
        self.record(Call::Start(options));
        self.start.next().await
    }

    async fn events(&self) -> Result<Pin<Box<dyn Stream<Item = RadioEvent> + Send>>> {
        self.record(Call::Events);
        self.subscribe.next().await?;
        let receiver = self.events.subscribe();
        Ok(Box::pin(
            BroadcastStream::new(receiver).filter_map(|x| async move { x.ok() }),
        ))
    }

    async fn start_discovery(&self, request: &DiscoveryRequest) -> Result<()> {
        self.record(Call::StartDiscovery(request.clone()));
        self.discovery.next().await
    }

    async fn connected_peripherals(
        &self,
        service_filters: &[Uuid],
    ) -> Result<Vec<PeripheralSnapshot>> {
        self.record(Call::ConnectedPeripherals(service_filters.to_vec()));
        self.connected.next().await
    }

    async fn connect(&self, id: &PeripheralId) -> Result<()> {
        self.record(Call::Connect(id.clone()));
        self.connect.next().await
    }

    async fn disconnect(&self, id: &PeripheralId) -> Result<()> {
        self.record(Call::Disconnect(id.clone()));
        self.disconnect.next().await
    }

    async fn retrieve_services(&self, id: &PeripheralId) -> Result<PeripheralServices> {
        self.record(Call::RetrieveServices(id.clone()));
        self.services.next().await
    }

    async fn read(
        &self,
        id: &PeripheralId,
        service_uuid: Uuid,
        characteristic_uuid: Uuid,
    ) -> Result<Vec<u8>> {
        self.record(Call::Read(id.clone(), service_uuid, characteristic_uuid));
        self.read.next().await
    }

    async fn write(
        &self,
        id: &PeripheralId,
        service_uuid: Uuid,
        characteristic_uuid: Uuid,
        data: &[u8],
    ) -> Result<()> {
        self.record(Call::Write(
            id.clone(),
            service_uuid,
            characteristic_uuid,
            data.to_vec(),
        ));
        self.write.next().await
    }
}
