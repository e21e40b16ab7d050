use crate::{
    api::{CentralEvent, CharPropFlags, PeripheralId, PeripheralServices, RadioStack},
    codec::{ByteCodec, Utf8Codec},
    common::registry::PeripheralRegistry,
    Result,
};
use dashmap::DashMap;
use log::{debug, warn};
use std::sync::Arc;
use uuid::Uuid;

/// Reads and writes the one characteristic a session is configured for.
pub struct CharacteristicIo<R: RadioStack, C: ByteCodec = Utf8Codec> {
    radio: Arc<R>,
    registry: Arc<PeripheralRegistry>,
    codec: C,
    service_uuid: Uuid,
    characteristic_uuid: Uuid,
    last_read: DashMap<PeripheralId, String>,
}

impl<R: RadioStack, C: ByteCodec> CharacteristicIo<R, C> {
    pub(crate) fn new(
        radio: Arc<R>,
        registry: Arc<PeripheralRegistry>,
        codec: C,
        service_uuid: Uuid,
        characteristic_uuid: Uuid,
    ) -> Self {
        CharacteristicIo {
            radio,
            registry,
            codec,
            service_uuid,
            characteristic_uuid,
            last_read: DashMap::new(),
        }
    }

    pub fn service_uuid(&self) -> Uuid {
        self.service_uuid
    }

    pub fn characteristic_uuid(&self) -> Uuid {
        self.characteristic_uuid
    }

    /// Reads and decodes the characteristic, remembering the value as the peripheral's last read.
    /// A failed read keeps the previous value.
    pub async fn read(&self, id: &PeripheralId) -> Result<String> {
        let bytes = match self
            .radio
            .read(id, self.service_uuid, self.characteristic_uuid)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Read from {} failed: {}", id, e);
                return Err(e);
            }
        };

        let value = self.codec.decode(&bytes);
        debug!("Read {:?} from {}", value, id);
        self.last_read.insert(id.clone(), value.clone());
        self.registry.emit(CentralEvent::CharacteristicRead {
            id: id.clone(),
            value: value.clone(),
        });
        Ok(value)
    }

    /// Encodes and writes `text`. Nothing is retried.
    pub async fn write(&self, id: &PeripheralId, text: &str) -> Result<()> {
        let payload = self.codec.encode(text);
        match self
            .radio
            .write(id, self.service_uuid, self.characteristic_uuid, &payload)
            .await
        {
            Ok(()) => {
                debug!("Wrote {} bytes to {}", payload.len(), id);
                Ok(())
            }
            Err(e) => {
                warn!("Write to {} failed: {}", id, e);
                Err(e)
            }
        }
    }

    /// The value of the last successful read from `id`, if any.
    pub fn last_read_value(&self, id: &PeripheralId) -> Option<String> {
        self.last_read.get(id).map(|value| value.clone())
    }

    /// Drops the last read values of peripherals that are no longer in the registry.
    pub fn forget_unknown(&self) {
        self.last_read.retain(|id, _| self.registry.contains(id));
    }

    /// Asks the radio stack for the peripheral's services, warning when the configured
    /// characteristic is missing or can be neither read nor written.
    pub async fn retrieve_services(&self, id: &PeripheralId) -> Result<PeripheralServices> {
        let services = match self.radio.retrieve_services(id).await {
            Ok(services) => services,
            Err(e) => {
                warn!("Retrieving services of {} failed: {}", id, e);
                return Err(e);
            }
        };
        debug!("Retrieved peripheral services of {}: {:?}", id, services);

        let usable =
            CharPropFlags::READ | CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE;
        match services.characteristic(self.service_uuid, self.characteristic_uuid) {
            None => warn!(
                "{} has no characteristic {} in service {}",
                id, self.characteristic_uuid, self.service_uuid
            ),
            Some(characteristic) if !characteristic.properties.intersects(usable) => warn!(
                "Characteristic {} of {} is neither readable nor writable",
                self.characteristic_uuid, id
            ),
            Some(_) => {}
        }
        Ok(services)
    }
}
