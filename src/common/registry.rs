// blecentral Source Code File
//
// Copyright 2020 Nonpolynomial Labs LLC. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The single source of truth for the peripherals a central knows about.

use crate::api::{CentralEvent, PeripheralId, PeripheralRecord};
use dashmap::{mapref::entry::Entry, DashMap};
use futures::stream::{Stream, StreamExt};
use log::trace;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Debug)]
struct Slot {
    touched: u64,
    record: PeripheralRecord,
}

/// Keyed collection of [`PeripheralRecord`]s, at most one per [`PeripheralId`].
///
/// Every mutation is applied under the map's shard lock without suspending, so callers never
/// observe a half-applied update. [`values`](Self::values) orders records by the last time they
/// were written, most recently touched last.
///
/// The registry also carries the [`CentralEvent`] channel. Every mutation announces itself on it,
/// and the controllers use [`emit`](Self::emit) for the state they own.
#[derive(Debug)]
pub struct PeripheralRegistry {
    peripherals: DashMap<PeripheralId, Slot>,
    touches: AtomicU64,
    events_channel: broadcast::Sender<CentralEvent>,
}

impl Default for PeripheralRegistry {
    fn default() -> Self {
        let (broadcast_sender, _) = broadcast::channel(16);
        PeripheralRegistry {
            peripherals: DashMap::new(),
            touches: AtomicU64::new(0),
            events_channel: broadcast_sender,
        }
    }
}

impl PeripheralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: CentralEvent) {
        if let Err(lost) = self.events_channel.send(event) {
            trace!("Lost central event, while nothing subscribed: {:?}", lost);
        }
    }

    pub fn events(&self) -> Pin<Box<dyn Stream<Item = CentralEvent> + Send>> {
        let receiver = self.events_channel.subscribe();
        Box::pin(BroadcastStream::new(receiver).filter_map(|x| async move { x.ok() }))
    }

    fn next_touch(&self) -> u64 {
        self.touches.fetch_add(1, Ordering::Relaxed)
    }

    /// Inserts `record`, replacing whatever was stored for its id.
    pub fn upsert(&self, record: PeripheralRecord) {
        self.upsert_with(record, |_, _| {});
    }

    /// Like [`upsert`](Self::upsert), but when an entry already exists `merge` may carry fields
    /// over from it into the incoming record before it replaces the old one.
    pub fn upsert_with<F>(&self, mut record: PeripheralRecord, merge: F)
    where
        F: FnOnce(&PeripheralRecord, &mut PeripheralRecord),
    {
        let id = record.id.clone();
        // Stamp under the entry lock so stamps follow the order writes land in.
        match self.peripherals.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                merge(&entry.get().record, &mut record);
                let touched = self.next_touch();
                entry.insert(Slot { touched, record });
            }
            Entry::Vacant(entry) => {
                let touched = self.next_touch();
                entry.insert(Slot { touched, record });
            }
        }
        self.emit(CentralEvent::PeripheralUpdated(id));
    }

    /// Applies `f` to the stored record for `id`. Returns false, without calling `f`, when the id
    /// is unknown.
    pub fn update<F>(&self, id: &PeripheralId, f: F) -> bool
    where
        F: FnOnce(&mut PeripheralRecord),
    {
        let updated = match self.peripherals.get_mut(id) {
            Some(mut slot) => {
                f(&mut slot.record);
                slot.touched = self.next_touch();
                true
            }
            None => false,
        };
        if updated {
            self.emit(CentralEvent::PeripheralUpdated(id.clone()));
        }
        updated
    }

    pub fn clear(&self) {
        self.peripherals.clear();
        self.emit(CentralEvent::PeripheralsCleared);
    }

    /// The current position of the touch counter. Records written from now on compare at or
    /// above it.
    pub fn mark(&self) -> u64 {
        self.touches.load(Ordering::Relaxed)
    }

    /// Drops every record that was last touched before `mark`, keeping the ones written since.
    pub fn clear_before(&self, mark: u64) {
        self.peripherals.retain(|_, slot| slot.touched >= mark);
        self.emit(CentralEvent::PeripheralsCleared);
    }

    pub fn get(&self, id: &PeripheralId) -> Option<PeripheralRecord> {
        self.peripherals.get(id).map(|slot| slot.record.clone())
    }

    pub fn contains(&self, id: &PeripheralId) -> bool {
        self.peripherals.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peripherals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peripherals.is_empty()
    }

    /// A snapshot of all records, most recently touched last.
    pub fn values(&self) -> Vec<PeripheralRecord> {
        let mut slots: Vec<(u64, PeripheralRecord)> = self
            .peripherals
            .iter()
            .map(|slot| (slot.touched, slot.record.clone()))
            .collect();
        slots.sort_by_key(|(touched, _)| *touched);
        slots.into_iter().map(|(_, record)| record).collect()
    }
}
