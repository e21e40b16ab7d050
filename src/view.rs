//! The list handed to the presentation layer.

use crate::api::PeripheralRecord;
use crate::PeripheralRegistry;

/// Which detail renderer an item should be shown with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailMode {
    /// Name, RSSI and id; tapping toggles the connection.
    Summary,
    /// The connected-device card with characteristic read/write controls.
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralView {
    pub record: PeripheralRecord,
    pub display_name: String,
    pub detail: DetailMode,
}

/// Every record in the registry, most recently touched last. `connected_only` does not filter;
/// it only selects the detail renderer of each item.
pub fn project(registry: &PeripheralRegistry, connected_only: bool) -> Vec<PeripheralView> {
    let detail = if connected_only {
        DetailMode::Connected
    } else {
        DetailMode::Summary
    };
    registry
        .values()
        .into_iter()
        .map(|record| PeripheralView {
            display_name: record.display_name().to_string(),
            record,
            detail,
        })
        .collect()
}
