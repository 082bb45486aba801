use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::domain::conversation::DeviceAction;
use crate::domain::device::{DeviceKind, DeviceState, PowerStatus};

/// In-memory stand-in for the smart-home devices. Nothing here reaches real
/// hardware; the map lives as long as the process and is shared by every
/// request that process serves.
#[derive(Debug)]
pub struct DeviceStore {
    devices: Mutex<BTreeMap<DeviceKind, DeviceState>>,
}

impl Default for DeviceStore {
    fn default() -> Self {
        let devices = DeviceKind::ALL.into_iter().map(|kind| (kind, kind.initial_state())).collect();
        Self { devices: Mutex::new(devices) }
    }
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `actions` in order and returns one confirmation per action that
    /// named a known device. Unknown devices are skipped without a trace in
    /// the result.
    pub fn apply(&self, actions: &[DeviceAction]) -> Vec<String> {
        let mut devices = self.lock();
        let mut confirmations = Vec::with_capacity(actions.len());

        for action in actions {
            let Some(kind) = action.device.as_deref().and_then(DeviceKind::from_name) else {
                debug!(
                    event_name = "devices.action.skipped",
                    device = action.device.as_deref().unwrap_or("none"),
                    "ignoring action for unknown device"
                );
                continue;
            };
            let state = devices.entry(kind).or_insert_with(|| kind.initial_state());

            if let Some(status) = action.command.as_deref().and_then(PowerStatus::from_command) {
                state.set_status(status);
            }
            if let Some(value) = action.value {
                state.set_attribute(value);
            }

            debug!(
                event_name = "devices.action.applied",
                device = kind.as_str(),
                state = ?state,
                "simulated device updated"
            );
            confirmations.push(confirmation(kind));
        }

        confirmations
    }

    pub fn get(&self, kind: DeviceKind) -> Option<DeviceState> {
        self.lock().get(&kind).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<String, DeviceState> {
        self.lock().iter().map(|(kind, state)| (kind.as_str().to_owned(), *state)).collect()
    }

    // A poisoned lock still holds a usable map; the state is only a simulation.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<DeviceKind, DeviceState>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn confirmation(kind: DeviceKind) -> String {
    format!("{}を制御しました", kind.as_str())
}
