//! Cross-cutting notifications and the publish/subscribe bus that carries them.
//!
//! The bus is owned by one simulator instance and passed into systems each
//! tick. Telemetry filters and mission-hint logic subscribe by event kind.

use std::sync::mpsc::{self, Receiver, Sender};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::components::FiringSolution;
use crate::enums::*;
use crate::types::ShipId;

/// Events published by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// Pitch entered a gimbal-lock band (or cleared it).
    GimbalLock {
        ship_id: ShipId,
        pitch: f64,
        level: GimbalLockLevel,
    },
    SubsystemStateChanged {
        ship_id: ShipId,
        subsystem: String,
        from: SubsystemStatus,
        to: SubsystemStatus,
    },
    SubsystemOffline {
        ship_id: ShipId,
        subsystem: String,
    },
    SubsystemDestroyed {
        ship_id: ShipId,
        subsystem: String,
    },
    SubsystemOverheat {
        ship_id: ShipId,
        subsystem: String,
        heat: f64,
        max_heat: f64,
    },
    SubsystemCooled {
        ship_id: ShipId,
        subsystem: String,
        heat: f64,
    },
    WeaponFired {
        ship_id: ShipId,
        weapon_id: String,
        kind: WeaponKind,
        target: ShipId,
        target_contact: Option<String>,
        solution: FiringSolution,
        hit: bool,
        hull_damage: f64,
        subsystem_hit: Option<String>,
        sim_time: f64,
    },
    /// An active sensor fired. Other ships may hear it.
    SensorPing {
        ship_id: ShipId,
        position: DVec3,
        range: f64,
        sim_time: f64,
    },
    ContactUpdated {
        observer: ShipId,
        contact_id: String,
        is_new: bool,
        method: DetectionMethod,
        confidence: f64,
        distance: f64,
    },
    ContactLost {
        observer: ShipId,
        contact_id: String,
    },
    AutopilotEngaged {
        ship_id: ShipId,
        program: AutopilotKind,
    },
    AutopilotDisengaged {
        ship_id: ShipId,
        reason: String,
    },
    AutopilotComplete {
        ship_id: ShipId,
        program: AutopilotKind,
    },
    /// The integrator repaired a non-finite or out-of-bound value.
    NumericRecovery {
        ship_id: ShipId,
        field: String,
    },
    ShipDestroyed {
        ship_id: ShipId,
    },
}

/// Subscription key for `SimEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    GimbalLock,
    SubsystemStateChanged,
    SubsystemOffline,
    SubsystemDestroyed,
    SubsystemOverheat,
    SubsystemCooled,
    WeaponFired,
    SensorPing,
    ContactUpdated,
    ContactLost,
    AutopilotEngaged,
    AutopilotDisengaged,
    AutopilotComplete,
    NumericRecovery,
    ShipDestroyed,
}

impl SimEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SimEvent::GimbalLock { .. } => EventKind::GimbalLock,
            SimEvent::SubsystemStateChanged { .. } => EventKind::SubsystemStateChanged,
            SimEvent::SubsystemOffline { .. } => EventKind::SubsystemOffline,
            SimEvent::SubsystemDestroyed { .. } => EventKind::SubsystemDestroyed,
            SimEvent::SubsystemOverheat { .. } => EventKind::SubsystemOverheat,
            SimEvent::SubsystemCooled { .. } => EventKind::SubsystemCooled,
            SimEvent::WeaponFired { .. } => EventKind::WeaponFired,
            SimEvent::SensorPing { .. } => EventKind::SensorPing,
            SimEvent::ContactUpdated { .. } => EventKind::ContactUpdated,
            SimEvent::ContactLost { .. } => EventKind::ContactLost,
            SimEvent::AutopilotEngaged { .. } => EventKind::AutopilotEngaged,
            SimEvent::AutopilotDisengaged { .. } => EventKind::AutopilotDisengaged,
            SimEvent::AutopilotComplete { .. } => EventKind::AutopilotComplete,
            SimEvent::NumericRecovery { .. } => EventKind::NumericRecovery,
            SimEvent::ShipDestroyed { .. } => EventKind::ShipDestroyed,
        }
    }
}

#[derive(Debug)]
struct Subscriber {
    /// Empty means every kind.
    kinds: Vec<EventKind>,
    sender: Sender<SimEvent>,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Publish/subscribe channel keyed by event kind.
///
/// Every published event is also buffered until `drain` so the engine can
/// attach the tick's events to its snapshot.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    pending: Vec<SimEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to the given kinds (all kinds if `kinds` is empty).
    /// Dropping the receiver unsubscribes on the next matching publish.
    pub fn subscribe(&mut self, kinds: &[EventKind]) -> Receiver<SimEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(Subscriber {
            kinds: kinds.to_vec(),
            sender,
        });
        receiver
    }

    pub fn publish(&mut self, event: SimEvent) {
        let kind = event.kind();
        self.subscribers.retain(|sub| {
            if sub.wants(kind) {
                sub.sender.send(event.clone()).is_ok()
            } else {
                true
            }
        });
        self.pending.push(event);
    }

    /// Events published since the last drain.
    pub fn pending(&self) -> &[SimEvent] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
