//! Per-observer contact tracking.
//!
//! Each observer numbers the ships it sees in order of first detection
//! (`C-001`, `C-002`, ...). The number stays attached to the same ship for
//! as long as the contact survives, regardless of how it was detected.

use std::collections::BTreeMap;

use tracing::debug;

use bridgesim_core::components::ContactData;
use bridgesim_core::constants::CLASSIFICATION_CONFIDENCE_THRESHOLD;
use bridgesim_core::enums::Classification;
use bridgesim_core::events::{EventBus, SimEvent};
use bridgesim_core::math::relative_bearing;
use bridgesim_core::relative::closing_speed;
use bridgesim_core::state::ContactView;
use bridgesim_core::types::{Attitude, Kinematics, ShipId};

use crate::systems::sensors::Detection;

/// Confidence after linear decay to zero over the stale window.
pub fn effective_confidence(contact: &ContactData, now: f64, stale_threshold: f64) -> f64 {
    let age = (now - contact.last_update).max(0.0);
    contact.confidence * (1.0 - age / stale_threshold).clamp(0.0, 1.0)
}

/// Classification as the crew should see it: unknown once confidence has
/// decayed below the threshold.
pub fn displayed_classification(
    contact: &ContactData,
    now: f64,
    stale_threshold: f64,
) -> Classification {
    if effective_confidence(contact, now, stale_threshold) < CLASSIFICATION_CONFIDENCE_THRESHOLD {
        Classification::Unknown
    } else {
        contact.classification.clone()
    }
}

fn specificity(c: &Classification) -> u8 {
    match c {
        Classification::Unknown => 0,
        Classification::Size(_) => 1,
        Classification::Class(_) => 2,
    }
}

#[derive(Debug, Clone)]
pub struct ContactTracker {
    contacts: BTreeMap<String, ContactData>,
    /// contact id → true ship
    ships: BTreeMap<String, ShipId>,
    /// true ship → contact id
    ids: BTreeMap<ShipId, String>,
    next_number: u32,
    pub stale_threshold: f64,
}

impl ContactTracker {
    pub fn new(stale_threshold: f64) -> Self {
        Self {
            contacts: BTreeMap::new(),
            ships: BTreeMap::new(),
            ids: BTreeMap::new(),
            next_number: 1,
            stale_threshold,
        }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contact(&self, contact_id: &str) -> Option<&ContactData> {
        self.contacts.get(contact_id)
    }

    pub fn contacts(&self) -> impl Iterator<Item = &ContactData> {
        self.contacts.values()
    }

    /// True ship behind a contact. Used by fire control and autopilot
    /// target resolution, never shown to crews.
    pub fn ship_for(&self, contact_id: &str) -> Option<&ShipId> {
        self.ships.get(contact_id)
    }

    pub fn contact_for_ship(&self, ship: &ShipId) -> Option<&str> {
        self.ids.get(ship).map(String::as_str)
    }

    /// Contact estimate dead-reckoned to `now`.
    pub fn estimate(&self, contact_id: &str, now: f64) -> Option<Kinematics> {
        self.contacts.get(contact_id).map(|c| {
            let age = (now - c.last_update).max(0.0);
            Kinematics::new(c.position + c.velocity * age, c.velocity)
        })
    }

    /// Create or refresh the contact for a detection. Returns its id.
    pub fn ingest(
        &mut self,
        observer: &ShipId,
        own: &Kinematics,
        attitude: &Attitude,
        detection: &Detection,
        now: f64,
        events: &mut EventBus,
    ) -> String {
        let (contact_id, is_new) = match self.ids.get(&detection.ship) {
            Some(id) => (id.clone(), false),
            None => {
                let id = format!("C-{:03}", self.next_number);
                self.next_number += 1;
                self.ids.insert(detection.ship.clone(), id.clone());
                self.ships.insert(id.clone(), detection.ship.clone());
                (id, true)
            }
        };

        let offset = detection.position - own.position;
        let distance = offset.length();
        let bearing = relative_bearing(attitude, offset);
        let classification = match self.contacts.get(&contact_id) {
            Some(old)
                if specificity(&old.classification) > specificity(&detection.classification) =>
            {
                old.classification.clone()
            }
            _ => detection.classification.clone(),
        };

        if is_new {
            debug!(observer = %observer, contact = %contact_id, distance, "new contact");
        }
        self.contacts.insert(
            contact_id.clone(),
            ContactData {
                contact_id: contact_id.clone(),
                position: detection.position,
                velocity: detection.velocity,
                confidence: detection.accuracy.clamp(0.0, 1.0),
                last_update: now,
                method: detection.method,
                bearing,
                distance,
                signature: detection.signature,
                classification,
            },
        );
        events.publish(SimEvent::ContactUpdated {
            observer: observer.clone(),
            contact_id: contact_id.clone(),
            is_new,
            method: detection.method,
            confidence: detection.accuracy,
            distance,
        });
        contact_id
    }

    /// Drop contacts older than twice the stale threshold.
    pub fn prune(&mut self, observer: &ShipId, now: f64, events: &mut EventBus) -> usize {
        let limit = 2.0 * self.stale_threshold;
        let expired: Vec<String> = self
            .contacts
            .values()
            .filter(|c| now - c.last_update > limit)
            .map(|c| c.contact_id.clone())
            .collect();
        for contact_id in &expired {
            self.contacts.remove(contact_id);
            if let Some(ship) = self.ships.remove(contact_id) {
                self.ids.remove(&ship);
            }
            debug!(observer = %observer, contact = %contact_id, "contact lost");
            events.publish(SimEvent::ContactLost {
                observer: observer.clone(),
                contact_id: contact_id.clone(),
            });
        }
        expired.len()
    }

    /// Nearest first, measured from `own` now.
    pub fn by_distance(&self, own: &Kinematics) -> Vec<&ContactData> {
        let mut list: Vec<&ContactData> = self.contacts.values().collect();
        list.sort_by(|a, b| {
            let da = a.position.distance(own.position);
            let db = b.position.distance(own.position);
            da.total_cmp(&db)
        });
        list
    }

    /// Fastest closing first.
    pub fn by_closing_speed(&self, own: &Kinematics) -> Vec<&ContactData> {
        let mut list: Vec<&ContactData> = self.contacts.values().collect();
        list.sort_by(|a, b| {
            let ca = closing_speed(own, &Kinematics::new(a.position, a.velocity));
            let cb = closing_speed(own, &Kinematics::new(b.position, b.velocity));
            cb.total_cmp(&ca)
        });
        list
    }

    /// Most confident first, after decay.
    pub fn by_confidence(&self, now: f64) -> Vec<&ContactData> {
        let mut list: Vec<&ContactData> = self.contacts.values().collect();
        list.sort_by(|a, b| {
            let ca = effective_confidence(a, now, self.stale_threshold);
            let cb = effective_confidence(b, now, self.stale_threshold);
            cb.total_cmp(&ca)
        });
        list
    }

    pub fn view(&self, own: &Kinematics, now: f64) -> Vec<ContactView> {
        self.by_distance(own)
            .into_iter()
            .map(|c| {
                let estimate = Kinematics::new(c.position, c.velocity);
                ContactView {
                    contact_id: c.contact_id.clone(),
                    position: c.position,
                    velocity: c.velocity,
                    distance: c.position.distance(own.position),
                    bearing: c.bearing,
                    closing_speed: closing_speed(own, &estimate),
                    confidence: effective_confidence(c, now, self.stale_threshold),
                    method: c.method,
                    classification: displayed_classification(c, now, self.stale_threshold),
                    age_secs: (now - c.last_update).max(0.0),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use bridgesim_core::enums::{DetectionMethod, SizeClass};
    use bridgesim_core::events::EventKind;

    use super::*;

    fn detection(ship: &str, x: f64, accuracy: f64, classification: Classification) -> Detection {
        Detection {
            ship: ShipId::new(ship),
            position: DVec3::new(x, 0.0, 0.0),
            velocity: DVec3::ZERO,
            accuracy,
            method: DetectionMethod::Passive,
            signature: 1.0,
            classification,
        }
    }

    fn ingest(
        tracker: &mut ContactTracker,
        det: &Detection,
        now: f64,
        events: &mut EventBus,
    ) -> String {
        tracker.ingest(
            &ShipId::new("observer"),
            &Kinematics::default(),
            &Attitude::default(),
            det,
            now,
            events,
        )
    }

    #[test]
    fn test_ids_are_stable_and_sequential() {
        let mut tracker = ContactTracker::new(60.0);
        let mut events = EventBus::new();
        let bravo = detection("bravo", 1000.0, 0.8, Classification::Unknown);
        let charlie = detection("charlie", 2000.0, 0.8, Classification::Unknown);
        let bravo_moved = detection("bravo", 1100.0, 0.8, Classification::Unknown);
        let a = ingest(&mut tracker, &bravo, 0.0, &mut events);
        let b = ingest(&mut tracker, &charlie, 0.0, &mut events);
        let a2 = ingest(&mut tracker, &bravo_moved, 1.0, &mut events);
        assert_eq!(a, "C-001");
        assert_eq!(b, "C-002");
        assert_eq!(a, a2);
        assert_eq!(tracker.ship_for("C-002"), Some(&ShipId::new("charlie")));
        assert_eq!(tracker.contact("C-001").unwrap().distance, 1100.0);
    }

    #[test]
    fn test_confidence_decays_and_classification_degrades() {
        let mut tracker = ContactTracker::new(60.0);
        let mut events = EventBus::new();
        let id = ingest(
            &mut tracker,
            &detection("bravo", 1000.0, 0.95, Classification::Class("frigate".into())),
            0.0,
            &mut events,
        );
        let contact = tracker.contact(&id).unwrap();
        assert!((effective_confidence(contact, 30.0, 60.0) - 0.475).abs() < 1e-12);
        assert_eq!(effective_confidence(contact, 90.0, 60.0), 0.0);
        assert_eq!(
            displayed_classification(contact, 10.0, 60.0),
            Classification::Class("frigate".into())
        );
        assert_eq!(displayed_classification(contact, 45.0, 60.0), Classification::Unknown);
    }

    #[test]
    fn test_specific_classification_is_kept() {
        let mut tracker = ContactTracker::new(60.0);
        let mut events = EventBus::new();
        let sized = detection("bravo", 1000.0, 0.8, Classification::Size(SizeClass::Large));
        let vague = detection("bravo", 1000.0, 0.4, Classification::Unknown);
        let id = ingest(&mut tracker, &sized, 0.0, &mut events);
        ingest(&mut tracker, &vague, 1.0, &mut events);
        assert_eq!(
            tracker.contact(&id).unwrap().classification,
            Classification::Size(SizeClass::Large)
        );
    }

    #[test]
    fn test_prune_after_twice_stale() {
        let mut tracker = ContactTracker::new(60.0);
        let mut events = EventBus::new();
        let rx = events.subscribe(&[EventKind::ContactLost]);
        let bravo = detection("bravo", 1000.0, 0.8, Classification::Unknown);
        ingest(&mut tracker, &bravo, 0.0, &mut events);

        assert_eq!(tracker.prune(&ShipId::new("observer"), 90.0, &mut events), 0);
        assert_eq!(tracker.prune(&ShipId::new("observer"), 120.0, &mut events), 0);
        assert_eq!(tracker.prune(&ShipId::new("observer"), 120.5, &mut events), 1);
        assert!(tracker.is_empty());
        assert_eq!(rx.try_iter().count(), 1);

        // Re-detection gets a fresh number.
        let id = ingest(&mut tracker, &bravo, 130.0, &mut events);
        assert_eq!(id, "C-002");
    }

    #[test]
    fn test_sort_orders() {
        let mut tracker = ContactTracker::new(60.0);
        let mut events = EventBus::new();
        let mut far = detection("far", 5000.0, 0.9, Classification::Unknown);
        far.velocity = DVec3::new(-300.0, 0.0, 0.0);
        ingest(&mut tracker, &far, 0.0, &mut events);
        let near = detection("near", 1000.0, 0.5, Classification::Unknown);
        ingest(&mut tracker, &near, 0.0, &mut events);

        let own = Kinematics::default();
        let ids = |list: Vec<&ContactData>| {
            list.iter().map(|c| c.contact_id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(tracker.by_distance(&own)), vec!["C-002", "C-001"]);
        assert_eq!(ids(tracker.by_closing_speed(&own)), vec!["C-001", "C-002"]);
        assert_eq!(ids(tracker.by_confidence(0.0)), vec!["C-001", "C-002"]);
    }
}
