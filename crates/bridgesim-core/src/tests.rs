#[cfg(test)]
mod tests {
    use glam::DVec3;
    use serde_json::json;

    use crate::commands::*;
    use crate::config::*;
    use crate::enums::*;
    use crate::error::{CommandError, ConfigError};
    use crate::events::{EventBus, EventKind, SimEvent};
    use crate::state::SimSnapshot;
    use crate::types::{ShipId, SimTime};

    #[test]
    fn test_classification_serde() {
        let variants = vec![
            Classification::Unknown,
            Classification::Size(SizeClass::Large),
            Classification::Class("corvette".to_string()),
        ];
        for v in variants {
            let json = serde_json::to_string(&v).unwrap();
            let back: Classification = serde_json::from_str(&json).unwrap();
            assert_eq!(v, back);
        }
    }

    #[test]
    fn test_ship_command_serde() {
        let commands = vec![
            ShipCommand::SetThrust {
                thrust: DVec3::new(1000.0, 0.0, 0.0),
            },
            ShipCommand::SetOrientation {
                pitch: 10.0,
                yaw: -45.0,
                roll: 0.0,
            },
            ShipCommand::EngageAutopilot {
                request: AutopilotRequest::Intercept {
                    target: TargetRef::Contact("C-001".to_string()),
                },
            },
            ShipCommand::DisengageAutopilot,
            ShipCommand::FireWeapon {
                weapon: "railgun-1".to_string(),
                target: Some(TargetRef::Ship(ShipId::new("bravo"))),
            },
        ];
        for cmd in commands {
            let json = serde_json::to_string(&cmd).unwrap();
            let back: ShipCommand = serde_json::from_str(&json).unwrap();
            assert_eq!(cmd, back, "round trip failed for {json}");
        }
    }

    #[test]
    fn test_from_name_parses_arguments() {
        let cmd = ShipCommand::from_name("set_thrust", json!({ "thrust": [500.0, 0.0, 0.0] }))
            .unwrap();
        assert_eq!(
            cmd,
            ShipCommand::SetThrust {
                thrust: DVec3::new(500.0, 0.0, 0.0)
            }
        );

        let cmd = ShipCommand::from_name("set_orientation", json!({ "pitch": 5.0, "yaw": 90.0 }))
            .unwrap();
        assert_eq!(
            cmd,
            ShipCommand::SetOrientation {
                pitch: 5.0,
                yaw: 90.0,
                roll: 0.0
            },
            "roll should default to zero"
        );

        let cmd = ShipCommand::from_name("ping_sensors", serde_json::Value::Null).unwrap();
        assert_eq!(cmd, ShipCommand::PingSensors);
    }

    #[test]
    fn test_from_name_engage_autopilot_defaults() {
        let cmd = ShipCommand::from_name(
            "engage_autopilot",
            json!({ "request": { "program": "go_to_position", "target": [1000.0, 0.0, 0.0] } }),
        )
        .unwrap();
        match cmd {
            ShipCommand::EngageAutopilot {
                request:
                    AutopilotRequest::GoToPosition {
                        stop_at_target,
                        arrival_tolerance,
                        ..
                    },
            } => {
                assert!(stop_at_target, "stop_at_target should default to true");
                assert_eq!(arrival_tolerance, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_from_name_rejects_bad_input() {
        let err = ShipCommand::from_name("warp_drive", json!({})).unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("warp_drive".to_string()));

        let err = ShipCommand::from_name("set_thrust", json!({ "thrust": "fast" })).unwrap_err();
        assert!(
            matches!(err, CommandError::InvalidArgument(_)),
            "expected InvalidArgument, got {err:?}"
        );

        let err = ShipCommand::from_name("rotate", json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument(_)));
    }

    #[test]
    fn test_manual_helm_commands() {
        assert!(ShipCommand::Rotate {
            pitch: 0.0,
            yaw: 10.0,
            roll: 0.0
        }
        .is_manual_helm());
        assert!(!ShipCommand::PingSensors.is_manual_helm());
        assert!(!ShipCommand::DisengageAutopilot.is_manual_helm());
    }

    #[test]
    fn test_event_bus_filters_by_kind() {
        let mut bus = EventBus::new();
        let lost = bus.subscribe(&[EventKind::ContactLost]);
        let all = bus.subscribe(&[]);

        bus.publish(SimEvent::ShipDestroyed {
            ship_id: ShipId::new("alpha"),
        });
        bus.publish(SimEvent::ContactLost {
            observer: ShipId::new("alpha"),
            contact_id: "C-001".to_string(),
        });

        let received: Vec<SimEvent> = lost.try_iter().collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind(), EventKind::ContactLost);
        assert_eq!(all.try_iter().count(), 2);
        assert_eq!(bus.pending().len(), 2);
        assert_eq!(bus.drain().len(), 2);
        assert!(bus.pending().is_empty());
    }

    #[test]
    fn test_event_bus_drops_closed_subscribers() {
        let mut bus = EventBus::new();
        let rx = bus.subscribe(&[EventKind::ShipDestroyed]);
        let _keep = bus.subscribe(&[EventKind::ContactLost]);
        drop(rx);
        bus.publish(SimEvent::ShipDestroyed {
            ship_id: ShipId::new("alpha"),
        });
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_event_serde_is_tagged() {
        let event = SimEvent::AutopilotEngaged {
            ship_id: ShipId::new("alpha"),
            program: AutopilotKind::HoldPosition,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "AutopilotEngaged");
        assert_eq!(value["ship_id"], "alpha");
    }

    #[test]
    fn test_ship_config_defaults_from_minimal_json() {
        let config = ShipConfig::from_json(r#"{ "id": "alpha", "mass": 1000.0 }"#).unwrap();
        assert_eq!(config.id, ShipId::new("alpha"));
        assert_eq!(config.moment_of_inertia(), 10_000.0);
        assert_eq!(config.size_class(), SizeClass::Small);
        assert_eq!(config.subsystems.len(), 6);
        assert!(config.passive_sensor.is_some());
        assert!(config.weapons.is_empty());
    }

    #[test]
    fn test_ship_config_validation() {
        let err = ShipConfig::from_json(r#"{ "mass": 1000.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "id"));

        let mut config = ShipConfig::new("alpha");
        config.mass = -1.0;
        assert!(config.validate().is_err(), "negative mass must be rejected");

        let config = ShipConfig::new("alpha")
            .with_weapon(WeaponConfig::default())
            .with_weapon(WeaponConfig::default());
        assert!(config.validate().is_err(), "duplicate weapon ids must be rejected");

        let mut weapon = WeaponConfig::default();
        weapon.subsystem = "deflector".to_string();
        let config = ShipConfig::new("alpha").with_weapon(weapon);
        assert!(config.validate().is_err(), "unknown weapon subsystem must be rejected");

        assert!(matches!(
            ShipConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_sim_config_validation() {
        assert!(SimConfig::default().validate().is_ok());
        let err = SimConfig::from_json(r#"{ "dt": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        let config = SimConfig::from_json(r#"{ "seed": 7 }"#).unwrap();
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = SimSnapshot {
            time: SimTime {
                tick: 3,
                elapsed_secs: 0.1,
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SimSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.time.tick, 3);
        assert!(back.ships.is_empty());
    }
}
