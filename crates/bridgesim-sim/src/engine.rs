//! Simulation engine, the core of the bridge simulator.
//!
//! `Simulator` owns the hecs ECS world, the seeded RNG and the event bus,
//! routes crew commands to ship systems, runs every system once per tick and
//! produces `SimSnapshot`s. Completely headless, enabling deterministic
//! testing.

use std::collections::{BTreeMap, VecDeque};
use std::sync::mpsc::{Receiver, Sender};

use glam::DVec3;
use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use bridgesim_autopilot::{AutopilotProgram, NavigationController};
use bridgesim_core::commands::{AutopilotRequest, CommandOutcome, ShipCommand, TargetRef};
use bridgesim_core::components::ShipState;
use bridgesim_core::config::{AutopilotGains, ShipConfig, SimConfig};
use bridgesim_core::error::{CommandError, ConfigError};
use bridgesim_core::events::{EventBus, EventKind, SimEvent};
use bridgesim_core::math::{attitude_to_quat, normalize_attitude, quat_to_attitude};
use bridgesim_core::state::{ShipView, SimSnapshot};
use bridgesim_core::types::{Attitude, AxisRates, Kinematics, ShipId, SimTime};

use crate::systems;
use crate::systems::sensors::tracker::ContactTracker;
use crate::world_setup;

/// Channel on which a queued command reports its result.
pub type CommandReply = Sender<Result<CommandOutcome, CommandError>>;

/// A command waiting for the next tick boundary.
#[derive(Debug)]
struct QueuedCommand {
    ship_id: ShipId,
    command: ShipCommand,
    reply: Option<CommandReply>,
}

/// The simulation engine. Owns the ECS world and all sim state.
pub struct Simulator {
    world: World,
    /// Ship id → entity, ordered so every per-ship pass is deterministic.
    index: BTreeMap<ShipId, Entity>,
    time: SimTime,
    dt: f64,
    rng: ChaCha8Rng,
    events: EventBus,
    command_queue: VecDeque<QueuedCommand>,
}

impl Simulator {
    /// Create a new simulator with the given config.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            world: World::new(),
            index: BTreeMap::new(),
            time: SimTime::default(),
            dt: config.dt,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            events: EventBus::new(),
            command_queue: VecDeque::new(),
        })
    }

    /// Validate `config` and add the ship to the world.
    pub fn spawn_ship(&mut self, config: ShipConfig) -> Result<(), CommandError> {
        config
            .validate()
            .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
        if self.index.contains_key(&config.id) {
            return Err(CommandError::DuplicateShip(config.id));
        }
        let entity = world_setup::spawn_ship(&mut self.world, &config);
        self.index.insert(config.id, entity);
        Ok(())
    }

    /// Subscribe to published events. An empty `kinds` receives everything.
    pub fn subscribe(&mut self, kinds: &[EventKind]) -> Receiver<SimEvent> {
        self.events.subscribe(kinds)
    }

    /// Queue a command for processing at the next tick boundary.
    pub fn queue_command(&mut self, ship_id: ShipId, command: ShipCommand) {
        self.command_queue.push_back(QueuedCommand {
            ship_id,
            command,
            reply: None,
        });
    }

    /// Queue a command and report its result on `reply` once it is applied.
    pub fn queue_command_with_reply(
        &mut self,
        ship_id: ShipId,
        command: ShipCommand,
        reply: CommandReply,
    ) {
        self.command_queue.push_back(QueuedCommand {
            ship_id,
            command,
            reply: Some(reply),
        });
    }

    /// Apply a command immediately.
    pub fn command(
        &mut self,
        ship_id: &ShipId,
        command: ShipCommand,
    ) -> Result<CommandOutcome, CommandError> {
        let result = self.apply_command(ship_id, command);
        match &result {
            Ok(outcome) => debug!(ship = %ship_id, ?outcome, "command applied"),
            Err(error) => warn!(ship = %ship_id, %error, "command rejected"),
        }
        result
    }

    /// Advance the simulation by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> SimSnapshot {
        self.process_commands();
        self.run_systems();
        self.time.advance(self.dt);

        let events = self.events.drain();
        systems::snapshot::build_snapshot(&self.world, &self.index, &self.time, events)
    }

    /// Current view of one ship.
    pub fn ship_state(&self, ship_id: &ShipId) -> Option<ShipView> {
        let entity = *self.index.get(ship_id)?;
        systems::snapshot::build_ship(&self.world, entity, self.time.elapsed_secs)
    }

    /// Ids of every ship, in tick order.
    pub fn ship_ids(&self) -> impl Iterator<Item = &ShipId> {
        self.index.keys()
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Entity for a ship id.
    pub fn entity(&self, ship_id: &ShipId) -> Option<Entity> {
        self.index.get(ship_id).copied()
    }

    /// Process all queued commands. Results go back to whoever asked for
    /// one; the rest are only logged.
    fn process_commands(&mut self) {
        while let Some(queued) = self.command_queue.pop_front() {
            let result = self.command(&queued.ship_id, queued.command);
            if let Some(reply) = queued.reply {
                // The requester may have hung up.
                let _ = reply.send(result);
            }
        }
    }

    /// Run all systems in order.
    fn run_systems(&mut self) {
        let dt = self.dt;
        let now = self.time.elapsed_secs;
        // 1. Autopilot programs write thrust and heading
        systems::navigation::run(&mut self.world, &self.index, dt, now, &mut self.events);
        // 2. Heat dissipation and status transitions
        systems::damage::run(&mut self.world, dt, &mut self.events);
        // 3. Reactor regeneration
        systems::power::run(&mut self.world, dt);
        // 4. Rigid-body integration
        systems::physics::run(&mut self.world, dt, &mut self.events);
        // 5. Turret slew and firing solutions
        systems::weapons::run(&mut self.world, &self.index, dt, now);
        // 6. Pairwise passive scans and contact pruning
        systems::sensors::run(
            &mut self.world,
            &mut self.rng,
            self.time.tick,
            now,
            &mut self.events,
        );
    }

    fn apply_command(
        &mut self,
        ship_id: &ShipId,
        command: ShipCommand,
    ) -> Result<CommandOutcome, CommandError> {
        let entity = self
            .entity(ship_id)
            .ok_or_else(|| CommandError::UnknownShip(ship_id.clone()))?;
        let now = self.time.elapsed_secs;
        let manual = command.is_manual_helm();

        let outcome = match command {
            ShipCommand::SetThrust { thrust } => {
                require_finite("thrust", &[thrust.x, thrust.y, thrust.z])?;
                self.with_ship(entity, ship_id, |ship| ship.thrust = thrust)?
            }
            ShipCommand::SetOrientation { pitch, yaw, roll } => {
                require_finite("orientation", &[pitch, yaw, roll])?;
                self.with_ship(entity, ship_id, |ship| {
                    let attitude = normalize_attitude(Attitude::new(pitch, yaw, roll));
                    ship.rotation = attitude_to_quat(&attitude);
                    ship.orientation = normalize_attitude(quat_to_attitude(ship.rotation));
                    ship.angular_velocity = AxisRates::default();
                    ship.angular_acceleration = AxisRates::default();
                })?
            }
            ShipCommand::Rotate { pitch, yaw, roll } => {
                require_finite("angular velocity", &[pitch, yaw, roll])?;
                self.with_ship(entity, ship_id, |ship| {
                    ship.angular_velocity = AxisRates::new(pitch, yaw, roll);
                })?
            }
            ShipCommand::ApplyTorque { pitch, yaw, roll } => {
                require_finite("torque", &[pitch, yaw, roll])?;
                self.with_ship(entity, ship_id, |ship| {
                    // N·m / kg·m² is rad/s²; the ship stores deg/s².
                    let per_inertia = |torque: f64| (torque / ship.moment_of_inertia).to_degrees();
                    ship.angular_acceleration =
                        AxisRates::new(per_inertia(pitch), per_inertia(yaw), per_inertia(roll));
                })?
            }
            ShipCommand::EngageAutopilot { request } => {
                self.engage_autopilot(entity, ship_id, &request)?
            }
            ShipCommand::DisengageAutopilot => self.disengage_autopilot(entity, ship_id)?,
            ShipCommand::PingSensors => systems::sensors::active::ping(
                &mut self.world,
                &mut self.rng,
                entity,
                ship_id,
                now,
                &mut self.events,
            )?,
            ShipCommand::SetWeaponTarget { weapon, target } => systems::weapons::set_target(
                &mut self.world,
                &self.index,
                entity,
                ship_id,
                &weapon,
                target,
            )?,
            ShipCommand::FireWeapon { weapon, target } => systems::weapons::fire(
                &mut self.world,
                &mut self.rng,
                &self.index,
                entity,
                ship_id,
                &weapon,
                target,
                now,
                &mut self.events,
            )?,
        };

        if manual {
            if let Ok(mut nav) = self.world.get::<&mut NavigationController>(entity) {
                nav.manual_input(now);
            }
        }
        Ok(outcome)
    }

    fn with_ship(
        &mut self,
        entity: Entity,
        ship_id: &ShipId,
        f: impl FnOnce(&mut ShipState),
    ) -> Result<CommandOutcome, CommandError> {
        let mut ship = self
            .world
            .get::<&mut ShipState>(entity)
            .map_err(|_| CommandError::UnknownShip(ship_id.clone()))?;
        f(&mut ship);
        Ok(CommandOutcome::Applied)
    }

    /// Check that whatever the request follows exists right now.
    fn check_autopilot_target(
        &self,
        entity: Entity,
        request: &AutopilotRequest,
    ) -> Result<(), CommandError> {
        let target = match request {
            AutopilotRequest::Intercept { target } | AutopilotRequest::MatchVelocity { target } => {
                target.clone()
            }
            AutopilotRequest::Formation { flagship, .. } => TargetRef::Ship(flagship.clone()),
            _ => return Ok(()),
        };
        let found = match &target {
            TargetRef::Ship(id) => self.index.get(id).is_some_and(|&e| e != entity),
            TargetRef::Contact(contact) => self
                .world
                .get::<&ContactTracker>(entity)
                .is_ok_and(|tracker| tracker.contact(contact).is_some()),
        };
        if found {
            Ok(())
        } else {
            Err(CommandError::TargetNotFound(target.label().to_string()))
        }
    }

    fn engage_autopilot(
        &mut self,
        entity: Entity,
        ship_id: &ShipId,
        request: &AutopilotRequest,
    ) -> Result<CommandOutcome, CommandError> {
        self.check_autopilot_target(entity, request)?;
        let own = {
            let ship = self
                .world
                .get::<&ShipState>(entity)
                .map_err(|_| CommandError::UnknownShip(ship_id.clone()))?;
            Kinematics::new(ship.position, ship.velocity)
        };
        let gains = self
            .world
            .get::<&AutopilotGains>(entity)
            .map(|g| (*g).clone())
            .unwrap_or_default();
        let program = AutopilotProgram::from_request(request, &gains, &own)
            .map_err(|e| CommandError::Autopilot(e.to_string()))?;
        let kind = program.kind();

        let mut nav = self
            .world
            .get::<&mut NavigationController>(entity)
            .map_err(|_| CommandError::SystemUnavailable {
                ship: ship_id.clone(),
                system: "navigation",
            })?;
        nav.engage(program);
        self.events.publish(SimEvent::AutopilotEngaged {
            ship_id: ship_id.clone(),
            program: kind,
        });
        Ok(CommandOutcome::Applied)
    }

    fn disengage_autopilot(
        &mut self,
        entity: Entity,
        ship_id: &ShipId,
    ) -> Result<CommandOutcome, CommandError> {
        let previous = self
            .world
            .get::<&mut NavigationController>(entity)
            .map_err(|_| CommandError::SystemUnavailable {
                ship: ship_id.clone(),
                system: "navigation",
            })?
            .disengage();
        if previous.is_some() {
            if let Ok(mut ship) = self.world.get::<&mut ShipState>(entity) {
                ship.thrust = DVec3::ZERO;
            }
            self.events.publish(SimEvent::AutopilotDisengaged {
                ship_id: ship_id.clone(),
                reason: "disengaged by crew".to_string(),
            });
        }
        Ok(CommandOutcome::Applied)
    }
}

fn require_finite(what: &str, values: &[f64]) -> Result<(), CommandError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(CommandError::InvalidArgument(format!("{what} must be finite")))
    }
}
