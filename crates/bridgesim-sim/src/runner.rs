//! Simulation thread. Runs a `Simulator` at its tick rate and publishes
//! snapshots.
//!
//! The simulator is moved into the thread, so the tick loop is the only
//! code that mutates it. Commands arrive over an `mpsc` channel and are
//! queued for the next tick boundary. The latest snapshot is stored in
//! shared state for synchronous polling.

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use bridgesim_core::commands::{CommandOutcome, ShipCommand};
use bridgesim_core::config::ShipConfig;
use bridgesim_core::error::CommandError;
use bridgesim_core::state::SimSnapshot;
use bridgesim_core::types::ShipId;

use crate::engine::{CommandReply, Simulator};

/// Messages accepted by the simulation thread.
#[derive(Debug)]
pub enum LoopCommand {
    /// A crew command, applied at the next tick boundary. The result is
    /// sent on the reply channel when one is given.
    Ship(ShipId, ShipCommand, Option<CommandReply>),
    /// Add a ship at the next tick boundary.
    Spawn(Box<ShipConfig>),
    /// Stop the thread gracefully.
    Shutdown,
}

/// Handle to a running simulation thread.
pub struct SimLoop {
    command_tx: mpsc::Sender<LoopCommand>,
    latest_snapshot: Arc<Mutex<Option<SimSnapshot>>>,
    handle: Option<JoinHandle<()>>,
}

impl SimLoop {
    /// Move `simulator` onto a new thread and start ticking in real time.
    pub fn spawn(simulator: Simulator) -> io::Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<LoopCommand>();
        let latest_snapshot = Arc::new(Mutex::new(None));
        let shared = Arc::clone(&latest_snapshot);

        let handle = std::thread::Builder::new()
            .name("bridgesim-loop".into())
            .spawn(move || run_loop(simulator, command_rx, &shared))?;

        Ok(Self {
            command_tx,
            latest_snapshot,
            handle: Some(handle),
        })
    }

    /// Sender for other threads (network sessions, consoles) to use.
    pub fn sender(&self) -> mpsc::Sender<LoopCommand> {
        self.command_tx.clone()
    }

    /// Queue a crew command without waiting for its result. Returns false
    /// if the thread has stopped.
    pub fn send(&self, ship_id: ShipId, command: ShipCommand) -> bool {
        self.command_tx
            .send(LoopCommand::Ship(ship_id, command, None))
            .is_ok()
    }

    /// Queue a crew command. The receiver yields its result once the next
    /// tick applies it. Returns `None` if the thread has stopped.
    pub fn submit(
        &self,
        ship_id: ShipId,
        command: ShipCommand,
    ) -> Option<mpsc::Receiver<Result<CommandOutcome, CommandError>>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.command_tx
            .send(LoopCommand::Ship(ship_id, command, Some(reply_tx)))
            .ok()?;
        Some(reply_rx)
    }

    /// Most recent snapshot, if a tick has completed.
    pub fn latest(&self) -> Option<SimSnapshot> {
        self.latest_snapshot
            .lock()
            .ok()
            .and_then(|snapshot| snapshot.clone())
    }

    /// Stop the thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.command_tx.send(LoopCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SimLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drain pending messages into the simulator. Returns false on shutdown.
pub fn drain_commands(simulator: &mut Simulator, command_rx: &mpsc::Receiver<LoopCommand>) -> bool {
    loop {
        match command_rx.try_recv() {
            Ok(LoopCommand::Ship(ship_id, command, reply)) => match reply {
                Some(reply) => simulator.queue_command_with_reply(ship_id, command, reply),
                None => simulator.queue_command(ship_id, command),
            },
            Ok(LoopCommand::Spawn(config)) => {
                if let Err(error) = simulator.spawn_ship(*config) {
                    warn!(%error, "spawn rejected");
                }
            }
            Ok(LoopCommand::Shutdown) => return false,
            Err(mpsc::TryRecvError::Empty) => return true,
            Err(mpsc::TryRecvError::Disconnected) => return false,
        }
    }
}

/// The tick loop. Runs until Shutdown or channel disconnect.
fn run_loop(
    mut simulator: Simulator,
    command_rx: mpsc::Receiver<LoopCommand>,
    latest_snapshot: &Mutex<Option<SimSnapshot>>,
) {
    let tick_duration = Duration::from_secs_f64(simulator.dt());
    let mut next_tick_time = Instant::now();
    info!(dt = simulator.dt(), "simulation loop started");

    while drain_commands(&mut simulator, &command_rx) {
        let snapshot = simulator.tick();
        if let Ok(mut lock) = latest_snapshot.lock() {
            *lock = Some(snapshot);
        }

        next_tick_time += tick_duration;
        let now = Instant::now();
        if next_tick_time > now {
            std::thread::sleep(next_tick_time - now);
        } else if now - next_tick_time > tick_duration * 2 {
            // Too far behind, reset to avoid catch-up spiral
            next_tick_time = now;
        }
    }
    info!(tick = simulator.time().tick, "simulation loop stopped");
}
