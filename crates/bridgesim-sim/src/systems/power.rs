//! Reactor power storage. Active pings and weapon fire draw from it.

use hecs::World;

use bridgesim_core::config::PowerConfig;
use bridgesim_core::constants::REACTOR;
use bridgesim_core::state::PowerView;

use crate::systems::damage::DamageModel;

#[derive(Debug, Clone)]
pub struct PowerGrid {
    pub capacity: f64,
    pub stored: f64,
    pub regen_per_sec: f64,
}

impl PowerGrid {
    pub fn from_config(config: &PowerConfig) -> Self {
        Self {
            capacity: config.capacity,
            stored: config.initial.unwrap_or(config.capacity),
            regen_per_sec: config.regen_per_sec,
        }
    }

    pub fn regenerate(&mut self, dt: f64, reactor_factor: f64) {
        self.stored = (self.stored + self.regen_per_sec * reactor_factor * dt).min(self.capacity);
    }

    pub fn can_draw(&self, amount: f64) -> bool {
        self.stored >= amount
    }

    /// Draw `amount` if it is all available. Partial draws never happen.
    pub fn try_draw(&mut self, amount: f64) -> bool {
        if !self.can_draw(amount) {
            return false;
        }
        self.stored -= amount;
        true
    }

    pub fn view(&self) -> PowerView {
        PowerView {
            capacity: self.capacity,
            stored: self.stored,
            regen_per_sec: self.regen_per_sec,
        }
    }
}

pub fn run(world: &mut World, dt: f64) {
    for (_entity, (grid, damage)) in world.query_mut::<(&mut PowerGrid, Option<&DamageModel>)>() {
        let factor = damage.map_or(1.0, |d| d.factor(REACTOR));
        grid.regenerate(dt, factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_is_all_or_nothing() {
        let mut grid = PowerGrid::from_config(&PowerConfig {
            capacity: 300.0,
            regen_per_sec: 50.0,
            initial: Some(250.0),
        });
        assert!(grid.try_draw(200.0));
        assert_eq!(grid.stored, 50.0);
        assert!(!grid.try_draw(200.0));
        assert_eq!(grid.stored, 50.0);
    }

    #[test]
    fn test_regen_scales_with_reactor_and_caps() {
        let mut grid = PowerGrid::from_config(&PowerConfig {
            capacity: 100.0,
            regen_per_sec: 50.0,
            initial: Some(0.0),
        });
        grid.regenerate(1.0, 0.5);
        assert_eq!(grid.stored, 25.0);
        grid.regenerate(10.0, 1.0);
        assert_eq!(grid.stored, 100.0);
    }
}
