// Simulation configuration.
//
// Loaded once at startup from a RON file; every field has a default so a
// partial file only overrides what it names. Values here are fixed for the
// lifetime of a world: changing them mid-run changes steering behaviour.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::error::{NavError, Result};
use super::steering::SteeringParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed simulation ticks per second.
    pub tick_rate: f32,
    /// World units per navigation tile.
    pub tile_size: f32,

    // Steering
    pub ksi: f32,
    /// Upper bound `ksi` is clamped to before use.
    pub max_ksi: f32,
    pub agent_radius: f32,
    pub agent_speed: f32,
    pub agent_health: f32,
    pub neighbor_cutoff: f32,
    pub separation_distance: f32,
    pub avoidance_horizon: f32,
    pub obstacle_horizon: f32,
    pub jitter_scale: f32,
    pub max_overlap_force: f32,
    pub max_avoidance_force: f32,
    pub max_obstacle_force: f32,
    pub max_acceleration: f32,

    /// Seed for the jitter stream. `None` draws from OS entropy, so runs are
    /// not reproducible.
    pub rng_seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let steering = SteeringParams::default();
        Self {
            tick_rate: 30.0,
            tile_size: 1.0,
            ksi: steering.ksi,
            max_ksi: 10.0,
            agent_radius: 0.3,
            agent_speed: 2.0,
            agent_health: 1.0,
            neighbor_cutoff: steering.neighbor_cutoff,
            separation_distance: steering.separation_distance,
            avoidance_horizon: steering.avoidance_horizon,
            obstacle_horizon: steering.obstacle_horizon,
            jitter_scale: steering.jitter_scale,
            max_overlap_force: steering.max_overlap_force,
            max_avoidance_force: steering.max_avoidance_force,
            max_obstacle_force: steering.max_obstacle_force,
            max_acceleration: steering.max_acceleration,
            rng_seed: None,
        }
    }
}

impl SimConfig {
    /// Read and validate a RON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| NavError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&contents)?;
        info!("Loaded sim config from {}", path.display());
        Ok(config)
    }

    pub fn from_ron(contents: &str) -> Result<Self> {
        let config: Self = ron::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Seconds per tick.
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Rejects values that would make grid maths or integration undefined.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tick_rate", self.tick_rate),
            ("tile_size", self.tile_size),
            ("ksi", self.ksi),
            ("max_ksi", self.max_ksi),
            ("agent_radius", self.agent_radius),
            ("neighbor_cutoff", self.neighbor_cutoff),
            ("avoidance_horizon", self.avoidance_horizon),
            ("obstacle_horizon", self.obstacle_horizon),
            ("max_acceleration", self.max_acceleration),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(NavError::InvalidConfig(format!("{name} must be > 0, got {value}")));
            }
        }

        let non_negative = [
            ("agent_speed", self.agent_speed),
            ("separation_distance", self.separation_distance),
            ("jitter_scale", self.jitter_scale),
            ("max_overlap_force", self.max_overlap_force),
            ("max_avoidance_force", self.max_avoidance_force),
            ("max_obstacle_force", self.max_obstacle_force),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(NavError::InvalidConfig(format!("{name} must be >= 0, got {value}")));
            }
        }
        Ok(())
    }

    /// Steering tunables, with `ksi` clamped to `max_ksi`.
    pub fn steering_params(&self) -> SteeringParams {
        let ksi = if self.ksi > self.max_ksi {
            warn!("ksi {} exceeds max_ksi {}, clamping", self.ksi, self.max_ksi);
            self.max_ksi
        } else {
            self.ksi
        };
        SteeringParams {
            ksi,
            neighbor_cutoff: self.neighbor_cutoff,
            separation_distance: self.separation_distance,
            avoidance_horizon: self.avoidance_horizon,
            obstacle_horizon: self.obstacle_horizon,
            jitter_scale: self.jitter_scale,
            max_overlap_force: self.max_overlap_force,
            max_avoidance_force: self.max_avoidance_force,
            max_obstacle_force: self.max_obstacle_force,
            max_acceleration: self.max_acceleration,
        }
    }
}
