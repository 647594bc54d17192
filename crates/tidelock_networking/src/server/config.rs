//! # Server Configuration
//!
//! TOML-deserialized settings plus static map geometry, both loaded
//! once at startup.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tidelock_core::{Aabb, Vec2};

/// Configuration/map load failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Offending path.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

/// Server settings. Every field has a default so a partial TOML file
/// works.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// UDP bind address.
    pub bind_address: String,
    /// UDP port.
    pub port: u16,
    /// Simulation rate in Hz.
    pub tick_rate: u32,
    /// Snapshot broadcast rate in Hz; normally below `tick_rate`.
    pub snapshot_rate: u32,
    /// Session capacity.
    pub max_players: usize,
    /// Heartbeat age in seconds after which a session is dropped.
    pub connection_timeout_secs: f32,
    /// World boundary minimum corner `[x, y]`.
    pub world_min: [f32; 2],
    /// World boundary maximum corner `[x, y]`.
    pub world_max: [f32; 2],
    /// Half-extents of a player collider `[x, y]`.
    pub player_half_extents: [f32; 2],
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 7777,
            tick_rate: crate::DEFAULT_TICK_RATE,
            snapshot_rate: crate::DEFAULT_SNAPSHOT_RATE,
            max_players: 32,
            connection_timeout_secs: 5.0,
            world_min: [-75.0, -75.0],
            world_max: [75.0, 75.0],
            player_half_extents: [0.5, 0.5],
        }
    }
}

impl ServerConfig {
    /// Loads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// World bounds as an AABB.
    #[must_use]
    pub fn world_bounds(&self) -> Aabb {
        Aabb::new(
            Vec2::new(self.world_min[0], self.world_min[1]),
            Vec2::new(self.world_max[0], self.world_max[1]),
        )
    }

    /// Player half-extents as a vector.
    #[must_use]
    pub const fn player_half(&self) -> Vec2 {
        Vec2::new(self.player_half_extents[0], self.player_half_extents[1])
    }
}

/// One static collider in the map file.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct MapCollider {
    /// Center `[x, y]`.
    pub center: [f32; 2],
    /// Half-extents `[x, y]`.
    pub half_extents: [f32; 2],
    /// Overlap volume instead of a blocking wall.
    #[serde(default)]
    pub trigger: bool,
}

impl MapCollider {
    /// The collider's AABB.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(
            Vec2::new(self.center[0], self.center[1]),
            Vec2::new(self.half_extents[0], self.half_extents[1]),
        )
    }
}

/// Static world geometry: colliders and spawn points, consumed once at
/// startup to seed the world and the spawn rotation.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MapData {
    /// Static colliders.
    pub colliders: Vec<MapCollider>,
    /// Spawn coordinates handed out round-robin.
    pub spawn_points: Vec<[f32; 2]>,
}

impl MapData {
    /// Loads map geometry from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Spawn points as vectors.
    pub fn spawn_positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.spawn_points.iter().map(|p| Vec2::new(p[0], p[1]))
    }
}
