//! Procedurally generated dungeon the agent learns to explore.
//!
//! Each reset carves a new set of rooms and corridors. The agent sees an
//! egocentric window around itself with four channels: unknown, free,
//! occupied and the trail of cells it has stood on.

mod agent;
mod map;

pub use agent::{Action, Agent, Direction, NUM_ACTIONS};
pub use map::{Cell, Layout, Map, Room};

use crate::env::{Env, EnvError, Render, Seed, StepInfo};
use crate::spaces::{BoxSpace, Discrete};
use image::RgbImage;
use ndarray::Array3;
use rand::SeedableRng;
use rand::rngs::StdRng;

pub const CHANNEL_UNKNOWN: usize = 0;
pub const CHANNEL_FREE: usize = 1;
pub const CHANNEL_OCCUPIED: usize = 2;
pub const CHANNEL_TRAJECTORY: usize = 3;
pub const NUM_CHANNELS: usize = 4;

/// Base reward for every cell revealed by a step.
pub const EXPLORE_REWARD: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct DungeonConfig {
    pub width: usize,
    pub height: usize,
    pub max_rooms: usize,
    pub min_room_xy: usize,
    pub max_room_xy: usize,
    pub observation_size: usize,
    pub vision_radius: usize,
    pub max_steps: u32,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            max_rooms: 3,
            min_room_xy: 5,
            max_room_xy: 12,
            observation_size: 11,
            vision_radius: 5,
            max_steps: 400,
        }
    }
}

impl DungeonConfig {
    fn layout(&self) -> Layout {
        Layout {
            width: self.width,
            height: self.height,
            max_rooms: self.max_rooms,
            min_room_xy: self.min_room_xy,
            max_room_xy: self.max_room_xy,
        }
    }

    pub fn validate(&self) -> Result<(), EnvError> {
        self.layout().validate()?;
        if self.observation_size == 0 || self.observation_size % 2 == 0 {
            return Err(EnvError::Config(format!(
                "observation_size must be odd, got {}",
                self.observation_size
            )));
        }
        if self.max_steps == 0 {
            return Err(EnvError::Config("max_steps must be positive".into()));
        }
        Ok(())
    }
}

struct Episode {
    map: Map,
    agent: Agent,
    step: u32,
}

pub struct Dungeon {
    config: DungeonConfig,
    rng: StdRng,
    episode: Option<Episode>,
}

impl Dungeon {
    pub fn new(config: DungeonConfig) -> Result<Self, EnvError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::from_entropy(),
            episode: None,
        })
    }

    pub fn config(&self) -> &DungeonConfig {
        &self.config
    }

    pub fn map(&self) -> Option<&Map> {
        self.episode.as_ref().map(|ep| &ep.map)
    }

    pub fn agent(&self) -> Option<&Agent> {
        self.episode.as_ref().map(|ep| &ep.agent)
    }

    fn observe(&self, ep: &Episode) -> Array3<f32> {
        let size = self.config.observation_size;
        let half = (size / 2) as i64;
        let (fx, fy) = ep.agent.facing.delta();
        let (rx, ry) = ep.agent.facing.right().delta();
        let (ax, ay) = (ep.agent.x as i64, ep.agent.y as i64);

        let mut obs = Array3::<f32>::zeros((size, size, NUM_CHANNELS));
        for row in 0..size {
            for col in 0..size {
                // Rows run away from the agent, so the agent always faces up.
                let forward = half - row as i64;
                let right = col as i64 - half;
                let x = ax + forward * fx + right * rx;
                let y = ay + forward * fy + right * ry;

                if !ep.map.in_bounds(x, y) {
                    obs[[row, col, CHANNEL_OCCUPIED]] = 1.0;
                    continue;
                }
                let (x, y) = (x as usize, y as usize);
                let channel = match (ep.map.is_explored(x, y), ep.map.cell(x, y)) {
                    (false, _) => CHANNEL_UNKNOWN,
                    (true, Cell::Free) => CHANNEL_FREE,
                    (true, Cell::Occupied) => CHANNEL_OCCUPIED,
                };
                obs[[row, col, channel]] = 1.0;
                if ep.map.is_visited(x, y) {
                    obs[[row, col, CHANNEL_TRAJECTORY]] = 1.0;
                }
            }
        }
        obs
    }
}

impl Seed for Dungeon {
    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

impl Env for Dungeon {
    type Obs = Array3<f32>;
    type Act = usize;
    type Info = StepInfo;

    fn reset(&mut self) -> Result<Self::Obs, EnvError> {
        let mut map = Map::generate(&self.config.layout(), &mut self.rng)?;
        let (x, y) = map
            .rooms()
            .first()
            .map(Room::center)
            .ok_or_else(|| EnvError::Config("no room could be placed".into()))?;
        let agent = Agent::new(x, y, Direction::random(&mut self.rng));
        map.visit(x, y);
        map.reveal(x, y, self.config.vision_radius);

        let episode = Episode {
            map,
            agent,
            step: 0,
        };
        let obs = self.observe(&episode);
        self.episode = Some(episode);
        Ok(obs)
    }

    fn step(&mut self, act: Self::Act) -> Result<(Self::Obs, f32, bool, Self::Info), EnvError> {
        let action = Action::try_from(act)?;
        let radius = self.config.vision_radius;
        let max_steps = self.config.max_steps;
        let ep = self.episode.as_mut().ok_or(EnvError::NotReset)?;

        let before = ep.agent.position();
        match action {
            Action::Forward => {
                if let Some((x, y)) = ep.agent.ahead().filter(|&(x, y)| ep.map.is_free(x, y)) {
                    ep.agent.x = x;
                    ep.agent.y = y;
                }
            }
            Action::TurnLeft => ep.agent.facing = ep.agent.facing.left(),
            Action::TurnRight => ep.agent.facing = ep.agent.facing.right(),
        }
        let (x, y) = ep.agent.position();
        let moved = (x, y) != before;
        let is_new = ep.map.visit(x, y);
        let new_explored = ep.map.reveal(x, y, radius);
        ep.step += 1;

        let done = ep.step >= max_steps || ep.map.fully_explored();
        let info = StepInfo {
            is_new,
            moved,
            total_explored: ep.map.explored_cells() as f32,
            new_explored,
            total_cells: (ep.map.width() * ep.map.height()) as u32,
            step: ep.step,
        };
        let reward = EXPLORE_REWARD * new_explored as f32;

        let episode = self.episode.as_ref().ok_or(EnvError::NotReset)?;
        Ok((self.observe(episode), reward, done, info))
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.episode = None;
        Ok(())
    }

    fn observation_space(&self) -> BoxSpace {
        let size = self.config.observation_size;
        BoxSpace::unit(&[size, size, NUM_CHANNELS])
    }

    fn action_space(&self) -> Discrete {
        Discrete::new(NUM_ACTIONS)
    }
}

impl Render for Dungeon {
    fn render(&self) -> Result<RgbImage, EnvError> {
        let ep = self.episode.as_ref().ok_or(EnvError::NotReset)?;
        Ok(ep.map.render(Some(ep.agent.position())))
    }
}
