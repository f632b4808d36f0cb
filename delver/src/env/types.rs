use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step<O, A> {
    pub obs: O,
    pub act: A,
    pub rew: f32,
    pub done: bool,
    pub info: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryShard<O, A> {
    pub id: String,
    pub steps: Vec<Step<O, A>>,
    pub version: u64,
    pub rollout_probs: Option<Vec<f32>>, // log-probs of the taken actions
    /// Observation after the last step, used to bootstrap the value of an
    /// unfinished fragment.
    pub last_obs: O,
}

impl<O, A> TrajectoryShard<O, A> {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Per-step information reported by the dungeon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// The agent's cell had not been stood on before this step.
    pub is_new: bool,
    /// The agent's position changed.
    pub moved: bool,
    /// Explored cells so far this episode.
    pub total_explored: f32,
    /// Cells revealed by this step.
    pub new_explored: u32,
    pub total_cells: u32,
    pub step: u32,
}

/// Construction parameters of the shaped dungeon, as passed by name through
/// the environment registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub width: usize,
    pub height: usize,
    pub max_rooms: usize,
    pub min_room_xy: usize,
    pub max_room_xy: usize,
    pub max_steps: u32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            max_rooms: 3,
            min_room_xy: 5,
            max_room_xy: 12,
            max_steps: 400,
        }
    }
}
