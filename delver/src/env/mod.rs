pub mod dungeon;
mod errors;
pub mod registry;
pub mod shaping;
mod traits;
mod types;
mod vec_env;

pub use errors::EnvError;
pub use registry::{EnvFactory, EnvRegistry};
pub use shaping::{RewardShaping, ShapedDungeon};
pub use traits::{Env, Render, Seed};
pub use types::{EnvConfig, Step, StepInfo, TrajectoryShard};
pub use vec_env::VecEnv;
