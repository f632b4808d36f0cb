use crate::env::errors::EnvError;
use crate::spaces::{BoxSpace, Discrete};
use image::RgbImage;

pub trait Env: Send {
    type Obs: Send + Clone + 'static;
    type Act: Send + Clone + 'static;
    type Info: Send + Clone + 'static;

    fn reset(&mut self) -> Result<Self::Obs, EnvError>;
    fn step(&mut self, act: Self::Act) -> Result<(Self::Obs, f32, bool, Self::Info), EnvError>;
    fn close(&mut self) -> Result<(), EnvError>;

    fn observation_space(&self) -> BoxSpace;
    fn action_space(&self) -> Discrete;
}

/// Environments whose randomness can be pinned for reproducible episodes.
///
/// The seed takes effect on the next `reset`.
pub trait Seed {
    fn seed(&mut self, seed: u64);
}

/// Explicit accessor for a picture of the current world state.
///
/// Wrappers forward this instead of reaching into the map and agent of the
/// environment they hold.
pub trait Render {
    fn render(&self) -> Result<RgbImage, EnvError>;
}
