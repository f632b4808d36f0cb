pub mod actor_critic;
mod errors;
mod policy;
mod stats;
mod traits;
mod worker;

pub use actor_critic::{ActorCriticTrainer, TrainerConfig};
pub use errors::LearnerError;
pub use policy::LinearPolicy;
pub use stats::{EpisodeSummary, EpisodeWindow};
pub use traits::{TrainResult, Trainer};
pub use worker::{Episode, Rollout, RolloutWorker, Shard};
