pub mod config;
pub mod env;
pub mod learner;
pub mod render;
pub mod runtime;
pub mod spaces;
pub mod tracking;
pub mod train;
