//! Reward shaping for the dungeon explorer.
//!
//! `RewardShaping` wraps any environment that produces a trajectory channel
//! last in its observation and reports exploration flags in its info. It
//! hides the trajectory from the learner and rewrites the reward so that
//! coverage pays more as the episode goes on, while revisiting cells and
//! standing still cost a fixed amount.

use crate::env::dungeon::{Dungeon, DungeonConfig, NUM_ACTIONS};
use crate::env::{Env, EnvConfig, EnvError, Render, Seed, StepInfo};
use crate::spaces::{BoxSpace, Discrete};
use image::RgbImage;
use ndarray::{Array3, s};

pub const EXPLORATION_FACTOR: f32 = 0.02;
pub const REVISIT_PENALTY: f32 = 1.0;
pub const IDLE_PENALTY: f32 = 5.0;

pub const OBSERVATION_SIZE: usize = 11;
pub const VISION_RADIUS: usize = 5;
/// Observation shape of `ShapedDungeon`: the free, occupied and unknown
/// channels of the egocentric window.
pub const OBSERVATION_SHAPE: [usize; 3] = [OBSERVATION_SIZE, OBSERVATION_SIZE, 3];
pub const SEED: u64 = 42;

/// Scale by cumulative exploration, then subtract the penalties.
///
/// The order matters: penalties are never scaled.
pub fn shape_reward(reward: f32, info: &StepInfo) -> f32 {
    let mut shaped = reward * (1.0 + info.total_explored * EXPLORATION_FACTOR);
    if !info.is_new {
        shaped -= REVISIT_PENALTY;
    }
    if !info.moved {
        shaped -= IDLE_PENALTY;
    }
    shaped
}

/// Drops the last channel (the visited trajectory).
pub fn strip_trajectory(obs: &Array3<f32>) -> Array3<f32> {
    obs.slice(s![.., .., ..-1]).to_owned()
}

pub struct RewardShaping<E> {
    inner: E,
}

impl<E> RewardShaping<E>
where
    E: Env<Obs = Array3<f32>, Act = usize, Info = StepInfo>,
{
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E> Env for RewardShaping<E>
where
    E: Env<Obs = Array3<f32>, Act = usize, Info = StepInfo>,
{
    type Obs = Array3<f32>;
    type Act = usize;
    type Info = StepInfo;

    fn reset(&mut self) -> Result<Self::Obs, EnvError> {
        let obs = self.inner.reset()?;
        Ok(strip_trajectory(&obs))
    }

    fn step(&mut self, act: Self::Act) -> Result<(Self::Obs, f32, bool, Self::Info), EnvError> {
        let (obs, reward, done, info) = self.inner.step(act)?;
        Ok((strip_trajectory(&obs), shape_reward(reward, &info), done, info))
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.inner.close()
    }

    fn observation_space(&self) -> BoxSpace {
        let inner = self.inner.observation_space();
        let shape = inner.shape();
        let mut stripped = shape.to_vec();
        if let Some(channels) = stripped.last_mut() {
            *channels = channels.saturating_sub(1);
        }
        BoxSpace::uniform(&stripped, inner.low, inner.high)
    }

    fn action_space(&self) -> Discrete {
        self.inner.action_space()
    }
}

impl<E: Seed> Seed for RewardShaping<E> {
    fn seed(&mut self, seed: u64) {
        self.inner.seed(seed);
    }
}

impl<E: Render> Render for RewardShaping<E> {
    fn render(&self) -> Result<RgbImage, EnvError> {
        self.inner.render()
    }
}

/// The dungeon as the learner sees it: 11x11x3 observations, three actions,
/// shaped rewards and a fixed seed.
pub type ShapedDungeon = RewardShaping<Dungeon>;

impl RewardShaping<Dungeon> {
    pub fn dungeon(
        width: usize,
        height: usize,
        max_rooms: usize,
        min_room_xy: usize,
        max_room_xy: usize,
        max_steps: u32,
    ) -> Result<Self, EnvError> {
        let mut base = Dungeon::new(DungeonConfig {
            width,
            height,
            max_rooms,
            min_room_xy,
            max_room_xy,
            observation_size: OBSERVATION_SIZE,
            vision_radius: VISION_RADIUS,
            max_steps,
        })?;
        base.seed(SEED);
        let shaped = Self::new(base);
        if shaped.observation_space() != BoxSpace::unit(&OBSERVATION_SHAPE)
            || shaped.action_space() != Discrete::new(NUM_ACTIONS)
        {
            return Err(EnvError::Config(format!(
                "shaped dungeon must observe {OBSERVATION_SHAPE:?} and act in Discrete({NUM_ACTIONS})"
            )));
        }
        Ok(shaped)
    }

    pub fn from_config(config: &EnvConfig) -> Result<Self, EnvError> {
        Self::dungeon(
            config.width,
            config.height,
            config.max_rooms,
            config.min_room_xy,
            config.max_room_xy,
            config.max_steps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn info(total_explored: f32, is_new: bool, moved: bool) -> StepInfo {
        StepInfo {
            is_new,
            moved,
            total_explored,
            ..StepInfo::default()
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    /// Scripted base environment that replays fixed rewards and flags.
    struct Scripted {
        channels: usize,
        script: Vec<(f32, StepInfo)>,
        cursor: usize,
    }

    impl Scripted {
        fn new(channels: usize, script: Vec<(f32, StepInfo)>) -> Self {
            Self {
                channels,
                script,
                cursor: 0,
            }
        }

        fn obs(&self) -> Array3<f32> {
            Array3::from_shape_fn((5, 5, self.channels), |(r, c, ch)| {
                ((r * 31 + c * 7 + ch) % 2) as f32
            })
        }
    }

    impl Env for Scripted {
        type Obs = Array3<f32>;
        type Act = usize;
        type Info = StepInfo;

        fn reset(&mut self) -> Result<Self::Obs, EnvError> {
            self.cursor = 0;
            Ok(self.obs())
        }

        fn step(&mut self, _act: usize) -> Result<(Self::Obs, f32, bool, StepInfo), EnvError> {
            let (reward, info) = self.script[self.cursor];
            self.cursor += 1;
            Ok((self.obs(), reward, self.cursor == self.script.len(), info))
        }

        fn close(&mut self) -> Result<(), EnvError> {
            Ok(())
        }

        fn observation_space(&self) -> BoxSpace {
            BoxSpace::unit(&[5, 5, self.channels])
        }

        fn action_space(&self) -> Discrete {
            Discrete::new(3)
        }
    }

    #[test]
    fn revisit_penalty_after_scaling() {
        let shaped = shape_reward(1.0, &info(10.0, false, true));
        assert!(close(shaped, 0.2), "got {shaped}");
    }

    #[test]
    fn idle_penalty_without_exploration_bonus() {
        let shaped = shape_reward(2.0, &info(0.0, true, false));
        assert!(close(shaped, -3.0), "got {shaped}");
    }

    #[test]
    fn shaping_formula_over_flag_grid() {
        for &r in &[-1.5f32, 0.0, 0.3, 2.0] {
            for &total in &[0.0f32, 1.0, 25.0, 180.0] {
                for is_new in [true, false] {
                    for moved in [true, false] {
                        let expected = r * (1.0 + 0.02 * total)
                            - if is_new { 0.0 } else { 1.0 }
                            - if moved { 0.0 } else { 5.0 };
                        let shaped = shape_reward(r, &info(total, is_new, moved));
                        assert!(close(shaped, expected), "r={r} total={total}");
                    }
                }
            }
        }
    }

    #[test]
    fn penalties_are_not_scaled() {
        // Subtracting before scaling would give (0 - 6) * 3 = -18.
        let shaped = shape_reward(0.0, &info(100.0, false, false));
        assert!(close(shaped, -6.0));
    }

    #[test]
    fn strips_last_channel_only() {
        let base = Array3::from_shape_fn((11, 11, 4), |(r, c, ch)| (r + c * 11 + ch * 121) as f32);
        let stripped = strip_trajectory(&base);
        assert_eq!(stripped.shape(), &[11, 11, 3]);
        assert_eq!(stripped, base.slice(s![.., .., ..3]));
    }

    #[test]
    fn wrapper_passes_done_and_info_through() {
        let script = vec![
            (1.0, info(10.0, false, true)),
            (2.0, info(0.0, true, false)),
        ];
        let mut env = RewardShaping::new(Scripted::new(4, script.clone()));
        let obs = env.reset().unwrap();
        assert_eq!(obs.shape(), &[5, 5, 3]);

        let (obs, reward, done, got) = env.step(0).unwrap();
        assert_eq!(obs.shape(), &[5, 5, 3]);
        assert!(close(reward, 0.2));
        assert!(!done);
        assert_eq!(got, script[0].1);

        let (_, reward, done, got) = env.step(0).unwrap();
        assert!(close(reward, -3.0));
        assert!(done);
        assert_eq!(got, script[1].1);
    }

    #[test]
    fn drops_trajectory_for_any_channel_count() {
        let mut env = RewardShaping::new(Scripted::new(6, vec![]));
        let base = env.inner().obs();
        let obs = env.reset().unwrap();
        assert_eq!(obs.shape(), &[5, 5, 5]);
        assert_eq!(obs, base.slice(s![.., .., ..5]));
        assert_eq!(env.observation_space().shape(), &[5, 5, 5]);
    }

    #[test]
    fn shaped_dungeon_spaces() {
        let mut env = ShapedDungeon::from_config(&EnvConfig::default()).unwrap();
        assert_eq!(env.action_space(), Discrete::new(3));
        assert_eq!(OBSERVATION_SHAPE, [11, 11, 3]);
        assert_eq!(env.observation_space(), BoxSpace::unit(&OBSERVATION_SHAPE));

        let obs = env.reset().unwrap();
        assert_eq!(obs.shape(), &[11, 11, 3]);
        assert!(env.observation_space().contains(&obs));
        for action in [0, 1, 2, 0] {
            let (obs, _, _, _) = env.step(action).unwrap();
            assert_eq!(obs.shape(), &[11, 11, 3]);
        }
        assert_eq!(env.render().unwrap().dimensions(), (20, 20));
    }

    #[test]
    fn shaped_dungeon_is_seeded() {
        let mut a = ShapedDungeon::dungeon(20, 20, 3, 5, 10, 400).unwrap();
        let mut b = ShapedDungeon::dungeon(20, 20, 3, 5, 10, 400).unwrap();
        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
        assert_eq!(a.step(0).unwrap().1, b.step(0).unwrap().1);
    }

    #[test]
    fn shaped_reward_matches_base_reward() {
        let mut base = ShapedDungeon::dungeon(20, 20, 3, 5, 10, 400)
            .unwrap()
            .into_inner();
        let mut shaped = ShapedDungeon::dungeon(20, 20, 3, 5, 10, 400).unwrap();
        base.reset().unwrap();
        shaped.reset().unwrap();
        for action in [0, 0, 2, 0, 1, 0] {
            let (_, raw, _, info) = base.step(action).unwrap();
            let (_, reward, _, _) = shaped.step(action).unwrap();
            assert!(close(reward, shape_reward(raw, &info)));
        }
    }
}
