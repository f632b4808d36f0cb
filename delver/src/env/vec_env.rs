use super::{Env, EnvError};
use crate::spaces::{BoxSpace, Discrete};

pub struct VecEnv<E> {
    envs: Vec<E>,
}

impl<E: Env> VecEnv<E> {
    pub fn new<F>(make_env: F, num_envs: usize) -> Result<Self, EnvError>
    where
        F: Fn(usize) -> Result<E, EnvError>,
    {
        let envs = (0..num_envs).map(make_env).collect::<Result<_, _>>()?;
        Ok(Self { envs })
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn observation_space(&self) -> Option<BoxSpace> {
        self.envs.first().map(Env::observation_space)
    }

    pub fn action_space(&self) -> Option<Discrete> {
        self.envs.first().map(Env::action_space)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut E> {
        self.envs.iter_mut()
    }

    pub fn reset(&mut self) -> Result<Vec<E::Obs>, EnvError> {
        self.envs.iter_mut().map(|env| env.reset()).collect()
    }

    /// Resets a single sub-environment after its episode ended.
    pub fn reset_at(&mut self, index: usize) -> Result<E::Obs, EnvError> {
        let len = self.envs.len();
        self.envs
            .get_mut(index)
            .ok_or(EnvError::BatchMismatch {
                actions: index + 1,
                envs: len,
            })?
            .reset()
    }

    pub fn step(
        &mut self,
        actions: Vec<E::Act>,
    ) -> Result<Vec<(E::Obs, f32, bool, E::Info)>, EnvError> {
        if actions.len() != self.envs.len() {
            return Err(EnvError::BatchMismatch {
                actions: actions.len(),
                envs: self.envs.len(),
            });
        }

        self.envs
            .iter_mut()
            .zip(actions)
            .map(|(env, action)| env.step(action))
            .collect()
    }

    pub fn close(&mut self) -> Result<(), EnvError> {
        for env in &mut self.envs {
            env.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{EnvConfig, ShapedDungeon};

    fn batch(n: usize) -> VecEnv<ShapedDungeon> {
        VecEnv::new(|_| ShapedDungeon::from_config(&EnvConfig::default()), n).unwrap()
    }

    #[test]
    fn steps_every_env() {
        let mut envs = batch(3);
        assert_eq!(envs.reset().unwrap().len(), 3);
        assert_eq!(envs.observation_space().unwrap().shape(), &[11, 11, 3]);
        assert_eq!(envs.action_space().unwrap().n, 3);

        let results = envs.step(vec![0, 1, 2]).unwrap();
        assert_eq!(results.len(), 3);
        assert!(envs.reset_at(2).is_ok());
        assert!(envs.reset_at(3).is_err());
    }

    #[test]
    fn action_count_must_match() {
        let mut envs = batch(2);
        envs.reset().unwrap();
        assert!(matches!(
            envs.step(vec![0]),
            Err(EnvError::BatchMismatch {
                actions: 1,
                envs: 2
            })
        ));
    }

    #[test]
    fn construction_errors_propagate() {
        let bad = EnvConfig {
            width: 0,
            ..EnvConfig::default()
        };
        assert!(VecEnv::new(|_| ShapedDungeon::from_config(&bad), 2).is_err());
        assert!(batch(0).observation_space().is_none());
    }
}
