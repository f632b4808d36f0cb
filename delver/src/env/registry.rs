use crate::env::{EnvConfig, EnvError};
use std::collections::HashMap;
use std::sync::Arc;

pub type EnvFactory<E> = Arc<dyn Fn(&EnvConfig) -> Result<E, EnvError> + Send + Sync>;

/// Named environment constructors, so trainers can be configured with an
/// environment name and a config mapping instead of a concrete type.
pub struct EnvRegistry<E> {
    factories: HashMap<String, EnvFactory<E>>,
}

impl<E> Default for EnvRegistry<E> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
}

impl<E> EnvRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&EnvConfig) -> Result<E, EnvError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            tracing::warn!(env = %name, "replacing registered environment");
        }
    }

    pub fn get(&self, name: &str) -> Result<EnvFactory<E>, EnvError> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| EnvError::UnknownEnv(name.to_string()))
    }

    pub fn make(&self, name: &str, config: &EnvConfig) -> Result<E, EnvError> {
        (self.get(name)?)(config)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
