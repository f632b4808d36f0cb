use super::worker::Episode;
use std::collections::VecDeque;

pub const SMOOTHING_EPISODES: usize = 100;

/// Reward and length summary over the most recent episodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeSummary {
    pub reward_min: f64,
    pub reward_mean: f64,
    pub reward_max: f64,
    pub len_mean: f64,
}

#[derive(Debug, Clone)]
pub struct EpisodeWindow {
    capacity: usize,
    episodes: VecDeque<Episode>,
}

impl Default for EpisodeWindow {
    fn default() -> Self {
        Self::new(SMOOTHING_EPISODES)
    }
}

impl EpisodeWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            episodes: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, episode: Episode) {
        if self.episodes.len() == self.capacity {
            self.episodes.pop_front();
        }
        self.episodes.push_back(episode);
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// All fields are NaN while the window is empty.
    pub fn summary(&self) -> EpisodeSummary {
        if self.episodes.is_empty() {
            return EpisodeSummary {
                reward_min: f64::NAN,
                reward_mean: f64::NAN,
                reward_max: f64::NAN,
                len_mean: f64::NAN,
            };
        }
        let n = self.episodes.len() as f64;
        let rewards = self.episodes.iter().map(|e| e.reward as f64);
        EpisodeSummary {
            reward_min: rewards.clone().fold(f64::INFINITY, f64::min),
            reward_max: rewards.clone().fold(f64::NEG_INFINITY, f64::max),
            reward_mean: rewards.sum::<f64>() / n,
            len_mean: self.episodes.iter().map(|e| e.length as f64).sum::<f64>() / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(reward: f32, length: u32) -> Episode {
        Episode { reward, length }
    }

    #[test]
    fn empty_window_is_nan() {
        let summary = EpisodeWindow::default().summary();
        assert!(summary.reward_mean.is_nan());
        assert!(summary.len_mean.is_nan());
    }

    #[test]
    fn summary_over_window() {
        let mut window = EpisodeWindow::new(2);
        window.push(episode(-100.0, 10));
        window.push(episode(1.0, 4));
        window.push(episode(3.0, 6));

        assert_eq!(window.len(), 2);
        let summary = window.summary();
        assert_eq!(summary.reward_min, 1.0);
        assert_eq!(summary.reward_max, 3.0);
        assert_eq!(summary.reward_mean, 2.0);
        assert_eq!(summary.len_mean, 5.0);
    }
}
