use crate::env::EnvError;
use rand::Rng;

pub const NUM_ACTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward,
    TurnLeft,
    TurnRight,
}

impl TryFrom<usize> for Action {
    type Error = EnvError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::Forward),
            1 => Ok(Action::TurnLeft),
            2 => Ok(Action::TurnRight),
            action => Err(EnvError::InvalidAction {
                action,
                n: NUM_ACTIONS,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        match rng.gen_range(0..4) {
            0 => Direction::North,
            1 => Direction::East,
            2 => Direction::South,
            _ => Direction::West,
        }
    }

    pub fn left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    pub fn right(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Unit step in map coordinates, y grows downwards.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agent {
    pub x: usize,
    pub y: usize,
    pub facing: Direction,
}

impl Agent {
    pub fn new(x: usize, y: usize, facing: Direction) -> Self {
        Self { x, y, facing }
    }

    pub fn position(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    /// Cell directly in front of the agent, if it has non-negative coordinates.
    pub fn ahead(&self) -> Option<(usize, usize)> {
        let (dx, dy) = self.facing.delta();
        let x = usize::try_from(self.x as i64 + dx).ok()?;
        let y = usize::try_from(self.y as i64 + dy).ok()?;
        Some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turning_four_times_restores_facing() {
        let mut dir = Direction::North;
        for _ in 0..4 {
            dir = dir.left();
        }
        assert_eq!(dir, Direction::North);
        assert_eq!(Direction::North.left().right(), Direction::North);
        assert_eq!(Direction::East.right(), Direction::South);
    }

    #[test]
    fn action_decoding() {
        assert_eq!(Action::try_from(0).unwrap(), Action::Forward);
        assert_eq!(Action::try_from(2).unwrap(), Action::TurnRight);
        assert!(matches!(
            Action::try_from(3),
            Err(EnvError::InvalidAction { action: 3, n: 3 })
        ));
    }

    #[test]
    fn ahead_at_the_edge() {
        let agent = Agent::new(0, 4, Direction::West);
        assert_eq!(agent.ahead(), None);
        let agent = Agent::new(2, 4, Direction::South);
        assert_eq!(agent.ahead(), Some((2, 5)));
    }
}
