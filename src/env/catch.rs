use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Environment, Step};

/// Grid dimensions for the catch environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatchConfig {
    /// Grid height; an episode lasts `rows - 1` steps
    pub rows: usize,
    /// Grid width
    pub cols: usize,
}

impl Default for CatchConfig {
    fn default() -> Self {
        Self { rows: 10, cols: 7 }
    }
}

impl CatchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.rows < 2 {
            return Err(format!("rows must be at least 2, got {}", self.rows));
        }
        if self.cols < 2 {
            return Err(format!("cols must be at least 2, got {}", self.cols));
        }
        Ok(())
    }
}

/// Catch environment: a ball falls one row per step and the paddle on the
/// bottom row moves left/right to catch it.
///
/// Actions: 0 = left, 1 = stay, 2 = right. The episode terminates when the
/// ball reaches the bottom row, paying +1 on a catch and -1 on a miss; every
/// other step pays 0. Observations are three features normalized to [0, 1]:
/// paddle column, ball column, ball row.
pub struct CatchEnv {
    config: CatchConfig,
    rng: StdRng,
    ball_row: usize,
    ball_col: usize,
    paddle_col: usize,
}

impl CatchEnv {
    pub fn new(config: CatchConfig) -> Self {
        let mut env = Self {
            config,
            rng: StdRng::from_entropy(),
            ball_row: 0,
            ball_col: 0,
            paddle_col: 0,
        };
        env.spawn();
        env
    }

    /// Drop a new ball in a random column, paddle back to the center
    fn spawn(&mut self) {
        self.ball_row = 0;
        self.ball_col = self.rng.gen_range(0..self.config.cols);
        self.paddle_col = self.config.cols / 2;
    }

    fn observation(&self) -> Vec<f32> {
        vec![
            self.paddle_col as f32 / (self.config.cols - 1) as f32,
            self.ball_col as f32 / (self.config.cols - 1) as f32,
            self.ball_row as f32 / (self.config.rows - 1) as f32,
        ]
    }
}

impl Environment for CatchEnv {
    fn n_actions(&self) -> usize {
        3
    }

    fn reset(&mut self, seed: Option<u64>) -> Vec<f32> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.spawn();
        self.observation()
    }

    fn step(&mut self, action: usize) -> Step {
        match action {
            0 => self.paddle_col = self.paddle_col.saturating_sub(1),
            2 => self.paddle_col = (self.paddle_col + 1).min(self.config.cols - 1),
            _ => {}
        }
        self.ball_row += 1;

        let terminated = self.ball_row == self.config.rows - 1;
        let reward = if terminated {
            if self.ball_col == self.paddle_col {
                1.0
            } else {
                -1.0
            }
        } else {
            0.0
        };

        Step {
            observation: self.observation(),
            reward,
            terminated,
            truncated: false,
        }
    }
}
