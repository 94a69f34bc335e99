//! Automatic grade sources used when a grading timer fires.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces the grade for a submitted assignment.
pub trait Grader: Send + Sync {
    fn grade(&self, student: &str, assignment: &str) -> f64;
}

/// Uniformly random integer grades in `[0, 100]`.
pub struct RandomGrader {
    rng: Mutex<StdRng>,
}

impl RandomGrader {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible grades for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomGrader {
    fn default() -> Self {
        Self::new()
    }
}

impl Grader for RandomGrader {
    fn grade(&self, _student: &str, _assignment: &str) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f64::from(rng.gen_range(0u8..=100))
    }
}

/// Always returns the same grade.
#[derive(Debug, Clone, Copy)]
pub struct FixedGrader(pub f64);

impl Grader for FixedGrader {
    fn grade(&self, _student: &str, _assignment: &str) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_grades_stay_in_range() {
        let grader = RandomGrader::new();
        for _ in 0..500 {
            let g = grader.grade("Alice", "A1");
            assert!((0.0..=100.0).contains(&g), "out of range: {g}");
            assert_eq!(g.fract(), 0.0);
        }
    }

    #[test]
    fn seeded_grader_is_reproducible() {
        let a = RandomGrader::seeded(7);
        let b = RandomGrader::seeded(7);
        let left: Vec<f64> = (0..10).map(|_| a.grade("s", "a")).collect();
        let right: Vec<f64> = (0..10).map(|_| b.grade("s", "a")).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn fixed_grader() {
        assert_eq!(FixedGrader(73.0).grade("s", "a"), 73.0);
    }
}
