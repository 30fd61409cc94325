//! Elapsed time since the frame loop started

use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since [`Clock::start`]
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_elapsed_is_monotonic() {
        let clock = Clock::start();
        let a = clock.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.elapsed();
        assert!(a >= 0.0);
        assert!(b > a);
    }
}
