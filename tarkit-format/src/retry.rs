use std::time::Duration;

pub const DEFAULT_ATTEMPTS: u32 = 10;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(25);

/// Bounded retry with a fixed delay between attempts, for storage that may
/// be briefly busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> RetryPolicy {
        RetryPolicy { attempts, delay }
    }

    /// A single attempt.
    pub fn none() -> RetryPolicy {
        RetryPolicy::new(1, Duration::from_millis(0))
    }

    /// Runs `op` until it succeeds or the attempts run out, sleeping between
    /// attempts only. Returns the last error.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> std::result::Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> std::result::Result<T, E>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        operation = %what,
                        attempt,
                        attempts,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    std::thread::sleep(self.delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 10);
        assert_eq!(policy.delay, Duration::from_millis(25));
    }

    #[test]
    fn succeeds_after_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(0));
        let mut calls = 0;
        let result: Result<u32, String> = policy.run("op", || {
            calls += 1;
            if calls < 3 {
                Err("busy".to_string())
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn gives_up() {
        let policy = RetryPolicy::new(4, Duration::from_millis(0));
        let mut calls = 0;
        let result: Result<(), String> = policy.run("op", || {
            calls += 1;
            Err(format!("busy {}", calls))
        });
        assert_eq!(result, Err("busy 4".to_string()));
        assert_eq!(calls, 4);
    }

    #[test]
    fn zero_attempts_runs_once() {
        let mut calls = 0;
        let _: Result<(), &str> = RetryPolicy::new(0, Duration::from_millis(0)).run("op", || {
            calls += 1;
            Err("no")
        });
        assert_eq!(calls, 1);
    }
}
