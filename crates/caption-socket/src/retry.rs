use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Automatic reconnect attempts before the channel is closed for good
	pub max_attempts: u32,
	pub initial_delay: Duration,
	pub max_delay: Duration,
	pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			initial_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(5),
			backoff_multiplier: 2.0,
		}
	}
}

impl RetryConfig {
	pub fn validate(&self) -> Result<(), String> {
		if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
			return Err(format!("backoff multiplier must be >= 1.0, got {}", self.backoff_multiplier));
		}

		if self.max_delay < self.initial_delay {
			return Err(format!("max delay {:?} is shorter than initial delay {:?}", self.max_delay, self.initial_delay));
		}

		Ok(())
	}
}

/// Capped exponential backoff: `delay(n) = min(initial * multiplier^(n-1), max)`.
///
/// Stateless; the attempt number lives in the connection state.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	config: RetryConfig,
}

impl RetryPolicy {
	pub const fn new(config: RetryConfig) -> Self {
		Self { config }
	}

	pub const fn max_attempts(&self) -> u32 {
		self.config.max_attempts
	}

	pub fn delay_for(&self, attempt: u32) -> Duration {
		let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
		let factor = self.config.backoff_multiplier.max(1.0).powi(exponent);
		let delay = self.config.initial_delay.as_secs_f64() * factor;
		let cap = self.config.max_delay.as_secs_f64();

		if delay.is_finite() && delay < cap {
			Duration::from_secs_f64(delay)
		} else {
			self.config.max_delay
		}
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(RetryConfig::default())
	}
}
