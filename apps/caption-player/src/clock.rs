use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
	/// Local file played by a native player that reports time updates
	Local,
	/// Remote video in an embedded player that has to be sampled
	Embedded,
}

impl fmt::Display for ClockSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Local => f.write_str("local"),
			Self::Embedded => f.write_str("embedded"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
	/// Seconds, never negative
	pub time: f64,
	pub source: ClockSource,
	/// Bumped on every reset or seek
	pub epoch: u64,
}

/// Samples the host player's position for the polled clock
pub trait PositionProbe: Send + 'static {
	/// Current position in seconds, `None` while the player can't tell
	fn position(&mut self) -> Option<f64>;

	/// Called when the clock was reset or seeked to `at`
	fn restart(&mut self, _at: f64) {}
}

/// Headless stand-in for a player: position is the time elapsed since (re)start
#[derive(Debug, Clone)]
pub struct WallClockProbe {
	origin: Instant,
	offset: f64,
}

impl WallClockProbe {
	pub fn new() -> Self {
		Self { origin: Instant::now(), offset: 0.0 }
	}
}

impl Default for WallClockProbe {
	fn default() -> Self {
		Self::new()
	}
}

impl PositionProbe for WallClockProbe {
	fn position(&mut self) -> Option<f64> {
		Some(self.offset + self.origin.elapsed().as_secs_f64())
	}

	fn restart(&mut self, at: f64) {
		self.origin = Instant::now();
		self.offset = at;
	}
}

/// Current playback position. Readings only move forward; going back takes an explicit
/// [`PlaybackClock::reset`] or [`PlaybackClock::seek`].
#[derive(Debug, Clone)]
pub struct PlaybackClock {
	tx: Arc<watch::Sender<ClockReading>>,
}

/// Write side of an event-driven clock, handed to the host player's time-update callback
#[derive(Debug, Clone)]
pub struct TimeUpdater {
	tx: Arc<watch::Sender<ClockReading>>,
}

impl TimeUpdater {
	/// Returns whether the reading moved
	pub fn update(&self, time: f64) -> bool {
		advance(&self.tx, time, None)
	}
}

fn advance(tx: &watch::Sender<ClockReading>, time: f64, epoch: Option<u64>) -> bool {
	if !time.is_finite() || time < 0.0 {
		return false;
	}

	tx.send_if_modified(|reading| {
		if epoch.is_some_and(|e| e != reading.epoch) {
			return false;
		}
		if time <= reading.time {
			if time < reading.time {
				trace!(current = reading.time, reported = time, "ignoring clock regression");
			}
			return false;
		}
		reading.time = time;
		true
	})
}

impl PlaybackClock {
	fn with_source(source: ClockSource) -> Self {
		let (tx, _rx) = watch::channel(ClockReading { time: 0.0, source, epoch: 0 });
		Self { tx: Arc::new(tx) }
	}

	/// Clock fed by a native time-update callback
	pub fn event_driven(source: ClockSource) -> (Self, TimeUpdater) {
		let clock = Self::with_source(source);
		let updater = TimeUpdater { tx: Arc::clone(&clock.tx) };
		(clock, updater)
	}

	/// Clock fed by sampling `probe` every `interval` until `cancel` fires
	pub fn polled<P: PositionProbe>(source: ClockSource, mut probe: P, interval: Duration, cancel: CancellationToken) -> Self {
		let clock = Self::with_source(source);
		let tx = Arc::clone(&clock.tx);

		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
			let mut epoch = tx.borrow().epoch;

			loop {
				tokio::select! {
					() = cancel.cancelled() => break,
					_ = ticker.tick() => {}
				}

				let reading = *tx.borrow();
				if reading.epoch != epoch {
					probe.restart(reading.time);
					epoch = reading.epoch;
				}
				if let Some(position) = probe.position() {
					advance(&tx, position, Some(epoch));
				}
			}
			debug!("clock sampler stopped");
		});

		clock
	}

	pub fn current_time(&self) -> f64 {
		self.tx.borrow().time
	}

	pub fn reading(&self) -> ClockReading {
		*self.tx.borrow()
	}

	pub fn source(&self) -> ClockSource {
		self.tx.borrow().source
	}

	/// Back to 0 for newly selected media
	pub fn reset(&self, source: ClockSource) {
		self.tx.send_modify(|reading| {
			reading.time = 0.0;
			reading.source = source;
			reading.epoch += 1;
		});
		debug!(%source, "clock reset");
	}

	/// Jump to `time`, backwards included. Non-finite or negative positions are ignored.
	pub fn seek(&self, time: f64) -> bool {
		if !time.is_finite() || time < 0.0 {
			return false;
		}
		self.tx.send_modify(|reading| {
			reading.time = time;
			reading.epoch += 1;
		});
		true
	}

	pub fn subscribe(&self) -> watch::Receiver<ClockReading> {
		self.tx.subscribe()
	}
}
