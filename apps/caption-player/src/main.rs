use anyhow::Result;
use caption_player::{observability, ClockSource, Config, MediaSource, PlaybackClock, PlayerCommand, SessionHandle, SessionOrchestrator, SessionParts, WallClockProbe};
use caption_socket::transport::WsConnector;
use caption_socket::ConnectionManager;
use caption_timeline::format_timestamp;
use chunk_upload::HttpChunkSink;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
	dotenvy::dotenv().ok();

	let config = Config::parse();
	config.validate().map_err(|e| anyhow::anyhow!(e))?;

	observability::init_tracing(config.log_json);

	info!(
		backend = %config.backend_url,
		events = %config.events_url,
		language = %config.language,
		"starting caption player"
	);

	let cancel = CancellationToken::new();
	let (connection, events) = ConnectionManager::spawn(WsConnector::new(config.events_url.clone()), config.connection_config());
	let clock = PlaybackClock::polled(ClockSource::Local, WallClockProbe::new(), config.poll_interval(), cancel.child_token());

	let session = SessionOrchestrator::spawn(SessionParts {
		connection,
		events,
		clock,
		sink: Arc::new(HttpChunkSink::new(&config.backend_url)),
		upload: config.upload_config(),
		languages: config.supported_languages(),
		language: config.language.clone(),
	})?;

	tokio::spawn(log_active_captions(session.clone(), cancel.child_token()));
	tokio::spawn(log_status(session.clone(), cancel.child_token()));

	if let Some(media) = &config.media {
		if let Err(e) = session.select_media(MediaSource::parse(media)).await {
			error!(%media, error = %e, "could not start media");
		}
	}

	tokio::select! {
		() = read_commands(&session) => info!("command input closed"),
		_ = signal::ctrl_c() => info!("received shutdown signal"),
	}

	cancel.cancel();
	session.shutdown().await;
	info!("caption player stopped");
	Ok(())
}

/// Handle `media`, `lang`, `reconnect` and `quit` lines until `quit` or end of input
async fn read_commands(session: &SessionHandle) {
	let mut lines = BufReader::new(tokio::io::stdin()).lines();

	loop {
		let line = match lines.next_line().await {
			Ok(Some(line)) => line,
			Ok(None) => return,
			Err(e) => {
				error!(error = %e, "failed to read stdin");
				return;
			}
		};
		if line.trim().is_empty() {
			continue;
		}

		let result = match PlayerCommand::parse(&line) {
			Ok(PlayerCommand::Quit) => return,
			Ok(PlayerCommand::Media(target)) => session.select_media(MediaSource::parse(&target)).await,
			Ok(PlayerCommand::Language(code)) => session.change_language(code).await.map(|language| info!(%language, "language selected")),
			Ok(PlayerCommand::Reconnect) => session.reconnect().await,
			Err(usage) => {
				warn!("{usage}");
				continue;
			}
		};

		if let Err(e) = result {
			warn!(error = %e, "command failed");
		}
	}
}

async fn log_active_captions(session: SessionHandle, cancel: CancellationToken) {
	let mut view = session.watch_view();
	let mut shown: Option<(f64, String)> = None;

	loop {
		tokio::select! {
			() = cancel.cancelled() => return,
			changed = view.changed() => if changed.is_err() { return },
		}

		let active = view.borrow_and_update().active.clone();
		let current = active.map(|c| (c.start_time, c.text));
		if current != shown {
			if let Some((start, text)) = &current {
				info!(at = %format_timestamp(*start), "{text}");
			}
			shown = current;
		}
	}
}

async fn log_status(session: SessionHandle, cancel: CancellationToken) {
	let mut status = session.watch_status();

	loop {
		tokio::select! {
			() = cancel.cancelled() => return,
			changed = status.changed() => if changed.is_err() { return },
		}

		let line = status.borrow_and_update().clone();
		if !line.is_empty() {
			info!(status = %line, "session status");
		}
	}
}
