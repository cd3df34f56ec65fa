use crate::status::connectivity_status;
use crate::{extract_video_id, ClockSource, PlaybackClock, SessionError};
use caption_events::{ClientEvent, Language, ServerEvent, SupportedLanguages};
use caption_socket::{ConnectionManager, StateChange};
use caption_timeline::{CaptionSnapshot, CaptionStream, Insertion};
use chunk_upload::{ChunkSink, FileSource, UploadConfig, UploadMetadata, UploadProgress, UploadSession, UploadStatus};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const FALLBACK_FILENAME: &str = "video.mp4";

/// What the user picked to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
	LocalFile(PathBuf),
	RemoteUrl(String),
}

impl MediaSource {
	/// URLs (anything with a scheme or a bare video host) are remote, the rest are paths
	pub fn parse(input: &str) -> Self {
		let input = input.trim();
		let lower = input.to_ascii_lowercase();
		if lower.contains("://") || lower.starts_with("www.") || lower.starts_with("youtube.com/") || lower.starts_with("youtu.be/") {
			Self::RemoteUrl(input.to_string())
		} else {
			Self::LocalFile(PathBuf::from(input))
		}
	}
}

#[derive(Debug)]
enum SessionCommand {
	SelectMedia(MediaSource, oneshot::Sender<Result<(), SessionError>>),
	ChangeLanguage(String, oneshot::Sender<Result<Language, SessionError>>),
	Reconnect(oneshot::Sender<Result<(), SessionError>>),
}

/// Collaborators the orchestrator owns for its lifetime
pub struct SessionParts {
	pub connection: ConnectionManager,
	pub events: mpsc::Receiver<ServerEvent>,
	pub clock: PlaybackClock,
	pub sink: Arc<dyn ChunkSink>,
	pub upload: UploadConfig,
	pub languages: SupportedLanguages,
	pub language: String,
}

struct ActiveUpload {
	session_id: String,
	cancel: CancellationToken,
}

/// Single control flow for one playback session: media selection, language changes,
/// caption arrivals, upload progress, connection changes and clock ticks are handled one
/// at a time, so none of the state below needs a lock.
pub struct SessionOrchestrator {
	connection: ConnectionManager,
	events: mpsc::Receiver<ServerEvent>,
	captions: CaptionStream,
	clock: PlaybackClock,
	sink: Arc<dyn ChunkSink>,
	upload_config: UploadConfig,
	languages: SupportedLanguages,
	language: Language,
	upload: Option<ActiveUpload>,
	progress_tx: mpsc::Sender<UploadProgress>,
	progress_rx: mpsc::Receiver<UploadProgress>,
	commands: mpsc::Receiver<SessionCommand>,
	view_tx: watch::Sender<CaptionSnapshot>,
	status_tx: watch::Sender<String>,
}

impl SessionOrchestrator {
	pub fn new(parts: SessionParts) -> Result<(Self, SessionHandle), SessionError> {
		let language = parts.languages.resolve(&parts.language)?;
		let (command_tx, command_rx) = mpsc::channel(32);
		let (progress_tx, progress_rx) = mpsc::channel(64);
		let (view_tx, view_rx) = watch::channel(CaptionSnapshot::empty());
		let (status_tx, status_rx) = watch::channel(String::new());

		let orchestrator = Self {
			connection: parts.connection,
			events: parts.events,
			captions: CaptionStream::new(),
			clock: parts.clock,
			sink: parts.sink,
			upload_config: parts.upload,
			languages: parts.languages,
			language,
			upload: None,
			progress_tx,
			progress_rx,
			commands: command_rx,
			view_tx,
			status_tx,
		};

		let handle = SessionHandle {
			commands: command_tx,
			view: view_rx,
			status: status_rx,
			cancel: CancellationToken::new(),
			task: Arc::new(Mutex::new(None)),
		};

		Ok((orchestrator, handle))
	}

	/// Build and run on a background task; [`SessionHandle::shutdown`] stops it
	pub fn spawn(parts: SessionParts) -> Result<SessionHandle, SessionError> {
		let (orchestrator, handle) = Self::new(parts)?;
		let task = tokio::spawn(orchestrator.run(handle.cancel.clone()));
		if let Ok(mut slot) = handle.task.try_lock() {
			*slot = Some(task);
		}
		Ok(handle)
	}

	pub const fn language(&self) -> &Language {
		&self.language
	}

	pub const fn captions(&self) -> &CaptionStream {
		&self.captions
	}

	pub const fn clock(&self) -> &PlaybackClock {
		&self.clock
	}

	pub fn status(&self) -> String {
		self.status_tx.borrow().clone()
	}

	/// Session id of the upload whose progress is still reported
	pub fn active_upload(&self) -> Option<&str> {
		self.upload.as_ref().map(|u| u.session_id.as_str())
	}

	fn set_status(&self, status: impl Into<String>) {
		let status = status.into();
		debug!(%status, "status");
		self.status_tx.send_replace(status);
	}

	fn publish(&mut self) {
		let snapshot = self.captions.snapshot(self.clock.current_time());
		self.view_tx.send_replace(snapshot);
	}

	/// Drop everything tied to the previous media
	fn begin_media(&mut self, source: ClockSource) {
		if let Some(previous) = self.upload.take() {
			info!(session_id = %previous.session_id, "superseding previous upload");
			previous.cancel.cancel();
		}
		self.captions.reset();
		self.clock.reset(source);
		self.publish();
	}

	/// Local files are uploaded in chunks; remote URLs are handed to the backend with a single
	/// fire-and-forget request. Input is validated before any state is touched.
	pub async fn select_media(&mut self, media: MediaSource) -> Result<(), SessionError> {
		match media {
			MediaSource::RemoteUrl(url) => {
				let Some(video_id) = extract_video_id(&url) else {
					warn!(%url, "rejected remote media URL");
					return Err(SessionError::InvalidVideoUrl(url));
				};

				self.begin_media(ClockSource::Embedded);
				let request = ClientEvent::process_remote_video(video_id.clone(), self.language.clone());
				let connection = self.connection.clone();
				match self.drive(connection.send(request)).await {
					Ok(()) => {
						info!(%video_id, language = %self.language, "requested remote video processing");
						self.set_status("Processing remote video...");
						Ok(())
					}
					Err(e) => {
						warn!(%video_id, error = %e, "remote video request dropped");
						self.set_status("Not connected to server, request not sent");
						Err(e.into())
					}
				}
			}
			MediaSource::LocalFile(path) => {
				let source = FileSource::open(&path).await?;
				let filename = source.file_name().unwrap_or_else(|| FALLBACK_FILENAME.to_string());
				let metadata = UploadMetadata {
					filename,
					language: self.language.clone(),
				};
				let session = UploadSession::new(source, metadata, &self.upload_config)?;

				self.begin_media(ClockSource::Local);
				self.start_upload(session);
				Ok(())
			}
		}
	}

	fn start_upload(&mut self, session: UploadSession<FileSource>) {
		let session_id = session.session_id().to_string();
		let cancel = CancellationToken::new();
		let sink = Arc::clone(&self.sink);
		let progress = self.progress_tx.clone();
		let token = cancel.clone();

		info!(%session_id, filename = session.filename(), total_chunks = session.total_chunks(), "starting upload");
		tokio::spawn(async move {
			session.run(sink.as_ref(), &progress, &token).await;
		});

		self.upload = Some(ActiveUpload { session_id, cancel });
		self.set_status("Preparing upload...");
	}

	/// Captions already shown belong to the old language, so the timeline is cleared. The
	/// connection stays up.
	pub fn change_language(&mut self, code: &str) -> Result<Language, SessionError> {
		let language = self.languages.resolve(code)?;
		if language != self.language {
			info!(from = %self.language, to = %language, "caption language changed");
			self.language = language.clone();
			self.captions.reset();
			self.publish();
		}
		Ok(language)
	}

	pub async fn reconnect(&mut self) -> Result<(), SessionError> {
		let connection = self.connection.clone();
		self.drive(connection.connect()).await?;
		Ok(())
	}

	/// Await a connection request while still consuming server events. The connection actor
	/// only answers once it has delivered the frame it holds, so not draining here can stall both.
	async fn drive<F: Future>(&mut self, request: F) -> F::Output {
		tokio::pin!(request);

		loop {
			tokio::select! {
				biased;
				output = &mut request => return output,
				Some(event) = self.events.recv() => self.handle_server_event(event),
			}
		}
	}

	pub fn handle_server_event(&mut self, event: ServerEvent) {
		match event {
			ServerEvent::Caption(caption) => {
				if let Insertion::Inserted { .. } = self.captions.ingest(caption) {
					self.publish();
				}
			}
			ServerEvent::Status(status) => self.set_status(status),
			ServerEvent::TranscriptionComplete(_) => {
				info!(captions = self.captions.len(), "transcription complete");
				self.set_status("Transcription complete");
			}
			ServerEvent::ConnectionResponse(data) => debug!(?data, "connection acknowledged by server"),
			ServerEvent::ProcessingStarted(data) => {
				let status = data.as_ref().and_then(|d| d.get("status")).and_then(|s| s.as_str()).map(str::to_string);
				info!(status = ?status, "backend started processing");
				self.set_status("Processing video...");
			}
			ServerEvent::ChunkReceived(data) => debug!(?data, "chunk acknowledged by server"),
			ServerEvent::Lifecycle(signal) => debug!(?signal, "ignoring mirrored lifecycle frame"),
		}
	}

	pub fn handle_upload_progress(&mut self, progress: UploadProgress) {
		if self.active_upload() != Some(progress.session_id.as_str()) {
			debug!(session_id = %progress.session_id, "ignoring progress from superseded upload");
			return;
		}

		match progress.status {
			UploadStatus::Failed => error!(session_id = %progress.session_id, error = ?progress.error, "upload failed"),
			UploadStatus::Complete => info!(session_id = %progress.session_id, total_chunks = progress.total_chunks, "upload delivered"),
			_ => {}
		}
		if progress.is_terminal() {
			self.upload = None;
		}
		self.set_status(progress.status_line());
	}

	pub fn handle_state_change(&self, change: &StateChange) {
		self.set_status(connectivity_status(change, self.connection.max_attempts()));
	}

	/// Re-resolve the active caption at the latest clock reading
	pub fn on_tick(&mut self) {
		self.publish();
	}

	async fn handle_command(&mut self, command: SessionCommand) {
		match command {
			SessionCommand::SelectMedia(media, reply) => {
				let _ = reply.send(self.select_media(media).await);
			}
			SessionCommand::ChangeLanguage(code, reply) => {
				let _ = reply.send(self.change_language(&code));
			}
			SessionCommand::Reconnect(reply) => {
				let _ = reply.send(self.reconnect().await);
			}
		}
	}

	/// Event loop. Opens the connection on entry and shuts it down on exit.
	pub async fn run(mut self, cancel: CancellationToken) {
		let mut changes = self.connection.subscribe();
		let mut ticks = self.clock.subscribe();

		let connection = self.connection.clone();
		if let Err(e) = self.drive(connection.connect()).await {
			error!(error = %e, "failed to start connection");
		}
		info!(language = %self.language, "session orchestrator started");

		loop {
			tokio::select! {
				() = cancel.cancelled() => break,
				Some(command) = self.commands.recv() => self.handle_command(command).await,
				Some(event) = self.events.recv() => self.handle_server_event(event),
				Some(progress) = self.progress_rx.recv() => self.handle_upload_progress(progress),
				Ok(change) = changes.recv() => self.handle_state_change(&change),
				Ok(()) = ticks.changed() => self.on_tick(),
			}
		}

		if let Some(upload) = self.upload.take() {
			upload.cancel.cancel();
		}
		// an actor parked on a full event channel must see the receiver go away
		self.events.close();
		self.connection.shutdown().await;
		info!("session orchestrator stopped");
	}
}

/// Cheap to clone; commands are answered once the orchestrator has applied them
#[derive(Clone)]
pub struct SessionHandle {
	commands: mpsc::Sender<SessionCommand>,
	view: watch::Receiver<CaptionSnapshot>,
	status: watch::Receiver<String>,
	cancel: CancellationToken,
	task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
	async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<Result<T, SessionError>>) -> SessionCommand) -> Result<T, SessionError> {
		let (tx, rx) = oneshot::channel();
		self.commands.send(command(tx)).await.map_err(|_| SessionError::Unavailable)?;
		rx.await.map_err(|_| SessionError::Unavailable)?
	}

	pub async fn select_media(&self, media: MediaSource) -> Result<(), SessionError> {
		self.request(|reply| SessionCommand::SelectMedia(media, reply)).await
	}

	pub async fn change_language(&self, code: impl Into<String>) -> Result<Language, SessionError> {
		let code = code.into();
		self.request(|reply| SessionCommand::ChangeLanguage(code, reply)).await
	}

	pub async fn reconnect(&self) -> Result<(), SessionError> {
		self.request(SessionCommand::Reconnect).await
	}

	/// Latest active caption and timeline
	pub fn view(&self) -> CaptionSnapshot {
		self.view.borrow().clone()
	}

	pub fn watch_view(&self) -> watch::Receiver<CaptionSnapshot> {
		self.view.clone()
	}

	pub fn status(&self) -> String {
		self.status.borrow().clone()
	}

	pub fn watch_status(&self) -> watch::Receiver<String> {
		self.status.clone()
	}

	/// Stop the orchestrator and wait for it to close the connection
	pub async fn shutdown(&self) {
		info!("shutting down session");
		self.cancel.cancel();

		if let Some(task) = self.task.lock().await.take() {
			let _ = task.await;
		}
	}
}
