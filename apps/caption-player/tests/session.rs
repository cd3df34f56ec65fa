use caption_events::{Caption, ClientEvent, Language, ServerEvent, SupportedLanguages};
use caption_player::{ClockSource, MediaSource, PlaybackClock, SessionError, SessionHandle, SessionOrchestrator, SessionParts, TimeUpdater};
use caption_socket::transport::{MemoryAcceptor, MemoryConnector, MemoryPeer};
use caption_socket::{ConnectionConfig, ConnectionError, ConnectionManager, ConnectionState, RetryConfig};
use caption_timeline::CaptionSnapshot;
use chunk_upload::{RecordingSink, UploadConfig};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(30);

struct Harness {
	session: SessionHandle,
	connection: ConnectionManager,
	connector: MemoryConnector,
	acceptor: MemoryAcceptor,
	peer: MemoryPeer,
	clock: PlaybackClock,
	updater: TimeUpdater,
	sink: Arc<RecordingSink>,
}

async fn harness(connection_config: ConnectionConfig, upload: UploadConfig) -> Harness {
	let (connector, mut acceptor) = MemoryConnector::new();
	let (connection, events) = ConnectionManager::spawn(connector.clone(), connection_config);
	let (clock, updater) = PlaybackClock::event_driven(ClockSource::Local);
	let sink = Arc::new(RecordingSink::new());

	let session = SessionOrchestrator::spawn(SessionParts {
		connection: connection.clone(),
		events,
		clock: clock.clone(),
		sink: sink.clone(),
		upload,
		languages: SupportedLanguages::default(),
		language: "hi".to_string(),
	})
	.unwrap();

	let peer = tokio::time::timeout(WAIT, acceptor.accept()).await.unwrap().unwrap();
	wait_status(&session, "Connected to server").await;

	Harness {
		session,
		connection,
		connector,
		acceptor,
		peer,
		clock,
		updater,
		sink,
	}
}

async fn default_harness() -> Harness {
	harness(ConnectionConfig::default(), UploadConfig::default()).await
}

async fn wait_status(session: &SessionHandle, expected: &str) {
	let mut status = session.watch_status();
	tokio::time::timeout(WAIT, status.wait_for(|s| s == expected))
		.await
		.unwrap_or_else(|_| panic!("status never became {expected:?}, last {:?}", session.status()))
		.unwrap();
}

async fn wait_view(session: &SessionHandle, predicate: impl FnMut(&CaptionSnapshot) -> bool) {
	let mut view = session.watch_view();
	tokio::time::timeout(WAIT, view.wait_for(predicate)).await.unwrap().unwrap();
}

fn caption(start: f64, end: f64, text: &str) -> ServerEvent {
	ServerEvent::Caption(Caption::new(start, Some(end), text))
}

#[tokio::test]
async fn test_captions_arrive_sorted_and_follow_the_clock() {
	let h = default_harness().await;

	h.peer.push_event(&caption(4.0, 6.0, "second")).unwrap();
	h.peer.push_event(&caption(0.0, 2.0, "first")).unwrap();
	wait_view(&h.session, |v| v.captions.len() == 2).await;

	let view = h.session.view();
	assert_eq!(view.captions.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(), vec!["first", "second"]);
	assert_eq!(view.active.map(|c| c.text), Some("first".to_string()));

	h.updater.update(3.0);
	wait_view(&h.session, |v| v.current_time >= 3.0).await;
	assert!(h.session.view().active.is_none());

	h.updater.update(4.5);
	wait_view(&h.session, |v| v.active.as_ref().is_some_and(|c| c.text == "second")).await;
	assert_eq!(h.session.view().active_index, Some(1));
}

#[tokio::test]
async fn test_language_change_clears_captions_but_keeps_connection() {
	let h = default_harness().await;

	h.peer.push_event(&caption(0.0, 5.0, "namaste")).unwrap();
	wait_view(&h.session, |v| v.captions.len() == 1).await;

	let language = h.session.change_language("ta").await.unwrap();
	assert_eq!(language, Language::new("ta"));
	assert!(h.session.view().captions.is_empty());
	assert_eq!(h.connection.state(), ConnectionState::Open);
	assert_eq!(h.connector.attempts(), 1);

	// the same channel keeps delivering
	h.peer.push_event(&caption(0.0, 5.0, "vanakkam")).unwrap();
	wait_view(&h.session, |v| v.captions.len() == 1).await;
	assert_eq!(h.session.view().captions[0].text, "vanakkam");
}

#[tokio::test]
async fn test_unsupported_language_is_rejected_without_side_effects() {
	let h = default_harness().await;
	h.peer.push_event(&caption(0.0, 5.0, "namaste")).unwrap();
	wait_view(&h.session, |v| v.captions.len() == 1).await;

	let result = h.session.change_language("klingon").await;
	assert!(matches!(result, Err(SessionError::UnsupportedLanguage(_))));
	assert_eq!(h.session.view().captions.len(), 1);
}

#[tokio::test]
async fn test_remote_selection_sends_one_request() {
	let mut h = default_harness().await;
	h.session.change_language("bn").await.unwrap();

	h.peer.push_event(&caption(0.0, 5.0, "stale")).unwrap();
	wait_view(&h.session, |v| v.captions.len() == 1).await;
	h.updater.update(8.0);

	h.session.select_media(MediaSource::parse("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10")).await.unwrap();

	let frame = tokio::time::timeout(WAIT, h.peer.recv()).await.unwrap().unwrap();
	assert_eq!(ClientEvent::decode(&frame).unwrap(), ClientEvent::process_remote_video("dQw4w9WgXcQ", Language::new("bn")));
	assert_eq!(h.session.status(), "Processing remote video...");

	let reading = h.clock.reading();
	assert_eq!(reading.source, ClockSource::Embedded);
	assert!(reading.time.abs() < f64::EPSILON);
	assert!(h.session.view().captions.is_empty());

	// fire-and-forget: nothing else goes out
	assert!(tokio::time::timeout(Duration::from_millis(50), h.peer.recv()).await.is_err());
}

#[tokio::test]
async fn test_remote_selection_during_caption_burst() {
	let config = ConnectionConfig {
		event_capacity: 1,
		..ConnectionConfig::default()
	};
	let mut h = harness(config, UploadConfig::default()).await;

	for i in 0..50 {
		h.peer.push_event(&caption(f64::from(i), f64::from(i) + 0.5, &format!("before {i}"))).unwrap();
	}
	tokio::time::timeout(Duration::from_secs(3), h.session.select_media(MediaSource::parse("https://youtu.be/dQw4w9WgXcQ")))
		.await
		.expect("selection stalled behind queued captions")
		.unwrap();

	let frame = tokio::time::timeout(WAIT, h.peer.recv()).await.unwrap().unwrap();
	assert_eq!(ClientEvent::decode(&frame).unwrap(), ClientEvent::process_remote_video("dQw4w9WgXcQ", Language::new("hi")));

	for i in 0..50 {
		h.peer.push_event(&caption(100.0 + f64::from(i), 100.5 + f64::from(i), &format!("after {i}"))).unwrap();
	}
	wait_view(&h.session, |v| v.captions.iter().filter(|c| c.text.starts_with("after")).count() == 50).await;
}

#[tokio::test]
async fn test_shutdown_with_undelivered_captions() {
	let config = ConnectionConfig {
		event_capacity: 1,
		..ConnectionConfig::default()
	};
	let h = harness(config, UploadConfig::default()).await;

	for i in 0..50 {
		h.peer.push_event(&caption(f64::from(i), f64::from(i) + 0.5, "queued")).unwrap();
	}
	tokio::time::timeout(Duration::from_secs(3), h.session.shutdown()).await.expect("shutdown stalled behind queued captions");

	let mut state = h.connection.watch_state();
	tokio::time::timeout(WAIT, state.wait_for(|s| s.is_closed())).await.unwrap().ok();
	assert!(h.connection.state().is_closed());
}

#[tokio::test]
async fn test_invalid_url_changes_nothing() {
	let mut h = default_harness().await;
	h.peer.push_event(&caption(0.0, 5.0, "keep me")).unwrap();
	wait_view(&h.session, |v| v.captions.len() == 1).await;
	h.updater.update(2.0);

	let result = h.session.select_media(MediaSource::parse("https://vimeo.com/123456789")).await;
	assert!(matches!(result, Err(SessionError::InvalidVideoUrl(_))));

	assert_eq!(h.session.view().captions.len(), 1);
	assert!((h.clock.current_time() - 2.0).abs() < f64::EPSILON);
	assert!(tokio::time::timeout(Duration::from_millis(50), h.peer.recv()).await.is_err());
}

#[tokio::test]
async fn test_remote_selection_while_disconnected_reports_drop() {
	let h = default_harness().await;
	h.connection.disconnect().await.unwrap();
	wait_status(&h.session, "Disconnected from server").await;

	let result = h.session.select_media(MediaSource::parse("https://youtu.be/dQw4w9WgXcQ")).await;
	assert!(matches!(result, Err(SessionError::Connection(ConnectionError::NotConnected))));
	assert_eq!(h.session.status(), "Not connected to server, request not sent");
}

#[tokio::test]
async fn test_local_file_is_uploaded_in_chunks() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("clip.mp4");
	std::fs::write(&path, b"0123456789").unwrap();

	let h = harness(ConnectionConfig::default(), UploadConfig { chunk_size: 4, ..UploadConfig::default() }).await;
	h.session.change_language("te").await.unwrap();
	h.updater.update(12.0);

	h.session.select_media(MediaSource::LocalFile(path)).await.unwrap();
	assert_eq!(h.clock.reading().source, ClockSource::Local);
	assert!(h.clock.current_time().abs() < f64::EPSILON);

	wait_status(&h.session, "Upload complete! Processing video...").await;

	let posted = h.sink.posted();
	assert_eq!(posted.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2]);
	assert_eq!(posted.iter().map(|c| c.payload.clone()).collect::<Vec<_>>(), vec![b"0123".to_vec(), b"4567".to_vec(), b"89".to_vec()]);
	assert!(posted.iter().all(|c| c.filename == "clip.mp4" && c.language.as_str() == "te" && c.total_chunks == 3));
}

#[tokio::test]
async fn test_failed_upload_is_reported() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("clip.mp4");
	std::fs::write(&path, b"0123456789").unwrap();

	let h = harness(ConnectionConfig::default(), UploadConfig { chunk_size: 4, ..UploadConfig::default() }).await;
	h.sink.fail_always_on(1);

	h.session.select_media(MediaSource::LocalFile(path)).await.unwrap();
	wait_status(&h.session, "Upload failed").await;
	assert_eq!(h.sink.posted().len(), 1);
	assert_eq!(h.sink.attempts(), 2);
}

#[tokio::test]
async fn test_missing_file_is_rejected_before_reset() {
	let h = default_harness().await;
	h.peer.push_event(&caption(0.0, 5.0, "keep me")).unwrap();
	wait_view(&h.session, |v| v.captions.len() == 1).await;

	let result = h.session.select_media(MediaSource::LocalFile("/definitely/not/here.mp4".into())).await;
	assert!(matches!(result, Err(SessionError::Io(_))));
	assert_eq!(h.session.view().captions.len(), 1);
	assert!(h.sink.posted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_exhaustion() {
	let config = ConnectionConfig {
		retry: RetryConfig {
			max_attempts: 2,
			..RetryConfig::default()
		},
		..ConnectionConfig::default()
	};
	let mut h = harness(config, UploadConfig::default()).await;

	h.connector.refuse_all();
	h.peer.close();
	wait_status(&h.session, "Connection lost: reconnect attempts exhausted").await;
	assert_eq!(h.connection.state(), ConnectionState::Closed);
	assert_eq!(h.connector.attempts(), 3);

	h.connector.accept_all();
	h.session.reconnect().await.unwrap();
	let _peer = tokio::time::timeout(WAIT, h.acceptor.accept()).await.unwrap().unwrap();
	wait_status(&h.session, "Connected to server").await;
	assert_eq!(h.connection.state(), ConnectionState::Open);
}

#[tokio::test]
async fn test_shutdown_closes_connection() {
	let h = default_harness().await;
	h.session.shutdown().await;

	assert!(matches!(h.session.change_language("en").await, Err(SessionError::Unavailable)));
	let mut state = h.connection.watch_state();
	tokio::time::timeout(WAIT, state.wait_for(|s| s.is_closed())).await.unwrap().ok();
}
