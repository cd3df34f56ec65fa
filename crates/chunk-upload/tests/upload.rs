use caption_events::Language;
use chunk_upload::{
	AssemblerConfig, Assembly, Chunk, ChunkAssembler, FileSource, MemorySource, RecordingSink, UploadConfig, UploadError, UploadMetadata, UploadProgress, UploadSession,
	UploadStatus, DEFAULT_CHUNK_SIZE,
};
use std::io::Write;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn metadata() -> UploadMetadata {
	UploadMetadata {
		filename: "lecture.mp4".to_string(),
		language: Language::new("ta"),
	}
}

fn patterned(size: usize) -> Vec<u8> {
	(0..size).map(|i| u8::try_from(i % 251).unwrap()).collect()
}

fn drain(rx: &mut mpsc::Receiver<UploadProgress>) -> Vec<UploadProgress> {
	let mut reports = Vec::new();
	while let Ok(report) = rx.try_recv() {
		reports.push(report);
	}
	reports
}

#[tokio::test]
async fn test_reference_chunking_of_twelve_megabytes() {
	let source = MemorySource::from(vec![7; 12_000_000]);
	let session = UploadSession::new(source, metadata(), &UploadConfig::default()).unwrap();
	assert_eq!(session.chunk_size(), DEFAULT_CHUNK_SIZE);
	assert_eq!(session.total_chunks(), 3);

	let sink = RecordingSink::new();
	let (tx, _rx) = mpsc::channel(16);
	let report = session.run(&sink, &tx, &CancellationToken::new()).await;
	assert_eq!(report.status, UploadStatus::Complete);

	let ranges: Vec<_> = sink.posted().iter().map(|c| c.byte_range.clone()).collect();
	assert_eq!(ranges, vec![0..5_242_880, 5_242_880..10_485_760, 10_485_760..12_000_000]);
	assert_eq!(sink.posted()[2].payload.len(), 12_000_000 - 10_485_760);
}

#[tokio::test]
async fn test_chunks_carry_session_metadata_in_order() {
	let session = UploadSession::new(MemorySource::from(patterned(10)), metadata(), &UploadConfig { chunk_size: 4, ..UploadConfig::default() }).unwrap();
	let session_id = session.session_id().to_string();

	let sink = RecordingSink::new();
	let (tx, mut rx) = mpsc::channel(16);
	session.run(&sink, &tx, &CancellationToken::new()).await;

	let posted: Vec<Chunk> = sink.posted();
	assert_eq!(posted.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2]);
	assert!(posted.iter().all(|c| c.session_id == session_id && c.total_chunks == 3 && c.filename == "lecture.mp4" && c.language.as_str() == "ta"));

	let lines: Vec<String> = drain(&mut rx).iter().map(UploadProgress::status_line).collect();
	assert_eq!(lines, vec!["Uploading: 33% (1/3)", "Uploading: 67% (2/3)", "Upload complete! Processing video..."]);
}

#[tokio::test]
async fn test_failed_chunk_aborts_session_without_retry() {
	let sink = RecordingSink::new();
	sink.fail_on(1, 1);

	let mut session = UploadSession::new(MemorySource::from(patterned(10)), metadata(), &UploadConfig { chunk_size: 4, ..UploadConfig::default() }).unwrap();
	session.start();
	assert_eq!(session.upload_next(&sink).await.unwrap(), UploadStatus::InProgress);
	assert!(matches!(session.upload_next(&sink).await, Err(UploadError::ChunkUploadFailed { index: 1, .. })));
	assert_eq!(session.status(), UploadStatus::Failed);
	assert_eq!(session.next_index(), 1);

	// halted: nothing more is posted
	assert_eq!(session.upload_next(&sink).await.unwrap(), UploadStatus::Failed);
	assert_eq!(sink.attempts(), 2);
	assert_eq!(sink.posted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_retry_resends_same_chunk() {
	let sink = RecordingSink::new();
	sink.fail_on(1, 2);

	let config = UploadConfig {
		chunk_size: 4,
		chunk_retries: 2,
		..UploadConfig::default()
	};
	let session = UploadSession::new(MemorySource::from(patterned(10)), metadata(), &config).unwrap();
	let (tx, _rx) = mpsc::channel(16);
	let report = session.run(&sink, &tx, &CancellationToken::new()).await;

	assert_eq!(report.status, UploadStatus::Complete);
	assert_eq!(sink.attempts(), 5);
	assert_eq!(sink.posted().iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_failure_is_reported_once_and_terminal() {
	let sink = RecordingSink::new();
	sink.fail_always_on(0);

	let session = UploadSession::new(MemorySource::from(patterned(10)), metadata(), &UploadConfig { chunk_size: 4, ..UploadConfig::default() }).unwrap();
	let (tx, mut rx) = mpsc::channel(16);
	let report = session.run(&sink, &tx, &CancellationToken::new()).await;

	assert_eq!(report.status, UploadStatus::Failed);
	assert!(report.error.is_some());
	let reports = drain(&mut rx);
	assert_eq!(reports.len(), 1);
	assert!(reports[0].is_terminal());
	assert_eq!(reports[0].status_line(), "Upload failed");
}

#[tokio::test]
async fn test_empty_file_posts_nothing() {
	let session = UploadSession::new(MemorySource::default(), metadata(), &UploadConfig::default()).unwrap();
	let sink = RecordingSink::new();
	let (tx, mut rx) = mpsc::channel(16);
	let report = session.run(&sink, &tx, &CancellationToken::new()).await;

	assert_eq!(report.status, UploadStatus::Complete);
	assert_eq!(report.total_chunks, 0);
	assert_eq!(sink.attempts(), 0);
	assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn test_cancelled_session_stops_between_chunks() {
	let session = UploadSession::new(MemorySource::from(patterned(10)), metadata(), &UploadConfig { chunk_size: 4, ..UploadConfig::default() }).unwrap();
	let cancel = CancellationToken::new();
	cancel.cancel();

	let sink = RecordingSink::new();
	let (tx, _rx) = mpsc::channel(16);
	let report = session.run(&sink, &tx, &cancel).await;

	assert_eq!(report.status, UploadStatus::InProgress);
	assert_eq!(sink.attempts(), 0);
}

#[tokio::test]
async fn test_file_upload_round_trips_through_assembler() {
	let dir = tempfile::tempdir().unwrap();
	let media_path = dir.path().join("lecture.mp4");
	let bytes = patterned(10_000);
	std::fs::File::create(&media_path).unwrap().write_all(&bytes).unwrap();

	let assembler = ChunkAssembler::new(AssemblerConfig {
		upload_dir: dir.path().join("uploads"),
		temp_dir: dir.path().join("temp_chunks"),
		..AssemblerConfig::default()
	})
	.await
	.unwrap();

	let source = FileSource::open(&media_path).await.unwrap();
	assert_eq!(source.file_name().as_deref(), Some("lecture.mp4"));

	let session = UploadSession::new(source, metadata(), &UploadConfig { chunk_size: 3_000, ..UploadConfig::default() }).unwrap();
	let (tx, _rx) = mpsc::channel(16);
	let report = session.run(&assembler, &tx, &CancellationToken::new()).await;
	assert_eq!(report.status, UploadStatus::Complete);
	assert_eq!(report.total_chunks, 4);

	let stats = assembler.stats().await;
	assert_eq!(stats.uploaded_files, 1);
	assert_eq!(stats.active_uploads, 0);

	let merged = std::fs::read_dir(dir.path().join("uploads")).unwrap().next().unwrap().unwrap().path();
	let name = merged.file_name().unwrap().to_string_lossy().into_owned();
	assert!(name.starts_with("video_") && name.ends_with(".mp4"));
	assert_eq!(std::fs::read(merged).unwrap(), bytes);
}

#[tokio::test]
async fn test_assembler_is_idempotent_and_order_independent() {
	let dir = tempfile::tempdir().unwrap();
	let assembler = ChunkAssembler::new(AssemblerConfig {
		upload_dir: dir.path().join("uploads"),
		temp_dir: dir.path().join("temp"),
		..AssemblerConfig::default()
	})
	.await
	.unwrap();

	let chunk = |index: u64, payload: &[u8]| Chunk {
		session_id: "1700000000000_a1b2c3d4e".to_string(),
		index,
		total_chunks: 3,
		byte_range: 0..0,
		payload: payload.to_vec(),
		filename: "clip.MOV".to_string(),
		language: Language::new("en"),
	};

	assert_eq!(assembler.receive(&chunk(2, b"cc")).await.unwrap(), Assembly::Partial { index: 2, missing: vec![0, 1] });
	assert_eq!(assembler.receive(&chunk(0, b"aa")).await.unwrap(), Assembly::Partial { index: 0, missing: vec![1] });
	// re-sent chunk overwrites itself
	assert_eq!(assembler.receive(&chunk(0, b"aa")).await.unwrap(), Assembly::Partial { index: 0, missing: vec![1] });
	assert_eq!(assembler.stats().await.active_uploads, 1);

	let Assembly::Complete { path, size } = assembler.receive(&chunk(1, b"bb")).await.unwrap() else {
		panic!("expected a merged file");
	};
	assert_eq!(size, 6);
	assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mov"));
	assert_eq!(std::fs::read(path).unwrap(), b"aabbcc");
	assert_eq!(assembler.stats().await.active_uploads, 0);
}

#[tokio::test]
async fn test_assembler_rejects_non_video_and_cleans_up() {
	let dir = tempfile::tempdir().unwrap();
	let assembler = ChunkAssembler::new(AssemblerConfig {
		upload_dir: dir.path().join("uploads"),
		temp_dir: dir.path().join("temp"),
		..AssemblerConfig::default()
	})
	.await
	.unwrap();

	let mut chunk = Chunk {
		session_id: "s1".to_string(),
		index: 0,
		total_chunks: 2,
		byte_range: 0..1,
		payload: vec![1],
		filename: "notes.pdf".to_string(),
		language: Language::new("en"),
	};
	assert!(matches!(assembler.receive(&chunk).await, Err(UploadError::Assembly(_))));

	chunk.filename = "clip.webm".to_string();
	assert!(matches!(assembler.receive(&chunk).await, Ok(Assembly::Partial { .. })));
	assert_eq!(assembler.missing_chunks("s1", 2).await, vec![1]);

	assembler.cleanup_session("s1").await;
	assert_eq!(assembler.missing_chunks("s1", 2).await, vec![0, 1]);
	assert_eq!(assembler.stats().await.active_uploads, 0);
}

async fn assembler_in(dir: &std::path::Path) -> ChunkAssembler {
	ChunkAssembler::new(AssemblerConfig {
		upload_dir: dir.join("uploads"),
		temp_dir: dir.join("temp"),
		..AssemblerConfig::default()
	})
	.await
	.unwrap()
}

fn two_part_chunk(index: u64, payload: &[u8]) -> Chunk {
	Chunk {
		session_id: "1700000000000_f00dcafe1".to_string(),
		index,
		total_chunks: 2,
		byte_range: 0..0,
		payload: payload.to_vec(),
		filename: "talk.mp4".to_string(),
		language: Language::new("hi"),
	}
}

#[tokio::test]
async fn test_chunk_resent_after_merge_returns_first_result() {
	let dir = tempfile::tempdir().unwrap();
	let assembler = assembler_in(dir.path()).await;

	assembler.receive(&two_part_chunk(0, b"ab")).await.unwrap();
	let merged = assembler.receive(&two_part_chunk(1, b"cd")).await.unwrap();
	assert!(matches!(merged, Assembly::Complete { size: 4, .. }));

	// the sender retried a chunk whose acknowledgement was lost
	assert_eq!(assembler.receive(&two_part_chunk(1, b"cd")).await.unwrap(), merged);
	assert_eq!(assembler.receive(&two_part_chunk(0, b"ab")).await.unwrap(), merged);

	let stats = assembler.stats().await;
	assert_eq!(stats.active_uploads, 0);
	assert_eq!(stats.uploaded_files, 1);
}

#[tokio::test]
async fn test_concurrent_duplicate_final_chunk_merges_once() {
	let dir = tempfile::tempdir().unwrap();
	let assembler = assembler_in(dir.path()).await;
	assembler.receive(&two_part_chunk(0, b"ab")).await.unwrap();

	let last = two_part_chunk(1, b"cd");
	let (first, second) = tokio::join!(assembler.receive(&last), assembler.receive(&last));
	let (first, second) = (first.unwrap(), second.unwrap());
	assert_eq!(first, second);

	let Assembly::Complete { path, size } = first else {
		panic!("expected a merged file");
	};
	assert_eq!(size, 4);
	assert_eq!(std::fs::read(path).unwrap(), b"abcd");

	let stats = assembler.stats().await;
	assert_eq!(stats.uploaded_files, 1);
	assert_eq!(stats.active_uploads, 0);
}

#[tokio::test]
async fn test_failed_merge_leaves_no_output_file() {
	let dir = tempfile::tempdir().unwrap();
	let assembler = assembler_in(dir.path()).await;
	assembler.receive(&two_part_chunk(0, b"ab")).await.unwrap();

	// an unreadable second chunk makes the merge fail after the output was created
	std::fs::create_dir_all(dir.path().join("temp").join("1700000000000_f00dcafe1").join("chunk_000001")).unwrap();

	let result = assembler.receive(&two_part_chunk(0, b"ab")).await;
	assert!(matches!(result, Err(UploadError::Assembly(_))));
	assert_eq!(assembler.stats().await.uploaded_files, 0);
	assert_eq!(std::fs::read_dir(dir.path().join("uploads")).unwrap().count(), 0);
	// stored chunks survive for a retry
	assert_eq!(assembler.missing_chunks("1700000000000_f00dcafe1", 2).await, Vec::<u64>::new());
}
