use std::fmt;
use std::path::Path;
use std::time::Instant;

use crate::aggregation::ordered_set::OrderedSet;
use crate::aggregation::result_table::{FillMode, ResultTable};
use crate::export::csv_exporter::{self, CsvExport};
use crate::pipeline::frame_extractor::FrameExtractor;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::response_audit::ResponseAudit;
use crate::recognition::domain::plate_reader::PlateReader;
use crate::recognition::domain::plate_response::plates_in_response;
use crate::shared::error::AnalysisError;
use crate::tracking::domain::person_tracker::PersonTracker;
use crate::tracking::domain::tracking_response::tracking_job_id;
use crate::video::domain::video_asset::VideoAsset;

/// Which remote call a [`CallFailure`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    Tracking,
    Plate,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Tracking => write!(f, "tracking"),
            FailureStage::Plate => write!(f, "plate"),
        }
    }
}

/// A remote call that failed and whose contribution was skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallFailure {
    pub stage: FailureStage,
    pub frame_index: Option<usize>,
    pub message: String,
}

/// Everything one analysis run produced.
#[derive(Debug)]
pub struct AnalysisReport {
    pub tracking_ids: OrderedSet,
    pub plates: OrderedSet,
    pub frames_processed: usize,
    pub plate_requests: usize,
    pub failures: Vec<CallFailure>,
    pub table: ResultTable,
}

impl AnalysisReport {
    pub fn export(&self) -> CsvExport {
        csv_exporter::export(&self.table)
    }
}

/// Video analysis pipeline: open → track → extract → recognize → aggregate.
///
/// Runs strictly in series: the video is opened for decoding, then one
/// tracking upload is made for the whole video, then one plate upload per
/// extracted frame in index order. A failed remote call
/// is logged and skipped; decode and I/O failures during extraction abort.
pub struct AnalyzeVideoUseCase {
    extractor: FrameExtractor,
    tracker: Option<Box<dyn PersonTracker>>,
    plate_reader: Box<dyn PlateReader>,
    logger: Box<dyn PipelineLogger>,
    fill_mode: FillMode,
    audit: Option<ResponseAudit>,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
}

impl AnalyzeVideoUseCase {
    /// `tracker` is optional; without one the tracking column stays empty.
    pub fn new(
        extractor: FrameExtractor,
        tracker: Option<Box<dyn PersonTracker>>,
        plate_reader: Box<dyn PlateReader>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            extractor,
            tracker,
            plate_reader,
            logger,
            fill_mode: FillMode::default(),
            audit: None,
            on_progress: None,
        }
    }

    pub fn with_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    pub fn with_audit(mut self, audit: ResponseAudit) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Progress callback `(frames_done, total)`; returning `false` cancels.
    pub fn with_progress(
        mut self,
        on_progress: Box<dyn Fn(usize, usize) -> bool + Send>,
    ) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Analyzes `video`, writing frame files under `frames_dir`.
    pub fn execute(
        &mut self,
        video: &VideoAsset,
        frames_dir: &Path,
    ) -> Result<AnalysisReport, AnalysisError> {
        // Opened first so an undecodable file is rejected before the
        // tracking upload.
        let metadata = self.extractor.open(video)?;
        self.logger.info(&format!(
            "Decoding {}x{} {} video at {:.2} fps",
            metadata.width, metadata.height, metadata.codec, metadata.fps
        ));

        let mut failures = Vec::new();
        let tracking_ids = self.track(video, &mut failures);

        let recognized = self.recognize_plates(frames_dir, metadata.total_frames, &mut failures);
        self.extractor.close();
        let (plates, frames_processed, plate_requests) = recognized?;

        self.logger.info(&format!(
            "Found {} distinct plates in {frames_processed} frames",
            plates.len()
        ));
        self.logger.summary();

        let table = ResultTable::align(&tracking_ids, &plates, self.fill_mode);
        Ok(AnalysisReport {
            tracking_ids,
            plates,
            frames_processed,
            plate_requests,
            failures,
            table,
        })
    }

    fn track(&mut self, video: &VideoAsset, failures: &mut Vec<CallFailure>) -> OrderedSet {
        let mut tracking_ids = OrderedSet::new();
        let Some(tracker) = self.tracker.as_mut() else {
            self.logger.info("Person tracking skipped");
            return tracking_ids;
        };

        let started = Instant::now();
        let result = tracker.submit(video).and_then(|response| {
            if let Some(audit) = &self.audit {
                audit.record_tracking(&response);
            }
            tracking_job_id(&response)
        });
        self.logger.timing("tracking_upload", started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(job_id) => {
                self.logger.info(&format!("Person tracking job {job_id} submitted"));
                tracking_ids.insert(job_id);
            }
            Err(e) => {
                log::error!("Person tracking failed: {e}");
                self.logger.failure("tracking", &e.to_string());
                failures.push(CallFailure {
                    stage: FailureStage::Tracking,
                    frame_index: None,
                    message: e.to_string(),
                });
            }
        }
        tracking_ids
    }

    /// Returns `(plates, frames_processed, plate_requests)`.
    fn recognize_plates(
        &mut self,
        frames_dir: &Path,
        total_frames: usize,
        failures: &mut Vec<CallFailure>,
    ) -> Result<(OrderedSet, usize, usize), AnalysisError> {
        let Self {
            extractor,
            plate_reader,
            logger,
            audit,
            on_progress,
            ..
        } = self;

        let mut plates = OrderedSet::new();
        let mut frames_processed = 0;
        let mut plate_requests = 0;

        for frame in extractor.frames(frames_dir)? {
            let frame = frame?;

            let started = Instant::now();
            plate_requests += 1;
            let result = plate_reader.read(&frame).and_then(|response| {
                if let Some(audit) = audit.as_ref() {
                    audit.record_plates(&response);
                }
                plates_in_response(&response)
            });
            logger.timing("plate_upload", started.elapsed().as_secs_f64() * 1000.0);

            match result {
                Ok(found) => {
                    for plate in found {
                        if plates.insert(plate.as_str()) {
                            log::debug!("New plate {plate} in frame {}", frame.index);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Skipping frame {}: {e}", frame.index);
                    logger.failure("plate", &e.to_string());
                    failures.push(CallFailure {
                        stage: FailureStage::Plate,
                        frame_index: Some(frame.index),
                        message: e.to_string(),
                    });
                }
            }

            frames_processed += 1;
            logger.progress(frames_processed, total_frames);
            if let Some(callback) = on_progress.as_ref() {
                if !callback(frames_processed, total_frames) {
                    return Err(AnalysisError::Cancelled);
                }
            }
        }

        Ok((plates, frames_processed, plate_requests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::constants::PLATE_SERVICE;
    use crate::shared::frame::Frame;
    use crate::shared::frame_file::FrameFile;
    use crate::shared::http::build_client;
    use crate::shared::http::test_server::SilentServer;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::domain::image_writer::ImageWriter;
    use crate::video::domain::video_reader::VideoReader;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // --- Stubs ---

    struct StubReader {
        frames: usize,
        decode_error_after: bool,
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 2,
                height: 2,
                fps: 25.0,
                total_frames: self.frames,
                codec: "stub".into(),
                source_path: None,
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let good = (0..self.frames)
                .map(|i| Ok::<_, Box<dyn std::error::Error>>(Frame::new(vec![0; 12], 2, 2, i)));
            let tail = self.decode_error_after.then(|| Err("truncated".into()));
            Box::new(good.chain(tail))
        }

        fn close(&mut self) {}
    }

    struct UnopenableReader;

    impl VideoReader for UnopenableReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Err("Invalid data found when processing input".into())
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(std::iter::empty())
        }

        fn close(&mut self) {}
    }

    struct NoopWriter;

    impl ImageWriter for NoopWriter {
        fn write(&self, _path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    struct StubTracker {
        response: Result<Value, &'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl PersonTracker for StubTracker {
        fn submit(&mut self, _video: &VideoAsset) -> Result<Value, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .map_err(|message| AnalysisError::protocol("Eden AI", message))
        }
    }

    /// Answers frame `i` with `responses[i]`; `None` simulates a failed call.
    struct StubPlateReader {
        responses: Vec<Option<Value>>,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl PlateReader for StubPlateReader {
        fn read(&mut self, frame: &FrameFile) -> Result<Value, AnalysisError> {
            self.seen.lock().unwrap().push(frame.index);
            self.responses
                .get(frame.index)
                .cloned()
                .flatten()
                .ok_or_else(|| AnalysisError::protocol(PLATE_SERVICE, "HTTP 502: bad gateway"))
        }
    }

    /// Times out against a silent server on `frame`, delegates otherwise.
    struct TimeoutOnFrame {
        frame: usize,
        server: SilentServer,
        inner: StubPlateReader,
    }

    impl PlateReader for TimeoutOnFrame {
        fn read(&mut self, frame: &FrameFile) -> Result<Value, AnalysisError> {
            if frame.index != self.frame {
                return self.inner.read(frame);
            }
            let client = build_client(Duration::from_millis(300)).unwrap();
            client
                .post(&self.server.url)
                .send()
                .map_err(|source| AnalysisError::Transport {
                    service: PLATE_SERVICE,
                    source,
                })
                .map(|_| Value::Null)
        }
    }

    // --- Helpers ---

    fn plates(values: &[&str]) -> Value {
        let results: Vec<Value> = values.iter().map(|p| json!({"plate": p})).collect();
        json!({ "results": results })
    }

    struct Harness {
        use_case: AnalyzeVideoUseCase,
        tracker_calls: Arc<AtomicUsize>,
        plate_calls: Arc<Mutex<Vec<usize>>>,
    }

    fn harness(
        frames: usize,
        tracking: Option<Result<Value, &'static str>>,
        responses: Vec<Option<Value>>,
    ) -> Harness {
        let tracker_calls = Arc::new(AtomicUsize::new(0));
        let plate_calls = Arc::new(Mutex::new(Vec::new()));
        let tracker = tracking.map(|response| {
            Box::new(StubTracker {
                response,
                calls: tracker_calls.clone(),
            }) as Box<dyn PersonTracker>
        });
        let extractor = FrameExtractor::new(
            Box::new(StubReader {
                frames,
                decode_error_after: false,
            }),
            Box::new(NoopWriter),
        );
        let use_case = AnalyzeVideoUseCase::new(
            extractor,
            tracker,
            Box::new(StubPlateReader {
                responses,
                seen: plate_calls.clone(),
            }),
            Box::new(NullPipelineLogger),
        );
        Harness {
            use_case,
            tracker_calls,
            plate_calls,
        }
    }

    fn video() -> VideoAsset {
        VideoAsset::ingest(b"stub", "mp4").unwrap()
    }

    // --- Tests ---

    #[test]
    fn test_one_plate_request_per_frame_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let responses = (0..5).map(|_| Some(plates(&[]))).collect();
        let mut h = harness(5, None, responses);

        let report = h.use_case.execute(&video(), dir.path()).unwrap();
        assert_eq!(report.plate_requests, 5);
        assert_eq!(report.frames_processed, 5);
        assert_eq!(*h.plate_calls.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_single_tracking_call_yields_job_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(
            1,
            Some(Ok(json!({"public_id": "abc123"}))),
            vec![Some(plates(&[]))],
        );

        let report = h.use_case.execute(&video(), dir.path()).unwrap();
        assert_eq!(report.tracking_ids.to_vec(), vec!["abc123"]);
        assert_eq!(h.tracker_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_plates_collapse_and_table_is_forward_filled() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(
            3,
            Some(Ok(json!({"public_id": "abc123"}))),
            vec![
                Some(plates(&["XY12"])),
                Some(plates(&["XY12"])),
                Some(plates(&["AB99"])),
            ],
        );

        let report = h.use_case.execute(&video(), dir.path()).unwrap();
        assert_eq!(report.plates.to_vec(), vec!["XY12", "AB99"]);
        let csv = String::from_utf8(report.export().bytes).unwrap();
        assert_eq!(csv, ",tracking_id,plate\n0,abc123,XY12\n1,abc123,AB99\n");
    }

    #[test]
    fn test_malformed_plate_response_skips_only_that_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(
            3,
            None,
            vec![
                Some(plates(&["XY12"])),
                Some(json!({"detail": "no results key"})),
                Some(plates(&["AB99"])),
            ],
        );

        let report = h.use_case.execute(&video(), dir.path()).unwrap();
        assert_eq!(report.plate_requests, 3);
        assert_eq!(report.plates.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, FailureStage::Plate);
        assert_eq!(report.failures[0].frame_index, Some(1));
    }

    #[test]
    fn test_failed_plate_call_does_not_stop_later_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(3, None, vec![None, None, Some(plates(&["KA01"]))]);

        let report = h.use_case.execute(&video(), dir.path()).unwrap();
        assert_eq!(report.plates.to_vec(), vec!["KA01"]);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn test_tracking_failure_is_recorded_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(
            1,
            Some(Err("response has no `public_id`")),
            vec![Some(plates(&["XY12"]))],
        );

        let report = h.use_case.execute(&video(), dir.path()).unwrap();
        assert!(report.tracking_ids.is_empty());
        assert_eq!(report.failures[0].stage, FailureStage::Tracking);
        assert_eq!(report.table.rows()[0].tracking_id, None);
        assert_eq!(report.table.rows()[0].plate.as_deref(), Some("XY12"));
    }

    #[test]
    fn test_zero_frames_with_tracking_gives_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(0, Some(Ok(json!({"public_id": "abc123"}))), vec![]);

        let report = h.use_case.execute(&video(), dir.path()).unwrap();
        assert_eq!(report.plate_requests, 0);
        assert_eq!(report.table.len(), 1);
        assert_eq!(report.table.rows()[0].plate, None);
    }

    #[test]
    fn test_zero_frames_without_tracking_gives_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(0, None, vec![]);

        let report = h.use_case.execute(&video(), dir.path()).unwrap();
        assert!(report.table.is_empty());
    }

    #[test]
    fn test_progress_callback_can_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let responses = (0..4).map(|_| Some(plates(&[]))).collect();
        let h = harness(4, None, responses);
        let plate_calls = h.plate_calls.clone();
        let mut use_case = h
            .use_case
            .with_progress(Box::new(|current, _total| current < 2));

        let result = use_case.execute(&video(), dir.path());
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        assert_eq!(plate_calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_independent_fill_mode_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            1,
            Some(Ok(json!({"public_id": "abc123"}))),
            vec![Some(plates(&["XY12", "AB99"]))],
        );
        let mut use_case = h.use_case.with_fill_mode(FillMode::Independent);

        let report = use_case.execute(&video(), dir.path()).unwrap();
        assert_eq!(report.table.rows()[1].tracking_id, None);
    }

    #[test]
    fn test_audit_records_last_responses() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            2,
            Some(Ok(json!({"public_id": "abc123"}))),
            vec![Some(plates(&["XY12"])), Some(plates(&["AB99"]))],
        );
        let audit_dir = dir.path().join("audit");
        let mut use_case = h.use_case.with_audit(ResponseAudit::new(&audit_dir));

        use_case.execute(&video(), &dir.path().join("frames")).unwrap();
        let faces = std::fs::read_to_string(audit_dir.join("faces.json")).unwrap();
        let last_plates = std::fs::read_to_string(audit_dir.join("plates.json")).unwrap();
        assert!(faces.contains("abc123"));
        assert!(last_plates.contains("AB99"));
    }

    #[test]
    fn test_decode_failure_mid_stream_uses_captured_frames() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FrameExtractor::new(
            Box::new(StubReader {
                frames: 2,
                decode_error_after: true,
            }),
            Box::new(NoopWriter),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut use_case = AnalyzeVideoUseCase::new(
            extractor,
            None,
            Box::new(StubPlateReader {
                responses: vec![Some(plates(&["XY12"])), Some(plates(&["AB99"]))],
                seen: seen.clone(),
            }),
            Box::new(NullPipelineLogger),
        );

        let report = use_case.execute(&video(), dir.path()).unwrap();
        assert_eq!(report.frames_processed, 2);
        assert_eq!(report.plates.len(), 2);
    }

    #[test]
    fn test_decode_failure_before_any_frame_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FrameExtractor::new(
            Box::new(StubReader {
                frames: 0,
                decode_error_after: true,
            }),
            Box::new(NoopWriter),
        );
        let mut use_case = AnalyzeVideoUseCase::new(
            extractor,
            None,
            Box::new(StubPlateReader {
                responses: vec![],
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
            Box::new(NullPipelineLogger),
        );

        assert!(matches!(
            use_case.execute(&video(), dir.path()),
            Err(AnalysisError::Decode { .. })
        ));
    }

    #[test]
    fn test_unopenable_video_is_rejected_before_tracking_upload() {
        let dir = tempfile::tempdir().unwrap();
        let tracker_calls = Arc::new(AtomicUsize::new(0));
        let mut use_case = AnalyzeVideoUseCase::new(
            FrameExtractor::new(Box::new(UnopenableReader), Box::new(NoopWriter)),
            Some(Box::new(StubTracker {
                response: Ok(json!({"public_id": "abc123"})),
                calls: tracker_calls.clone(),
            }) as Box<dyn PersonTracker>),
            Box::new(StubPlateReader {
                responses: vec![],
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
            Box::new(NullPipelineLogger),
        );

        assert!(matches!(
            use_case.execute(&video(), dir.path()),
            Err(AnalysisError::Decode { .. })
        ));
        assert_eq!(tracker_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_timed_out_plate_call_skips_only_that_frame() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let extractor = FrameExtractor::new(
            Box::new(StubReader {
                frames: 3,
                decode_error_after: false,
            }),
            Box::new(NoopWriter),
        );
        let mut use_case = AnalyzeVideoUseCase::new(
            extractor,
            None,
            Box::new(TimeoutOnFrame {
                frame: 1,
                server: SilentServer::start(),
                inner: StubPlateReader {
                    responses: vec![Some(plates(&["XY12"])), None, Some(plates(&["AB99"]))],
                    seen: seen.clone(),
                },
            }),
            Box::new(NullPipelineLogger),
        );

        let report = use_case.execute(&video(), dir.path()).unwrap();
        assert_eq!(report.frames_processed, 3);
        assert_eq!(report.plate_requests, 3);
        assert_eq!(report.plates.to_vec(), vec!["XY12", "AB99"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].frame_index, Some(1));
        assert!(report.failures[0].message.contains("request failed"));
        assert_eq!(*seen.lock().unwrap(), vec![0, 2]);
    }
}
