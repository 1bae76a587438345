//! End-to-end: synthetic source -> pipeline -> hub consumers and hazard log.

use async_trait::async_trait;
use image::RgbImage;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hazard_stream::adapters::source::build_source;
use hazard_stream::adapters::storage::{EventSink, InMemoryHazardStore};
use hazard_stream::adapters::stream::StreamHub;
use hazard_stream::adapters::vision::JpegAnnotator;
use hazard_stream::application::pipeline::{FramePipeline, PipelineParts, PipelineState};
use hazard_stream::application::ports::{DetectorPort, EventSinkPort, HazardStorePort};
use hazard_stream::application::services::HazardService;
use hazard_stream::domain::detection::Detection;
use hazard_stream::domain::errors::{DomainError, DomainResult};
use hazard_stream::domain::hazard::{NewHazard, PersistedHazard};
use hazard_stream::domain::model::{HazardPolicy, PipelineParams};
use hazard_stream::domain::stream::StreamMessage;

/// A car (track 1) that moves 100 px right per call, over a pothole.
struct DriftingCar {
    calls: u32,
}

impl DetectorPort for DriftingCar {
    fn name(&self) -> &'static str {
        "drifting-car"
    }

    fn detect(&mut self, _frame: &RgbImage) -> DomainResult<Vec<Detection>> {
        self.calls += 1;
        let x = 100.0 * self.calls as f32;
        Ok(vec![
            Detection::new(x - 10.0, 100.0, x + 10.0, 140.0, 1, 2),
            Detection::new(150.0, 200.0, 170.0, 220.0, 9, 0),
        ])
    }
}

/// Always fails to save.
struct BrokenStore {
    attempts: AtomicUsize,
}

#[async_trait]
impl HazardStorePort for BrokenStore {
    async fn save(&self, _hazard: NewHazard) -> DomainResult<PersistedHazard> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DomainError::Storage("database is locked".into()))
    }
    async fn recent(&self, _limit: usize) -> DomainResult<Vec<PersistedHazard>> {
        Ok(Vec::new())
    }
    async fn count(&self) -> DomainResult<u64> {
        Ok(0)
    }
}

fn pipeline(source: &str, hub: &StreamHub, sink: Arc<dyn EventSinkPort>) -> FramePipeline {
    let policy = HazardPolicy::default();
    let params = PipelineParams { frame_delay: Duration::ZERO, ..PipelineParams::default() };
    let parts = PipelineParts {
        source: build_source(source).unwrap(),
        detector: Box::new(DriftingCar { calls: 0 }),
        encoder: Box::new(JpegAnnotator::new(params.jpeg_quality, policy.clone())),
        publisher: Arc::new(hub.clone()),
        sink,
    };
    FramePipeline::new(parts, policy, params)
}

enum Seen {
    Frame,
    Hazard(String, u64),
    End,
}

async fn drain(sub: &mut hazard_stream::adapters::stream::Subscription) -> Vec<Seen> {
    let mut seen = Vec::new();
    while let Some(msg) = tokio::time::timeout(Duration::from_secs(10), sub.next())
        .await
        .expect("stream stalled")
    {
        match msg {
            StreamMessage::Frame(jpeg) => {
                assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
                seen.push(Seen::Frame);
            }
            StreamMessage::Hazard(json) => {
                let v: Value = serde_json::from_str(&json).unwrap();
                seen.push(Seen::Hazard(
                    v["type"].as_str().unwrap().to_string(),
                    v["frame_id"].as_u64().unwrap(),
                ));
            }
            StreamMessage::EndOfStream => {
                seen.push(Seen::End);
                break;
            }
        }
    }
    seen
}

fn describe(seen: &[Seen]) -> Vec<String> {
    seen.iter()
        .map(|s| match s {
            Seen::Frame => "frame".to_string(),
            Seen::Hazard(kind, frame) => format!("{kind}@{frame}"),
            Seen::End => "end".to_string(),
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_consumer_gets_frames_then_their_hazards_in_order() {
    let hub = StreamHub::new(64);
    let store = Arc::new(InMemoryHazardStore::new());
    let (sink, worker) = EventSink::spawn(store.clone());
    let sink: Arc<dyn EventSinkPort> = Arc::new(sink);

    let mut first = hub.connect();
    let mut second = hub.connect();
    assert_eq!(hub.consumer_count(), 2);

    let pipeline = pipeline("stub://10", &hub, sink.clone());
    let status = pipeline.status();
    let handle = pipeline.spawn().unwrap();

    let a = drain(&mut first).await;
    let b = drain(&mut second).await;
    let report = tokio::task::spawn_blocking(move || handle.join().unwrap())
        .await
        .unwrap()
        .unwrap();

    let expected = vec![
        "frame", "Pothole@3",
        "frame", "Pothole@6", "Rash Driving@6",
        "frame", "Pothole@9", "Rash Driving@9",
        "end",
    ];
    assert_eq!(describe(&a), expected);
    assert_eq!(describe(&b), expected);
    assert_eq!(report.frames_read, 10);
    assert_eq!(report.frames_processed, 3);
    assert_eq!(report.events_emitted, 5);
    assert_eq!(status.get(), PipelineState::Closed);

    drop(sink);
    worker.await.unwrap();
    let rows = store.snapshot();
    let logged: Vec<_> = rows
        .iter()
        .map(|r| format!("{}|{}|{}", r.hazard_type, r.location_data, r.severity))
        .collect();
    assert_eq!(
        logged,
        vec![
            "Pothole|Frame 3|8",
            "Pothole|Frame 6|8",
            "Rash Driving|Frame 6|10",
            "Pothole|Frame 9|8",
            "Rash Driving|Frame 9|10",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_failing_store_never_stops_the_stream() {
    let hub = StreamHub::new(64);
    let store = Arc::new(BrokenStore { attempts: AtomicUsize::new(0) });
    let (sink, worker) = EventSink::spawn(store.clone());
    let sink: Arc<dyn EventSinkPort> = Arc::new(sink);

    let mut consumer = hub.connect();
    let handle = pipeline("stub://9", &hub, sink.clone()).spawn().unwrap();
    let seen = drain(&mut consumer).await;
    let report = tokio::task::spawn_blocking(move || handle.join().unwrap())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(seen.iter().filter(|s| matches!(s, Seen::Frame)).count(), 3);
    assert_eq!(report.events_emitted, 5);

    drop(sink);
    worker.await.unwrap();
    assert_eq!(store.attempts.load(Ordering::SeqCst), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_source_closes_consumers_and_reports_unavailable() {
    let hub = StreamHub::new(8);
    let store = Arc::new(InMemoryHazardStore::new());
    let (sink, _worker) = EventSink::spawn(store.clone());

    let mut consumer = hub.connect();
    let handle = pipeline("/nonexistent/frames", &hub, Arc::new(sink)).spawn().unwrap();
    let seen = drain(&mut consumer).await;
    let outcome = tokio::task::spawn_blocking(move || handle.join().unwrap()).await.unwrap();

    assert_eq!(describe(&seen), vec!["end"]);
    assert!(matches!(outcome, Err(DomainError::SourceUnavailable(_))));
}

#[tokio::test]
async fn consumer_reports_and_manual_logs_share_the_hazard_log() {
    let store = Arc::new(InMemoryHazardStore::new());
    let (sink, worker) = EventSink::spawn(store.clone());
    let service = HazardService::new(store.clone(), Arc::new(sink));

    let row = service
        .log(NewHazard { hazard_type: "Pothole".into(), location_data: "Main St".into(), severity: 6 })
        .await
        .unwrap();
    assert_eq!(row.id, 1);

    let report = serde_json::from_str(r#"{"type":"Rash Driving","severity":12,"frame_id":42}"#).unwrap();
    service.accept_report(report);
    drop(service);
    worker.await.unwrap();

    let rows = store.snapshot();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].location_data, "Frame 42");
    assert!(matches!(
        HazardService::new(store.clone(), Arc::new(EventSink::spawn(store).0))
            .log(NewHazard { hazard_type: " ".into(), location_data: String::new(), severity: 1 })
            .await,
        Err(DomainError::InvalidInput(_))
    ));
}
