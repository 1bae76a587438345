use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hazard_stream::adapters::{
    http::{router, state::HttpState},
    source::build_source,
    storage::{EventSink, SqliteHazardStore},
    stream::StreamHub,
    vision::{JpegAnnotator, PassthroughDetector},
};
use hazard_stream::application::{
    pipeline::{FramePipeline, PipelineParts},
    ports::{DetectorPort, EventSinkPort, HazardStorePort, StreamPublisherPort},
    services::HazardService,
};
use hazard_stream::config::ServerArgs;
use hazard_stream::domain::model::YoloParams;

const SINK_DRAIN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=info by default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = ServerArgs::parse();
    args.validate()?;

    info!("🔧 Initializing adapters...");

    let store: Arc<dyn HazardStorePort> = Arc::new(SqliteHazardStore::open(&args.db)?);
    let (sink, sink_worker) = EventSink::spawn(store.clone());
    let sink: Arc<dyn EventSinkPort> = Arc::new(sink);
    let hub = StreamHub::new(args.stream_capacity);
    let hazards = Arc::new(HazardService::new(store, sink.clone()));

    let policy = args.hazard_policy();
    let params = args.pipeline_params();
    let parts = PipelineParts {
        source: build_source(&args.source)?,
        detector: build_detector(args.model.as_deref(), args.yolo_params())?,
        encoder: Box::new(JpegAnnotator::new(params.jpeg_quality, policy.clone())),
        publisher: Arc::new(hub.clone()) as Arc<dyn StreamPublisherPort>,
        sink,
    };
    let pipeline = FramePipeline::new(parts, policy, params);
    let pipeline_status = pipeline.status();
    let pipeline_thread = pipeline.spawn().context("failed to start pipeline thread")?;

    // The server outlives the pipeline: consumers can still query the log.
    tokio::task::spawn_blocking(move || match pipeline_thread.join() {
        Ok(Ok(report)) => info!(
            "Pipeline finished: {} frames read, {} processed, {} sent, {} hazards",
            report.frames_read, report.frames_processed, report.frames_sent, report.events_emitted
        ),
        Ok(Err(e)) => error!("Pipeline aborted: {}", e),
        Err(_) => error!("Pipeline thread panicked"),
    });

    let state = HttpState { hub, hazards, pipeline: pipeline_status };
    let app = router(state).fallback_service(ServeDir::new(&args.static_dir));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!("🚀 Hazard stream listening on http://{} (ws: /ws/video)", args.bind);
    info!("📂 Static files served from '{}'", args.static_dir);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Completes only if the pipeline already finished and released its handle.
    EventSink::finish(sink_worker, SINK_DRAIN_GRACE).await;
    info!("Server stopped");
    Ok(())
}

fn build_detector(model: Option<&str>, yolo: YoloParams) -> anyhow::Result<Box<dyn DetectorPort>> {
    match model {
        Some(path) => load_yolo(path, yolo),
        None => {
            warn!("No --model given: frames are streamed without detection");
            Ok(Box::new(PassthroughDetector))
        }
    }
}

#[cfg(feature = "onnx")]
fn load_yolo(path: &str, yolo: YoloParams) -> anyhow::Result<Box<dyn DetectorPort>> {
    use hazard_stream::adapters::vision::{OnnxYoloEngine, YoloDetector};
    let engine = OnnxYoloEngine::load(path)?;
    Ok(Box::new(YoloDetector::new(engine, yolo)))
}

#[cfg(not(feature = "onnx"))]
fn load_yolo(path: &str, _yolo: YoloParams) -> anyhow::Result<Box<dyn DetectorPort>> {
    anyhow::bail!("model '{path}' given but this build lacks the onnx feature")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
