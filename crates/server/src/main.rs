use std::fs;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tonic::codec::CompressionEncoding;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};
use tracing::{info, warn};

use spotter_core::detection::domain::label_table::LabelTable;
use spotter_core::detection::infrastructure::model_resolver;
use spotter_core::detection::infrastructure::onnx_entity_detector::OnnxEntityDetector;
use spotter_core::pipeline::entity_builder::EntityBuilder;
use spotter_core::pipeline::recognize_entities_use_case::RecognizeEntitiesUseCase;

mod config;
mod pb;
mod service;
mod telemetry;

use config::ServerConfig;
use pb::entity_recognition_server::EntityRecognitionServer;
use service::RecognitionService;

#[tokio::main]
async fn main() {
    telemetry::init();

    if let Err(e) = run().await {
        tracing::error!("{e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();
    config.validate()?;

    info!(model = %config.model, "resolving detection model");
    let model_path = model_resolver::resolve(
        &config.model,
        config.model_url.as_deref(),
        Some(Box::new(download_progress)),
    )?;

    let labels = match &config.labels {
        Some(path) => LabelTable::from_path(path)?,
        None => LabelTable::coco(),
    };
    info!(
        model = %model_path.display(),
        labels = labels.len(),
        device = ?config.device,
        "loading detector"
    );
    let detector = OnnxEntityDetector::new(&model_path, config.device, config.confidence)?;

    let pipeline = Arc::new(RecognizeEntitiesUseCase::new(
        Arc::new(detector),
        EntityBuilder::new(labels),
    ));
    let recognition = EntityRecognitionServer::new(RecognitionService::new(pipeline))
        .accept_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Gzip);

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(pb::FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let mut server = Server::builder();
    if let (Some(cert), Some(key)) = (&config.tls_cert, &config.tls_key) {
        info!("serving with TLS certificate");
        let identity = Identity::from_pem(fs::read(cert)?, fs::read(key)?);
        let mut tls = ServerTlsConfig::new().identity(identity);
        if let Some(ca) = &config.tls_ca {
            tls = tls.client_ca_root(Certificate::from_pem(fs::read(ca)?));
        }
        server = server.tls_config(tls)?;
    } else {
        warn!("serving without TLS; connections are unencrypted");
    }

    let addr: SocketAddr = format!("[::]:{}", config.port).parse()?;
    info!(port = config.port, "server started");

    server
        .add_service(recognition)
        .add_service(reflection)
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        return;
    }
    info!("shutdown signal received");
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}
