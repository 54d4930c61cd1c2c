use std::path::PathBuf;

use clap::Parser;

use spotter_core::detection::infrastructure::execution_provider::Device;

/// gRPC entity recognition server.
#[derive(Parser, Debug)]
#[command(name = "spotter-server")]
pub struct ServerConfig {
    /// Detection model: a filesystem path, or a file name resolved against
    /// the model cache.
    #[arg(long, env = "SPOTTER_MODEL", default_value = "models/yolov8n.onnx")]
    pub model: String,

    /// Download URL used when the model is not present locally.
    #[arg(long, env = "SPOTTER_MODEL_URL")]
    pub model_url: Option<String>,

    /// Labels file, one label per line. Defaults to the built-in COCO table.
    #[arg(long, env = "SPOTTER_LABELS")]
    pub labels: Option<PathBuf>,

    /// Inference device: auto or cpu.
    #[arg(long, env = "SPOTTER_DEVICE", default_value = "auto")]
    pub device: Device,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, env = "SPOTTER_CONFIDENCE", default_value_t = 0.25)]
    pub confidence: f32,

    /// Listen port.
    #[arg(long, env = "SPOTTER_PORT", default_value_t = 50051)]
    pub port: u16,

    /// TLS certificate chain (PEM); enables TLS together with --tls-key.
    #[arg(long, env = "SPOTTER_TLS_CERT")]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key (PEM).
    #[arg(long, env = "SPOTTER_TLS_KEY")]
    pub tls_key: Option<PathBuf>,

    /// Client CA root (PEM); enables mutual TLS.
    #[arg(long, env = "SPOTTER_TLS_CA")]
    pub tls_ca: Option<PathBuf>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            ));
        }
        if self.tls_cert.is_some() != self.tls_key.is_some() {
            return Err("--tls-cert and --tls-key must be supplied together".into());
        }
        if self.tls_ca.is_some() && self.tls_cert.is_none() {
            return Err("--tls-ca requires --tls-cert and --tls-key".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> ServerConfig {
        ServerConfig::try_parse_from(std::iter::once("spotter-server").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.port, 50051);
        assert_eq!(cfg.device, Device::Auto);
        assert!((cfg.confidence - 0.25).abs() < 1e-6);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_device_parsed_from_flag() {
        let cfg = config(&["--device", "cpu"]);
        assert_eq!(cfg.device, Device::Cpu);
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let cfg = config(&["--confidence", "1.5"]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_tls_cert_without_key_rejected() {
        let cfg = config(&["--tls-cert", "server.pem"]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_tls_ca_without_identity_rejected() {
        let cfg = config(&["--tls-ca", "ca.pem"]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_full_tls_config_accepted() {
        let cfg = config(&[
            "--tls-cert",
            "server.pem",
            "--tls-key",
            "server.key",
            "--tls-ca",
            "ca.pem",
        ]);
        assert!(cfg.validate().is_ok());
    }
}
