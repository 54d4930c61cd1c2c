use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use spotter_core::detection::domain::label_table::LabelTable;
use spotter_core::detection::infrastructure::execution_provider::Device;
use spotter_core::detection::infrastructure::model_resolver;
use spotter_core::detection::infrastructure::onnx_entity_detector::OnnxEntityDetector;
use spotter_core::pipeline::entity_builder::EntityBuilder;
use spotter_core::pipeline::recognize_entities_use_case::RecognizeEntitiesUseCase;
use spotter_core::shared::entity::Entity;
use spotter_core::shared::media_type::MediaType;

/// Local entity recognition for image files.
#[derive(Parser)]
#[command(name = "spotter")]
struct Cli {
    /// Input image file(s), JPEG or PNG.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Detection model: a filesystem path, or a file name resolved against
    /// the model cache.
    #[arg(long, env = "SPOTTER_MODEL", default_value = "models/yolov8n.onnx")]
    model: String,

    /// Download URL used when the model is not present locally.
    #[arg(long, env = "SPOTTER_MODEL_URL")]
    model_url: Option<String>,

    /// Labels file, one label per line. Defaults to the built-in COCO table.
    #[arg(long, env = "SPOTTER_LABELS")]
    labels: Option<PathBuf>,

    /// Inference device: auto or cpu.
    #[arg(long, env = "SPOTTER_DEVICE", default_value = "auto")]
    device: Device,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = 0.25)]
    confidence: f32,

    /// Save entity crops into this directory.
    #[arg(long)]
    save_crops: Option<PathBuf>,

    /// Media type used when re-encoding entity crops.
    #[arg(long, default_value = "image/jpeg")]
    crop_media_type: String,

    /// Emit detections as JSON lines instead of plain text.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct EntityRecord<'a> {
    file: &'a str,
    label: &'a str,
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    confidence: f32,
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let crop_media_type = MediaType::parse(&cli.crop_media_type)?;

    let model_path = model_resolver::resolve(
        &cli.model,
        cli.model_url.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    let labels = match &cli.labels {
        Some(path) => LabelTable::from_path(path)?,
        None => LabelTable::coco(),
    };
    let detector = OnnxEntityDetector::new(&model_path, cli.device, cli.confidence)?;
    let pipeline = RecognizeEntitiesUseCase::new(Arc::new(detector), EntityBuilder::new(labels));

    for input in &cli.inputs {
        let bytes = fs::read(input)?;
        let entities = pipeline.execute(&bytes, None, crop_media_type)?;

        report(input, &entities, cli.json)?;
        if let Some(dir) = &cli.save_crops {
            save_crops(dir, &entities)?;
            tracing::info!(
                "Saved {} entity crops to {}",
                entities.len(),
                dir.display()
            );
        }
    }

    Ok(())
}

fn report(input: &Path, entities: &[Entity], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let file = input.display().to_string();
    for entity in entities {
        if json {
            let record = EntityRecord {
                file: &file,
                label: &entity.label,
                x1: entity.x1,
                y1: entity.y1,
                x2: entity.x2,
                y2: entity.y2,
                confidence: entity.confidence,
            };
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!(
                "Detected entity: {} (at {}, {}, {}, {}), confidence={:.2}",
                entity.label, entity.x1, entity.y1, entity.x2, entity.y2, entity.confidence
            );
        }
    }
    if entities.is_empty() && !json {
        println!("No entities detected in {file}");
    }
    Ok(())
}

fn save_crops(dir: &Path, entities: &[Entity]) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    for (index, entity) in entities.iter().enumerate() {
        let path = dir.join(crop_file_name(entity, index));
        fs::write(&path, &entity.image)?;
    }
    Ok(())
}

fn crop_file_name(entity: &Entity, index: usize) -> String {
    format!(
        "out_{}_{}.{}",
        entity.label.replace(' ', "-"),
        index,
        entity.media_type.extension()
    )
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(label: &str, media_type: MediaType) -> Entity {
        Entity {
            label: label.to_string(),
            x1: 1,
            y1: 2,
            x2: 3,
            y2: 4,
            confidence: 0.5,
            image: vec![0xFF],
            media_type,
        }
    }

    #[test]
    fn test_crop_file_name_uses_label_index_and_extension() {
        assert_eq!(
            crop_file_name(&entity("person", MediaType::Jpeg), 0),
            "out_person_0.jpg"
        );
        assert_eq!(
            crop_file_name(&entity("traffic light", MediaType::Png), 3),
            "out_traffic-light_3.png"
        );
    }

    #[test]
    fn test_save_crops_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let entities = vec![
            entity("person", MediaType::Jpeg),
            entity("dog", MediaType::Jpeg),
        ];
        save_crops(dir.path(), &entities).unwrap();
        assert!(dir.path().join("out_person_0.jpg").exists());
        assert!(dir.path().join("out_dog_1.jpg").exists());
    }
}
