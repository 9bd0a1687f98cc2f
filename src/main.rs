use std::{path::PathBuf, time::Instant};

use image::Rgb;
use textspot::{util::draw_results, OnnxEngine, PipelineConfig, TextSpotter};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let image_path = args
        .next()
        .unwrap_or_else(|| "tests/data/test_image.png".into());
    let annotated_path = args.next().map(PathBuf::from);

    let image = image::open(&image_path)?;
    let cache = PathBuf::from(".cache");
    std::fs::create_dir_all(&cache)?;
    let engine = OnnxEngine::builder()
        .det_model("tests/data/models/det.onnx")
        .cls_model("tests/data/models/cls.onnx")
        .rec_model(
            "tests/data/models/rec.onnx",
            "tests/data/models/ppocr_keys_v1.txt",
        )
        .with_engine_cache_path(cache)
        .max_side_len(2048)
        .build()?;
    let spotter = TextSpotter::<OnnxEngine>::builder()
        .config(PipelineConfig {
            classify: engine.has_classifier(),
            ..Default::default()
        })
        .threads(4)
        .build(engine)?;

    let start = Instant::now();
    let results = spotter.recognize(&image)?;
    log::debug!("Recognized {} lines in {:?}", results.len(), start.elapsed());

    println!("{}", serde_json::to_string_pretty(&results)?);

    if let Some(path) = annotated_path {
        draw_results(&image, &results, Rgb([255, 0, 0])).save(&path)?;
        log::info!("Saved annotated image to {}", path.display());
    }
    Ok(())
}
