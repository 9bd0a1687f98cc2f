use std::{path::PathBuf, time::Instant};

use textspot::{OnnxEngine, PipelineConfig, TextSpotter};

// Needs the PaddleOCR models under tests/data/models and an onnxruntime library to load.
#[test]
#[ignore]
fn recognizes_sample_image() {
    let _ = env_logger::builder().is_test(true).try_init();

    let image = image::open("tests/data/test_image.png").expect("Failed to load test image");
    let cache = std::env!("CARGO_TARGET_TMPDIR");
    let cache = PathBuf::from(cache).join(".engine_cache");
    std::fs::create_dir_all(&cache).expect("Failed to create temp dir");
    let engine = OnnxEngine::builder()
        .det_model("tests/data/models/det.onnx")
        .cls_model("tests/data/models/cls.onnx")
        .rec_model(
            "tests/data/models/rec.onnx",
            "tests/data/models/ppocr_keys_v1.txt",
        )
        .with_engine_cache_path(cache)
        .max_side_len(2048)
        .build()
        .expect("Failed to build engine");
    assert!(engine.has_classifier());

    let spotter = TextSpotter::<OnnxEngine>::builder()
        .config(PipelineConfig {
            classify: true,
            ..Default::default()
        })
        .threads(2)
        .build(engine)
        .expect("Failed to build pipeline");
    let start = Instant::now();
    let results = spotter.recognize(&image).expect("Failed recognition.");
    log::debug!("{:?}", start.elapsed());

    assert!(results.len() > 1);
    assert!(results
        .iter()
        .all(|it| it.confidence >= spotter.config().rec_score_threshold));
    assert!(results
        .iter()
        .any(|it| it.text == "不行，头好痛-接下来要处理的事情太多了，现在必须好好休息·！"));
}
