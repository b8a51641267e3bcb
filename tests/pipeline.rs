//! Integration tests for whole split/merge runs.
//!
//! Inputs are generated in memory (or in a temp folder for on-disk runs), so
//! the suite needs no fixtures.
//!
//! Run with:
//!   cargo test --test pipeline

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stripcut::{
    process, process_blocking, process_to_file, AlphaPolicy, FileError, ImageSource,
    InputImage, NamingScheme, Operation, OutputFormat, ProcessOutput, RemainderPolicy,
    ResizeSpec, SplitMode, Stage, StripConfig, StripError, StripProgressCallback,
};
use zip::ZipArchive;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs through the test harness; `RUST_LOG=stripcut=debug`
/// shows them with `--nocapture`.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Solid image whose colour encodes `seed`, so merged strips can be told apart.
fn solid(width: u32, height: u32, seed: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([seed, 255 - seed, seed / 2]))
}

/// Image with a distinct value in every row.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(y % 251) as u8, (x % 251) as u8, ((x + y) % 7) as u8])
    })
}

fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn png_input(name: &str, img: RgbImage) -> InputImage {
    InputImage::new(name, png_bytes(&DynamicImage::ImageRgb8(img)))
}

fn png_config() -> StripConfig {
    StripConfig::builder()
        .output_format(OutputFormat::Png)
        .build()
        .unwrap()
}

/// Archive entries as (name, decoded image), in archive order.
fn read_archive(bytes: &[u8]) -> Vec<(String, DynamicImage)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            let img = image::load_from_memory(&data).unwrap();
            (file.name().to_string(), img)
        })
        .collect()
}

fn dims(entries: &[(String, DynamicImage)]) -> Vec<(u32, u32)> {
    entries.iter().map(|(_, i)| (i.width(), i.height())).collect()
}

fn names(output: &ProcessOutput) -> Vec<&str> {
    output.entries.iter().map(|e| e.name.as_str()).collect()
}

fn write_png(dir: &Path, name: &str, img: RgbImage) {
    std::fs::write(dir.join(name), png_bytes(&DynamicImage::ImageRgb8(img))).unwrap();
}

// ── Split ────────────────────────────────────────────────────────────────────

#[test]
fn split_tall_image_into_three_strips() {
    init_logging();
    let source = ImageSource::in_memory("long", vec![png_input("long.png", solid(800, 3000, 7))]);
    let output = process_blocking(
        source,
        &Operation::Split(SplitMode::Parts(3)),
        &StripConfig::default(),
    )
    .unwrap();

    assert_eq!(names(&output), ["long_1.jpg", "long_2.jpg", "long_3.jpg"]);
    let entries = read_archive(&output.archive);
    assert_eq!(dims(&entries), vec![(800, 1000); 3]);
    assert_eq!(output.stats.operation, "split");
    assert_eq!(output.stats.input_images, 1);
    assert_eq!(output.stats.output_images, 3);
    assert_eq!(output.stats.dropped_rows, 0);
    assert_eq!(output.stats.archive_bytes, output.archive.len());
}

#[test]
fn split_bands_match_source_rows() {
    let src = gradient(6, 12);
    let source = ImageSource::in_memory("g", vec![png_input("g.png", src.clone())]);
    let output = process_blocking(
        source,
        &Operation::Split(SplitMode::Parts(4)),
        &png_config(),
    )
    .unwrap();

    let entries = read_archive(&output.archive);
    assert_eq!(entries.len(), 4);
    for (i, (_, strip)) in entries.iter().enumerate() {
        let strip = strip.to_rgb8();
        assert_eq!(strip.dimensions(), (6, 3));
        for (x, y, px) in strip.enumerate_pixels() {
            assert_eq!(px, src.get_pixel(x, i as u32 * 3 + y));
        }
    }
}

#[test]
fn split_remainder_dropped_or_extended() {
    let make = || ImageSource::in_memory("r", vec![png_input("r.png", gradient(4, 10))]);
    let op = Operation::Split(SplitMode::Parts(3));

    let dropped = process_blocking(make(), &op, &png_config()).unwrap();
    assert_eq!(dims(&read_archive(&dropped.archive)), vec![(4, 3); 3]);
    assert_eq!(dropped.stats.dropped_rows, 1);

    let config = StripConfig::builder()
        .output_format(OutputFormat::Png)
        .remainder(RemainderPolicy::Extend)
        .build()
        .unwrap();
    let extended = process_blocking(make(), &op, &config).unwrap();
    assert_eq!(
        dims(&read_archive(&extended.archive)),
        vec![(4, 3), (4, 3), (4, 4)]
    );
    assert_eq!(extended.stats.dropped_rows, 0);
}

#[test]
fn split_by_min_height() {
    let source = ImageSource::in_memory("m", vec![png_input("m.png", gradient(5, 25))]);
    let output = process_blocking(
        source,
        &Operation::Split(SplitMode::MinHeight(10)),
        &png_config(),
    )
    .unwrap();
    // floor(25 / 10) = 2 bands of 12 rows, 1 row dropped.
    assert_eq!(dims(&read_archive(&output.archive)), vec![(5, 12); 2]);
    assert_eq!(output.stats.dropped_rows, 1);
}

#[test]
fn split_rejects_more_than_one_image() {
    let source = ImageSource::in_memory(
        "two",
        vec![
            png_input("1.png", solid(4, 4, 1)),
            png_input("2.png", solid(4, 4, 2)),
        ],
    );
    let err = process_blocking(
        source,
        &Operation::Split(SplitMode::Parts(2)),
        &StripConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, StripError::SplitRequiresSingleImage { count: 2 }));
    assert!(err.to_string().contains("select exactly one image"));
}

#[test]
fn split_with_zero_parts_is_invalid() {
    let source = ImageSource::in_memory("z", vec![png_input("z.png", solid(4, 4, 1))]);
    let err = process_blocking(
        source,
        &Operation::Split(SplitMode::Parts(0)),
        &StripConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, StripError::InvalidParameter(_)));
}

// ── Merge ────────────────────────────────────────────────────────────────────

#[test]
fn merge_five_images_in_pairs() {
    let images = (1..=5)
        .map(|i| png_input(&format!("{i}.png"), solid(800, 600, i as u8 * 40)))
        .collect();
    let output = process_blocking(
        ImageSource::in_memory("ch", images),
        &Operation::Merge { group_size: 2 },
        &StripConfig::default(),
    )
    .unwrap();

    assert_eq!(
        names(&output),
        ["ch_group_1.jpg", "ch_group_2.jpg", "ch_group_3.jpg"]
    );
    assert_eq!(
        dims(&read_archive(&output.archive)),
        vec![(800, 1200), (800, 1200), (800, 600)]
    );
    assert_eq!(output.stats.input_images, 5);
}

#[test]
fn merge_group_larger_than_set_fails() {
    let images = (1..=5)
        .map(|i| png_input(&format!("{i}.png"), solid(8, 6, i as u8)))
        .collect();
    let err = process_blocking(
        ImageSource::in_memory("ch", images),
        &Operation::Merge { group_size: 10 },
        &StripConfig::default(),
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains('5'), "{msg}");
    assert!(msg.contains("10"), "{msg}");
}

#[test]
fn merge_follows_numeric_order_not_upload_order() {
    // Uploaded out of order; img10 must land last.
    let images = vec![
        png_input("img2.png", solid(3, 2, 20)),
        png_input("img10.png", solid(3, 2, 100)),
        png_input("img1.png", solid(3, 2, 10)),
    ];
    let output = process_blocking(
        ImageSource::in_memory("ch", images),
        &Operation::Merge { group_size: 3 },
        &png_config(),
    )
    .unwrap();

    let merged = read_archive(&output.archive).remove(0).1.to_rgb8();
    assert_eq!(merged.dimensions(), (3, 6));
    assert_eq!(*merged.get_pixel(0, 0), solid(1, 1, 10)[(0, 0)]);
    assert_eq!(*merged.get_pixel(0, 2), solid(1, 1, 20)[(0, 0)]);
    assert_eq!(*merged.get_pixel(0, 4), solid(1, 1, 100)[(0, 0)]);
}

#[test]
fn merge_two_part_ordering() {
    let images = vec![
        png_input("02_01.png", solid(2, 1, 30)),
        png_input("01_10.png", solid(2, 1, 20)),
        png_input("01_02.png", solid(2, 1, 10)),
    ];
    let config = StripConfig::builder()
        .output_format(OutputFormat::Png)
        .ordering(stripcut::OrderingKey::TwoPart)
        .build()
        .unwrap();
    let output = process_blocking(
        ImageSource::in_memory("ch", images),
        &Operation::Merge { group_size: 3 },
        &config,
    )
    .unwrap();

    let merged = read_archive(&output.archive).remove(0).1.to_rgb8();
    let column: Vec<u8> = (0..3).map(|y| merged.get_pixel(0, y).0[0]).collect();
    assert_eq!(column, [10, 20, 30]);
}

#[test]
fn sequential_png_naming() {
    let images = (1..=3)
        .map(|i| png_input(&format!("{i}.png"), solid(4, 4, i as u8)))
        .collect();
    let config = StripConfig::builder()
        .naming(NamingScheme::Sequential)
        .output_format(OutputFormat::Png)
        .build()
        .unwrap();
    let output = process_blocking(
        ImageSource::in_memory("ignored", images),
        &Operation::Merge { group_size: 2 },
        &config,
    )
    .unwrap();
    assert_eq!(names(&output), ["merged_1.png", "merged_2.png"]);
}

#[test]
fn split_then_merge_restores_image() {
    let original = gradient(7, 24);
    let split = process_blocking(
        ImageSource::in_memory("page", vec![png_input("page.png", original.clone())]),
        &Operation::Split(SplitMode::Parts(4)),
        &png_config(),
    )
    .unwrap();

    let strips = read_archive(&split.archive)
        .into_iter()
        .map(|(name, img)| InputImage::new(name, png_bytes(&img)))
        .collect();
    let merged = process_blocking(
        ImageSource::in_memory("page", strips),
        &Operation::Merge { group_size: 4 },
        &png_config(),
    )
    .unwrap();

    assert_eq!(names(&merged), ["page_group_1.png"]);
    let restored = read_archive(&merged.archive).remove(0).1.to_rgb8();
    assert_eq!(restored, original);
}

#[test]
fn split_then_merge_restores_top_rows_when_remainder_dropped() {
    let original = gradient(5, 26);
    let parts = 4;
    let split = process_blocking(
        ImageSource::in_memory("page", vec![png_input("page.png", original.clone())]),
        &Operation::Split(SplitMode::Parts(parts)),
        &png_config(),
    )
    .unwrap();
    assert_eq!(split.stats.dropped_rows, 2);

    let strips = read_archive(&split.archive)
        .into_iter()
        .map(|(name, img)| InputImage::new(name, png_bytes(&img)))
        .collect();
    let merged = process_blocking(
        ImageSource::in_memory("page", strips),
        &Operation::Merge {
            group_size: parts as usize,
        },
        &png_config(),
    )
    .unwrap();

    let restored = read_archive(&merged.archive).remove(0).1.to_rgb8();
    let kept = parts * (26 / parts);
    assert_eq!(restored.dimensions(), (5, kept));
    let top = image::imageops::crop_imm(&original, 0, 0, 5, kept).to_image();
    assert_eq!(restored, top);
}

// ── Input handling ───────────────────────────────────────────────────────────

#[test]
fn undecodable_and_foreign_files_are_reported() {
    init_logging();
    let images = vec![
        png_input("1.png", solid(4, 4, 1)),
        InputImage::new("2.png", b"not an image".to_vec()),
        InputImage::new("notes.txt", b"hello".to_vec()),
        png_input("3.png", solid(4, 4, 3)),
    ];
    let output = process_blocking(
        ImageSource::in_memory("ch", images),
        &Operation::Merge { group_size: 2 },
        &StripConfig::default(),
    )
    .unwrap();

    assert_eq!(output.stats.input_images, 2);
    assert_eq!(output.entries.len(), 1);
    assert_eq!(output.skipped.len(), 2);
    assert!(output
        .skipped
        .iter()
        .any(|s| matches!(s, FileError::DecodeFailed { name, .. } if name == "2.png")));
    assert!(output
        .skipped
        .iter()
        .any(|s| matches!(s, FileError::UnsupportedExtension { name } if name == "notes.txt")));
}

#[test]
fn strict_decode_aborts() {
    let images = vec![
        png_input("1.png", solid(4, 4, 1)),
        InputImage::new("2.png", b"garbage".to_vec()),
    ];
    let config = StripConfig::builder().strict_decode(true).build().unwrap();
    let err = process_blocking(
        ImageSource::in_memory("ch", images),
        &Operation::Merge { group_size: 1 },
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, StripError::Decode { ref name, .. } if name == "2.png"));
}

#[test]
fn no_accepted_files_fails() {
    let err = process_blocking(
        ImageSource::in_memory("ch", vec![InputImage::new("a.gif", vec![1, 2])]),
        &Operation::Merge { group_size: 1 },
        &StripConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, StripError::NoImagesFound { .. }));
}

#[test]
fn resize_applies_before_split() {
    let config = StripConfig::builder()
        .output_format(OutputFormat::Png)
        .resize(ResizeSpec::new(Some(10), None))
        .build()
        .unwrap();
    let output = process_blocking(
        ImageSource::in_memory("r", vec![png_input("r.png", gradient(20, 40))]),
        &Operation::Split(SplitMode::Parts(2)),
        &config,
    )
    .unwrap();
    // Height is kept when only the width is given.
    assert_eq!(dims(&read_archive(&output.archive)), vec![(10, 20); 2]);
}

#[test]
fn transparent_pixels_follow_alpha_policy() {
    let rgba = RgbaImage::from_pixel(2, 4, Rgba([10, 20, 30, 0]));
    let input = || {
        ImageSource::in_memory(
            "t",
            vec![InputImage::new(
                "t.png",
                png_bytes(&DynamicImage::ImageRgba8(rgba.clone())),
            )],
        )
    };
    let op = Operation::Split(SplitMode::Parts(2));

    let discarded = process_blocking(input(), &op, &png_config()).unwrap();
    let strip = read_archive(&discarded.archive).remove(0).1;
    assert_eq!(strip.color(), image::ColorType::Rgb8);
    assert_eq!(*strip.to_rgb8().get_pixel(0, 0), Rgb([10, 20, 30]));

    let config = StripConfig::builder()
        .output_format(OutputFormat::Png)
        .alpha(AlphaPolicy::WHITE)
        .build()
        .unwrap();
    let composited = process_blocking(input(), &op, &config).unwrap();
    let strip = read_archive(&composited.archive).remove(0).1;
    assert_eq!(*strip.to_rgb8().get_pixel(0, 0), Rgb([255, 255, 255]));
}

// ── On-disk sources ──────────────────────────────────────────────────────────

#[test]
fn folder_merge_consumes_sources() {
    init_logging();
    let root = tempfile::TempDir::new().unwrap();
    let dir = root.path().join("chapter");
    std::fs::create_dir(&dir).unwrap();
    for i in 1..=3 {
        write_png(&dir, &format!("{i}.png"), solid(5, 5, i));
    }
    std::fs::write(dir.join("readme.txt"), "keep me").unwrap();

    let output = process_blocking(
        ImageSource::on_disk(&dir),
        &Operation::Merge { group_size: 2 },
        &StripConfig::default(),
    )
    .unwrap();

    assert_eq!(names(&output), ["chapter_group_1.jpg", "chapter_group_2.jpg"]);
    assert_eq!(output.stats.consumed_sources, 3);
    let left: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(left, ["readme.txt"]);
}

#[test]
fn folder_sources_kept_when_asked() {
    let root = tempfile::TempDir::new().unwrap();
    let dir = root.path().join("ch");
    std::fs::create_dir(&dir).unwrap();
    write_png(&dir, "long.png", gradient(3, 9));

    let config = StripConfig::builder().consume_sources(false).build().unwrap();
    let output = process_blocking(
        ImageSource::on_disk(&dir),
        &Operation::Split(SplitMode::Parts(3)),
        &config,
    )
    .unwrap();

    assert_eq!(names(&output), ["ch_1.jpg", "ch_2.jpg", "ch_3.jpg"]);
    assert_eq!(output.stats.consumed_sources, 0);
    assert!(dir.join("long.png").exists());
}

#[test]
fn failed_folder_run_keeps_sources() {
    let root = tempfile::TempDir::new().unwrap();
    let dir = root.path().join("ch");
    std::fs::create_dir(&dir).unwrap();
    write_png(&dir, "1.png", solid(2, 2, 1));
    write_png(&dir, "2.png", solid(2, 2, 2));

    let err = process_blocking(
        ImageSource::on_disk(&dir),
        &Operation::Split(SplitMode::Parts(2)),
        &StripConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, StripError::SplitRequiresSingleImage { .. }));
    assert!(dir.join("1.png").exists());
    assert!(dir.join("2.png").exists());
}

#[test]
fn missing_folder_is_reported() {
    let root = tempfile::TempDir::new().unwrap();
    let err = process_blocking(
        ImageSource::on_disk(root.path().join("nope")),
        &Operation::Merge { group_size: 2 },
        &StripConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, StripError::DirectoryNotFound { .. }));
}

// ── Async entry points ───────────────────────────────────────────────────────

#[derive(Default)]
struct CountingCallback {
    outputs: AtomicUsize,
    stages: std::sync::Mutex<Vec<Stage>>,
}

impl StripProgressCallback for CountingCallback {
    fn on_stage(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_output_complete(&self, _index: usize, _total: usize, _name: &str, _bytes: usize) {
        self.outputs.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn async_process_reports_progress() {
    let cb = Arc::new(CountingCallback::default());
    let config = StripConfig::builder()
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let output = process(
        ImageSource::in_memory("a", vec![png_input("a.png", solid(4, 8, 9))]),
        Operation::Split(SplitMode::Parts(2)),
        &config,
    )
    .await
    .unwrap();

    assert_eq!(output.entries.len(), 2);
    assert_eq!(cb.outputs.load(Ordering::SeqCst), 2);
    // In-memory runs have nothing to clean up.
    assert_eq!(
        *cb.stages.lock().unwrap(),
        [Stage::Loaded, Stage::Ordered, Stage::Transformed, Stage::Packaged]
    );
}

#[tokio::test]
async fn process_to_file_writes_archive() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("out").join("processed_images.zip");
    let images = (1..=4)
        .map(|i| png_input(&format!("p{i}.png"), solid(6, 3, i as u8)))
        .collect();

    let output = process_to_file(
        ImageSource::in_memory("ch", images),
        Operation::Merge { group_size: 2 },
        &StripConfig::default(),
        &path,
    )
    .await
    .unwrap();

    assert!(output.archive.is_empty());
    assert_eq!(
        output.stats.archive_bytes as u64,
        std::fs::metadata(&path).unwrap().len()
    );
    let bytes = std::fs::read(&path).unwrap();
    let entries = read_archive(&bytes);
    assert_eq!(dims(&entries), vec![(6, 6), (6, 6)]);
}

#[tokio::test]
async fn process_to_file_error_leaves_no_archive() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("processed_images.zip");
    let err = process_to_file(
        ImageSource::in_memory("ch", vec![png_input("1.png", solid(2, 2, 1))]),
        Operation::Merge { group_size: 3 },
        &StripConfig::default(),
        &path,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StripError::InsufficientImages { .. }));
    assert!(!path.exists());
}

#[tokio::test]
async fn concurrent_runs_are_isolated() {
    let config = png_config();
    let run = |seed: u8| {
        let config = config.clone();
        async move {
            process(
                ImageSource::in_memory(
                    format!("job{seed}"),
                    vec![png_input("x.png", solid(3, 6, seed))],
                ),
                Operation::Split(SplitMode::Parts(3)),
                &config,
            )
            .await
        }
    };

    let (a, b) = tokio::join!(run(1), run(2));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(names(&a), ["job1_1.png", "job1_2.png", "job1_3.png"]);
    assert_eq!(names(&b), ["job2_1.png", "job2_2.png", "job2_3.png"]);
    let pixel = |o: &ProcessOutput| read_archive(&o.archive)[0].1.to_rgb8()[(0, 0)];
    assert_eq!(pixel(&a), solid(1, 1, 1)[(0, 0)]);
    assert_eq!(pixel(&b), solid(1, 1, 2)[(0, 0)]);
}
