//! End-to-end runs of the batch driver over a label table on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use vistune_training::driver::s3_uri;
use vistune_training::jsonl::read_jsonl_records;
use vistune_training::{
    validate_record, BatchDriver, DriverOptions, ImageUploader, JsonlWriter, LabelColumns, LabelReader,
    NullProgressSink, ProgressEvent, ProgressSink, RecordBuilder, RunContext, TrainingError, TrainingResult,
};

/// Records every upload; fails for keys listed in `fail_keys`.
#[derive(Default)]
struct FakeUploader {
    uploads: Mutex<Vec<(PathBuf, String)>>,
    fail_keys: Vec<String>,
}

#[async_trait]
impl ImageUploader for FakeUploader {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> TrainingResult<String> {
        if self.fail_keys.iter().any(|k| k == key) {
            return Err(TrainingError::Upload(format!("access denied for {key}")));
        }
        self.uploads.lock().unwrap().push((local_path.to_path_buf(), key.to_string()));
        Ok(s3_uri(bucket, key))
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressSink for CollectingSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Fixture {
    temp: TempDir,
    images: PathBuf,
    labels: PathBuf,
}

fn fixture(csv: &str, images: &[&str]) -> Fixture {
    let temp = TempDir::new().unwrap();
    let images_dir = temp.path().join("images");
    std::fs::create_dir(&images_dir).unwrap();
    for name in images {
        std::fs::write(images_dir.join(name), b"\x89PNG").unwrap();
    }
    let labels = temp.path().join("labels.csv");
    std::fs::write(&labels, csv).unwrap();
    Fixture { temp, images: images_dir, labels }
}

fn options(images_dir: &Path) -> DriverOptions {
    DriverOptions {
        images_dir: images_dir.to_path_buf(),
        bucket: "invoices".to_string(),
        key_prefix: "nova/images".to_string(),
        account_id: "111122223333".to_string(),
    }
}

#[tokio::test]
async fn test_mixed_batch_counts_and_output() {
    let fx = fixture(
        "图片名称,销售方\n\
         inv1.png,ACME Trading Co\n\
         inv2.png,提取失败: timeout\n\
         inv3.png,   \n\
         inv4.png,处理失败\n\
         missing.png,Ghost Ltd\n\
         inv5.jpg,上海某某有限公司\n",
        &["inv1.png", "inv2.png", "inv3.png", "inv4.png", "inv5.jpg"],
    );

    let uploader = FakeUploader::default();
    let driver = BatchDriver::new(RecordBuilder::new(), &uploader, options(&fx.images));
    let out_path = fx.temp.path().join("out").join("training_data.jsonl");
    let mut out = JsonlWriter::create(&out_path).unwrap();
    let sink = CollectingSink::default();

    let rows = LabelReader::open(&fx.labels, &LabelColumns::default()).unwrap().rows();
    let summary = driver.run(rows, &mut out, RunContext::new(&sink)).await.unwrap();
    assert_eq!(out.finish().unwrap(), 2);

    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (2, 1, 3));
    assert_eq!(summary.total(), 6);
    assert_eq!(summary.failures.get("missing_image"), Some(&1));
    assert_eq!(summary.skips.get("failure_marker"), Some(&2));
    assert_eq!(summary.skips.get("empty_label"), Some(&1));

    // Skipped rows never reach the uploader.
    let keys: Vec<String> = uploader.uploads.lock().unwrap().iter().map(|(_, k)| k.clone()).collect();
    assert_eq!(keys, vec!["nova/images/inv1.png", "nova/images/inv5.jpg"]);

    let records = read_jsonl_records(&out_path).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| validate_record(r).is_ok()));
    assert_eq!(records[0].label(), Some("ACME Trading Co"));
    let image = records[0].images().next().unwrap();
    assert_eq!(image.format, "png");
    assert_eq!(image.source.s3_location.uri, "s3://invoices/nova/images/inv1.png");
    assert_eq!(image.source.s3_location.bucket_owner, "111122223333");
    assert_eq!(records[1].images().next().unwrap().format, "jpg");

    let events = sink.events.lock().unwrap();
    assert!(matches!(events.last(), Some(ProgressEvent::Finished { succeeded: 2, failed: 1, skipped: 3 })));
}

#[tokio::test]
async fn test_upload_failure_is_counted_and_run_continues() {
    let fx = fixture("图片名称,销售方\na.png,甲公司\nb.png,乙公司\n", &["a.png", "b.png"]);

    let uploader = FakeUploader { fail_keys: vec!["p/a.png".to_string()], ..Default::default() };
    let mut opts = options(&fx.images);
    opts.key_prefix = "p".to_string();
    let driver = BatchDriver::new(RecordBuilder::new(), &uploader, opts);
    let mut out = JsonlWriter::new(Vec::new());

    let rows = LabelReader::open(&fx.labels, &LabelColumns::default()).unwrap().rows();
    let summary = driver.run(rows, &mut out, RunContext::new(&NullProgressSink)).await.unwrap();

    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (1, 1, 0));
    assert_eq!(summary.failures.get("upload"), Some(&1));
    assert_eq!(out.lines(), 1);
}

#[tokio::test]
async fn test_short_row_counts_as_failed() {
    let fx = fixture("图片名称,销售方\nonly-image.png\n,no image\nok.png,OK\n", &["only-image.png", "ok.png"]);

    let uploader = FakeUploader::default();
    let driver = BatchDriver::new(RecordBuilder::new(), &uploader, options(&fx.images));
    let mut out = JsonlWriter::new(Vec::new());

    let rows = LabelReader::open(&fx.labels, &LabelColumns::default()).unwrap().rows();
    let summary = driver.run(rows, &mut out, RunContext::new(&NullProgressSink)).await.unwrap();

    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (1, 2, 0));
    assert_eq!(summary.failures.get("missing_field"), Some(&2));
}

#[tokio::test]
async fn test_jpeg_alias_produces_converse_valid_format() {
    let fx = fixture("图片名称,销售方\nscan.JPG,丙公司\n", &["scan.JPG"]);

    let uploader = FakeUploader::default();
    let driver = BatchDriver::new(RecordBuilder::new().with_jpeg_alias(true), &uploader, options(&fx.images));
    let out_path = fx.temp.path().join("training_data.jsonl");
    let mut out = JsonlWriter::create(&out_path).unwrap();

    let rows = LabelReader::open(&fx.labels, &LabelColumns::default()).unwrap().rows();
    driver.run(rows, &mut out, RunContext::new(&NullProgressSink)).await.unwrap();
    out.finish().unwrap();

    let records = read_jsonl_records(&out_path).unwrap();
    assert_eq!(records[0].images().next().unwrap().format, "jpeg");
}

#[tokio::test]
async fn test_image_names_outside_images_dir_are_rejected() {
    let temp = TempDir::new().unwrap();
    let secret = temp.path().join("secret.png");
    std::fs::write(&secret, b"\x89PNG").unwrap();
    let fx = fixture(
        &format!("图片名称,销售方\n{},ACME\n../secret.png,ACME\nok.png,OK\n", secret.display()),
        &["ok.png"],
    );
    std::fs::write(fx.temp.path().join("secret.png"), b"\x89PNG").unwrap();

    let uploader = FakeUploader::default();
    let driver = BatchDriver::new(RecordBuilder::new(), &uploader, options(&fx.images));
    let mut out = JsonlWriter::new(Vec::new());

    let rows = LabelReader::open(&fx.labels, &LabelColumns::default()).unwrap().rows();
    let summary = driver.run(rows, &mut out, RunContext::new(&NullProgressSink)).await.unwrap();

    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (1, 2, 0));
    assert_eq!(summary.failures.get("invalid_image_name"), Some(&2));
    let keys: Vec<String> = uploader.uploads.lock().unwrap().iter().map(|(_, k)| k.clone()).collect();
    assert_eq!(keys, vec!["nova/images/ok.png"]);
}

#[tokio::test]
async fn test_failure_marker_wins_over_missing_image_name() {
    let fx = fixture("图片名称,销售方\n,提取失败: timeout\n,  \n", &[]);

    let uploader = FakeUploader::default();
    let driver = BatchDriver::new(RecordBuilder::new(), &uploader, options(&fx.images));
    let mut out = JsonlWriter::new(Vec::new());

    let rows = LabelReader::open(&fx.labels, &LabelColumns::default()).unwrap().rows();
    let summary = driver.run(rows, &mut out, RunContext::new(&NullProgressSink)).await.unwrap();

    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (0, 0, 2));
    assert_eq!(summary.skips.get("failure_marker"), Some(&1));
    assert_eq!(summary.skips.get("empty_label"), Some(&1));
}
