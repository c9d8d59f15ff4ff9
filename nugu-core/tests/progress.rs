use std::sync::{Arc, Mutex};

use nugu_core::progress::{tap_diagnostics, LogScraper, ProgressDecoder, ProgressRecord};

const UPLOAD_LINE: &str = "Uploading 4137 article(s) from 1 file(s) totalling 2827.49 MiB.";

#[test]
fn upload_summary_sets_counts_and_size_only() {
    let mut decoder = LogScraper::new();

    let record = decoder.decode_line(UPLOAD_LINE).cloned().expect("line should match");

    assert_eq!(
        record,
        ProgressRecord {
            files: 1,
            articles: 4137,
            total_size: Some("2827.49 MiB".to_string()),
            read: 0,
            posted: 0,
            checked: 0,
        }
    );
}

#[test]
fn posting_progress_preserves_upload_summary() {
    let mut decoder = LogScraper::new();
    decoder.decode_line(UPLOAD_LINE);

    let record = decoder
        .decode_line("Article posting progress: 100 read, 98 posted, 95 checked")
        .cloned()
        .expect("line should match");

    assert_eq!(record.articles, 4137);
    assert_eq!(record.files, 1);
    assert_eq!(record.total_size.as_deref(), Some("2827.49 MiB"));
    assert_eq!((record.read, record.posted, record.checked), (100, 98, 95));
}

#[test]
fn checked_count_is_optional_and_kept_when_absent() {
    let mut decoder = LogScraper::new();
    decoder.decode_line("Article posting progress: 10 read, 9 posted, 8 checked");

    let record = decoder
        .decode_line("Article posting progress: 20 read, 19 posted")
        .cloned()
        .expect("line should match");

    assert_eq!((record.read, record.posted, record.checked), (20, 19, 8));
}

#[test]
fn log_level_prefixes_do_not_prevent_matching() {
    let mut decoder = LogScraper::new();
    assert!(decoder.decode_line("> Uploading 2 article(s) from 2 file(s) totalling 1.5 KiB").is_some());
    assert!(decoder
        .decode_line("[2024-03-01 10:00:00.000][INFO] Article posting progress: 2 read, 1 posted")
        .is_some());
    assert_eq!(decoder.record().posted, 1);
    assert_eq!(decoder.record().total_size.as_deref(), Some("1.5 KiB"));
}

#[test]
fn unrelated_and_malformed_lines_are_skipped() {
    let mut decoder = LogScraper::new();
    decoder.decode_line(UPLOAD_LINE);
    let before = decoder.record().clone();

    for line in [
        "",
        "[WARN] Connection reset, retrying",
        "Uploading many article(s) from 1 file(s) totalling 3 MiB",
        "Uploading 3 article(s) from 1 file(s) totalling 3 TiB",
        "Article posting progress: lots read",
    ] {
        assert!(decoder.decode_line(line).is_none(), "{line:?} should be skipped");
    }
    assert_eq!(decoder.record(), &before);
}

#[test]
fn unparseable_numbers_leave_their_field_untouched() {
    let mut decoder = LogScraper::new();
    decoder.decode_line("Article posting progress: 5 read, 4 posted");

    let record = decoder
        .decode_line("Article posting progress: 99999999999999999999999 read, 6 posted")
        .cloned()
        .expect("shape still matches");

    assert_eq!(record.read, 5);
    assert_eq!(record.posted, 6);
}

#[tokio::test]
async fn tap_mirrors_raw_lines_and_reports_cumulative_snapshots() {
    let log = b"[INFO] Reading input\n\
[INFO] Uploading 4 article(s) from 2 file(s) totalling 2.00 MiB\n\
garbage \xff line\n\
[INFO] Article posting progress: 4 read, 3 posted\n\
[INFO] Article posting progress: 4 read, 4 posted, 4 checked";
    let seen: Arc<Mutex<Vec<ProgressRecord>>> = Arc::default();
    let sink = seen.clone();
    let mut mirror = Vec::new();

    let last = tap_diagnostics(
        &log[..],
        &mut mirror,
        LogScraper::new(),
        Box::new(move |record: &ProgressRecord| sink.lock().unwrap().push(record.clone())),
    )
    .await
    .expect("tap should succeed");

    assert_eq!(mirror, log.to_vec(), "mirror must see the exact bytes");
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3, "only progress lines reach the observer");
    assert_eq!(seen[0].articles, 4);
    assert_eq!(seen[1].posted, 3);
    assert_eq!(seen[1].files, 2, "snapshots are cumulative");
    assert_eq!(seen[2], last);
    assert_eq!(last.checked, 4);
}

struct ClosedStderr;

impl tokio::io::AsyncWrite for ClosedStderr {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        _buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn tap_keeps_decoding_after_the_mirror_closes() {
    let log = b"[INFO] Uploading 4 article(s) from 2 file(s) totalling 2.00 MiB\n\
[INFO] Article posting progress: 4 read, 4 posted\n";
    let seen: Arc<Mutex<Vec<ProgressRecord>>> = Arc::default();
    let sink = seen.clone();

    let last = tap_diagnostics(
        &log[..],
        ClosedStderr,
        LogScraper::new(),
        Box::new(move |record: &ProgressRecord| sink.lock().unwrap().push(record.clone())),
    )
    .await
    .expect("a closed mirror must not stop the tap");

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(last.posted, 4);
    assert_eq!(last.articles, 4);
}
