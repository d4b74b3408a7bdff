//! Broker behaviour against the in-memory clipboard.

use std::io::Cursor;
use std::time::Duration;

use clipkit_clipboard::sys::memory::{self, MemoryAdapter};
use clipkit_clipboard::{Broker, BrokerConfig, ClipboardError, ContentKind, RetryPolicy};
use image::{ImageFormat, Rgba, RgbaImage};

fn broker(adapter: &MemoryAdapter) -> Broker<MemoryAdapter> {
    let config = BrokerConfig::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_retry(RetryPolicy::default().with_initial_backoff(Duration::from_millis(1)));
    Broker::new(adapter.clone(), config)
}

fn sample_png() -> (RgbaImage, Vec<u8>) {
    let image = RgbaImage::from_fn(3, 2, |x, y| {
        Rgba([(x * 80) as u8, (y * 120) as u8, 200, if x == 1 { 128 } else { 255 }])
    });
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png).unwrap();
    (image, png.into_inner())
}

#[test]
fn text_reads_back_as_written() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);

    broker.write(ContentKind::Text, "héllo, clipboard".as_bytes()).unwrap();
    assert_eq!(
        broker.read(ContentKind::Text).unwrap().as_deref(),
        Some("héllo, clipboard".as_bytes())
    );
    assert_eq!(broker.read_text().unwrap().as_deref(), Some("héllo, clipboard"));
}

#[test]
fn missing_kind_reads_as_none() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);
    assert_eq!(broker.read_text().unwrap(), None);

    broker.write_text("only text").unwrap();
    assert_eq!(broker.read(ContentKind::Image).unwrap(), None);
    assert_eq!(broker.read_paths().unwrap(), None);
}

#[test]
fn images_are_stored_as_bitmaps_and_read_as_png() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);
    let (image, png) = sample_png();

    broker.write(ContentKind::Image, &png).unwrap();

    let dib = adapter.contents(memory::BITMAP).unwrap();
    assert_eq!(&dib[0..4], &40u32.to_le_bytes());
    assert_eq!(dib.len(), 40 + 3 * 2 * 4);

    let read = broker.read(ContentKind::Image).unwrap().unwrap();
    let decoded = image::load_from_memory_with_format(&read, ImageFormat::Png)
        .unwrap()
        .into_rgba8();
    assert_eq!(decoded, image);
}

#[test]
fn invalid_png_leaves_clipboard_untouched() {
    let adapter = MemoryAdapter::new();
    adapter.insert_external(memory::TEXT, "keep me");
    let broker = broker(&adapter);

    let err = broker.write(ContentKind::Image, b"\x89PNG broken").unwrap_err();
    assert!(matches!(err, ClipboardError::Image(_)));
    assert_eq!(adapter.open_attempts(), 0);
    assert_eq!(adapter.store_count(), 0);
    assert_eq!(broker.read_text().unwrap().as_deref(), Some("keep me"));
}

#[test]
fn invalid_utf8_text_is_rejected() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);
    let err = broker.write(ContentKind::Text, &[0xc3, 0x28]).unwrap_err();
    assert!(matches!(err, ClipboardError::Text(_)));
    assert_eq!(adapter.store_count(), 0);
}

#[test]
fn busy_clipboard_is_retried() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);
    adapter.set_busy_opens(3);

    broker.write_text("eventually").unwrap();
    assert_eq!(adapter.open_attempts(), 4);
    assert_eq!(broker.read_text().unwrap().as_deref(), Some("eventually"));
}

#[test]
fn exhausted_retries_report_attempts() {
    let adapter = MemoryAdapter::new();
    let config = BrokerConfig::default().with_retry(
        RetryPolicy::new(3)
            .with_initial_backoff(Duration::from_millis(1))
            .with_max_backoff(Duration::from_millis(2)),
    );
    let broker = Broker::new(adapter.clone(), config);
    adapter.set_busy_opens(10);

    let err = broker.read(ContentKind::Text).unwrap_err();
    assert_eq!(err, ClipboardError::Unavailable { attempts: 3 });
    assert_eq!(adapter.open_attempts(), 3);
}

#[test]
fn rejected_store_is_reported() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);
    adapter.fail_next_store("read only");

    let err = broker.write_text("nope").unwrap_err();
    assert!(matches!(err, ClipboardError::Fail(msg) if msg.contains("read only")));
}

#[test]
fn path_lists_round_trip() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);
    let paths = ["/home/me/a.txt", "/home/me/b dir/c.png", "/home/me/a.txt"];

    broker.write_paths(&paths).unwrap();
    assert_eq!(
        adapter.contents(memory::PATH_LIST).as_deref(),
        Some(&br#"["/home/me/a.txt","/home/me/b dir/c.png","/home/me/a.txt"]"#[..])
    );
    assert_eq!(broker.read_paths().unwrap().unwrap(), paths);
}

#[test]
fn empty_path_list_write_changes_nothing() {
    let adapter = MemoryAdapter::new();
    adapter.insert_external(memory::TEXT, "still here");
    let broker = broker(&adapter);

    broker.write_paths::<&str>(&[]).unwrap();
    broker.write(ContentKind::FilePathList, b"[]").unwrap();
    assert_eq!(adapter.store_count(), 0);
    assert_eq!(broker.read_text().unwrap().as_deref(), Some("still here"));
}

#[test]
fn lists_available_kinds() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);
    assert!(broker.available_kinds().unwrap().is_empty());

    broker.write_text("x").unwrap();
    assert_eq!(broker.available_kinds().unwrap(), [ContentKind::Text]);

    broker.write_paths(&["/x"]).unwrap();
    assert_eq!(broker.available_kinds().unwrap(), [ContentKind::FilePathList]);
}

#[test]
fn change_signal_fires_when_content_is_replaced() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);

    let signal = broker.write_text("mine").unwrap();
    std::thread::sleep(Duration::from_millis(30));
    assert!(!signal.is_superseded());

    adapter.insert_external(memory::TEXT, "theirs");
    assert!(signal.wait_blocking());
}

#[test]
fn change_signal_stops_on_shutdown() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);

    let signal = broker.write_text("mine").unwrap();
    broker.shutdown();
    assert!(!signal.wait_blocking());
}

#[test]
fn shut_down_broker_refuses_calls() {
    let adapter = MemoryAdapter::new();
    let broker = broker(&adapter);
    broker.shutdown();

    assert!(broker.is_shut_down());
    assert_eq!(broker.read_text(), Err(ClipboardError::ShutDown));
    assert_eq!(
        broker.write_text("late").unwrap_err(),
        ClipboardError::ShutDown
    );
}
