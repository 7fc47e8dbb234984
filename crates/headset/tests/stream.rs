//! End-to-end streaming scenarios against the mock transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use headset::session::{EEG_CHARACTERISTICS, SessionState};
use headset::transport::mock::MockTransport;
use headset::StreamCoordinator;
use headset_types::{HeadsetConfig, StreamSample};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn fast_config() -> HeadsetConfig {
    HeadsetConfig {
        buffer_capacity: 256,
        scan_timeout_ms: 50,
        tick_interval_ms: 5,
    }
}

fn collecting_callback() -> (
    Box<dyn FnMut(StreamSample) + Send>,
    mpsc::UnboundedReceiver<StreamSample>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Box::new(move |sample| {
            let _ = tx.send(sample);
        }),
        rx,
    )
}

/// Packs 12-bit samples behind a 2-byte sequence header, two per group.
fn frame_u12(samples: &[u16]) -> Vec<u8> {
    let mut payload = vec![0x00, 0x01];
    for pair in samples.chunks(2) {
        let a = pair[0];
        let b = pair.get(1).copied().unwrap_or(0);
        payload.push((a >> 4) as u8);
        payload.push((((a & 0x0f) << 4) | (b >> 8)) as u8);
        payload.push((b & 0xff) as u8);
    }
    payload
}

#[tokio::test]
async fn empty_scan_switches_to_synthetic_and_streams_without_connect() {
    let transport = MockTransport::new();
    let mut coordinator = StreamCoordinator::new(Arc::new(transport), fast_config());

    let devices = coordinator.scan().await.unwrap();
    assert!(devices.is_empty());
    assert!(coordinator.is_synthetic_mode());

    let (callback, mut rx) = collecting_callback();
    coordinator.start_streaming(callback).await;

    let sample = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert!((0.0..=100.0).contains(&sample.attention_score));
    coordinator.stop_streaming().await;
}

#[tokio::test]
async fn scan_failure_surfaces_but_still_starts_the_synthetic_stream() {
    let transport = MockTransport::new();
    transport.fail_next_scan("adapter unavailable");
    let mut coordinator = StreamCoordinator::new(Arc::new(transport), fast_config());

    assert!(coordinator.scan().await.is_err());
    assert!(coordinator.is_synthetic_mode());

    let (callback, mut rx) = collecting_callback();
    coordinator.start_streaming(callback).await;
    assert!(timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().is_some());
    coordinator.stop_streaming().await;
}

#[tokio::test]
async fn connect_failure_surfaces_but_still_starts_the_synthetic_stream() {
    let transport = MockTransport::new();
    transport.fail_next_connect("out of range");
    let mut coordinator = StreamCoordinator::new(Arc::new(transport), fast_config());

    assert!(coordinator.connect("dev-1").await.is_err());
    assert!(coordinator.is_synthetic_mode());

    let (callback, mut rx) = collecting_callback();
    coordinator.start_streaming(callback).await;
    assert!(timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().is_some());
    coordinator.stop_streaming().await;
}

#[tokio::test]
async fn hardware_path_streams_buffered_samples() {
    let transport = MockTransport::new();
    transport.add_device("dev-1", "Headset-7");
    let transport = Arc::new(transport);
    let mut coordinator = StreamCoordinator::new(transport.clone(), fast_config());

    let devices = coordinator.scan().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert!(!coordinator.is_synthetic_mode());

    coordinator.connect(&devices[0].id).await.unwrap();
    let link = transport.link().unwrap();

    // One decoded pair per scored lead, full-scale samples.
    for characteristic in &EEG_CHARACTERISTICS[..4] {
        link.notify(characteristic, &frame_u12(&[4095, 4095]));
    }

    let (callback, mut rx) = collecting_callback();
    coordinator.start_streaming(callback).await;

    let first = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    for value in first.raw_eeg {
        assert!((value - 0.48828125 * 2047.0).abs() < 1e-3);
    }
    // Far from a full window buffered: the score is the
    // insufficient-data sentinel, not an estimate. The attempt drains
    // whatever was left, so the next tick reads empty buffers as zeros.
    assert_eq!(first.attention_score, 0.0);

    let second = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(second.raw_eeg, [0.0; 4]);

    assert!(!coordinator.is_synthetic_mode());
    coordinator.stop_streaming().await;
    assert!(coordinator.session().is_none());
}

#[tokio::test]
async fn stop_streaming_halts_delivery_before_returning() {
    let transport = MockTransport::new();
    let mut coordinator = StreamCoordinator::new(Arc::new(transport), fast_config());
    coordinator.enable_synthetic_mode();

    let delivered = Arc::new(AtomicUsize::new(0));
    let delivered_clone = Arc::clone(&delivered);
    coordinator
        .start_streaming(Box::new(move |_| {
            delivered_clone.fetch_add(1, Ordering::Relaxed);
        }))
        .await;

    // Let a few ticks through, then stop.
    tokio::time::sleep(Duration::from_millis(30)).await;
    coordinator.stop_streaming().await;
    let at_stop = delivered.load(Ordering::Relaxed);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(delivered.load(Ordering::Relaxed), at_stop);
}

#[tokio::test]
async fn stop_streaming_twice_is_side_effect_free() {
    let transport = MockTransport::new();
    let mut coordinator = StreamCoordinator::new(Arc::new(transport), fast_config());

    // Stopping with nothing running is a no-op, not an error.
    coordinator.stop_streaming().await;

    coordinator.enable_synthetic_mode();
    let (callback, _rx) = collecting_callback();
    coordinator.start_streaming(callback).await;
    coordinator.stop_streaming().await;
    coordinator.stop_streaming().await;
    assert!(coordinator.is_synthetic_mode());
}

#[tokio::test]
async fn registering_a_new_consumer_silently_replaces_the_old_one() {
    let transport = MockTransport::new();
    let mut coordinator = StreamCoordinator::new(Arc::new(transport), fast_config());
    coordinator.enable_synthetic_mode();

    let first_count = Arc::new(AtomicUsize::new(0));
    let first_clone = Arc::clone(&first_count);
    coordinator
        .start_streaming(Box::new(move |_| {
            first_clone.fetch_add(1, Ordering::Relaxed);
        }))
        .await;

    let (second, mut rx) = collecting_callback();
    coordinator.start_streaming(second).await;

    // Once the replacement consumer sees a sample, the old one is out of
    // the loop for good.
    assert!(timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().is_some());
    let frozen = first_count.load(Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(first_count.load(Ordering::Relaxed), frozen);
    coordinator.stop_streaming().await;
}

#[tokio::test]
async fn forced_disconnect_idles_the_session_but_keeps_the_stream_alive() {
    let transport = MockTransport::new();
    transport.add_device("dev-1", "Headset-7");
    let transport = Arc::new(transport);
    let mut coordinator = StreamCoordinator::new(transport.clone(), fast_config());

    coordinator.connect("dev-1").await.unwrap();
    let (callback, mut rx) = collecting_callback();
    coordinator.start_streaming(callback).await;
    assert!(timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().is_some());

    // The headset walks away: the session idles, yet ticks keep coming
    // (empty reads surface as zeros, never silence).
    transport.link().unwrap().force_disconnect();
    assert_eq!(
        coordinator.session().unwrap().state(),
        SessionState::Idle
    );
    let sample = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(sample.attention_score, 0.0);
    coordinator.stop_streaming().await;
}

#[tokio::test]
async fn synthetic_mode_stays_set_after_scan_finds_hardware_later() {
    let transport = MockTransport::new();
    let transport_arc = Arc::new(transport);
    let mut coordinator = StreamCoordinator::new(transport_arc.clone(), fast_config());

    coordinator.scan().await.unwrap();
    assert!(coordinator.is_synthetic_mode());

    // A later scan that does find devices reports them, but the sticky
    // flag never clears on its own.
    transport_arc.add_device("dev-1", "Headset-7");
    let devices = coordinator.scan().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert!(coordinator.is_synthetic_mode());
}
