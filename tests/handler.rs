//! End-to-end tests through the public handle

use anthem_avr::protocol::WriteSink;
use anthem_avr::{AvrError, AvrHandle, ReconcilePhase, ReconcileTiming};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<String>>>);

impl RecordingSink {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl WriteSink for RecordingSink {
    fn write(&mut self, frame: &[u8]) -> anthem_avr::Result<()> {
        self.0.lock().push(String::from_utf8_lossy(frame).into_owned());
        Ok(())
    }
}

/// Sink whose transport is gone
struct BrokenSink;

impl WriteSink for BrokenSink {
    fn write(&mut self, _frame: &[u8]) -> anthem_avr::Result<()> {
        Err(AvrError::NotConnected)
    }
}

fn connected(timing: ReconcileTiming) -> (AvrHandle, RecordingSink, Arc<Mutex<Vec<String>>>) {
    let avr = AvrHandle::spawn(timing);
    let sink = RecordingSink::default();
    let notifications = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&notifications);
    avr.subscribe(Arc::new(move |raw: &str| seen.lock().push(raw.to_string())));
    avr.connection_made(Box::new(sink.clone()));
    (avr, sink, notifications)
}

#[tokio::test]
async fn test_startup_session() {
    let (avr, sink, notifications) = connected(ReconcileTiming::default());

    // Receiver answers in pieces, power first
    avr.feed(&b"P1P"[..]).await.unwrap();
    assert!(notifications.lock().is_empty());
    avr.feed(&b"0;P1VM-"[..]).await.unwrap();
    avr.feed(&b"45;P1S3;P1M0;"[..]).await.unwrap();

    assert_eq!(sink.take(), vec!["P1P?;"]);
    // Power was seeded "0", so only the zone attributes changed
    assert_eq!(*notifications.lock(), vec!["P1VM-45", "P1S3", "P1M0"]);

    let status = avr.status().await.unwrap();
    assert!(status.connected);
    assert!(!status.power);
    assert_eq!(status.attenuation, -45);
    assert_eq!(status.volume, 50);
    assert_eq!(status.input_number, Some(3));
    assert_eq!(status.source, Some("TV"));
    assert_eq!(avr.label("P1S").await.unwrap(), Some("TV"));
    assert_eq!(status.reconcile_phase, ReconcilePhase::Idle);

    let snapshot = serde_json::to_value(avr.snapshot().await.unwrap()).unwrap();
    assert_eq!(snapshot["values"]["P1VM"], "-45");
    assert_eq!(snapshot["reconciled"], false);
}

#[tokio::test]
async fn test_rejections_and_noise_leave_state_alone() {
    let (avr, _sink, notifications) = connected(ReconcileTiming::default());
    let before = avr.snapshot().await.unwrap();

    let results = avr
        .feed(&b";;Invalid Command P1X;Parameter Out-of-range P1V5;Zone2 Off;junk;"[..])
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    assert!(results[..3].iter().all(|r| r.recognized && !r.changed));
    assert!(!results[3].recognized);
    assert_eq!(avr.snapshot().await.unwrap(), before);
    assert!(notifications.lock().is_empty());
}

#[tokio::test]
async fn test_write_failures_are_swallowed() {
    let avr = AvrHandle::spawn(ReconcileTiming::default());
    avr.connection_made(Box::new(BrokenSink));

    avr.set_mute(true).await.unwrap();
    avr.refresh_all();
    assert!(avr.status().await.unwrap().connected);
}

#[tokio::test]
async fn test_requests_without_transport() {
    let avr = AvrHandle::spawn(ReconcileTiming::default());
    avr.set_volume(10).await.unwrap();
    assert_eq!(
        avr.set_input_name("Kaleidescape").await,
        Err(AvrError::UnknownInput("Kaleidescape".to_string()))
    );
    assert_eq!(avr.input_name().await.unwrap(), "Unknown");
    assert!(avr.input_list().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_power_on_supersedes_loop() {
    let timing = ReconcileTiming {
        initial_delay: Duration::from_secs(1),
        interval: Duration::from_secs(2),
    };
    let (avr, sink, _) = connected(timing);
    sink.take();

    avr.feed(&b"P1P1;"[..]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    // Power cycles before the first tick fires
    avr.feed(&b"P1P0;P1P1;"[..]).await.unwrap();

    // Old loop's tick at t=1s is stale, new loop fires at t=1.5s
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(sink.take().is_empty());
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(sink.take(), vec!["P1P?;", "P1V?;", "P1S?;", "P1M?;"]);

    avr.feed(&b"P1M0;"[..]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        avr.reconcile_phase().await.unwrap(),
        ReconcilePhase::Reconciled
    );
    assert!(avr.status().await.unwrap().reconciled);
}

#[tokio::test(start_paused = true)]
async fn test_zone_reply_with_power_on_still_refreshes() {
    let (avr, sink, _) = connected(ReconcileTiming::default());
    avr.feed(&b"P1P1;P1M0;"[..]).await.unwrap();
    sink.take();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(sink.take(), vec!["P1P?;", "P1V?;", "P1S?;", "P1M?;"]);
    assert_eq!(avr.reconcile_phase().await.unwrap(), ReconcilePhase::Polling);

    // Keeps refreshing until a zone answers after a refresh
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(sink.take().len(), 4);

    avr.feed(&b"P1S3;"[..]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(sink.take().is_empty());
    assert_eq!(
        avr.reconcile_phase().await.unwrap(),
        ReconcilePhase::Reconciled
    );
}

#[tokio::test(start_paused = true)]
async fn test_connection_lost_stops_polling() {
    let (avr, sink, _) = connected(ReconcileTiming::default());
    avr.feed(&b"P1P1;"[..]).await.unwrap();
    sink.take();

    avr.connection_lost(Some("reset by peer".to_string()));
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(sink.take().is_empty());
    let status = avr.status().await.unwrap();
    assert!(!status.connected);
    assert_ne!(status.reconcile_phase, ReconcilePhase::Polling);
}

#[tokio::test]
async fn test_shutdown_closes_handle() {
    let avr = AvrHandle::spawn(ReconcileTiming::default());
    avr.shutdown();
    assert_eq!(avr.feed(&b"P1P1;"[..]).await, Err(AvrError::HandlerClosed));
    assert!(!avr.is_alive());
}
