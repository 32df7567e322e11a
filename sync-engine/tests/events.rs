//! Observer delivery through the orchestrator.

mod common;

use std::sync::{Arc, Mutex};

use common::Harness;
use sync_engine::{StrategyKind, SyncEvent, SyncObserver};

#[derive(Default)]
struct Recorder {
    progress: Mutex<Vec<f64>>,
}

impl SyncObserver for Recorder {
    fn on_event(&self, event: &SyncEvent) {
        if let SyncEvent::Progress { progress, .. } = event {
            self.progress.lock().unwrap().push(*progress);
        }
    }
}

#[tokio::test]
async fn progress_is_monotonic_per_file() {
    let h = Harness::new(1, StrategyKind::Delta);
    let recorder = Arc::new(Recorder::default());
    h.orchestrator.add_observer(recorder.clone());
    let file = h.add_files(1).remove(0);

    h.orchestrator.synchronize(file).await.unwrap();

    let progress = recorder.progress.lock().unwrap().clone();
    assert_eq!(progress, vec![0.0, 0.5, 1.0]);
}

#[tokio::test]
async fn dropped_observer_is_not_called() {
    let h = Harness::new(1, StrategyKind::Full);
    let recorder = Arc::new(Recorder::default());
    h.orchestrator.add_observer(recorder.clone());
    let files = h.add_files(2);

    h.orchestrator.synchronize(files[0].clone()).await.unwrap();
    let weak = Arc::downgrade(&recorder);
    drop(recorder);

    h.orchestrator.synchronize(files[1].clone()).await.unwrap();
    assert!(weak.upgrade().is_none());
}

#[tokio::test]
async fn removed_observer_stops_receiving() {
    let h = Harness::new(1, StrategyKind::Full);
    let recorder = Arc::new(Recorder::default());
    let token = h.orchestrator.add_observer(recorder.clone());
    let files = h.add_files(2);

    h.orchestrator.synchronize(files[0].clone()).await.unwrap();
    h.orchestrator.remove_observer(token);
    h.orchestrator.synchronize(files[1].clone()).await.unwrap();

    assert_eq!(recorder.progress.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn started_precedes_completed() {
    let mut h = Harness::new(1, StrategyKind::Full);
    let file = h.add_files(1).remove(0);

    h.orchestrator.synchronize(file.clone()).await.unwrap();

    let events = h.drain_events();
    let started = events
        .iter()
        .position(|e| matches!(e, SyncEvent::Started(f) if f.id == file.id))
        .unwrap();
    let completed = events
        .iter()
        .position(|e| matches!(e, SyncEvent::Completed(r) if r.file().id == file.id))
        .unwrap();
    assert!(started < completed);
}
