use futures::Stream;
use tokio::runtime::Builder;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{EngineHandle, TelemetryEvent};
use crate::api::types::{ScanSummary, TickUpdate};
use crate::config::AppConfig;

impl EngineHandle {
    // ========================================================================
    // STREAM SUBSCRIPTIONS
    // ========================================================================

    pub fn subscribe_tick_updates(&self) -> mpsc::UnboundedReceiver<TickUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(mut broadcast_rx) = self.broadcasts.subscribe_tick_updates() {
            std::thread::spawn(move || {
                let rt = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("Failed to create Tokio runtime");
                rt.block_on(async move {
                    while let Ok(update) = broadcast_rx.recv().await {
                        if tx.send(update).is_err() {
                            break;
                        }
                    }
                });
            });
        }

        rx
    }

    pub fn subscribe_scan_summaries(&self) -> mpsc::UnboundedReceiver<ScanSummary> {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(mut broadcast_rx) = self.broadcasts.subscribe_scan_summaries() {
            std::thread::spawn(move || {
                let rt = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("Failed to create Tokio runtime");
                rt.block_on(async move {
                    while let Ok(summary) = broadcast_rx.recv().await {
                        if tx.send(summary).is_err() {
                            break;
                        }
                    }
                });
            });
        }

        rx
    }

    pub fn subscribe_telemetry(&self) -> mpsc::UnboundedReceiver<TelemetryEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut broadcast_rx = self.telemetry_tx.subscribe();

        std::thread::spawn(move || {
            let rt = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create Tokio runtime");
            rt.block_on(async move {
                while let Ok(event) = broadcast_rx.recv().await {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            });
        });

        rx
    }

    pub fn telemetry_receiver(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.telemetry_tx.subscribe()
    }

    // ========================================================================
    // ASYNC STREAM ADAPTERS
    // ========================================================================

    pub async fn tick_updates_stream(&self) -> impl Stream<Item = TickUpdate> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_tick_updates())
    }

    pub async fn scan_summaries_stream(&self) -> impl Stream<Item = ScanSummary> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_scan_summaries())
    }

    pub async fn telemetry_stream(&self) -> impl Stream<Item = TelemetryEvent> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_telemetry())
    }

    // ========================================================================
    // SNAPSHOT HELPERS
    // ========================================================================

    /// Milliseconds elapsed since the handle was created (used for telemetry).
    pub fn uptime_ms(&self) -> u64 {
        self.time_source
            .now()
            .saturating_duration_since(self.start_instant)
            .as_millis() as u64
    }

    /// Snapshot the current app configuration (tooling helper).
    pub fn config_snapshot(&self) -> AppConfig {
        self.config
            .read()
            .map(|config| config.clone())
            .unwrap_or_else(|err| err.into_inner().clone())
    }
}
