// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::api::types::{ScanSummary, TickUpdate};

/// Manages all tokio broadcast channels
///
/// Single Responsibility: Broadcast channel lifecycle and subscription
///
/// This manager centralizes broadcast channel creation, storage, and
/// subscription handling for the session's observer surfaces.
///
/// # Channel Types
/// - Tick updates: per-output-tick crowd/volume payloads for observers
/// - Scan summaries: one message per completed scan window
pub struct BroadcastChannelManager {
    tick_updates: Arc<Mutex<Option<broadcast::Sender<TickUpdate>>>>,
    scan_summaries: Arc<Mutex<Option<broadcast::Sender<ScanSummary>>>>,
}

impl BroadcastChannelManager {
    /// Create a new BroadcastChannelManager with all channels uninitialized
    ///
    /// Channels must be explicitly initialized via init_* methods before use.
    pub fn new() -> Self {
        Self {
            tick_updates: Arc::new(Mutex::new(None)),
            scan_summaries: Arc::new(Mutex::new(None)),
        }
    }

    /// Initialize the tick-update broadcast channel
    ///
    /// Returns the sender the output cycle publishes through. Buffer size
    /// 100 messages: several minutes of ticks at the default cadence, so
    /// a briefly stalled subscriber only lags rather than gaps.
    pub fn init_tick_updates(&self) -> broadcast::Sender<TickUpdate> {
        let (tx, _) = broadcast::channel(100);
        *self.tick_updates.lock().unwrap() = Some(tx.clone());
        tx
    }

    /// Subscribe to tick updates
    ///
    /// Each subscriber receives independent copies of all messages.
    /// Returns None if init_tick_updates() has not been called yet.
    pub fn subscribe_tick_updates(&self) -> Option<broadcast::Receiver<TickUpdate>> {
        self.tick_updates
            .lock()
            .unwrap()
            .as_ref()
            .map(|tx| tx.subscribe())
    }

    /// Get the current tick-update sender, if the channel is initialized
    pub fn get_tick_sender(&self) -> Option<broadcast::Sender<TickUpdate>> {
        self.tick_updates.lock().unwrap().clone()
    }

    /// Initialize the scan-summary broadcast channel
    ///
    /// Returns the sender the scan cycle publishes through. Buffer size
    /// 50 messages: scans are an order of magnitude rarer than ticks.
    pub fn init_scan_summaries(&self) -> broadcast::Sender<ScanSummary> {
        let (tx, _) = broadcast::channel(50);
        *self.scan_summaries.lock().unwrap() = Some(tx.clone());
        tx
    }

    /// Subscribe to scan summaries
    ///
    /// Returns None if init_scan_summaries() has not been called yet.
    pub fn subscribe_scan_summaries(&self) -> Option<broadcast::Receiver<ScanSummary>> {
        self.scan_summaries
            .lock()
            .unwrap()
            .as_ref()
            .map(|tx| tx.subscribe())
    }

    /// Get the current scan-summary sender, if the channel is initialized
    pub fn get_scan_sender(&self) -> Option<broadcast::Sender<ScanSummary>> {
        self.scan_summaries.lock().unwrap().clone()
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new()
    }
}
