//! Broadcast-based shutdown signaling.
//!
//! A single [`ShutdownTx`] is owned by the component that decides when the process
//! is terminating; every long-lived task holds a [`ShutdownRx`] subscribed from it.
//! The signal fires once and never resets: subscribers that check after the fact
//! still observe it, so late subscription cannot miss a shutdown.

use thiserror::Error;
use tokio::sync::watch;

/// Error returned when a shutdown signal cannot be delivered.
#[derive(Debug, Error)]
#[error("failed to signal shutdown: no subscribers are listening")]
pub struct ShutdownError;

/// Transmitter side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

/// Receiver side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownTx {
    /// Fires the shutdown signal, waking every subscriber.
    ///
    /// Firing more than once is harmless. Fails only when no receiver is alive to
    /// observe the signal.
    pub fn shutdown(&self) -> Result<(), ShutdownError> {
        self.0.send(true).map_err(|_| ShutdownError)
    }

    /// Creates a new receiver subscribed to this shutdown signal.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

impl ShutdownRx {
    /// Returns `true` once the shutdown signal has fired.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Waits until the shutdown signal fires.
    ///
    /// Resolves immediately when the signal already fired. A dropped transmitter is
    /// treated as shutdown so subscribers can never wait forever on a channel that
    /// nobody can fire anymore.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.0.clone();
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

/// Creates a new shutdown channel.
///
/// The channel starts in the "not shut down" state. We create a watch channel so a
/// single send reaches every subscriber and so the fired state is retained for
/// receivers that subscribe later.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn test_wait_resolves_after_shutdown() {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        assert!(!shutdown_rx.is_shutdown());

        shutdown_tx.shutdown().unwrap();

        assert!(shutdown_rx.is_shutdown());
        timeout(Duration::from_secs(1), shutdown_rx.wait_for_shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscriber_created_after_fire_observes_shutdown() {
        let (shutdown_tx, _shutdown_rx) = create_shutdown_channel();
        shutdown_tx.shutdown().unwrap();

        let late_rx = shutdown_tx.subscribe();
        assert!(late_rx.is_shutdown());
        timeout(Duration::from_secs(1), late_rx.wait_for_shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_all_subscribers_wake_on_shutdown() {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let other_rx = shutdown_tx.subscribe();

        let first = tokio::spawn(async move { shutdown_rx.wait_for_shutdown().await });
        let second = tokio::spawn(async move { other_rx.wait_for_shutdown().await });

        shutdown_tx.shutdown().unwrap();

        timeout(Duration::from_secs(1), first).await.unwrap().unwrap();
        timeout(Duration::from_secs(1), second)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_transmitter_counts_as_shutdown() {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        drop(shutdown_tx);

        timeout(Duration::from_secs(1), shutdown_rx.wait_for_shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_without_subscribers_fails() {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        drop(shutdown_rx);

        assert!(shutdown_tx.shutdown().is_err());
    }
}
