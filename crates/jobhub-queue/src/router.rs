//! Queue router: the timer-driven dispatch loop.
//!
//! Every cycle drains the registered channels in order and dispatches each
//! message to the handler resolved by event name. Handler failures are
//! contained per item; channel-read failures follow the configured
//! [`ChannelFailureMode`].

use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::channel::{QueueChannel, QueueMessage};
use crate::registry::{HandlerRegistry, QueueController};

/// Default poll interval between cycles.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// What to do when a channel read fails mid-cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelFailureMode {
    /// Stop the loop: a broken data source is fatal.
    #[default]
    FailFast,
    /// Log the failure and continue with the remaining channels.
    SkipAndLog,
}

impl FromStr for ChannelFailureMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail_fast" => Ok(ChannelFailureMode::FailFast),
            "skip_and_log" | "skip" => Ok(ChannelFailureMode::SkipAndLog),
            _ => Err(anyhow::anyhow!("Invalid channel failure mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueRouterConfig {
    pub poll_interval_ms: u64,
    pub channel_failure_mode: ChannelFailureMode,
}

impl Default for QueueRouterConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            channel_failure_mode: ChannelFailureMode::default(),
        }
    }
}

struct RouterInner {
    registry: HandlerRegistry,
    channels: Vec<Arc<dyn QueueChannel>>,
    config: QueueRouterConfig,
}

/// Drives the poll loop. `start` spawns the loop task; `stop` signals it to
/// exit after the in-flight cycle completes.
pub struct QueueRouter {
    inner: Arc<RouterInner>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl QueueRouter {
    /// Aggregate routes and channels from the controllers, in registration
    /// order. The registry is immutable from here on.
    pub fn new(controllers: &[Arc<dyn QueueController>], config: QueueRouterConfig) -> Self {
        let registry = HandlerRegistry::from_controllers(controllers);
        let channels: Vec<Arc<dyn QueueChannel>> = controllers
            .iter()
            .flat_map(|controller| controller.channels())
            .collect();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            inner: Arc::new(RouterInner {
                registry,
                channels,
                config,
            }),
            shutdown_tx,
            shutdown_rx: Mutex::new(Some(shutdown_rx)),
        }
    }

    pub fn route_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn channel_count(&self) -> usize {
        self.inner.channels.len()
    }

    /// Spawn the poll loop task. Returns an error if already started.
    pub fn start(&self) -> Result<JoinHandle<()>> {
        let mut shutdown_rx = self
            .shutdown_rx
            .lock()
            .unwrap()
            .take()
            .context("Queue router already started")?;
        let inner = Arc::clone(&self.inner);

        Ok(tokio::spawn(async move {
            tracing::info!(
                poll_interval_ms = inner.config.poll_interval_ms,
                routes = inner.registry.len(),
                channels = inner.channels.len(),
                failure_mode = ?inner.config.channel_failure_mode,
                "Queue router started"
            );

            let poll_interval = Duration::from_millis(inner.config.poll_interval_ms);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Queue router shutting down");
                        break;
                    }
                    _ = sleep(poll_interval) => {
                        if let Err(e) = inner.run_cycle().await {
                            tracing::error!(error = %e, "Channel read failed, stopping queue router");
                            break;
                        }
                    }
                }
            }

            tracing::info!("Queue router stopped");
        }))
    }

    /// Signal the loop to stop after the current cycle. Await the handle
    /// returned by `start` to observe the drain.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    /// Run exactly one poll cycle. Only returns an error for a channel read
    /// failure under [`ChannelFailureMode::FailFast`]; handler failures are
    /// contained per message.
    pub async fn run_cycle(&self) -> Result<()> {
        self.inner.run_cycle().await
    }
}

impl RouterInner {
    async fn run_cycle(&self) -> Result<()> {
        for channel in &self.channels {
            let messages = match channel.poll().await {
                Ok(messages) => messages,
                Err(e) => match self.config.channel_failure_mode {
                    ChannelFailureMode::FailFast => {
                        return Err(e)
                            .with_context(|| format!("Channel {} read failed", channel.name()));
                    }
                    ChannelFailureMode::SkipAndLog => {
                        tracing::error!(
                            channel = channel.name(),
                            error = %e,
                            "Channel read failed, skipping for this cycle"
                        );
                        continue;
                    }
                },
            };

            for message in messages {
                self.dispatch(&message).await;
            }
        }
        Ok(())
    }

    /// Resolve and invoke the handler for one message. Never lets a handler
    /// error escape to the cycle.
    async fn dispatch(&self, message: &QueueMessage) {
        let Some(handler) = self.registry.resolve(&message.event_name) else {
            tracing::warn!(
                event_name = %message.event_name,
                event_id = %message.event.id,
                payload = %message.event.payload,
                "No handler registered for event, skipping"
            );
            return;
        };

        if let Err(e) = handler.handle(&message.event).await {
            tracing::error!(
                event_name = %message.event_name,
                event_id = %message.event.id,
                payload = %message.event.payload,
                error = %e,
                "Handler failed, continuing with next message"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_failure_mode_from_str() {
        assert_eq!(
            "fail_fast".parse::<ChannelFailureMode>().unwrap(),
            ChannelFailureMode::FailFast
        );
        assert_eq!(
            "skip_and_log".parse::<ChannelFailureMode>().unwrap(),
            ChannelFailureMode::SkipAndLog
        );
        assert_eq!(
            "skip".parse::<ChannelFailureMode>().unwrap(),
            ChannelFailureMode::SkipAndLog
        );
        assert!("whatever".parse::<ChannelFailureMode>().is_err());
    }

    #[test]
    fn router_config_defaults_match_documented_values() {
        let config = QueueRouterConfig::default();
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.channel_failure_mode, ChannelFailureMode::FailFast);
    }
}
