//! Handler registry: event name -> handler mapping, built once at startup
//! from the registered controllers and immutable afterward.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use jobhub_core::models::EmailEvent;

use crate::channel::QueueChannel;

/// Processes one work item for one event name.
#[async_trait]
pub trait QueueHandler: Send + Sync {
    async fn handle(&self, event: &EmailEvent) -> anyhow::Result<()>;
}

/// Feature-module contract: a controller supplies its routes and the
/// channels the router should poll. The router aggregates across all
/// controllers supplied at construction time.
pub trait QueueController: Send + Sync {
    /// `(event name, handler)` pairs this controller serves.
    fn routes(&self) -> Vec<(String, Arc<dyn QueueHandler>)>;

    /// Pollable message sources this controller exposes.
    fn channels(&self) -> Vec<Arc<dyn QueueChannel>>;
}

/// At most one handler per event name; a later registration for the same
/// name replaces the earlier one.
#[derive(Default)]
pub struct HandlerRegistry {
    routes: HashMap<String, Arc<dyn QueueHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry by inserting every controller's routes in order.
    pub fn from_controllers(controllers: &[Arc<dyn QueueController>]) -> Self {
        let mut registry = Self::new();
        for controller in controllers {
            for (event_name, handler) in controller.routes() {
                registry.register(event_name, handler);
            }
        }
        registry
    }

    pub fn register(&mut self, event_name: impl Into<String>, handler: Arc<dyn QueueHandler>) {
        let event_name = event_name.into();
        if self.routes.insert(event_name.clone(), handler).is_some() {
            tracing::debug!(event_name = %event_name, "Handler replaced (last registration wins)");
        }
    }

    pub fn resolve(&self, event_name: &str) -> Option<Arc<dyn QueueHandler>> {
        self.routes.get(event_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
