use sale_window::metrics::WindowMetrics;
use sale_window::{QueryEngine, SharedWindow, WindowService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub query_engine: QueryEngine,
    pub window: SharedWindow,
    pub metrics: Arc<WindowMetrics>,
}

impl AppState {
    pub fn new(service: &WindowService) -> Self {
        Self {
            query_engine: service.query_engine(),
            window: service.window().clone(),
            metrics: service.metrics(),
        }
    }
}
