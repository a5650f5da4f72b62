/// Rendering helpers for the main window
///
/// - Nutrition metric cards (metrics.rs)

pub mod metrics;
