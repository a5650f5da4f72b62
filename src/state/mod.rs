/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - The aggregate view state and its transitions (view.rs)

pub mod data;
pub mod view;
