pub mod editor;
pub mod layout;
pub mod render;
pub mod text_metrics;
