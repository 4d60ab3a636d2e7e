pub mod api;
pub mod app;
pub mod config;
pub mod logging;
pub mod note_diff;
pub mod note_preview;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod types;
pub mod ui;
pub mod util;

#[cfg(test)]
mod test_support;
