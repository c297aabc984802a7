//! exforge-frontends: Presentation adapters for the attempt engine.
//!
//! Implements the `Frontend` trait for an interactive console, for
//! pre-recorded answer sheets, and for scripted tests, and loads the
//! configuration that picks between them.

pub mod answer_sheet;
pub mod config;
pub mod console;
pub mod scripted;

pub use answer_sheet::AnswerSheetFrontend;
pub use config::{create_frontend, load_config, load_config_from, ExforgeConfig, FrontendConfig};
pub use console::ConsoleFrontend;
pub use scripted::{ScriptedFrontend, Step, TranscriptHandle};
