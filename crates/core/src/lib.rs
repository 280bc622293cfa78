//! coachcall-core – Gemeinsame Typen fuer CoachCall
//!
//! - Session-IDs (Newtype ueber UUID)
//! - Anzeigesprache (`Language`)
//! - Zentraler Fehler-Enum (`CoachCallError`)
//! - Bridge-Zustand und UI-Events

pub mod error;
pub mod event;
pub mod types;

pub use error::{CoachCallError, Result};
pub use event::{BridgeEvent, BridgeState, TranskriptQuelle};
pub use types::{Language, SessionId};
