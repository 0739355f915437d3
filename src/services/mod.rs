//! Services module - station logic on top of the API and the shared state.
//!
//! Nothing here touches the terminal; every service talks to the server through
//! [`GameApi`](crate::api::GameApi) and reports to the user through
//! [`StateManager`](crate::state::StateManager) notifications.
//!
//! # Components
//!
//! - [`GameMutator`]: the shared borrow/return helper. Interactive callers use
//!   [`MutationMode::Remote`]; the scan pipeline uses [`MutationMode::LocalOnly`]
//!   because scan resolution already performed the action on the server.
//! - [`ScanPrompt`]: the single consumer of inconclusive scans. Pauses the scanner
//!   and waits for a borrow/return/dismiss choice.
//! - [`load_kiosk_data`] and [`KioskRefresher`]: fetch the program, open player
//!   searches and leaderboard, initially and after every completed slide round.

pub mod games;
pub mod kiosk_data;
pub mod prompt;

pub use games::{GameMutator, MutationMode};
pub use kiosk_data::{KioskRefresher, load_kiosk_data};
pub use prompt::{PromptChoice, PromptHandle, ScanPrompt};
