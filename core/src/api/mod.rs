//! Contribution modules.
//!
//! Each module is a thin typed surface over the bridge primitives: queries go
//! through the correlator, host notifications through the callback registry
//! and fire-and-forget commands through the publisher. Modules borrow the
//! bridge and hold no state of their own.

pub mod nav;
pub mod player;
pub mod room;
pub mod ui;

pub use nav::{CoWebsite, NavCommands};
pub use player::PlayerCommands;
pub use room::RoomCommands;
pub use ui::{Menu, MenuOptions, UiCommands};
