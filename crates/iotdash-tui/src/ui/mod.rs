//! Terminal UI module using ratatui.
//!
//! - `render`: routing guard and frame layout (loading, login, shell)
//! - `input`: keyboard handling for the login form and the shell
//! - `styles`: color scheme and text styling

pub mod input;
pub mod render;
pub mod styles;
