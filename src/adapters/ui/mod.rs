pub mod banner;
pub mod tui;

pub use banner::Session;

/// Prints the welcome banner and applies the prompt theme for all subsequent inquire prompts.
/// Call once at startup, after the store is chosen.
pub fn init_ui(session: &Session<'_>) {
    banner::print_welcome(session);
    tui::apply_theme();
}
