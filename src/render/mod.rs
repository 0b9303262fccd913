/// Interfaces consumed from the host engine.
pub mod host;
/// Intermediate buffer lifecycle.
pub mod target;
