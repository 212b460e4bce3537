pub mod health;
pub mod prewarm;
pub mod translate;

pub use health::{health_handler, ready_handler};
pub use prewarm::prewarm_handler;
pub use translate::translate_handler;
