//! Episode recording and accumulated experience.

pub mod episode;
pub mod error;
pub mod experience;
pub mod transition;

pub use episode::Episode;
pub use error::{XpError, XpResult};
pub use experience::{Experience, ExperienceLevel};
pub use transition::Transition;
