//! Text generation: hosted providers, rule-based templates and the strategy
//! that chains them

mod fallback;
mod provider;
mod template;

pub use fallback::*;
pub use provider::*;
pub use template::*;
