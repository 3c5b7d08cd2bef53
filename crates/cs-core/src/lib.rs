pub mod dice;
pub mod error;
pub mod numbers;
pub mod settings;
pub mod units;

pub use dice::Dice;
pub use error::ScriptError;
pub use numbers::*;
pub use settings::{ScriptLimits, ScriptSettings};
pub use units::*;
