pub mod biquad;
pub mod cascade;
pub mod smoother;
pub mod synthesis;

pub use biquad::{BiquadStage, StageCoefficients};
pub use cascade::FilterCascade;
pub use smoother::LinearSmoother;
pub use synthesis::{synthesize, CoefficientSet, MAX_STAGES};
