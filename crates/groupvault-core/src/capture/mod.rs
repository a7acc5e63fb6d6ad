//! Raw capture records and their normalization into canonical form.

mod model;
mod normalize;

pub use model::{PostDate, RawCapture, RawFileCapture};
pub use normalize::{normalize, normalize_file};
