pub mod names;
pub mod numeric;

pub use names::normalize_name;
pub use numeric::{parse_bound, parse_numeric_str, parse_numeric_value};
