pub mod analyte;
pub mod enums;
pub mod report;

pub use analyte::*;
pub use enums::*;
pub use report::*;
