pub mod classification;
pub mod fields;
pub mod qa;
pub mod report;
pub mod taxonomy;
pub mod units;
