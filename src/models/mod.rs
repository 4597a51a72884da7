pub mod sheet;

pub use sheet::{InspectionReport, SheetDescription, SheetOutcome, SheetReport};
