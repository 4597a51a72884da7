mod workbook;

pub use workbook::LocalWorkbookInspector;
