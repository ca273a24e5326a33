// Sheet normalization: reading raw sheets and turning them into canonical records.
pub mod assembler;
pub mod column_mapper;
pub mod compound;
pub mod header_detector;
pub mod sheet_reader;

pub use assembler::{assemble, AssembleOptions, Assembly, Diagnostic, MappedColumn, NormalizeReport};
pub use header_detector::{detect_header, DetectOptions, DetectionMethod, HeaderLocation};
pub use sheet_reader::{read_sheet, ReadOptions};
