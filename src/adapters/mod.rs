// Adapters layer: concrete image sources and result sinks behind the domain ports.

pub mod capture;
pub mod sink;

pub use capture::{load_gray, reset_workspace, CaptureDirectory, FileImageSource};
pub use sink::CsvResultSink;
