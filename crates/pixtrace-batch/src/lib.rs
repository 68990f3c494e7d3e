//! pixtrace-batch: Conversion orchestration on top of the pure pipeline.
//!
//! [`convert()`] turns one decoded image into an SVG document by tracing,
//! embedding, or letting the recommender choose. [`process_batch()`] runs
//! many conversions on a bounded worker pool and reports per-item
//! outcomes in submission order. [`archive_entries()`] names the results
//! for packaging.
//!
//! Nothing here reads or writes files; callers decode images into
//! [`pixtrace_pipeline::PixelBuffer`]s and persist the entries themselves.

pub mod archive;
pub mod batch;
pub mod convert;

pub use archive::{ArchiveEntry, archive_entries, file_stem};
pub use batch::{BatchError, BatchItem, BatchJob, BatchOptions, ProgressFn, process_batch};
pub use convert::{Conversion, ConvertError, ConvertOptions, MethodSelection, convert};
