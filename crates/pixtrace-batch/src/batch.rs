//! Bounded parallel batch conversion.
//!
//! Jobs run on a dedicated `rayon` pool of at most
//! [`BatchOptions::max_workers`] threads. Each job owns its buffer; the
//! only shared state is the progress counter. Results come back in
//! submission order whatever order the workers finish in, and a failing
//! job never stops its siblings.

use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use pixtrace_pipeline::PixelBuffer;

use crate::convert::{Conversion, ConvertError, ConvertOptions, convert};

/// Progress callback: `(completed, total)`. Calls are serialized and
/// `completed` increases by one each time.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + Sync + 'a;

/// Batch-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Upper bound on concurrently running conversions. Zero is treated
    /// as one.
    pub max_workers: usize,
}

impl BatchOptions {
    /// Default worker bound.
    pub const DEFAULT_MAX_WORKERS: usize = 4;
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_workers: Self::DEFAULT_MAX_WORKERS,
        }
    }
}

/// One image to convert.
#[derive(Debug)]
pub struct BatchJob {
    /// Caller's name for the image, typically its file name.
    pub identifier: String,
    /// Decoded pixels, or the reason none are available.
    pub buffer: Result<PixelBuffer, ConvertError>,
    /// Per-image conversion options.
    pub options: ConvertOptions,
}

impl BatchJob {
    /// A job with decoded pixels.
    #[must_use]
    pub fn new(identifier: impl Into<String>, buffer: PixelBuffer, options: ConvertOptions) -> Self {
        Self {
            identifier: identifier.into(),
            buffer: Ok(buffer),
            options,
        }
    }

    /// A job whose image could not be decoded. It is reported as a
    /// failed item without running any conversion.
    #[must_use]
    pub fn undecodable(
        identifier: impl Into<String>,
        message: impl Into<String>,
        options: ConvertOptions,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            buffer: Err(ConvertError::Decode(message.into())),
            options,
        }
    }

    fn run(self) -> BatchItem {
        let outcome = self.buffer.and_then(|buffer| convert(&buffer, &self.options));
        match &outcome {
            Ok(conversion) => log::debug!(
                "{}: {} ok ({} bytes)",
                self.identifier,
                conversion.method,
                conversion.svg.len(),
            ),
            Err(err) => log::warn!("{}: {} ({})", self.identifier, err, err.kind()),
        }
        BatchItem {
            identifier: self.identifier,
            outcome,
        }
    }
}

/// The result for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    /// Identifier from the job.
    pub identifier: String,
    /// The conversion, or why it failed.
    pub outcome: Result<Conversion, ConvertError>,
}

impl BatchItem {
    /// Whether the conversion succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Errors that prevent a batch from running at all.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Convert every job, in parallel, returning items in submission order.
///
/// # Errors
///
/// Returns [`BatchError::ThreadPool`] if the worker pool cannot be built.
/// Per-image failures are reported in the items, never here.
pub fn process_batch(
    jobs: Vec<BatchJob>,
    options: &BatchOptions,
    progress: Option<&ProgressFn<'_>>,
) -> Result<Vec<BatchItem>, BatchError> {
    let total = jobs.len();
    let workers = options.max_workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("pixtrace-worker-{i}"))
        .build()?;

    log::info!("converting {total} images on {workers} workers");
    let completed = Mutex::new(0usize);

    let items: Vec<BatchItem> = pool.install(|| {
        jobs.into_par_iter()
            .map(|job| {
                let item = job.run();
                if let Some(report) = progress {
                    let mut done = completed.lock().unwrap_or_else(PoisonError::into_inner);
                    *done += 1;
                    report(*done, total);
                }
                item
            })
            .collect()
    });

    let failed = items.iter().filter(|item| !item.is_success()).count();
    log::info!("batch finished: {} ok, {failed} failed", total - failed);
    Ok(items)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn small_image(shade: u8) -> PixelBuffer {
        image::RgbImage::from_fn(20, 20, |x, y| {
            if (4..16).contains(&x) && (4..16).contains(&y) {
                image::Rgb([shade, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        })
        .into()
    }

    #[test]
    fn empty_batch_is_empty() {
        let items = process_batch(Vec::new(), &BatchOptions::default(), None).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn default_bound_is_four() {
        assert_eq!(BatchOptions::default().max_workers, 4);
    }

    #[test]
    fn order_is_preserved_with_many_workers() {
        let jobs: Vec<BatchJob> = (0..16)
            .map(|i| BatchJob::new(format!("img{i:02}.png"), small_image(i * 10), ConvertOptions::default()))
            .collect();
        let items = process_batch(jobs, &BatchOptions { max_workers: 8 }, None).unwrap();
        let names: Vec<String> = items.iter().map(|i| i.identifier.clone()).collect();
        let expected: Vec<String> = (0..16).map(|i| format!("img{i:02}.png")).collect();
        assert_eq!(names, expected);
        assert!(items.iter().all(BatchItem::is_success));
    }

    #[test]
    fn undecodable_job_fails_alone() {
        let jobs = vec![
            BatchJob::new("a.png", small_image(10), ConvertOptions::default()),
            BatchJob::undecodable("b.png", "truncated file", ConvertOptions::default()),
            BatchJob::new("c.png", small_image(30), ConvertOptions::default()),
        ];
        let items = process_batch(jobs, &BatchOptions::default(), None).unwrap();
        assert!(items[0].is_success());
        assert_eq!(
            items[1].outcome,
            Err(ConvertError::Decode("truncated file".to_owned()))
        );
        assert!(items[2].is_success());
    }

    #[test]
    fn progress_counts_up_to_total() {
        let calls = AtomicUsize::new(0);
        let last = Mutex::new(Vec::new());
        let report = |done: usize, total: usize| {
            calls.fetch_add(1, Ordering::SeqCst);
            last.lock().unwrap().push((done, total));
        };
        let jobs: Vec<BatchJob> = (0..6)
            .map(|i| BatchJob::new(format!("{i}.png"), small_image(0), ConvertOptions::default()))
            .collect();
        process_batch(jobs, &BatchOptions { max_workers: 3 }, Some(&report)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        let seen = last.into_inner().unwrap();
        let expected: Vec<(usize, usize)> = (1..=6).map(|d| (d, 6)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn zero_workers_still_runs() {
        let jobs = vec![BatchJob::new("a.png", small_image(0), ConvertOptions::default())];
        let items = process_batch(jobs, &BatchOptions { max_workers: 0 }, None).unwrap();
        assert_eq!(items.len(), 1);
    }
}
