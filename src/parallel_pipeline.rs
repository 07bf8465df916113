// THEORY:
// Indexing a large collection is embarrassingly parallel: every image is
// fingerprinted on its own and the stages share nothing but the read-only
// configuration. `ParallelPipeline` spreads that work over a pool of tokio
// workers, one per CPU. A single dispatcher hands tasks out round-robin, each
// worker owns a clone of the `IconPipeline`, and results travel back over a
// oneshot channel per task, so callers simply await their own fingerprint.
//
// Decoding and fingerprinting are CPU-bound, so a worker never runs them on the
// async runtime itself: each task goes to `spawn_blocking`, and the worker
// awaits it before taking the next one. The pool therefore has at most one
// blocking job per worker in flight. Tasks may carry a decoded image or just a
// path; with a path the file is decoded on the blocking thread too, and only
// the small fingerprint ever comes back.
//
// Batches keep input order: result `i` always belongs to input `i`.

use crate::config::PipelineConfig;
use crate::error::{IconError, Result};
use crate::pipeline::{Fingerprint, IconPipeline};
use futures::future::join_all;
use image::DynamicImage;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

/// What a worker fingerprints.
pub enum FingerprintSource {
    Image(DynamicImage),
    /// A file, decoded on the worker.
    File(PathBuf),
}

pub struct FingerprintTask {
    pub source: FingerprintSource,
    pub result_sender: oneshot::Sender<Result<Fingerprint>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<FingerprintTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` workers. Must run inside a
    /// tokio runtime.
    pub fn new(pipeline: IconPipeline, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<FingerprintTask>();
        let mut workers = Vec::with_capacity(worker_count);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<FingerprintTask>())
            .unzip();

        // Dispatcher
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        for mut worker_receiver in worker_receivers {
            let worker_pipeline = pipeline.clone();

            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let job_pipeline = worker_pipeline.clone();
                    let source = task.source;
                    let fingerprint = tokio::task::spawn_blocking(move || match source {
                        FingerprintSource::Image(image) => job_pipeline.fingerprint(&image),
                        FingerprintSource::File(path) => job_pipeline.fingerprint_file(path),
                    })
                    .await
                    .unwrap_or_else(|_| Err(IconError::WorkerPool("Fingerprint job panicked")));
                    let _ = task.result_sender.send(fingerprint);
                }
            });

            workers.push(worker);
        }

        info!(workers = worker_count, "fingerprint worker pool started");
        Self { task_sender, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn fingerprint(&self, source: FingerprintSource) -> Result<Fingerprint> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = FingerprintTask { source, result_sender };

        self.task_sender
            .send(task)
            .map_err(|_| IconError::WorkerPool("Failed to send task to worker pool"))?;

        result_receiver
            .await
            .map_err(|_| IconError::WorkerPool("Failed to receive result from worker"))?
    }
}

pub struct ParallelPipeline {
    pipeline: IconPipeline,
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    /// A pool with one worker per logical CPU.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_workers(config, num_cpus::get())
    }

    pub fn with_workers(config: PipelineConfig, worker_count: usize) -> Result<Self> {
        let pipeline = IconPipeline::new(config)?;
        let worker_pool = WorkerPool::new(pipeline.clone(), worker_count);
        Ok(Self { pipeline, worker_pool })
    }

    /// The sequential pipeline the workers run, for hashing and comparisons.
    pub fn pipeline(&self) -> &IconPipeline {
        &self.pipeline
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    pub async fn fingerprint(&self, image: DynamicImage) -> Result<Fingerprint> {
        self.worker_pool.fingerprint(FingerprintSource::Image(image)).await
    }

    /// Decodes and fingerprints one file on a worker.
    pub async fn fingerprint_file(&self, path: impl Into<PathBuf>) -> Result<Fingerprint> {
        self.worker_pool.fingerprint(FingerprintSource::File(path.into())).await
    }

    /// Fingerprints every image concurrently. Result `i` belongs to `images[i]`.
    pub async fn fingerprint_batch(&self, images: Vec<DynamicImage>) -> Vec<Result<Fingerprint>> {
        join_all(images.into_iter().map(|image| self.fingerprint(image))).await
    }

    /// Decodes and fingerprints every file concurrently. Result `i` belongs to
    /// `paths[i]`. Decoded pixels never outlive their worker job.
    pub async fn fingerprint_files(&self, paths: Vec<PathBuf>) -> Vec<Result<Fingerprint>> {
        join_all(paths.into_iter().map(|path| self.fingerprint_file(path))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32, shift: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                ((x + shift) * 255 / (width + shift)) as u8,
                (y * 255 / height) as u8,
                ((x * y + shift) % 256) as u8,
            ])
        }))
    }

    #[tokio::test]
    async fn pool_matches_sequential_pipeline() {
        let parallel = ParallelPipeline::with_workers(PipelineConfig::default(), 3).expect("valid config");
        assert_eq!(parallel.worker_count(), 3);

        let image = gradient(160, 120, 7);
        let expected = parallel.pipeline().fingerprint(&image).expect("valid image");
        let got = parallel.fingerprint(image).await.expect("valid image");
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let parallel = ParallelPipeline::with_workers(PipelineConfig::default(), 2).expect("valid config");
        let images: Vec<DynamicImage> = (0..6).map(|i| gradient(90 + i * 13, 70 + i * 5, i * 31)).collect();
        let expected: Vec<Fingerprint> = images
            .iter()
            .map(|image| parallel.pipeline().fingerprint(image).expect("valid image"))
            .collect();

        let got = parallel.fingerprint_batch(images).await;
        assert_eq!(got.len(), expected.len());
        for (got, want) in got.into_iter().zip(expected) {
            assert_eq!(got.expect("valid image"), want);
        }
    }

    #[tokio::test]
    async fn failures_stay_in_their_slot() {
        let parallel = ParallelPipeline::with_workers(PipelineConfig::default(), 2).expect("valid config");
        let images = vec![
            gradient(40, 30, 0),
            DynamicImage::ImageRgb8(RgbImage::new(0, 0)),
            gradient(30, 40, 5),
        ];
        let results = parallel.fingerprint_batch(images).await;
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(IconError::InvalidDimensions { .. })));
        assert!(results[2].is_ok());
        assert!(parallel.fingerprint_batch(Vec::new()).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn files_are_decoded_on_the_workers() {
        let parallel = ParallelPipeline::with_workers(PipelineConfig::default(), 2).expect("valid config");
        let dir = std::env::temp_dir();
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| dir.join(format!("icon_dedup_pool_{}_{i}.png", std::process::id())))
            .collect();
        for (i, path) in paths.iter().enumerate() {
            gradient(80 + i as u32 * 10, 60, i as u32 * 17)
                .save(path)
                .expect("writable temp dir");
        }
        let mut inputs = paths.clone();
        inputs.insert(1, dir.join("icon_dedup_pool_missing.png"));

        let results = parallel.fingerprint_files(inputs).await;
        assert_eq!(results.len(), 4);
        assert!(results[1].is_err());
        for (result, path) in [&results[0], &results[2], &results[3]].into_iter().zip(&paths) {
            let fingerprint = result.as_ref().expect("decodable file");
            let expected = parallel.pipeline().fingerprint_file(path).expect("decodable file");
            assert_eq!(fingerprint, &expected);
            assert_eq!(fingerprint.icon.source_id(), Some(path.display().to_string().as_str()));
        }

        for path in &paths {
            let _ = std::fs::remove_file(path);
        }
    }

    #[tokio::test]
    async fn default_pool_uses_every_cpu() {
        let parallel = ParallelPipeline::new(PipelineConfig::default()).expect("valid config");
        assert_eq!(parallel.worker_count(), num_cpus::get().max(1));
    }
}
