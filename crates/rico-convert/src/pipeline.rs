//! Deterministic parallel conversion.
//!
//! The pipeline sorts sample paths by their bytes, splits them into
//! fixed-size chunks and for each chunk:
//!
//! 1. hands every sample to a worker pool (`Dispatching`),
//! 2. blocks until the whole chunk is encoded (`AwaitingChunk`),
//! 3. inserts the results in sorted order inside one transaction.
//!
//! Worker completion order never reaches the store, so two runs over the
//! same input produce the same `data.mdb`. Any failure aborts the run; a
//! chunk is either committed whole or not at all.
//!
//! ```text
//! Idle -> Dispatching -> AwaitingChunk -> Committing -> Idle
//!              \               \               \
//!               +---------------+---------------+--> Aborted
//! ```

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use rico_core::{CompressionOptions, container};
use tracing::{debug, error, info, trace};

use crate::store::{DEFAULT_MAP_SIZE, Store, StoreEntry};
use crate::{ConvertError, ConvertResult, Dataset, Progress, SampleKey};

/// Default number of samples per transaction.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Conversion settings.
///
/// ```rust
/// use rico_convert::ConvertOptions;
///
/// let opts = ConvertOptions::default().with_num_workers(4).with_chunk_size(64);
/// assert_eq!(opts.chunk_size, 64);
/// assert!(opts.compression.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Samples per chunk and transaction.
    pub chunk_size: usize,
    /// Worker count, hardware parallelism if `None`.
    pub num_workers: Option<usize>,
    /// Compression applied to every container.
    pub compression: Option<CompressionOptions>,
    /// LMDB map size in bytes.
    pub map_size: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            num_workers: None,
            compression: None,
            map_size: DEFAULT_MAP_SIZE,
        }
    }
}

impl ConvertOptions {
    /// Sets the chunk size. Zero is treated as 1.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets the worker count.
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = Some(num_workers);
        self
    }

    /// Enables compression.
    pub fn with_compression(mut self, compression: CompressionOptions) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Sets the LMDB map size.
    pub fn with_map_size(mut self, map_size: usize) -> Self {
        self.map_size = map_size;
        self
    }
}

/// Where the pipeline is within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Between chunks.
    Idle,
    /// Chunk handed to the workers.
    Dispatching {
        /// Chunk index within the run.
        chunk: usize,
    },
    /// Waiting for every worker of the chunk.
    AwaitingChunk {
        /// Chunk index within the run.
        chunk: usize,
    },
    /// Writing the chunk transaction.
    Committing {
        /// Chunk index within the run.
        chunk: usize,
    },
    /// A failure ended the pipeline. Terminal.
    Aborted,
}

/// Totals of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Samples committed.
    pub samples: usize,
    /// Transactions committed.
    pub chunks: usize,
}

/// Drives chunked conversion into one store.
pub struct Pipeline<'a> {
    store: &'a Store,
    pool: ThreadPool,
    chunk_size: usize,
    state: Cell<PipelineState>,
    progress: &'a dyn Progress,
    #[cfg(test)]
    history: std::cell::RefCell<Vec<PipelineState>>,
}

impl<'a> Pipeline<'a> {
    /// Builds a pipeline writing to `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Pool`] if the worker pool cannot start.
    pub fn new(
        store: &'a Store,
        options: &ConvertOptions,
        progress: &'a dyn Progress,
    ) -> ConvertResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.num_workers.unwrap_or(0))
            .thread_name(|i| format!("rico-worker-{i}"))
            .build()?;
        debug!(workers = pool.current_num_threads(), chunk_size = options.chunk_size, "pipeline ready");
        Ok(Self {
            store,
            pool,
            chunk_size: options.chunk_size.max(1),
            state: Cell::new(PipelineState::Idle),
            progress,
            #[cfg(test)]
            history: Default::default(),
        })
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Converts `samples` and commits them chunk by chunk.
    ///
    /// `key` and `encode` run on the workers. The input is sorted by the
    /// raw bytes of each path first, so `tile-2/y` comes before `tile/x`;
    /// its incoming order does not matter.
    ///
    /// # Errors
    ///
    /// The first failing sample in sorted order of a chunk, or a
    /// [`ConvertError::KeyCollision`] from the commit, aborts the run.
    /// Chunks committed before the failure stay in the store.
    pub fn run<K, E>(
        &mut self,
        label: &str,
        mut samples: Vec<PathBuf>,
        key: K,
        encode: E,
    ) -> ConvertResult<RunReport>
    where
        K: Fn(&Path) -> ConvertResult<SampleKey> + Sync,
        E: Fn(&Path) -> ConvertResult<Vec<u8>> + Sync,
    {
        if self.state() == PipelineState::Aborted {
            return Err(ConvertError::PipelineAborted);
        }

        samples.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        info!(label, samples = samples.len(), "converting");
        self.progress.start(label, samples.len() as u64);

        let mut report = RunReport::default();
        for (index, chunk) in samples.chunks(self.chunk_size).enumerate() {
            match self.process_chunk(index, chunk, &key, &encode) {
                Ok(()) => {
                    report.samples += chunk.len();
                    report.chunks += 1;
                    self.progress.advance(chunk.len() as u64);
                }
                Err(e) => {
                    self.transition(PipelineState::Aborted);
                    self.progress.finish();
                    error!(label, chunk = index, error = %e, "conversion aborted");
                    return Err(e);
                }
            }
        }

        self.progress.finish();
        info!(label, samples = report.samples, chunks = report.chunks, "conversion finished");
        Ok(report)
    }

    fn process_chunk<K, E>(
        &self,
        index: usize,
        chunk: &[PathBuf],
        key: &K,
        encode: &E,
    ) -> ConvertResult<()>
    where
        K: Fn(&Path) -> ConvertResult<SampleKey> + Sync,
        E: Fn(&Path) -> ConvertResult<Vec<u8>> + Sync,
    {
        self.transition(PipelineState::Dispatching { chunk: index });
        let (tx, rx) = mpsc::channel();
        // Returns once every spawned sample has finished.
        self.pool.in_place_scope(|scope| {
            for (position, path) in chunk.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = key(path).and_then(|k| Ok((k, encode(path)?)));
                    // The receiver outlives the scope.
                    let _ = tx.send((position, result));
                });
            }
            self.transition(PipelineState::AwaitingChunk { chunk: index });
        });
        drop(tx);

        let mut results: Vec<(usize, ConvertResult<(SampleKey, Vec<u8>)>)> =
            rx.into_iter().collect();
        results.sort_by_key(|(position, _)| *position);
        // Collecting in order surfaces the first failure by sorted position.
        let encoded = results
            .into_iter()
            .map(|(_, result)| result)
            .collect::<ConvertResult<Vec<_>>>()?;

        self.transition(PipelineState::Committing { chunk: index });
        let entries: Vec<StoreEntry<'_>> = encoded
            .iter()
            .zip(chunk)
            .map(|((key, value), source)| StoreEntry {
                key: key.as_bytes(),
                value,
                source,
            })
            .collect();
        self.store.commit(&entries)?;

        self.transition(PipelineState::Idle);
        Ok(())
    }

    fn transition(&self, next: PipelineState) {
        trace!(from = ?self.state.get(), to = ?next, "pipeline state");
        self.state.set(next);
        #[cfg(test)]
        self.history.borrow_mut().push(next);
    }

    /// Converts one dataset's discovered samples.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run`].
    pub fn convert(
        &mut self,
        dataset: Dataset,
        samples: Vec<PathBuf>,
        compression: Option<&CompressionOptions>,
    ) -> ConvertResult<RunReport> {
        let strategy = dataset.strategy();
        self.run(
            dataset.name(),
            samples,
            |path| strategy.key(path),
            |path| {
                let record = strategy.extract(path)?;
                Ok(container::encode_with(&record, compression)?)
            },
        )
    }
}

/// Discovers the samples of `dataset` under `root`.
///
/// # Errors
///
/// Returns [`ConvertError::DiscoveryEmpty`] if nothing matches.
pub fn discover_samples(dataset: Dataset, root: &Path) -> ConvertResult<Vec<PathBuf>> {
    info!(dataset = dataset.name(), root = %root.display(), "searching for samples");
    let samples = rico_io::discover(root, &dataset.discovery_rule())?;
    if samples.is_empty() {
        return Err(ConvertError::DiscoveryEmpty {
            dataset: dataset.name(),
            root: root.to_path_buf(),
        });
    }
    debug!(dataset = dataset.name(), found = samples.len(), "samples found");
    Ok(samples)
}
