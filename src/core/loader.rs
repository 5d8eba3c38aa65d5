//! Asset loading seam for the preloader.
//!
//! The preloader never decodes anything itself. It hands one [`Completion`]
//! per identifier to an [`AssetLoader`]; whoever does the work settles the
//! completion exactly once (consuming it), and the outcome travels back over
//! a channel to the thread that owns the preloader.
//!
//! - [`FileLoader`]: decodes local files with the `image` crate on [`Workers`]
//! - [`ManualLoader`]: records requests and lets the caller settle them, for
//!   tests and scripted demos

use crate::core::workers::Workers;
use crossbeam_channel::Sender;
use log::{debug, trace};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Identifies one preload run. Monotonically increasing per preloader.
pub type RunId = u64;

/// Why a single asset failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("load did not settle before the timeout")]
    TimedOut,
}

/// Outcome of one load request, tagged with the run that issued it.
#[derive(Debug)]
pub struct LoadOutcome<A> {
    pub run: RunId,
    pub index: usize,
    pub url: String,
    pub result: Result<A, LoadError>,
}

/// One-shot completion handle for a single identifier.
///
/// Settling consumes the handle, so an identifier can settle at most once.
/// If the receiving preloader was detached or moved on to another run the
/// outcome is silently dropped.
#[derive(Debug)]
pub struct Completion<A> {
    run: RunId,
    index: usize,
    url: String,
    tx: Sender<LoadOutcome<A>>,
}

impl<A> Completion<A> {
    pub(crate) fn new(run: RunId, index: usize, url: String, tx: Sender<LoadOutcome<A>>) -> Self {
        Self { run, index, url, tx }
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Report the result for this identifier.
    pub fn settle(self, result: Result<A, LoadError>) {
        let outcome = LoadOutcome {
            run: self.run,
            index: self.index,
            url: self.url,
            result,
        };
        if self.tx.send(outcome).is_err() {
            trace!("Load outcome for run {} dropped (receiver detached)", self.run);
        }
    }

    pub fn succeed(self, asset: A) {
        self.settle(Ok(asset));
    }

    pub fn fail(self, error: LoadError) {
        self.settle(Err(error));
    }
}

/// Issues asynchronous loads. Implementations must settle every completion
/// they intend to finish exactly once; dropping a completion means that
/// identifier never settles.
pub trait AssetLoader {
    type Asset: Send + 'static;

    /// Called once before the loads of a new run are issued.
    fn begin_run(&self, _run: RunId) {}

    /// Start loading `request.url()`.
    fn load(&self, request: Completion<Self::Asset>);

    /// The run was superseded or torn down; pending work may be abandoned.
    fn cancel_run(&self, _run: RunId) {}
}

// ============================================================================
// File loader
// ============================================================================

/// RGBA8 pixels of a decoded frame.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// `[width, height]` as usize, the shape texture APIs expect.
    pub fn size(&self) -> [usize; 2] {
        [self.width as usize, self.height as usize]
    }
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Map an identifier to a local path. Accepts plain paths and `file://` URLs.
pub fn resolve_path(url: &str) -> Result<PathBuf, LoadError> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    match url.split_once("://") {
        Some((scheme, _)) => Err(LoadError::UnsupportedScheme(scheme.to_string())),
        None => Ok(PathBuf::from(url)),
    }
}

/// Read and decode one image file into RGBA8.
pub fn decode_file(url: &str) -> Result<DecodedImage, LoadError> {
    let path = resolve_path(url)?;
    decode_path(&path)
}

fn decode_path(path: &Path) -> Result<DecodedImage, LoadError> {
    let display = path.display().to_string();
    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => LoadError::Io {
            path: display.clone(),
            reason: io.to_string(),
        },
        other => LoadError::Decode {
            path: display.clone(),
            reason: other.to_string(),
        },
    })?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!("Decoded {} ({}x{})", display, width, height);
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Decodes local image files on a shared [`Workers`] pool.
///
/// Each loader keeps its own run epoch, so loaders sharing a pool never
/// cancel each other's jobs. Clones share the pool, not the epoch.
pub struct FileLoader {
    workers: Arc<Workers>,
    epoch: Arc<AtomicU64>,
}

impl Clone for FileLoader {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.workers))
    }
}

impl FileLoader {
    pub fn new(workers: Arc<Workers>) -> Self {
        Self {
            workers,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn workers(&self) -> &Arc<Workers> {
        &self.workers
    }
}

impl AssetLoader for FileLoader {
    type Asset = DecodedImage;

    // The epoch only moves forward, so a late call for an older run
    // cannot revive its queued jobs.
    fn begin_run(&self, run: RunId) {
        self.epoch.fetch_max(run, Ordering::SeqCst);
    }

    fn load(&self, request: Completion<DecodedImage>) {
        let run = request.run();
        self.workers.execute_with_epoch(&self.epoch, run, move || {
            let result = decode_file(request.url());
            request.settle(result);
        });
    }

    fn cancel_run(&self, run: RunId) {
        self.epoch.fetch_max(run + 1, Ordering::SeqCst);
    }
}

// ============================================================================
// Manual loader
// ============================================================================

/// Loader that only records requests. The caller decides when and how each
/// identifier settles, which makes completion order fully deterministic.
pub struct ManualLoader<A = ()> {
    pending: RefCell<Vec<Completion<A>>>,
    runs: RefCell<Vec<RunId>>,
    cancelled: RefCell<Vec<RunId>>,
}

impl<A> Default for ManualLoader<A> {
    fn default() -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
            runs: RefCell::new(Vec::new()),
            cancelled: RefCell::new(Vec::new()),
        }
    }
}

impl<A: Send + 'static> ManualLoader<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests issued and not yet settled, across all runs.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Urls of unsettled requests, in request order.
    pub fn pending_urls(&self) -> Vec<String> {
        self.pending.borrow().iter().map(|c| c.url().to_string()).collect()
    }

    /// Runs started so far, oldest first.
    pub fn runs(&self) -> Vec<RunId> {
        self.runs.borrow().clone()
    }

    /// Runs that were cancelled, oldest first.
    pub fn cancelled_runs(&self) -> Vec<RunId> {
        self.cancelled.borrow().clone()
    }

    /// Remove the newest unsettled request for `index`.
    pub fn take(&self, index: usize) -> Option<Completion<A>> {
        let mut pending = self.pending.borrow_mut();
        let pos = pending.iter().rposition(|c| c.index() == index)?;
        Some(pending.remove(pos))
    }

    /// Remove the unsettled request for `index` issued by `run`.
    pub fn take_from_run(&self, run: RunId, index: usize) -> Option<Completion<A>> {
        let mut pending = self.pending.borrow_mut();
        let pos = pending
            .iter()
            .position(|c| c.run() == run && c.index() == index)?;
        Some(pending.remove(pos))
    }

    /// Settle the newest request for `index` with `asset`. Returns false if
    /// there was nothing to settle.
    pub fn succeed_with(&self, index: usize, asset: A) -> bool {
        match self.take(index) {
            Some(completion) => {
                completion.succeed(asset);
                true
            }
            None => false,
        }
    }

    /// Fail the newest request for `index`.
    pub fn fail(&self, index: usize, error: LoadError) -> bool {
        match self.take(index) {
            Some(completion) => {
                completion.fail(error);
                true
            }
            None => false,
        }
    }

    /// Fail every unsettled request.
    pub fn fail_all(&self) {
        let drained: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for completion in drained {
            let path = completion.url().to_string();
            completion.fail(LoadError::Io {
                path,
                reason: "not found".into(),
            });
        }
    }
}

impl<A: Default + Send + 'static> ManualLoader<A> {
    /// Settle the newest request for `index` with a default asset.
    pub fn succeed(&self, index: usize) -> bool {
        self.succeed_with(index, A::default())
    }

    /// Settle every unsettled request successfully.
    pub fn succeed_all(&self) {
        let drained: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for completion in drained {
            completion.succeed(A::default());
        }
    }
}

impl<A: Send + 'static> AssetLoader for ManualLoader<A> {
    type Asset = A;

    fn begin_run(&self, run: RunId) {
        self.runs.borrow_mut().push(run);
    }

    fn load(&self, request: Completion<A>) {
        self.pending.borrow_mut().push(request);
    }

    fn cancel_run(&self, run: RunId) {
        self.cancelled.borrow_mut().push(run);
    }
}
