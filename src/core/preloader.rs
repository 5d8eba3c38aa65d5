//! Image preloader: one load per identifier, aggregated by a pure reducer.
//!
//! Outcomes are produced wherever the [`AssetLoader`] does its work and
//! delivered over a per-run channel. [`Preloader::pump`] drains the channel
//! on the owning thread and folds each outcome into [`PreloadStatus`] with
//! [`PreloadStatus::reduce`]. Settlement order is arbitrary; the reducer
//! ignores repeats and out-of-range indices, so interleaving cannot corrupt
//! the counters.
//!
//! A new run starts only when the image set changes by identity
//! (`Arc::ptr_eq`). Each run gets a fresh channel and [`RunId`]; outcomes
//! from a superseded run are discarded, and [`Preloader::detach`] drops the
//! receiver so nothing settles into a torn-down component.

use crate::core::loader::{AssetLoader, Completion, LoadError, LoadOutcome, RunId};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, trace, warn};
use std::sync::Arc;

/// Ordered, immutable list of image identifiers. Identity of the `Arc`
/// decides whether a new preload run starts.
pub type ImageSet = Arc<[String]>;

/// Build an [`ImageSet`] from anything yielding strings.
pub fn image_set<I, S>(urls: I) -> ImageSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    urls.into_iter().map(Into::into).collect::<Vec<String>>().into()
}

/// Settlement of a single identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum PreloadEvent {
    LoadSucceeded { index: usize, url: String },
    LoadFailed { index: usize, url: String, error: LoadError },
}

impl PreloadEvent {
    pub fn index(&self) -> usize {
        match self {
            PreloadEvent::LoadSucceeded { index, .. } | PreloadEvent::LoadFailed { index, .. } => *index,
        }
    }
}

/// Aggregate progress of one preload run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreloadStatus {
    pub total: usize,
    pub loaded_count: usize,
    pub error_count: usize,
    /// Identifiers that failed, in settlement order.
    pub failed_urls: Vec<String>,
    pub is_loading: bool,
    settled: Vec<bool>,
}

impl PreloadStatus {
    /// Fresh status for a run of `total` identifiers. An empty run is
    /// finished immediately.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            loaded_count: 0,
            error_count: 0,
            failed_urls: Vec::new(),
            is_loading: total > 0,
            settled: vec![false; total],
        }
    }

    pub fn settled_count(&self) -> usize {
        self.loaded_count + self.error_count
    }

    pub fn is_settled(&self, index: usize) -> bool {
        self.settled.get(index).copied().unwrap_or(false)
    }

    /// Loaded share in percent, rounded. 0 for an empty run.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.loaded_count as f64 / self.total as f64) * 100.0).round() as u32
    }

    /// Every identifier settled and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.is_loading && self.total > 0 && self.loaded_count == 0
    }

    /// Fold one settlement into the status.
    pub fn reduce(mut self, event: &PreloadEvent) -> Self {
        let index = event.index();
        if index >= self.total {
            trace!("Ignoring settlement for out-of-range index {}", index);
            return self;
        }
        if self.settled[index] {
            trace!("Ignoring repeated settlement for index {}", index);
            return self;
        }
        self.settled[index] = true;

        match event {
            PreloadEvent::LoadSucceeded { .. } => self.loaded_count += 1,
            PreloadEvent::LoadFailed { url, .. } => {
                self.error_count += 1;
                if !self.failed_urls.contains(url) {
                    self.failed_urls.push(url.clone());
                }
            }
        }
        self.is_loading = self.settled_count() < self.total;
        self
    }
}

/// Drives preload runs through an [`AssetLoader`] and keeps the assets that
/// loaded successfully.
pub struct Preloader<L: AssetLoader> {
    loader: L,
    images: Option<ImageSet>,
    run: RunId,
    status: PreloadStatus,
    assets: Vec<Option<L::Asset>>,
    receiver: Option<Receiver<LoadOutcome<L::Asset>>>,
    timeout_ms: Option<f64>,
    started_at_ms: Option<f64>,
}

impl<L: AssetLoader> Preloader<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            images: None,
            run: 0,
            status: PreloadStatus::default(),
            assets: Vec::new(),
            receiver: None,
            timeout_ms: None,
            started_at_ms: None,
        }
    }

    /// Fail identifiers still unsettled `timeout_ms` after their run started.
    /// `None` waits forever.
    pub fn with_timeout(mut self, timeout_ms: Option<f64>) -> Self {
        self.set_timeout(timeout_ms);
        self
    }

    pub fn set_timeout(&mut self, timeout_ms: Option<f64>) {
        self.timeout_ms = timeout_ms.filter(|t| t.is_finite() && *t >= 0.0);
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn status(&self) -> &PreloadStatus {
        &self.status
    }

    pub fn images(&self) -> Option<&ImageSet> {
        self.images.as_ref()
    }

    /// Current run id; 0 before the first run.
    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn is_attached(&self) -> bool {
        self.receiver.is_some()
    }

    /// Decoded asset for `index`, if it loaded.
    pub fn asset(&self, index: usize) -> Option<&L::Asset> {
        self.assets.get(index).and_then(Option::as_ref)
    }

    /// Start loading `images`. Returns false (and does nothing) when the
    /// same set is already attached.
    pub fn start(&mut self, images: ImageSet, now_ms: f64) -> bool {
        if self.is_attached() && self.images.as_ref().is_some_and(|cur| Arc::ptr_eq(cur, &images)) {
            trace!("Preloader: same image set, keeping run {}", self.run);
            return false;
        }
        if self.is_attached() {
            debug!("Preloader: superseding run {}", self.run);
            self.loader.cancel_run(self.run);
        }

        self.run += 1;
        let total = images.len();
        let (tx, rx): (Sender<LoadOutcome<L::Asset>>, _) = unbounded();
        self.receiver = Some(rx);
        self.status = PreloadStatus::new(total);
        self.assets = std::iter::repeat_with(|| None).take(total).collect();
        self.started_at_ms = Some(now_ms);

        info!("Preloading {} image(s) (run {})", total, self.run);
        self.loader.begin_run(self.run);
        for (index, url) in images.iter().enumerate() {
            self.loader
                .load(Completion::new(self.run, index, url.clone(), tx.clone()));
        }
        self.images = Some(images);
        true
    }

    /// Apply every outcome delivered since the last pump. Returns the
    /// settlements that changed the status, in application order.
    pub fn pump(&mut self) -> Vec<PreloadEvent> {
        let Some(rx) = self.receiver.as_ref() else {
            return Vec::new();
        };
        let outcomes: Vec<_> = rx.try_iter().collect();

        let mut applied = Vec::new();
        for outcome in outcomes {
            if outcome.run != self.run {
                trace!("Discarding outcome from superseded run {}", outcome.run);
                continue;
            }
            let event = match outcome.result {
                Ok(asset) => {
                    if let Some(slot) = self.assets.get_mut(outcome.index) {
                        if slot.is_none() && !self.status.is_settled(outcome.index) {
                            *slot = Some(asset);
                        }
                    }
                    PreloadEvent::LoadSucceeded {
                        index: outcome.index,
                        url: outcome.url,
                    }
                }
                Err(error) => PreloadEvent::LoadFailed {
                    index: outcome.index,
                    url: outcome.url,
                    error,
                },
            };
            if self.apply(&event) {
                applied.push(event);
            }
        }
        applied
    }

    /// Fail every outstanding identifier if the run has exceeded its timeout.
    pub fn expire(&mut self, now_ms: f64) -> Vec<PreloadEvent> {
        let (Some(timeout), Some(started)) = (self.timeout_ms, self.started_at_ms) else {
            return Vec::new();
        };
        if !self.status.is_loading || now_ms - started < timeout {
            return Vec::new();
        }
        let Some(images) = self.images.clone() else {
            return Vec::new();
        };

        let mut applied = Vec::new();
        for (index, url) in images.iter().enumerate() {
            if self.status.is_settled(index) {
                continue;
            }
            let event = PreloadEvent::LoadFailed {
                index,
                url: url.clone(),
                error: LoadError::TimedOut,
            };
            if self.apply(&event) {
                applied.push(event);
            }
        }
        if !applied.is_empty() {
            self.loader.cancel_run(self.run);
        }
        applied
    }

    /// Stop listening: late outcomes of the current run are dropped and the
    /// next `start` begins a fresh run even for the same image set.
    pub fn detach(&mut self) {
        if self.receiver.take().is_some() {
            debug!("Preloader: detached from run {}", self.run);
            self.loader.cancel_run(self.run);
        }
        self.started_at_ms = None;
    }

    fn apply(&mut self, event: &PreloadEvent) -> bool {
        let before = self.status.settled_count();
        self.status = std::mem::take(&mut self.status).reduce(event);
        if self.status.settled_count() == before {
            return false;
        }
        if let PreloadEvent::LoadFailed { url, error, .. } = event {
            warn!("Failed to load image {}: {}", url, error);
        }
        if !self.status.is_loading {
            info!(
                "Preload finished: {} loaded, {} failed (run {})",
                self.status.loaded_count, self.status.error_count, self.run
            );
        }
        true
    }
}

impl<L: AssetLoader> Drop for Preloader<L> {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::ManualLoader;

    fn io_error(path: &str) -> LoadError {
        LoadError::Io {
            path: path.into(),
            reason: "not found".into(),
        }
    }

    #[test]
    fn test_reducer_counts_and_completion() {
        let status = PreloadStatus::new(2);
        assert!(status.is_loading);

        let status = status.reduce(&PreloadEvent::LoadSucceeded { index: 1, url: "b".into() });
        assert_eq!((status.loaded_count, status.error_count), (1, 0));
        assert!(status.is_loading);

        let status = status.reduce(&PreloadEvent::LoadFailed {
            index: 0,
            url: "a".into(),
            error: io_error("a"),
        });
        assert_eq!((status.loaded_count, status.error_count), (1, 1));
        assert_eq!(status.failed_urls, vec!["a".to_string()]);
        assert!(!status.is_loading);
        assert_eq!(status.percent(), 50);
    }

    #[test]
    fn test_reducer_is_idempotent() {
        let ok = PreloadEvent::LoadSucceeded { index: 0, url: "a".into() };
        let status = PreloadStatus::new(3).reduce(&ok).reduce(&ok);
        assert_eq!(status.loaded_count, 1);

        let late_fail = PreloadEvent::LoadFailed {
            index: 0,
            url: "a".into(),
            error: io_error("a"),
        };
        let status = status.reduce(&late_fail);
        assert_eq!((status.loaded_count, status.error_count), (1, 0));

        let out_of_range = PreloadEvent::LoadSucceeded { index: 9, url: "z".into() };
        assert_eq!(status.clone().reduce(&out_of_range), status);
    }

    #[test]
    fn test_empty_set_finishes_immediately() {
        let mut preloader = Preloader::new(ManualLoader::<()>::new());
        assert!(preloader.start(image_set(Vec::<String>::new()), 0.0));
        assert!(!preloader.status().is_loading);
        assert_eq!(preloader.status().total, 0);
        assert_eq!(preloader.status().percent(), 0);
    }

    #[test]
    fn test_same_set_does_not_restart() {
        let mut preloader = Preloader::new(ManualLoader::<()>::new());
        let images = image_set(["a.png", "b.png"]);
        assert!(preloader.start(images.clone(), 0.0));
        assert!(!preloader.start(images, 0.0));
        assert_eq!(preloader.loader().pending_count(), 2);

        // Equal contents, different identity: new run
        assert!(preloader.start(image_set(["a.png", "b.png"]), 0.0));
        assert_eq!(preloader.run(), 2);
        assert_eq!(preloader.loader().cancelled_runs(), vec![1]);
    }

    #[test]
    fn test_stale_run_outcomes_are_discarded() {
        let mut preloader = Preloader::new(ManualLoader::<()>::new());
        preloader.start(image_set(["a.png", "b.png"]), 0.0);
        let stale = preloader.loader().take_from_run(1, 0).unwrap();

        preloader.start(image_set(["c.png"]), 0.0);
        stale.succeed(());
        assert!(preloader.pump().is_empty());
        assert_eq!(preloader.status().loaded_count, 0);
        assert!(preloader.status().is_loading);

        preloader.loader().succeed(0);
        assert_eq!(preloader.pump().len(), 1);
        assert_eq!(preloader.status().loaded_count, 1);
        assert!(!preloader.status().is_loading);
    }

    #[test]
    fn test_failures_are_recorded() {
        let mut preloader = Preloader::new(ManualLoader::<()>::new());
        preloader.start(image_set(["a.png", "b.png", "c.png"]), 0.0);
        preloader.loader().fail(2, io_error("c.png"));
        preloader.loader().succeed(0);
        preloader.pump();

        let status = preloader.status();
        assert_eq!(status.failed_urls, vec!["c.png".to_string()]);
        assert_eq!(status.settled_count(), 2);
        assert!(status.is_loading);
        assert!(preloader.asset(0).is_some());
        assert!(preloader.asset(2).is_none());
    }

    #[test]
    fn test_timeout_fails_outstanding() {
        let mut preloader = Preloader::new(ManualLoader::<()>::new()).with_timeout(Some(1000.0));
        preloader.start(image_set(["a.png", "b.png"]), 0.0);
        preloader.loader().succeed(0);
        preloader.pump();

        assert!(preloader.expire(999.0).is_empty());
        let expired = preloader.expire(1000.0);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].index(), 1);
        assert!(!preloader.status().is_loading);
        assert_eq!(preloader.status().failed_urls, vec!["b.png".to_string()]);
    }

    #[test]
    fn test_detach_drops_late_outcomes() {
        let mut preloader = Preloader::new(ManualLoader::<()>::new());
        preloader.start(image_set(["a.png"]), 0.0);
        preloader.detach();
        preloader.loader().succeed(0);
        assert!(preloader.pump().is_empty());
        assert_eq!(preloader.status().loaded_count, 0);
    }
}
