// THEORY:
// The `parallel_pipeline` module runs the synchronous `DirectoryPipeline` off
// the request path and decides which result the user actually sees.
//
// Two pieces:
//   - `WorkerPool`: a dispatcher hands `ViewTask`s round-robin to a small set of
//     tokio workers. Each task carries a `CancellationToken`; a worker skips a
//     task whose token is already cancelled, and the caller stops waiting as
//     soon as the token fires.
//   - `ViewCoordinator`: owns the loaded listings, the last known position and
//     the published view. Every `refresh` takes a new generation number and
//     cancels the one before it. A finished view is only published if its
//     generation is newer than what is already on the `watch` channel, so a
//     slow, stale computation can never overwrite a fresher one.
//
// Listing loads and location readings are guarded the same way, each with its
// own generation counter.

use crate::core_modules::listing::{Coords, Listing};
use crate::core_modules::sample_data::sample_listings;
use crate::core_modules::translations::Notice;
use crate::error::{Result, TopikoError};
use crate::pipeline::{DirectoryPipeline, DirectoryView, ViewRequest};
use crate::sources::{ListingStore, LocationProvider};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const WORKER_POOL_MAX: usize = 4;

pub struct ViewTask {
    pub listings: Arc<Vec<Listing>>,
    pub request: ViewRequest,
    pub cancel: CancellationToken,
    pub result_sender: oneshot::Sender<DirectoryView>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<ViewTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Must be called from within a tokio runtime.
    pub fn new(pipeline: Arc<DirectoryPipeline>) -> Self {
        let size = num_cpus::get().clamp(1, WORKER_POOL_MAX);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<ViewTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| mpsc::unbounded_channel::<ViewTask>()).unzip();

        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_senders.len();
            }
        });

        let mut workers = Vec::with_capacity(size);
        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let pipeline = Arc::clone(&pipeline);
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    if task.cancel.is_cancelled() {
                        // Dropping the sender wakes the caller.
                        debug!(worker_id, "Skipping cancelled view task");
                        continue;
                    }
                    let view = pipeline.generate_view(&task.listings, &task.request);
                    let _ = task.result_sender.send(view);
                }
            }));
        }

        debug!(workers = size, "Worker pool started");
        Self { task_sender, workers }
    }

    /// Runs one request on a worker. `Ok(None)` means the token was cancelled
    /// before a result arrived.
    pub async fn process(
        &self,
        listings: Arc<Vec<Listing>>,
        request: ViewRequest,
        cancel: CancellationToken,
    ) -> Result<Option<DirectoryView>> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = ViewTask {
            listings,
            request,
            cancel: cancel.clone(),
            result_sender,
        };
        self.task_sender
            .send(task)
            .map_err(|_| TopikoError::CoordinatorClosed)?;

        tokio::select! {
            result = result_receiver => match result {
                Ok(view) => Ok(Some(view)),
                Err(_) if cancel.is_cancelled() => Ok(None),
                Err(_) => Err(TopikoError::CoordinatorClosed),
            },
            _ = cancel.cancelled() => Ok(None),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

/// A view that made it onto the coordinator's channel.
#[derive(Debug, Clone)]
pub struct PublishedView {
    pub generation: u64,
    pub view: Arc<DirectoryView>,
    /// Set while the listings on display are sample data.
    pub notice: Option<Notice>,
}

struct Catalogue {
    generation: u64,
    listings: Arc<Vec<Listing>>,
    notice: Option<Notice>,
}

struct StoredLocation {
    generation: u64,
    position: Option<Coords>,
}

struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

pub struct ViewCoordinator {
    pipeline: Arc<DirectoryPipeline>,
    store: Arc<dyn ListingStore>,
    locator: Arc<dyn LocationProvider>,
    worker_pool: WorkerPool,
    catalogue: RwLock<Catalogue>,
    location: RwLock<StoredLocation>,
    base_notice: Option<Notice>,
    load_counter: AtomicU64,
    location_counter: AtomicU64,
    in_flight: Mutex<InFlight>,
    shutdown: CancellationToken,
    view_sender: watch::Sender<Option<PublishedView>>,
}

impl ViewCoordinator {
    /// Starts with no listings; call `reload_listings` to populate.
    pub fn new(
        pipeline: Arc<DirectoryPipeline>,
        store: Arc<dyn ListingStore>,
        locator: Arc<dyn LocationProvider>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let (view_sender, _) = watch::channel(None);
        Self {
            worker_pool: WorkerPool::new(Arc::clone(&pipeline)),
            pipeline,
            store,
            locator,
            catalogue: RwLock::new(Catalogue {
                generation: 0,
                listings: Arc::new(Vec::new()),
                notice: None,
            }),
            location: RwLock::new(StoredLocation {
                generation: 0,
                position: None,
            }),
            base_notice: None,
            load_counter: AtomicU64::new(0),
            location_counter: AtomicU64::new(0),
            in_flight: Mutex::new(InFlight {
                generation: 0,
                cancel: shutdown.child_token(),
            }),
            shutdown,
            view_sender,
        }
    }

    /// Attaches a notice to every successful load, e.g. when the store is the
    /// built-in sample catalogue because no backend is configured.
    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.base_notice = Some(notice);
        self
    }

    pub fn pipeline(&self) -> &DirectoryPipeline {
        &self.pipeline
    }

    /// Fetches approved listings. A failing store is replaced by the sample
    /// catalogue rather than surfaced as an error. Returns `false` when a newer
    /// load finished first and this one was discarded.
    pub async fn reload_listings(&self) -> Result<bool> {
        self.ensure_open()?;
        let generation = self.load_counter.fetch_add(1, Ordering::SeqCst) + 1;

        let (listings, notice) = match self.store.fetch_approved().await {
            Ok(listings) => (listings, self.base_notice),
            Err(e) => {
                warn!("Error fetching listings, falling back to sample data: {e}");
                (sample_listings(), Some(Notice::SampleDataUnreachable))
            }
        };

        let mut catalogue = self.catalogue.write().await;
        if generation <= catalogue.generation {
            debug!(generation, current = catalogue.generation, "Discarding stale listing load");
            return Ok(false);
        }
        info!(generation, rows = listings.len(), "Listings loaded");
        *catalogue = Catalogue {
            generation,
            listings: Arc::new(listings),
            notice,
        };
        Ok(true)
    }

    /// Asks the location provider once. Any failure clears the stored position.
    /// A reading that finishes after a newer one is discarded; the position in
    /// effect afterwards is returned.
    pub async fn refresh_location(&self) -> Option<Coords> {
        let generation = self.location_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let position = match self.locator.current_position().await {
            Ok(coords) if coords.is_finite() => Some(coords),
            Ok(coords) => {
                warn!(?coords, "Ignoring non-finite position");
                None
            }
            Err(e) => {
                info!("Location unavailable, near-me filtering disabled: {e}");
                None
            }
        };

        let mut stored = self.location.write().await;
        if generation <= stored.generation {
            debug!(generation, current = stored.generation, "Discarding stale location reading");
            return stored.position;
        }
        *stored = StoredLocation { generation, position };
        position
    }

    pub async fn location(&self) -> Option<Coords> {
        self.location.read().await.position
    }

    pub async fn listings(&self) -> Arc<Vec<Listing>> {
        Arc::clone(&self.catalogue.read().await.listings)
    }

    pub async fn notice(&self) -> Option<Notice> {
        self.catalogue.read().await.notice
    }

    /// Computes a view without publishing it or touching the in-flight request.
    pub async fn compute(&self, request: ViewRequest) -> Result<DirectoryView> {
        self.ensure_open()?;
        let (listings, request, _) = self.prepare(request).await;
        self.worker_pool
            .process(listings, request, self.shutdown.child_token())
            .await?
            .ok_or(TopikoError::CoordinatorClosed)
    }

    /// Computes and publishes a view, superseding any refresh still running.
    /// `Ok(None)` means a newer refresh won.
    pub async fn refresh(&self, request: ViewRequest) -> Result<Option<PublishedView>> {
        self.ensure_open()?;
        let (generation, cancel) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight.cancel.cancel();
            in_flight.generation += 1;
            in_flight.cancel = self.shutdown.child_token();
            (in_flight.generation, in_flight.cancel.clone())
        };

        let (listings, request, notice) = self.prepare(request).await;
        let Some(view) = self.worker_pool.process(listings, request, cancel).await? else {
            if self.shutdown.is_cancelled() {
                return Err(TopikoError::CoordinatorClosed);
            }
            debug!(generation, "View refresh superseded before completion");
            return Ok(None);
        };

        Ok(self.publish(PublishedView {
            generation,
            view: Arc::new(view),
            notice,
        }))
    }

    /// Publishes `candidate` unless a view of the same or a newer generation is
    /// already out. Returns the view when it was accepted.
    pub(crate) fn publish(&self, candidate: PublishedView) -> Option<PublishedView> {
        let mut accepted = None;
        self.view_sender.send_if_modified(|current| {
            let newer = current
                .as_ref()
                .is_none_or(|published| candidate.generation > published.generation);
            if newer {
                *current = Some(candidate.clone());
                accepted = Some(candidate.clone());
            } else {
                debug!(generation = candidate.generation, "Discarding stale view");
            }
            newer
        });
        accepted
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PublishedView>> {
        self.view_sender.subscribe()
    }

    pub fn latest(&self) -> Option<PublishedView> {
        self.view_sender.borrow().clone()
    }

    /// Cancels everything in flight. Later calls fail with `CoordinatorClosed`.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        info!("View coordinator shut down");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(TopikoError::CoordinatorClosed);
        }
        Ok(())
    }

    /// Snapshots the listings and fills in the stored position when the
    /// request brings none of its own.
    async fn prepare(&self, mut request: ViewRequest) -> (Arc<Vec<Listing>>, ViewRequest, Option<Notice>) {
        if request.location.is_none() {
            request.location = self.location.read().await.position;
        }
        let catalogue = self.catalogue.read().await;
        (Arc::clone(&catalogue.listings), request, catalogue.notice)
    }
}

impl Drop for ViewCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::core_modules::catalog_filter::ListingFilter;
    use crate::error::LocationError;
    use crate::pipeline::ViewMode;
    use crate::sources::{FixedLocation, NoLocation, StaticListingStore};
    use futures::FutureExt;
    use futures::future::BoxFuture;

    struct FailingStore;

    impl ListingStore for FailingStore {
        fn fetch_approved(&self) -> BoxFuture<'_, Result<Vec<Listing>>> {
            futures::future::ready(Err(TopikoError::Store("connection refused".into()))).boxed()
        }
    }

    fn pipeline() -> Arc<DirectoryPipeline> {
        Arc::new(DirectoryPipeline::new(PipelineConfig::default()).expect("default config is valid"))
    }

    fn coordinator(store: impl ListingStore + 'static, locator: impl LocationProvider + 'static) -> ViewCoordinator {
        ViewCoordinator::new(pipeline(), Arc::new(store), Arc::new(locator))
    }

    fn empty_view() -> Arc<DirectoryView> {
        Arc::new(pipeline().generate_view(&[], &ViewRequest::default()))
    }

    #[tokio::test]
    async fn worker_pool_skips_cancelled_tasks() {
        let pool = WorkerPool::new(pipeline());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = pool
            .process(Arc::new(sample_listings()), ViewRequest::default(), cancel)
            .await
            .expect("pool is running");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn worker_pool_computes_views() {
        let pool = WorkerPool::new(pipeline());
        let view = pool
            .process(Arc::new(sample_listings()), ViewRequest::default(), CancellationToken::new())
            .await
            .expect("pool is running")
            .expect("not cancelled");
        assert_eq!(view.total_matches, sample_listings().len());
    }

    #[tokio::test]
    async fn refresh_publishes_increasing_generations() {
        let coordinator = coordinator(StaticListingStore::sample(), NoLocation(LocationError::Unsupported));
        assert!(coordinator.reload_listings().await.expect("open"));
        let mut updates = coordinator.subscribe();

        let first = coordinator
            .refresh(ViewRequest::default())
            .await
            .expect("open")
            .expect("nothing newer");
        let second = coordinator
            .refresh(ViewRequest {
                mode: ViewMode::Map,
                ..ViewRequest::default()
            })
            .await
            .expect("open")
            .expect("nothing newer");

        assert!(second.generation > first.generation);
        assert!(updates.has_changed().expect("sender alive"));
        let latest = updates.borrow_and_update().clone().expect("a view was published");
        assert_eq!(latest.generation, second.generation);
        assert_eq!(latest.view.mode, ViewMode::Map);
        assert!(latest.notice.is_none());
    }

    #[tokio::test]
    async fn stale_generation_never_overwrites_newer_view() {
        let coordinator = coordinator(StaticListingStore::sample(), NoLocation(LocationError::Unsupported));
        let newer = PublishedView {
            generation: 7,
            view: empty_view(),
            notice: None,
        };
        let older = PublishedView {
            generation: 3,
            view: empty_view(),
            notice: None,
        };

        assert!(coordinator.publish(newer).is_some());
        assert!(coordinator.publish(older).is_none());
        assert_eq!(coordinator.latest().map(|p| p.generation), Some(7));
    }

    #[tokio::test]
    async fn failing_store_falls_back_to_sample_data() {
        let coordinator = coordinator(FailingStore, NoLocation(LocationError::Unsupported));
        assert!(coordinator.reload_listings().await.expect("open"));
        assert_eq!(coordinator.listings().await.len(), sample_listings().len());
        assert_eq!(coordinator.notice().await, Some(Notice::SampleDataUnreachable));

        let published = coordinator
            .refresh(ViewRequest::default())
            .await
            .expect("open")
            .expect("nothing newer");
        assert_eq!(published.notice, Some(Notice::SampleDataUnreachable));
    }

    #[tokio::test]
    async fn configured_notice_is_attached_to_loads() {
        let coordinator = coordinator(StaticListingStore::sample(), NoLocation(LocationError::Unsupported))
            .with_notice(Notice::SampleDataUnconfigured);
        coordinator.reload_listings().await.expect("open");
        assert_eq!(coordinator.notice().await, Some(Notice::SampleDataUnconfigured));
    }

    #[tokio::test]
    async fn stored_location_feeds_near_me() {
        let athens = Coords::new(37.9838, 23.7275);
        let coordinator = coordinator(StaticListingStore::sample(), FixedLocation(athens));
        coordinator.reload_listings().await.expect("open");
        assert_eq!(coordinator.refresh_location().await, Some(athens));

        let view = coordinator
            .compute(ViewRequest {
                filter: ListingFilter {
                    near_me: true,
                    ..ListingFilter::default()
                },
                ..ViewRequest::default()
            })
            .await
            .expect("open");
        assert!(!view.location_prompt);
        assert_eq!(view.total_matches, 2);
    }

    #[tokio::test]
    async fn denied_location_prompts_instead_of_failing() {
        let coordinator = coordinator(StaticListingStore::sample(), NoLocation(LocationError::PermissionDenied));
        coordinator.reload_listings().await.expect("open");
        assert_eq!(coordinator.refresh_location().await, None);

        let view = coordinator
            .compute(ViewRequest {
                filter: ListingFilter {
                    near_me: true,
                    ..ListingFilter::default()
                },
                ..ViewRequest::default()
            })
            .await
            .expect("open");
        assert!(view.location_prompt);
    }

    /// Answers the first call slowly with Heraklion, every later call at once
    /// with Athens.
    struct SlowFirstReading {
        calls: std::sync::atomic::AtomicUsize,
    }

    const ATHENS: Coords = Coords {
        latitude: 37.9838,
        longitude: 23.7275,
    };
    const HERAKLION: Coords = Coords {
        latitude: 35.3387,
        longitude: 25.1442,
    };

    impl LocationProvider for SlowFirstReading {
        fn current_position(&self) -> BoxFuture<'_, std::result::Result<Coords, LocationError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                    Ok(HERAKLION)
                } else {
                    Ok(ATHENS)
                }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn slow_location_reading_never_overwrites_newer_one() {
        let coordinator = coordinator(
            StaticListingStore::sample(),
            SlowFirstReading {
                calls: std::sync::atomic::AtomicUsize::new(0),
            },
        );

        let (older, newer) = tokio::join!(coordinator.refresh_location(), coordinator.refresh_location());

        assert_eq!(newer, Some(ATHENS));
        assert_eq!(older, Some(ATHENS));
        assert_eq!(coordinator.location().await, Some(ATHENS));
    }

    #[tokio::test]
    async fn concurrent_refresh_supersedes_the_older_one() {
        let coordinator = coordinator(StaticListingStore::sample(), NoLocation(LocationError::Unsupported));
        coordinator.reload_listings().await.expect("open");

        let (first, second) = tokio::join!(
            coordinator.refresh(ViewRequest::default()),
            coordinator.refresh(ViewRequest {
                mode: ViewMode::Map,
                ..ViewRequest::default()
            })
        );
        let first = first.expect("open");
        let second = second.expect("open");

        assert!(first.is_none(), "the older refresh is cancelled");
        let published = second.expect("the newer refresh publishes");
        assert_eq!(published.generation, 2);
        assert_eq!(published.view.mode, ViewMode::Map);
        assert_eq!(coordinator.latest().map(|p| p.generation), Some(published.generation));
    }

    #[tokio::test]
    async fn shutdown_rejects_further_work() {
        let coordinator = coordinator(StaticListingStore::sample(), NoLocation(LocationError::Unsupported));
        coordinator.shutdown();
        assert!(matches!(
            coordinator.refresh(ViewRequest::default()).await,
            Err(TopikoError::CoordinatorClosed)
        ));
        assert!(matches!(
            coordinator.reload_listings().await,
            Err(TopikoError::CoordinatorClosed)
        ));
    }
}
