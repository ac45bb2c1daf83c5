//! Integration tests for the thumbnail pipeline.

use image::DynamicImage;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use thumbq::event::ThumbnailReady;
use thumbq::{
    Error, ResolveError, Resolver, ResolverRegistry, ResourceId, Thumbnail, ThumbnailPipeline,
    WarningSink,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

fn image(width: u32, height: u32) -> Thumbnail {
    Thumbnail::new(DynamicImage::new_rgba8(width, height))
}

/// Returns a fixed-size image for every id, or declines when `size` is None.
struct FixedResolver {
    name: &'static str,
    size: Option<(u32, u32)>,
    calls: AtomicUsize,
}

impl FixedResolver {
    fn resolving(name: &'static str, width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            name,
            size: Some((width, height)),
            calls: AtomicUsize::new(0),
        })
    }

    fn declining(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            size: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Resolver for FixedResolver {
    fn name(&self) -> &str {
        self.name
    }

    fn try_resolve(&self, _id: &ResourceId) -> Result<Option<Thumbnail>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.size.map(|(w, h)| image(w, h)))
    }
}

struct FailingResolver;

impl Resolver for FailingResolver {
    fn name(&self) -> &str {
        "broken"
    }

    fn try_resolve(&self, _id: &ResourceId) -> Result<Option<Thumbnail>, ResolveError> {
        Err(ResolveError::Other("plugin exploded".to_string()))
    }
}

/// Panics on one specific id, resolves everything else.
struct PanickingResolver;

impl Resolver for PanickingResolver {
    fn name(&self) -> &str {
        "panicky"
    }

    fn try_resolve(&self, id: &ResourceId) -> Result<Option<Thumbnail>, ResolveError> {
        if id.as_str() == "boom" {
            panic!("resolver defect");
        }
        Ok(Some(image(1, 1)))
    }
}

/// Blocks each resolution until the test sends a permit.
struct GatedResolver {
    permits: Mutex<mpsc::Receiver<()>>,
}

impl Resolver for GatedResolver {
    fn name(&self) -> &str {
        "gated"
    }

    fn try_resolve(&self, _id: &ResourceId) -> Result<Option<Thumbnail>, ResolveError> {
        let permits = self.permits.lock().unwrap();
        permits
            .recv()
            .map_err(|_| ResolveError::Other("gate closed".to_string()))?;
        Ok(Some(image(1, 1)))
    }
}

/// Tracks how many resolutions run at the same time.
#[derive(Default)]
struct ConcurrencyTracker {
    in_flight: AtomicUsize,
    max_seen: AtomicUsize,
}

impl Resolver for ConcurrencyTracker {
    fn name(&self) -> &str {
        "tracker"
    }

    fn try_resolve(&self, _id: &ResourceId) -> Result<Option<Thumbnail>, ResolveError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(2));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Some(image(1, 1)))
    }
}

#[derive(Default)]
struct CollectingSink {
    warnings: Mutex<Vec<(String, String)>>,
}

impl CollectingSink {
    fn warnings(&self) -> Vec<(String, String)> {
        self.warnings.lock().unwrap().clone()
    }
}

impl WarningSink for CollectingSink {
    fn resolver_failed(&self, resolver: &str, id: &ResourceId, _error: &ResolveError) {
        self.warnings
            .lock()
            .unwrap()
            .push((resolver.to_string(), id.to_string()));
    }
}

fn pipeline_with(resolver: Arc<dyn Resolver>) -> ThumbnailPipeline {
    let registry = ResolverRegistry::empty();
    registry.register(resolver);
    ThumbnailPipeline::new(Arc::new(registry))
}

fn empty_pipeline() -> ThumbnailPipeline {
    ThumbnailPipeline::new(Arc::new(ResolverRegistry::empty()))
}

fn resources(events: &[ThumbnailReady]) -> Vec<String> {
    events.iter().map(|e| e.resource.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Ordering and dispatch
// ---------------------------------------------------------------------------

#[test]
fn results_preserve_submission_order() {
    let pipeline = pipeline_with(FixedResolver::resolving("all", 4, 4));

    let ids: Vec<String> = (0..25).map(|i| format!("asset://item/{i}")).collect();
    for id in &ids {
        pipeline.submit(id.as_str());
    }
    pipeline.wait_idle();

    let events = pipeline.drain().unwrap();
    assert_eq!(resources(&events), ids);
}

#[test]
fn first_resolver_with_an_image_wins() {
    let r1 = FixedResolver::declining("r1");
    let r2 = FixedResolver::resolving("r2", 2, 2);
    let r3 = FixedResolver::resolving("r3", 3, 3);

    let registry = ResolverRegistry::empty();
    registry.register(r1.clone());
    registry.register(r2.clone());
    registry.register(r3.clone());

    let thumb = registry.resolve(&"file:///a.png".into()).expect("r2 resolves");
    assert_eq!((thumb.width(), thumb.height()), (2, 2));
    assert_eq!(r1.calls(), 1);
    assert_eq!(r2.calls(), 1);
    assert_eq!(r3.calls(), 0);
    assert_eq!(registry.names(), ["r1", "r2", "r3"]);
}

#[test]
fn unresolvable_requests_are_dropped_silently() {
    let pipeline = empty_pipeline();

    pipeline.submit("file:///nothing.png");
    pipeline.wait_idle();

    for _ in 0..3 {
        assert!(pipeline.drain().unwrap().is_empty());
    }
    assert!(pipeline.is_idle());
    assert_eq!(pipeline.pending(), 0);
}

#[test]
fn failing_resolver_is_logged_and_skipped() {
    let sink = Arc::new(CollectingSink::default());
    let good = FixedResolver::resolving("good", 5, 7);

    let registry = ResolverRegistry::empty().with_warning_sink(sink.clone());
    registry.register(Arc::new(FailingResolver));
    registry.register(good.clone());

    let thumb = registry.resolve(&"x".into()).expect("second resolver resolves");
    assert_eq!((thumb.width(), thumb.height()), (5, 7));
    assert_eq!(
        sink.warnings(),
        vec![("broken".to_string(), "x".to_string())]
    );
}

#[test]
fn resolver_failure_never_reaches_submitter() {
    let sink = Arc::new(CollectingSink::default());
    let registry = ResolverRegistry::empty().with_warning_sink(sink.clone());
    registry.register(Arc::new(FailingResolver));
    let pipeline = ThumbnailPipeline::new(Arc::new(registry));

    pipeline.submit("a");
    pipeline.submit("b");
    pipeline.wait_idle();

    assert!(pipeline.drain().unwrap().is_empty());
    assert_eq!(sink.warnings().len(), 2);
}

#[test]
fn duplicate_submissions_are_resolved_independently() {
    let resolver = FixedResolver::resolving("all", 1, 1);
    let pipeline = pipeline_with(resolver.clone());

    pipeline.submit("same");
    pipeline.submit("same");
    pipeline.wait_idle();

    let events = pipeline.drain().unwrap();
    assert_eq!(resources(&events), ["same", "same"]);
    assert_eq!(resolver.calls(), 2);
}

// ---------------------------------------------------------------------------
// Drain and notification
// ---------------------------------------------------------------------------

#[test]
fn second_drain_is_empty() {
    let pipeline = pipeline_with(FixedResolver::resolving("all", 1, 1));

    pipeline.submit("a");
    pipeline.submit("b");
    pipeline.wait_idle();

    assert_eq!(pipeline.drain().unwrap().len(), 2);
    assert!(pipeline.drain().unwrap().is_empty());
}

#[test]
fn drain_before_any_submit_is_empty() {
    let pipeline = pipeline_with(FixedResolver::resolving("all", 1, 1));
    assert!(pipeline.drain().unwrap().is_empty());
    assert!(pipeline.is_idle());
}

#[test]
fn subscribers_are_notified_on_drain_in_sequence() {
    let pipeline = pipeline_with(FixedResolver::resolving("all", 1, 1));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    pipeline.subscribe(move |ready: &ThumbnailReady| {
        sink.lock()
            .unwrap()
            .push((ready.seq, ready.resource.to_string()));
    });

    pipeline.submit("a");
    pipeline.submit("b");
    pipeline.wait_idle();
    assert!(seen.lock().unwrap().is_empty(), "no notification before drain");

    pipeline.drain().unwrap();
    pipeline.submit("c");
    pipeline.wait_idle();
    pipeline.drain().unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (0, "a".to_string()),
            (1, "b".to_string()),
            (2, "c".to_string())
        ]
    );
}

#[test]
fn handlers_may_drain_and_subscribe_from_inside_a_drain() {
    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let pipeline = Arc::new(pipeline_with(FixedResolver::resolving("all", 1, 1)));
        let log = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&pipeline);
        let first_log = Arc::clone(&log);
        let mut subscribed = false;
        pipeline.subscribe(move |ready: &ThumbnailReady| {
            first_log
                .lock()
                .unwrap()
                .push(format!("first:{}", ready.resource));
            let Some(pipeline) = weak.upgrade() else {
                return;
            };
            assert!(pipeline.drain().unwrap().is_empty());
            if !subscribed {
                subscribed = true;
                let second_log = Arc::clone(&first_log);
                pipeline.subscribe(move |ready: &ThumbnailReady| {
                    second_log
                        .lock()
                        .unwrap()
                        .push(format!("second:{}", ready.resource));
                });
            }
        });

        pipeline.submit("a");
        pipeline.submit("b");
        pipeline.wait_idle();
        assert_eq!(pipeline.drain().unwrap().len(), 2);

        pipeline.submit("c");
        pipeline.wait_idle();
        assert_eq!(pipeline.drain().unwrap().len(), 1);

        let log = log.lock().unwrap().clone();
        done_tx.send(log).unwrap();
    });

    let log = done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("pipeline thread panicked or deadlocked");
    assert_eq!(log, ["first:a", "first:b", "first:c", "second:c"]);
}

#[test]
fn only_the_owning_thread_may_drain() {
    let pipeline = pipeline_with(FixedResolver::resolving("all", 1, 1));
    pipeline.submit("a");
    pipeline.wait_idle();

    thread::scope(|s| {
        let result = s.spawn(|| pipeline.drain()).join().unwrap();
        assert!(matches!(result, Err(Error::NotOwningThread)));
    });

    assert_eq!(pipeline.ready(), 1);
    assert_eq!(resources(&pipeline.drain().unwrap()), ["a"]);
}

// ---------------------------------------------------------------------------
// Worker lifecycle
// ---------------------------------------------------------------------------

#[test]
fn submit_does_not_wait_for_resolution() {
    let (permit, permits) = mpsc::channel();
    let pipeline = pipeline_with(Arc::new(GatedResolver {
        permits: Mutex::new(permits),
    }));

    pipeline.submit("a");
    pipeline.submit("b");
    assert!(!pipeline.is_idle());
    assert!(pipeline.drain().unwrap().is_empty());

    permit.send(()).unwrap();
    permit.send(()).unwrap();
    pipeline.wait_idle();

    assert_eq!(resources(&pipeline.drain().unwrap()), ["a", "b"]);
    assert!(pipeline.is_idle());
}

#[test]
fn worker_restarts_for_each_burst() {
    let resolver = FixedResolver::resolving("all", 1, 1);
    let pipeline = pipeline_with(resolver.clone());

    for burst in 0..3 {
        pipeline.submit(format!("burst-{burst}"));
        pipeline.wait_idle();
        assert!(pipeline.is_idle());
    }

    assert_eq!(resolver.calls(), 3);
    assert_eq!(
        resources(&pipeline.drain().unwrap()),
        ["burst-0", "burst-1", "burst-2"]
    );
}

#[test]
fn concurrent_submitters_are_all_serviced_by_one_worker_at_a_time() {
    let tracker = Arc::new(ConcurrencyTracker::default());
    let pipeline = pipeline_with(tracker.clone());

    // Claim ownership on this thread before fanning out.
    pipeline.submit("owner");

    thread::scope(|s| {
        for t in 0..4 {
            let pipeline = &pipeline;
            s.spawn(move || {
                for i in 0..10 {
                    pipeline.submit(format!("t{t}-{i}"));
                }
            });
        }
    });
    pipeline.wait_idle();

    let events = pipeline.drain().unwrap();
    assert_eq!(events.len(), 41);
    let unique: HashSet<String> = resources(&events).into_iter().collect();
    assert_eq!(unique.len(), 41);
    assert_eq!(tracker.max_seen.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_resolver_loses_one_request_and_pipeline_recovers() {
    let pipeline = pipeline_with(Arc::new(PanickingResolver));

    pipeline.submit("boom");
    pipeline.wait_idle();
    assert!(pipeline.is_idle());
    assert!(pipeline.drain().unwrap().is_empty());

    pipeline.submit("fine");
    pipeline.wait_idle();
    assert_eq!(resources(&pipeline.drain().unwrap()), ["fine"]);
}

#[test]
fn resolvers_registered_later_are_used() {
    let pipeline = empty_pipeline();
    pipeline.submit("early");
    pipeline.wait_idle();

    pipeline
        .registry()
        .register(FixedResolver::resolving("late", 1, 1));
    pipeline.submit("late");
    pipeline.wait_idle();

    assert_eq!(resources(&pipeline.drain().unwrap()), ["late"]);
}

#[test]
fn dropping_the_pipeline_finishes_queued_work() {
    let resolver = FixedResolver::resolving("all", 1, 1);
    {
        let pipeline = pipeline_with(resolver.clone());
        for i in 0..5 {
            pipeline.submit(format!("{i}"));
        }
    }
    assert_eq!(resolver.calls(), 5);
}
