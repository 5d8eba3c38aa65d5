//! Preloading through the animator: progress, failures, restarts.

mod common;

use common::Harness;
use flipbook::config::AnimatorConfig;
use flipbook::core::clock::Clock;
use flipbook::core::event_bus::downcast_event;
use flipbook::core::events::{AssetFailedEvent, PreloadFinishedEvent, PreloadStartedEvent};
use flipbook::core::loader::LoadError;
use flipbook::core::player::Phase;
use flipbook::core::preloader::image_set;
use flipbook::view::Surface;

fn not_found(url: &str) -> LoadError {
    LoadError::Io {
        path: url.to_string(),
        reason: "not found".into(),
    }
}

#[test]
fn test_counts_add_up_after_settling() {
    let mut h = Harness::with_frames(5, true);
    h.loader().succeed(3);
    h.loader().fail(1, not_found("frames/f2.png"));
    h.loader().succeed(0);
    h.refresh();

    let status = h.animator.status().clone();
    assert!(status.is_loading);
    assert!(status.loaded_count + status.error_count <= status.total);

    h.loader().fail(4, not_found("frames/f5.png"));
    h.loader().succeed(2);
    h.refresh();

    let status = h.animator.status();
    assert!(!status.is_loading);
    assert_eq!(status.loaded_count, 3);
    assert_eq!(status.error_count, 2);
    assert_eq!(status.loaded_count + status.error_count, status.total);
    assert_eq!(status.failed_urls, vec!["frames/f2.png", "frames/f5.png"]);
}

#[test]
fn test_progress_surface() {
    let mut h = Harness::with_frames(4, true);
    let surface = h.animator.surface();
    assert_eq!(surface.message().as_deref(), Some("Loading images... (0/4) 0%"));

    h.loader().succeed(0);
    h.loader().fail(2, not_found("frames/f3.png"));
    h.refresh();

    let surface = h.animator.surface();
    assert_eq!(
        surface,
        Surface::Loading {
            loaded: 1,
            total: 4,
            percent: 25,
            failed: 1
        }
    );
    assert_eq!(surface.loading_warning().as_deref(), Some("1 image(s) failed to load."));
    assert_eq!(h.animator.phase(), Phase::AwaitingAssets);
    assert_eq!(h.animator.current_url(), None);
}

#[test]
fn test_partial_failure_plays_with_warning() {
    let mut h = Harness::with_frames(3, true);
    h.loader().succeed(0);
    h.loader().fail(1, not_found("frames/f2.png"));
    h.loader().succeed(2);
    h.refresh();

    let view = h.ready();
    assert_eq!(
        view.warning.as_deref(),
        Some("Warning: 1 image(s) failed to load and will be skipped.")
    );
    assert!(view.is_playing);
    assert_eq!(h.animator.player().loaded_count(), 2);

    // Playback cycles over the loaded count
    h.advance(100.0);
    h.advance(100.0);
    assert_eq!(h.label(), 1);
}

#[test]
fn test_all_failed_is_terminal_error() {
    let mut h = Harness::with_frames(2, true);
    h.loader().fail_all();
    h.refresh();

    let surface = h.animator.surface();
    assert_eq!(
        surface,
        Surface::Failed {
            total: 2,
            failed_urls: vec!["frames/f1.png".into(), "frames/f2.png".into()],
        }
    );
    assert_eq!(
        surface.message().as_deref(),
        Some("Error: Could not load any images. Failed URLs: frames/f1.png, frames/f2.png")
    );
    assert!(!h.animator.status().is_loading);
    assert_eq!(h.animator.status().loaded_count, 0);
    assert_eq!(h.animator.player().scheduler().scheduled_total(), 0);
    assert_eq!(h.animator.handle_key("ArrowRight"), None);
}

#[test]
fn test_start_while_loading() {
    let mut config = AnimatorConfig::new(image_set(["a.png", "b.png", "c.png"]));
    config.frame_rate = 10.0;
    config.start_while_loading = true;
    let mut h = Harness::new(config);

    h.loader().succeed(0);
    h.loader().succeed(1);
    h.refresh();
    assert_eq!(h.animator.phase(), Phase::Playing);

    h.advance(100.0);
    assert_eq!(h.label(), 2);
    // Only two frames loaded so far: wraps early
    h.advance(100.0);
    assert_eq!(h.label(), 1);

    h.loader().succeed(2);
    h.refresh();
    h.advance(100.0);
    h.advance(100.0);
    assert_eq!(h.label(), 3);
}

#[test]
fn test_load_timeout_fails_outstanding() {
    let mut config = AnimatorConfig::new(image_set(["a.png", "b.png"]));
    config.load_timeout_ms = Some(1000.0);
    let mut h = Harness::new(config);

    h.loader().succeed(0);
    h.advance(999.0);
    assert!(h.animator.status().is_loading);

    h.advance(1.0);
    let status = h.animator.status();
    assert!(!status.is_loading);
    assert_eq!(status.error_count, 1);
    assert_eq!(status.failed_urls, vec!["b.png"]);
    assert!(h.animator.surface().is_ready());

    // The straggler arrives too late to count
    h.loader().succeed(1);
    h.refresh();
    assert_eq!(h.animator.status().loaded_count, 1);
}

#[test]
fn test_new_image_set_restarts_and_drops_stale_outcomes() {
    let mut h = Harness::with_frames(2, true);
    let first_run = h.animator.preloader().run();
    let stale = h.loader().take_from_run(first_run, 0).unwrap();

    h.animator.set_images(image_set(["x.png"]), h.clock.now_ms());
    assert_eq!(h.loader().cancelled_runs(), vec![first_run]);
    assert!(matches!(h.animator.surface(), Surface::Loading { total: 1, .. }));

    stale.succeed(());
    h.refresh();
    assert_eq!(h.animator.status().loaded_count, 0);

    h.loader().succeed(0);
    h.refresh();
    assert_eq!(h.animator.current_url(), Some("x.png"));
}

#[test]
fn test_preload_events() {
    let mut h = Harness::with_frames(2, true);
    h.loader().succeed(0);
    h.loader().fail(1, LoadError::Decode {
        path: "frames/f2.png".into(),
        reason: "bad header".into(),
    });
    h.refresh();
    h.refresh();

    let events = h.events();
    let started: Vec<_> = events
        .iter()
        .filter_map(|e| downcast_event::<PreloadStartedEvent>(e))
        .collect();
    assert_eq!(started, vec![&PreloadStartedEvent { total: 2 }]);

    let failed: Vec<_> = events
        .iter()
        .filter_map(|e| downcast_event::<AssetFailedEvent>(e))
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].url, "frames/f2.png");

    let finished: Vec<_> = events
        .iter()
        .filter_map(|e| downcast_event::<PreloadFinishedEvent>(e))
        .collect();
    assert_eq!(finished, vec![&PreloadFinishedEvent { loaded: 1, failed: 1 }]);
}

#[test]
fn test_empty_config_never_loads() {
    let h = Harness::new(AnimatorConfig::default());
    assert_eq!(
        h.animator.surface().message().as_deref(),
        Some("Error: No image URLs provided.")
    );
    assert!(h.loader().runs().is_empty());
}
