//! Deterministic harness: manual loader, manual scheduler, manual clock.

#![allow(dead_code)]

use flipbook::animator::Animator;
use flipbook::config::AnimatorConfig;
use flipbook::core::clock::{Clock, ManualClock, ManualScheduler};
use flipbook::core::event_bus::{BoxedEvent, EventBus};
use flipbook::core::loader::ManualLoader;
use flipbook::core::preloader::image_set;
use flipbook::view::{ReadyView, Surface};

pub type TestAnimator = Animator<ManualLoader<()>, ManualScheduler>;

pub struct Harness {
    pub animator: TestAnimator,
    pub clock: ManualClock,
    pub bus: EventBus,
}

impl Harness {
    pub fn new(config: AnimatorConfig) -> Self {
        let bus = EventBus::new();
        let clock = ManualClock::new(0.0);
        let mut animator = Animator::new(&config, ManualLoader::new(), ManualScheduler::new())
            .with_emitter(bus.emitter());
        animator.mount(clock.now_ms());
        Self { animator, clock, bus }
    }

    /// `n` frames named f1.png.. at 10 fps (100 ms per frame).
    pub fn with_frames(n: usize, loop_enabled: bool) -> Self {
        let urls: Vec<String> = (1..=n).map(|i| format!("frames/f{}.png", i)).collect();
        let mut config = AnimatorConfig::new(image_set(urls));
        config.frame_rate = 10.0;
        config.loop_enabled = loop_enabled;
        Self::new(config)
    }

    /// Same as `with_frames`, with every frame loaded and the first tick
    /// (the baseline) already taken at t=0.
    pub fn loaded(n: usize, loop_enabled: bool) -> Self {
        let mut h = Self::with_frames(n, loop_enabled);
        h.loader().succeed_all();
        h.refresh();
        h
    }

    pub fn loader(&self) -> &ManualLoader<()> {
        self.animator.preloader().loader()
    }

    /// One host refresh at the current time.
    pub fn refresh(&mut self) -> bool {
        self.animator.update(self.clock.now_ms())
    }

    /// Advance time by `ms`, then refresh.
    pub fn advance(&mut self, ms: f64) -> bool {
        self.clock.advance(ms);
        self.refresh()
    }

    pub fn ready(&self) -> ReadyView {
        match self.animator.surface() {
            Surface::Ready(view) => view,
            other => panic!("expected a ready surface, got {:?}", other),
        }
    }

    /// 1-based number of the displayed frame.
    pub fn label(&self) -> usize {
        self.ready().frame.frame_number()
    }

    pub fn events(&self) -> Vec<BoxedEvent> {
        self.bus.poll()
    }
}
