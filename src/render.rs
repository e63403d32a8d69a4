use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, RecvTimeoutError, SyncSender},
    },
    thread,
    time::{Duration, Instant},
};

use crate::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, MAX_LAYERS,
    canvas::Canvas,
    color::PaintMode,
    error::{TowerError, TowerResult},
    frame::{BannerMode, Frame, RollState},
    geom::{Point, Rect},
    rolling::{Banner, RollSlot},
    strip::{PixelStrip, StripMapper},
};

/// Options for the render loop.
#[derive(Clone, Copy, Debug)]
pub struct RenderConfig {
    /// Scroll cadence: one column per tick while any banner is rolling.
    pub tick: Duration,
    /// Bounded capacity of the dispatcher → render loop frame channel.
    pub channel_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(60),
            channel_capacity: 4,
        }
    }
}

/// Handle to the long-lived render thread.
///
/// Frames are consumed in submission order. Dropping every frame sender
/// (this handle's plus any clone handed to dispatchers) shuts the loop
/// down: it drains the channel, performs one final render and exits.
pub struct RenderLoop {
    tx: SyncSender<Frame>,
    handle: thread::JoinHandle<()>,
}

impl RenderLoop {
    /// Initialize the strip and start the render thread.
    pub fn spawn<S>(mut strip: S, config: RenderConfig) -> TowerResult<Self>
    where
        S: PixelStrip + Send + 'static,
    {
        strip.init()?;
        let (tx, rx) = mpsc::sync_channel(config.channel_capacity.max(1));
        let handle = thread::Builder::new()
            .name("tower-render".into())
            .spawn(move || Worker::new(strip).run(rx, config.tick))
            .map_err(|e| TowerError::hardware(format!("spawning render thread: {e}")))?;
        Ok(Self { tx, handle })
    }

    /// A frame sender for a dispatcher. Sends block when the channel is
    /// full, which backpressures fast clients.
    pub fn sender(&self) -> SyncSender<Frame> {
        self.tx.clone()
    }

    pub fn submit(&self, frame: Frame) -> TowerResult<()> {
        self.tx
            .send(frame)
            .map_err(|_| TowerError::transport("render loop has exited"))
    }

    /// Drop this handle's sender and wait for the final render.
    ///
    /// Other sender clones must be dropped first or the loop keeps waiting
    /// for them.
    pub fn shutdown(self) {
        let Self { tx, handle } = self;
        drop(tx);
        if handle.join().is_err() {
            log::error!("render thread panicked");
        }
    }
}

/// What the loop composites for one layer of the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotMode {
    /// Fixed content at the layer origin.
    Static,
    /// Banner just started: show position 0 once before advancing.
    Start,
    /// Banner in motion: composite the slot head at the slot position.
    Continue,
}

#[derive(Clone, Debug)]
struct DisplayLayer {
    id: usize,
    image: Arc<Canvas>,
    origin: Point,
    mode: SlotMode,
}

/// Render-loop state: the current frame's display list plus one roll slot
/// per layer. Only the render thread touches this.
struct Worker<S> {
    strip: S,
    mapper: StripMapper,
    slots: [RollSlot; MAX_LAYERS],
    display: Vec<DisplayLayer>,
}

impl<S: PixelStrip> Worker<S> {
    fn new(strip: S) -> Self {
        Self {
            strip,
            mapper: StripMapper::new(),
            slots: std::array::from_fn(|_| RollSlot::default()),
            display: Vec::new(),
        }
    }

    fn run(mut self, rx: Receiver<Frame>, tick: Duration) {
        log::debug!("render loop started");
        loop {
            let incoming = if self.any_rolling() {
                match rx.recv_timeout(tick) {
                    Ok(frame) => Some(frame),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match rx.recv() {
                    Ok(frame) => Some(frame),
                    Err(_) => break,
                }
            };
            self.step(incoming);
        }
        // Channel closed: one final render, then release the hardware.
        self.render();
        self.strip.fini();
        log::debug!("render loop exited");
    }

    fn any_rolling(&self) -> bool {
        self.slots.iter().any(RollSlot::is_inhabited)
    }

    /// One loop iteration: frame intake (if any), roll advancement, render.
    fn step(&mut self, incoming: Option<Frame>) {
        if let Some(frame) = incoming {
            self.take_frame(frame);
        }
        self.advance_rolling();
        self.render();
    }

    /// Install a new frame and apply its roll transitions to the slots.
    fn take_frame(&mut self, frame: Frame) {
        let mut present = [false; MAX_LAYERS];
        let mut display = Vec::with_capacity(frame.len());
        for layer in frame {
            present[layer.id] = true;
            let mode = match layer.roll {
                RollState::Static => {
                    self.slots[layer.id].reset();
                    SlotMode::Static
                }
                RollState::Rolling { mode, entry, last } => {
                    let banner = Banner {
                        image: Arc::clone(&layer.image),
                        entry,
                        last,
                    };
                    match mode {
                        BannerMode::Start => {
                            self.slots[layer.id].start(banner);
                            SlotMode::Start
                        }
                        // The current banner keeps rolling; the snapshot is
                        // treated as Continue from here on.
                        BannerMode::Continue => SlotMode::Continue,
                        BannerMode::Next => {
                            let slot = &mut self.slots[layer.id];
                            if slot.is_inhabited() {
                                slot.enqueue(banner);
                                SlotMode::Continue
                            } else {
                                // Nothing to queue behind: a fresh start,
                                // shown at position 0 once like Start.
                                slot.start(banner);
                                SlotMode::Start
                            }
                        }
                    }
                }
            };
            display.push(DisplayLayer {
                id: layer.id,
                image: layer.image,
                origin: layer.origin,
                mode,
            });
        }
        // Layers that vanished from the frame (cleared or deactivated) no
        // longer roll; releasing their slots lets the loop fall back to the
        // blocking wait once nothing is in motion.
        for (slot, present) in self.slots.iter_mut().zip(present) {
            if !present {
                slot.reset();
            }
        }
        self.display = display;
    }

    /// Advance every rolling layer of the current frame by one column.
    ///
    /// A freshly started banner is promoted instead of advanced, so its
    /// first composite shows position 0.
    fn advance_rolling(&mut self) {
        for layer in &mut self.display {
            match layer.mode {
                SlotMode::Start => layer.mode = SlotMode::Continue,
                SlotMode::Continue => self.slots[layer.id].advance(),
                SlotMode::Static => {}
            }
        }
    }

    /// Alpha-over all layers of the current frame, lowest id first.
    fn composite(&self) -> Canvas {
        let mut result = Canvas::new(Rect::new(0, 0, DISPLAY_WIDTH, DISPLAY_HEIGHT));
        for layer in &self.display {
            let (image, origin) = match layer.mode {
                SlotMode::Continue => match self.slots[layer.id].head() {
                    Some(head) => (
                        Arc::clone(&head.image),
                        Point::new(self.slots[layer.id].position(), 0),
                    ),
                    // Nothing rolling through the slot: show the snapshot.
                    None => (Arc::clone(&layer.image), layer.origin),
                },
                SlotMode::Static | SlotMode::Start => {
                    (Arc::clone(&layer.image), layer.origin)
                }
            };
            for y in 0..DISPLAY_HEIGHT {
                for x in 0..DISPLAY_WIDTH {
                    let color = image.get(origin.x + x, origin.y + y);
                    result.paint(x, y, color, PaintMode::Over);
                }
            }
        }
        result
    }

    fn render(&mut self) {
        let t0 = Instant::now();
        let composite = self.composite();
        if let Err(e) = self.mapper.flush(&composite, &mut self.strip) {
            // Hardware hiccups must not kill the loop; the next frame
            // retries.
            log::warn!("strip render failed: {e}");
        }
        log::debug!("rendered frame in {} µs", t0.elapsed().as_micros());
    }
}
