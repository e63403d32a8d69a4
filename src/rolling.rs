use std::sync::Arc;

use smallvec::SmallVec;

use crate::{DISPLAY_WIDTH, canvas::Canvas};

/// One banner queued into a roll slot: a pre-extended canvas plus the
/// geometry the advance rules need.
#[derive(Clone, Debug)]
pub(crate) struct Banner {
    pub image: Arc<Canvas>,
    pub entry: i32,
    pub last: i32,
}

/// Per-layer rolling state owned by the render loop: a FIFO of banners and
/// the scroll position of the one at the head.
#[derive(Clone, Debug, Default)]
pub(crate) struct RollSlot {
    queue: SmallVec<[Banner; 2]>,
    position: i32,
}

impl RollSlot {
    pub fn reset(&mut self) {
        self.queue.clear();
        self.position = 0;
    }

    pub fn start(&mut self, banner: Banner) {
        self.queue.clear();
        self.queue.push(banner);
        self.position = 0;
    }

    pub fn enqueue(&mut self, banner: Banner) {
        self.queue.push(banner);
    }

    pub fn is_inhabited(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn head(&self) -> Option<&Banner> {
        self.queue.first()
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    /// Move the scroll position one step.
    ///
    /// Three cases, checked in order: the window would fall off the end of
    /// the extended canvas (jump back into the run-on zone so the entry
    /// strip lines up at the right edge); the head completed a full cycle
    /// and a successor is queued (swap banners, restart at 0); otherwise a
    /// plain unit step.
    pub fn advance(&mut self) {
        let Some(head) = self.queue.first() else {
            return;
        };
        if self.position + DISPLAY_WIDTH >= head.image.bounds().max_x {
            self.position = DISPLAY_WIDTH - 1 + head.entry;
        } else if self.position == head.last && self.queue.len() > 1 {
            log::debug!("roll slot: switching to the queued banner");
            self.queue.remove(0);
            self.position = 0;
        } else {
            self.position += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;

    fn banner(total: i32, entry: i32) -> Banner {
        let last = total - 2 * DISPLAY_WIDTH + 1;
        Banner {
            image: Arc::new(Canvas::new(Rect::new(0, 0, total, 8))),
            entry,
            last,
        }
    }

    #[test]
    fn advancing_an_empty_slot_is_a_noop() {
        let mut slot = RollSlot::default();
        slot.advance();
        assert_eq!(slot.position(), 0);
        assert!(!slot.is_inhabited());
    }

    #[test]
    fn advance_steps_by_one_column() {
        let mut slot = RollSlot::default();
        slot.start(banner(386, 0));
        slot.advance();
        slot.advance();
        assert_eq!(slot.position(), 2);
    }

    #[test]
    fn hand_off_jumps_into_the_run_on_zone() {
        let entry = 4;
        let total = 386;
        let mut slot = RollSlot::default();
        slot.start(banner(total, entry));

        // Walk until the window hits the end of the canvas.
        let mut steps = 0;
        while slot.position() + DISPLAY_WIDTH < total {
            slot.advance();
            steps += 1;
            assert!(steps < 10_000, "no hand-off within a full sweep");
        }
        slot.advance();
        assert_eq!(slot.position(), DISPLAY_WIDTH - 1 + entry);
    }

    #[test]
    fn single_banner_keeps_cycling_past_last() {
        let mut slot = RollSlot::default();
        slot.start(banner(386, 0));
        let last = slot.head().unwrap().last;

        for _ in 0..=last {
            slot.advance();
        }
        // No successor queued: the banner rolls on instead of swapping.
        assert!(slot.is_inhabited());
        assert_eq!(slot.position(), last + 1);
    }

    #[test]
    fn queued_banner_takes_over_at_last() {
        let mut slot = RollSlot::default();
        slot.start(banner(386, 0));
        let next = banner(500, 2);
        slot.enqueue(next);
        let last = slot.head().unwrap().last;

        for _ in 0..last {
            slot.advance();
        }
        assert_eq!(slot.position(), last);

        slot.advance();
        assert_eq!(slot.position(), 0);
        assert_eq!(slot.head().unwrap().image.width(), 500);
    }

    #[test]
    fn start_replaces_the_whole_queue() {
        let mut slot = RollSlot::default();
        slot.start(banner(386, 0));
        slot.enqueue(banner(500, 0));
        slot.start(banner(266, 1));
        assert_eq!(slot.position(), 0);
        assert_eq!(slot.head().unwrap().image.width(), 266);
    }
}
