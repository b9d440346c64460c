//! Display-style allocation for nodes.
//!
//! The presentation layer assigns each participant a visual style (a color
//! in the original UI). The engine only brokers tokens: it acquires one
//! when a node joins and releases it when the node leaves, through an
//! injected allocator rather than any process-wide registry.

/// Opaque handle to a presentation style slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleToken(pub usize);

/// Hands out style slots at join time and reclaims them at leave time.
pub trait StyleAllocator: Send {
    fn acquire(&mut self) -> StyleToken;
    fn release(&mut self, token: StyleToken);
}

/// Default allocator over a fixed number of slots: always hands out the
/// lowest-index slot with the fewest current users, so styles repeat only
/// once every slot is taken.
#[derive(Debug)]
pub struct Palette {
    in_use: Vec<usize>,
}

impl Palette {
    pub fn new(slots: usize) -> Self {
        Self {
            in_use: vec![0; slots.max(1)],
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(8)
    }
}

impl StyleAllocator for Palette {
    fn acquire(&mut self) -> StyleToken {
        let slot = self
            .in_use
            .iter()
            .enumerate()
            .min_by_key(|(_, count)| **count)
            .map(|(slot, _)| slot)
            .unwrap_or(0);
        self.in_use[slot] += 1;
        StyleToken(slot)
    }

    fn release(&mut self, token: StyleToken) {
        if let Some(count) = self.in_use.get_mut(token.0) {
            *count = count.saturating_sub(1);
        }
    }
}
