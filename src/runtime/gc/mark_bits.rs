/// Visited set for one marking pass, one bit per registry slot.
pub(crate) struct MarkBits {
    words: Vec<u64>,
}

impl MarkBits {
    pub(crate) fn with_slots(slots: usize) -> Self {
        Self {
            words: vec![0; slots.div_ceil(64)],
        }
    }

    #[inline]
    pub(crate) fn get(&self, slot: usize) -> bool {
        self.words
            .get(slot / 64)
            .is_some_and(|word| word & (1u64 << (slot % 64)) != 0)
    }

    /// Sets the bit for `slot`, returning `false` if it was already set.
    #[inline]
    pub(crate) fn set(&mut self, slot: usize) -> bool {
        let word = &mut self.words[slot / 64];
        let bit = 1u64 << (slot % 64);
        let fresh = *word & bit == 0;
        *word |= bit;
        fresh
    }

    pub(crate) fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
