/// Hands out small integer ids, preferring ids that were returned earlier over fresh ones.
#[derive(Debug, Clone, Default)]
pub struct IdPool {
    next_index: i32,
    available_ids: Vec<i32>,
}

impl IdPool {
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            next_index: 0,
            available_ids: Vec::with_capacity(initial_capacity),
        }
    }

    /// Takes an id, recycling the most recently returned one if any.
    #[inline(always)]
    pub fn take(&mut self) -> i32 {
        self.available_ids.pop().unwrap_or_else(|| {
            let id = self.next_index;
            self.next_index += 1;
            id
        })
    }

    /// Returns an id for reuse.
    #[inline(always)]
    pub fn return_id(&mut self, id: i32) {
        debug_assert!(id >= 0 && id < self.next_index);
        debug_assert!(!self.available_ids.contains(&id));
        self.available_ids.push(id);
    }

    /// Highest id ever handed out, or -1 if none has been.
    #[inline(always)]
    pub fn highest_possibly_claimed_id(&self) -> i32 {
        self.next_index - 1
    }

    #[inline(always)]
    pub fn available_id_count(&self) -> usize {
        self.available_ids.len()
    }

    pub fn clear(&mut self) {
        self.next_index = 0;
        self.available_ids.clear();
    }
}
