use super::result::QueryResult;

/// A cached result with the bookkeeping the store needs to order writes.
///
/// `generation` is bumped every time a request starts for the slot. A
/// completion is only applied if it carries the current generation, so a
/// response that was overtaken by a newer request is dropped.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub(crate) result: QueryResult,
    pub(crate) generation: u64,
}

impl CacheEntry {
    /// Creates an uninitialized entry.
    pub(crate) const fn new() -> Self {
        Self {
            result: QueryResult::UNINITIALIZED,
            generation: 0,
        }
    }

    /// Returns `true` if a request should be dispatched for this slot.
    ///
    /// A slot that is loading, or holds a successful result, is served as is
    /// unless the caller forces a refetch. Errored and uninitialized slots
    /// always fetch.
    pub(crate) const fn should_fetch(&self, force_refetch: bool) -> bool {
        if force_refetch {
            return true;
        }
        if self.result.is_loading {
            return false;
        }
        !self.result.is_initialized || self.result.is_error
    }

    /// Moves the slot into the loading state and returns the new generation.
    pub(crate) fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.result = QueryResult::loading();
        self.generation
    }

    /// Applies a settled result if it belongs to the current generation.
    ///
    /// Returns `false` if the result was stale and dropped.
    pub(crate) fn settle(&mut self, generation: u64, result: QueryResult) -> bool {
        if generation != self.generation {
            return false;
        }
        self.result = result;
        true
    }
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self::new()
    }
}
