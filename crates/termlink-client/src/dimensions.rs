//! Terminal dimension tracking across sync cycles.
//!
//! Until the first sync of a connection completes, a (debounced) local
//! resize re-issues the sync request with the new size. Afterwards the size
//! is only renegotiated through an explicit `negotiate_dimensions` call, so
//! a resync never races the terminal's own redraw.

/// Local terminal size and sync-cycle flag.
#[derive(Debug)]
pub struct DimensionNegotiator {
    cols: u16,
    rows: u16,
    /// Sync for the current connection has completed.
    negotiated: bool,
}

impl DimensionNegotiator {
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            negotiated: false,
        }
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Record a local size. Returns whether it changed.
    pub const fn set_local(&mut self, cols: u16, rows: u16) -> bool {
        let changed = self.cols != cols || self.rows != rows;
        self.cols = cols;
        self.rows = rows;
        changed
    }

    /// A new connection starts a new sync cycle.
    pub const fn begin_cycle(&mut self) {
        self.negotiated = false;
    }

    /// The server answered the sync request.
    pub const fn complete_cycle(&mut self) {
        self.negotiated = true;
    }

    /// Whether a settled local resize should trigger a sync request.
    #[must_use]
    pub const fn resize_needs_sync(&self) -> bool {
        !self.negotiated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_syncs_only_before_first_sync() {
        let mut dims = DimensionNegotiator::new(80, 24);
        dims.begin_cycle();
        assert!(dims.resize_needs_sync());

        dims.complete_cycle();
        assert!(!dims.resize_needs_sync());

        dims.begin_cycle();
        assert!(dims.resize_needs_sync());
    }

    #[test]
    fn test_set_local_reports_change() {
        let mut dims = DimensionNegotiator::new(80, 24);
        assert!(!dims.set_local(80, 24));
        assert!(dims.set_local(120, 40));
        assert_eq!(dims.dimensions(), (120, 40));
    }
}
