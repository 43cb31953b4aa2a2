use crate::types::WagerId;

/// Issues wager ids 1, 2, 3, ... for the lifetime of the exchange.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after a previously issued id.
    pub fn resume(last_issued: WagerId) -> Self {
        Self {
            last: last_issued.get(),
        }
    }

    pub fn next(&mut self) -> WagerId {
        self.last += 1;
        WagerId(self.last)
    }

    pub fn peek(&self) -> WagerId {
        WagerId(self.last + 1)
    }

    pub fn last_issued(&self) -> WagerId {
        WagerId(self.last)
    }
}
