//! Base address for rendering trace offsets.

/// Address of the first instruction ever observed.
///
/// Only used to print addresses as offsets. The first observation wins; later
/// ones, including the program entry point after a rollback, never move it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BaseAddress(Option<u64>);

impl BaseAddress {
    pub const fn unset() -> Self {
        Self(None)
    }

    /// Record `addr` if nothing was recorded yet; returns the base.
    pub fn observe(&mut self, addr: u64) -> u64 {
        *self.0.get_or_insert(addr)
    }

    pub const fn get(&self) -> Option<u64> {
        self.0
    }

    /// Offset of `addr` from the base (zero before the first observation).
    pub fn offset(&self, addr: u64) -> u64 {
        addr.wrapping_sub(self.0.unwrap_or(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_wins() {
        let mut base = BaseAddress::unset();
        assert_eq!(base.observe(0x8000_0010), 0x8000_0010);
        assert_eq!(base.observe(0x8000_0000), 0x8000_0010);
        assert_eq!(base.get(), Some(0x8000_0010));
    }

    #[test]
    fn test_offset() {
        let mut base = BaseAddress::unset();
        assert_eq!(base.offset(0x1234), 0);
        base.observe(0x1000);
        assert_eq!(base.offset(0x1234), 0x234);
    }

    #[test]
    fn test_zero_base_is_a_real_observation() {
        let mut base = BaseAddress::unset();
        base.observe(0);
        base.observe(0x40);
        assert_eq!(base.get(), Some(0));
        assert_eq!(base.offset(0x40), 0x40);
    }
}
