//! Bit set flags used in DBN market data records.

use std::fmt;

/// Indicates it's the last record in the event from the venue for a given
/// `instrument_id`.
pub const LAST: u8 = 1 << 7;
/// Indicates a top-of-book record, not an individual order.
pub const TOB: u8 = 1 << 6;
/// Indicates the record was sourced from a replay, such as a snapshot server.
pub const SNAPSHOT: u8 = 1 << 5;
/// Indicates an aggregated price level record, not an individual order.
pub const MBP: u8 = 1 << 4;
/// Indicates the `ts_recv` value is inaccurate due to clock issues or packet
/// reordering.
pub const BAD_TS_RECV: u8 = 1 << 3;
/// Indicates an unrecoverable gap was detected in the channel.
pub const MAYBE_BAD_BOOK: u8 = 1 << 2;

/// A transparent wrapper around the bit field used in several DBN record
/// types.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct FlagSet {
    raw: u8,
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut has_written_flag = false;
        for (flag, name) in [
            (LAST, stringify!(LAST)),
            (TOB, stringify!(TOB)),
            (SNAPSHOT, stringify!(SNAPSHOT)),
            (MBP, stringify!(MBP)),
            (BAD_TS_RECV, stringify!(BAD_TS_RECV)),
            (MAYBE_BAD_BOOK, stringify!(MAYBE_BAD_BOOK)),
        ] {
            if (self.raw & flag) > 0 {
                if has_written_flag {
                    write!(f, " | {name}")?;
                } else {
                    write!(f, "{name}")?;
                    has_written_flag = true;
                }
            }
        }
        if has_written_flag {
            write!(f, " ({})", self.raw)
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

impl From<u8> for FlagSet {
    fn from(raw: u8) -> Self {
        Self { raw }
    }
}

impl FlagSet {
    /// Creates a new `FlagSet` from the raw representation.
    pub const fn new(raw: u8) -> Self {
        Self { raw }
    }

    /// Creates a new `FlagSet` with no flags set.
    pub const fn empty() -> Self {
        Self { raw: 0 }
    }

    /// Returns the raw `u8` representation.
    pub const fn raw(&self) -> u8 {
        self.raw
    }

    /// Returns `true` if no flags are set.
    pub const fn is_empty(&self) -> bool {
        self.raw == 0
    }

    /// Returns `true` if it's the last record in the event from the venue for
    /// a given `instrument_id`.
    pub const fn is_last(&self) -> bool {
        self.raw & LAST > 0
    }

    /// Returns `true` if it's a top-of-book record, not an individual order.
    pub const fn is_tob(&self) -> bool {
        self.raw & TOB > 0
    }

    /// Returns `true` if the record was sourced from a replay, such as a
    /// snapshot server.
    pub const fn is_snapshot(&self) -> bool {
        self.raw & SNAPSHOT > 0
    }

    /// Returns `true` if it's an aggregated price level record, not an
    /// individual order.
    pub const fn is_mbp(&self) -> bool {
        self.raw & MBP > 0
    }

    /// Returns `true` if the `ts_recv` value is inaccurate due to clock issues
    /// or packet reordering.
    pub const fn is_bad_ts_recv(&self) -> bool {
        self.raw & BAD_TS_RECV > 0
    }

    /// Returns `true` if an unrecoverable gap was detected in the channel.
    pub const fn is_maybe_bad_book(&self) -> bool {
        self.raw & MAYBE_BAD_BOOK > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_multiple_flags() {
        let flags = FlagSet::new(LAST | SNAPSHOT);
        assert_eq!(format!("{flags:?}"), "LAST | SNAPSHOT (160)");
        assert!(flags.is_last());
        assert!(flags.is_snapshot());
        assert!(!flags.is_tob());
    }

    #[test]
    fn test_debug_empty() {
        assert_eq!(format!("{:?}", FlagSet::empty()), "0");
    }
}
