//! Frame flag bitfield.

/// Per-frame flags.
///
/// Only bit 0 is defined: FIN marks the final fragment of a message. The
/// remaining bits are reserved and preserved verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// Final fragment of a message.
    pub const FIN: u8 = 0b0000_0001;

    /// No flags set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Flags with only FIN set.
    #[must_use]
    pub const fn fin() -> Self {
        Self(Self::FIN)
    }

    /// Build from the raw header byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Raw header byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// Whether FIN is set.
    #[must_use]
    pub const fn is_fin(self) -> bool {
        self.0 & Self::FIN != 0
    }

    /// Copy with FIN set or cleared.
    #[must_use]
    pub const fn with_fin(self, fin: bool) -> Self {
        if fin { Self(self.0 | Self::FIN) } else { Self(self.0 & !Self::FIN) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fin_toggles_without_touching_reserved_bits() {
        let flags = FrameFlags::from_byte(0b1010_0000);
        assert!(!flags.is_fin());

        let set = flags.with_fin(true);
        assert!(set.is_fin());
        assert_eq!(set.to_byte(), 0b1010_0001);

        let cleared = set.with_fin(false);
        assert_eq!(cleared, flags);
    }
}
