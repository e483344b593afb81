/// Value types handed between the sampling steps.
///
/// All types are `Copy`; they never outlive a single worker iteration.

// ── Readings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerReading {
    pub millivolts: u16,
    pub percentage: u8,
    pub vbus: bool,
    /// Only meaningful while `vbus` is present; forced low otherwise.
    pub charging: bool,
}

// ── Power state ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PowerState {
    Awake = 0,
    SleepPending = 1,
    Halted = 2,
}

impl PowerState {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PowerState::Awake,
            1 => PowerState::SleepPending,
            _ => PowerState::Halted,
        }
    }
}

/// Edge the occupancy input is armed for while the node is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeEdge {
    Rising,
    Falling,
}

impl WakeEdge {
    /// The edge that moves the line away from `level`.
    pub const fn toward(level: bool) -> Self {
        if level {
            WakeEdge::Falling
        } else {
            WakeEdge::Rising
        }
    }

    /// Level the line has after this edge.
    pub const fn target_level(self) -> bool {
        matches!(self, WakeEdge::Rising)
    }
}
