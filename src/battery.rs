//! Battery level from a sampled cell voltage.
//!
//! The discharge curve is a short list of (millivolts, basis points) points
//! with strictly decreasing voltage. Levels between two points are linearly
//! interpolated in basis points and truncated to whole percent.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub millivolts: u16,
    /// Remaining charge in 1/100 of a percent.
    pub pptt: u16,
}

impl Breakpoint {
    pub const fn new(millivolts: u16, pptt: u16) -> Self {
        Self { millivolts, pptt }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DischargeCurve {
    points: &'static [Breakpoint],
}

impl DischargeCurve {
    /// Panics (at compile time when used in a `const`) on a malformed curve.
    pub const fn new(points: &'static [Breakpoint]) -> Self {
        assert!(points.len() >= 2, "discharge curve needs at least two points");
        let mut i = 1;
        while i < points.len() {
            assert!(
                points[i].millivolts < points[i - 1].millivolts,
                "discharge curve voltages must strictly decrease"
            );
            assert!(
                points[i].pptt <= points[i - 1].pptt,
                "discharge curve levels must not increase"
            );
            i += 1;
        }
        assert!(points[0].pptt <= 10_000, "levels are capped at 10000 pptt");
        Self { points }
    }

    pub fn points(&self) -> &'static [Breakpoint] {
        self.points
    }

    /// Charge level in basis points.
    pub fn level_pptt(&self, millivolts: u16) -> u16 {
        let first = self.points[0];
        if millivolts >= first.millivolts {
            return first.pptt;
        }
        let last = self.points[self.points.len() - 1];
        if millivolts <= last.millivolts {
            return last.pptt;
        }

        // hi.millivolts > millivolts >= lo.millivolts for exactly one pair
        for pair in self.points.windows(2) {
            let (hi, lo) = (pair[0], pair[1]);
            if millivolts >= lo.millivolts {
                let span_mv = (hi.millivolts - lo.millivolts) as u32;
                let span_pptt = (hi.pptt - lo.pptt) as u32;
                let above = (millivolts - lo.millivolts) as u32;
                return lo.pptt + (span_pptt * above / span_mv) as u16;
            }
        }
        last.pptt
    }

    /// Charge level in whole percent, 0..=100.
    pub fn percentage_of(&self, millivolts: u16) -> u8 {
        (self.level_pptt(millivolts) / 100) as u8
    }
}

/// Adafruit 3.7 V 2000 mAh LiPo under load: 15/16 of its life between
/// 3.95 V and 3.55 V, the last 1/16 between 3.55 V and 3.10 V.
pub const LIPO_2000MAH: DischargeCurve = DischargeCurve::new(&[
    Breakpoint::new(3950, 10_000),
    Breakpoint::new(3550, 625),
    Breakpoint::new(3100, 0),
]);

pub fn percentage_of(millivolts: u16, curve: &DischargeCurve) -> u8 {
    curve.percentage_of(millivolts)
}
