//! Admission control: capacity and directional concentration.
//!
//! A new position is refused when the ledger is full, when there is no
//! capital, or when admitting it would push the share of the dominant side
//! above `max_concentration`. A candidate on the minority side (its side has
//! no more positions than the other) is always allowed through the
//! concentration check, since it can only rebalance the book.

use super::position::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SideCounts {
    pub long: usize,
    pub short: usize,
}

impl SideCounts {
    pub fn total(&self) -> usize {
        self.long + self.short
    }

    pub fn of(&self, side: Side) -> usize {
        match side {
            Side::Long => self.long,
            Side::Short => self.short,
        }
    }

    pub fn with_added(&self, side: Side) -> SideCounts {
        match side {
            Side::Long => SideCounts {
                long: self.long + 1,
                ..*self
            },
            Side::Short => SideCounts {
                short: self.short + 1,
                ..*self
            },
        }
    }

    /// Share of the larger side, 0 for an empty book.
    pub fn concentration(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.long.max(self.short) as f64 / total as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    Admitted,
    AtCapacity { open: usize, max: usize },
    NoCapital,
    Concentrated { concentration: f64, max: f64 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionController {
    max_positions: usize,
    max_concentration: f64,
}

impl AdmissionController {
    pub fn new(max_positions: usize, max_concentration: f64) -> Self {
        AdmissionController {
            max_positions,
            max_concentration,
        }
    }

    pub fn can_open(&self, open: SideCounts, side: Side, capital: f64) -> Admission {
        if open.total() >= self.max_positions {
            return Admission::AtCapacity {
                open: open.total(),
                max: self.max_positions,
            };
        }
        if capital <= 0.0 {
            return Admission::NoCapital;
        }

        let minority = open.of(side) <= open.of(side.opposite());
        if !minority {
            let concentration = open.with_added(side).concentration();
            if concentration > self.max_concentration {
                return Admission::Concentrated {
                    concentration,
                    max: self.max_concentration,
                };
            }
        }
        Admission::Admitted
    }
}
