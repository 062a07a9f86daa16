//! Scorer output: direction, confidence and the reasoning behind it.

use serde::{Deserialize, Serialize};

use super::position::Side;
use super::structure::MarketStructure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    pub fn side(self) -> Option<Side> {
        match self {
            Direction::Long => Some(Side::Long),
            Direction::Short => Some(Side::Short),
            Direction::Neutral => None,
        }
    }

    /// +1 for long, -1 for short, 0 for neutral.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
            Direction::Neutral => 0.0,
        }
    }
}

/// The gate that turned a candidate into a neutral signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VetoReason {
    InsufficientHistory,
    NoConfluence,
    WeakConfluence,
    ProfitBelowFees,
    InsufficientVolume,
    WideSpread,
    WeakMomentum,
    InsufficientIndicatorConfluence,
    AgainstStructure,
    NotAGrade,
    LowScore,
}

impl VetoReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VetoReason::InsufficientHistory => "insufficient_history",
            VetoReason::NoConfluence => "no_confluence",
            VetoReason::WeakConfluence => "weak_confluence",
            VetoReason::ProfitBelowFees => "profit_below_fees",
            VetoReason::InsufficientVolume => "insufficient_volume",
            VetoReason::WideSpread => "wide_spread",
            VetoReason::WeakMomentum => "weak_momentum",
            VetoReason::InsufficientIndicatorConfluence => "insufficient_indicator_confluence",
            VetoReason::AgainstStructure => "against_structure",
            VetoReason::NotAGrade => "not_a_grade",
            VetoReason::LowScore => "low_score",
        }
    }
}

impl std::fmt::Display for VetoReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Grade from the number of passed quality checks (out of four).
    pub fn from_checks(passed: usize) -> Self {
        match passed {
            4.. => Grade::A,
            3 => Grade::B,
            2 => Grade::C,
            1 => Grade::D,
            _ => Grade::F,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalMetadata {
    pub veto: Option<VetoReason>,
    /// Horizons whose returns agreed with the direction.
    pub agreeing_horizons: usize,
    pub confluence_strength: f64,
    pub volume_ratio: f64,
    pub spread_bps: f64,
    pub indicator_votes: usize,
    pub structure: Option<MarketStructure>,
    pub grade: Option<Grade>,
    /// Reward to the next opposing level over the stop distance.
    pub risk_reward: f64,
    /// Composite score before exploration and grade adjustments.
    pub raw_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    pub score: f64,
    pub metadata: SignalMetadata,
}

impl Signal {
    pub fn neutral(reason: VetoReason, metadata: SignalMetadata) -> Self {
        Signal {
            direction: Direction::Neutral,
            score: 0.0,
            metadata: SignalMetadata {
                veto: Some(reason),
                ..metadata
            },
        }
    }

    pub fn is_directional(&self) -> bool {
        self.direction != Direction::Neutral
    }

    pub fn veto(&self) -> Option<VetoReason> {
        self.metadata.veto
    }
}
