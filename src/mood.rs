//! Phase to mood mapping
//!
//! Every phase the model can emit maps to exactly one mood descriptor. Labels
//! outside the table are rejected rather than given a fallback mood, so a class
//! catalog that drifts from this table surfaces as an error.

use crate::error::PredictError;
use std::fmt;
use std::str::FromStr;

/// Menstrual cycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Menstrual,
    Follicular,
    Fertility,
    Luteal,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Menstrual,
        Phase::Follicular,
        Phase::Fertility,
        Phase::Luteal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Menstrual => "Menstrual",
            Phase::Follicular => "Follicular",
            Phase::Fertility => "Fertility",
            Phase::Luteal => "Luteal",
        }
    }

    pub fn mood(&self) -> Mood {
        match self {
            Phase::Menstrual => Mood::RestAndRestore,
            Phase::Follicular => Mood::LightAndEnergized,
            Phase::Fertility => Mood::MagneticAndExpressive,
            Phase::Luteal => Mood::ReflectiveAndDeep,
        }
    }
}

impl FromStr for Phase {
    type Err = PredictError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == label)
            .ok_or_else(|| PredictError::UnmappedPhase(label.to_string()))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mood descriptor shown alongside a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mood {
    RestAndRestore,
    LightAndEnergized,
    MagneticAndExpressive,
    ReflectiveAndDeep,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::RestAndRestore => "Rest & Restore",
            Mood::LightAndEnergized => "Light & Energized",
            Mood::MagneticAndExpressive => "Magnetic & Expressive",
            Mood::ReflectiveAndDeep => "Reflective & Deep",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a predicted class label to its mood.
///
/// Fails with [`PredictError::UnmappedPhase`] for any label outside the table.
pub fn mood_for_label(label: &str) -> Result<Mood, PredictError> {
    label.parse::<Phase>().map(|phase| phase.mood())
}
