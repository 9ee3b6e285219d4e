//! Delay profiles for playback pacing.

use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::PhaseType;

/// Inclusive millisecond range a phase delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draw a delay from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }
}

/// Named pacing profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PacingProfile {
    /// Roughly one to two seconds per phase.
    Brisk,
    /// Five to twenty seconds per phase.
    Deliberate,
    /// No delay at all.
    Instant,
}

impl Default for PacingProfile {
    fn default() -> Self {
        Self::Brisk
    }
}

impl PacingProfile {
    /// Delay range for a phase type under this profile.
    pub fn range(&self, phase: PhaseType) -> DelayRange {
        match self {
            Self::Brisk => match phase {
                PhaseType::InitialOutput => DelayRange::new(1_500, 2_500),
                PhaseType::CriticReview => DelayRange::new(800, 1_200),
                PhaseType::ImproverRefinement => DelayRange::new(1_200, 1_800),
                PhaseType::FinalApproval => DelayRange::new(800, 1_200),
            },
            Self::Deliberate => DelayRange::new(5_000, 20_000),
            Self::Instant => DelayRange::new(0, 0),
        }
    }

    /// Draw the delay that follows a phase of type `phase`.
    pub fn delay_for<R: Rng + ?Sized>(&self, phase: PhaseType, rng: &mut R) -> Duration {
        self.range(phase).sample(rng)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brisk => "brisk",
            Self::Deliberate => "deliberate",
            Self::Instant => "instant",
        }
    }
}

impl FromStr for PacingProfile {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brisk" | "fast" => Ok(Self::Brisk),
            "deliberate" | "slow" => Ok(Self::Deliberate),
            "instant" | "none" => Ok(Self::Instant),
            other => Err(CoreError::UnknownProfile(other.to_string())),
        }
    }
}

impl std::fmt::Display for PacingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_brisk_delays_within_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for phase in PhaseType::ORDER {
            let range = PacingProfile::Brisk.range(phase);
            for _ in 0..50 {
                let delay = PacingProfile::Brisk.delay_for(phase, &mut rng).as_millis() as u64;
                assert!(delay >= range.min_ms && delay <= range.max_ms);
            }
        }
    }

    #[test]
    fn test_instant_is_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            PacingProfile::Instant.delay_for(PhaseType::InitialOutput, &mut rng),
            Duration::ZERO
        );
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("Deliberate".parse::<PacingProfile>().unwrap(), PacingProfile::Deliberate);
        assert!("warp".parse::<PacingProfile>().is_err());
    }
}
