use crate::error::ClassifierError;
use crate::session::ActiveChallenge;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One classifier output, consumed within the tick that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReading {
    pub label: String,
    pub confidence: f64,
}

impl ClassificationReading {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Parses the `<label> <confidence>` line format emitted by external classifiers.
impl FromStr for ClassificationReading {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (label, conf) = match (parts.next(), parts.next(), parts.next()) {
            (Some(label), Some(conf), None) => (label, conf),
            _ => return Err(ClassifierError::Malformed(s.to_string())),
        };
        let confidence: f64 = conf
            .parse()
            .map_err(|_| ClassifierError::Malformed(s.to_string()))?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ClassifierError::Malformed(s.to_string()));
        }
        Ok(Self::new(label, confidence))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Match,
    NoMatch,
}

/// A reading matches iff it is confident enough and names the active challenge.
/// Every call is independent; one confident correct reading is enough.
pub fn evaluate(
    reading: &ClassificationReading,
    challenge: &ActiveChallenge,
    confidence_threshold: f64,
) -> MatchResult {
    if reading.confidence >= confidence_threshold && reading.label == challenge.identifier {
        MatchResult::Match
    } else {
        MatchResult::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn challenge(id: &str) -> ActiveChallenge {
        ActiveChallenge::spawn(id.to_string(), -80.0, 100.0, 240.0)
    }

    #[test]
    fn confident_correct_label_matches() {
        let r = ClassificationReading::new("grin", 0.90);
        assert_eq!(evaluate(&r, &challenge("grin"), 0.85), MatchResult::Match);
    }

    #[test]
    fn threshold_is_inclusive() {
        let r = ClassificationReading::new("grin", 0.85);
        assert_eq!(evaluate(&r, &challenge("grin"), 0.85), MatchResult::Match);
    }

    #[test]
    fn below_threshold_never_matches() {
        let r = ClassificationReading::new("grin", 0.84);
        assert_eq!(evaluate(&r, &challenge("grin"), 0.85), MatchResult::NoMatch);
    }

    #[test]
    fn wrong_or_unknown_label_never_matches() {
        let c = challenge("grin");
        assert_eq!(
            evaluate(&ClassificationReading::new("kiss", 1.0), &c, 0.85),
            MatchResult::NoMatch
        );
        assert_eq!(
            evaluate(&ClassificationReading::new("not-in-catalog", 1.0), &c, 0.85),
            MatchResult::NoMatch
        );
    }

    #[test]
    fn evaluation_is_reproducible() {
        let r = ClassificationReading::new("shush", 0.91);
        let c = challenge("shush");
        let first = evaluate(&r, &c, 0.85);
        for _ in 0..10 {
            assert_eq!(evaluate(&r, &c, 0.85), first);
        }
    }

    #[test]
    fn parses_reading_lines() {
        let r: ClassificationReading = "grin 0.93".parse().unwrap();
        assert_eq!(r, ClassificationReading::new("grin", 0.93));

        assert_matches!(
            "grin".parse::<ClassificationReading>(),
            Err(ClassifierError::Malformed(_))
        );
        assert_matches!(
            "grin high".parse::<ClassificationReading>(),
            Err(ClassifierError::Malformed(_))
        );
        assert_matches!(
            "grin 1.5".parse::<ClassificationReading>(),
            Err(ClassifierError::Malformed(_))
        );
    }
}
