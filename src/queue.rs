use crate::catalog::ChallengeCatalog;
use crate::error::{EngineError, EngineResult};
use rand::seq::SliceRandom;
use rand::Rng;

/// Session-scoped random permutation of the catalog, consumed one id at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeQueue {
    remaining: Vec<String>,
}

impl ChallengeQueue {
    /// Draw a fresh permutation of every catalog identifier.
    pub fn initialize<R: Rng + ?Sized>(catalog: &ChallengeCatalog, rng: &mut R) -> Self {
        let mut remaining = catalog.ids().to_vec();
        remaining.shuffle(rng);
        Self { remaining }
    }

    pub fn pop_next(&mut self) -> EngineResult<String> {
        self.remaining.pop().ok_or(EngineError::EmptyQueue)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }
}
