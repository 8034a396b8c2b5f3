//! Session state machine: phases, lives, score and the falling challenge.
//!
//! The session is driven one tick at a time by [`Session::tick`]. Each tick takes
//! the input event for that frame and the elapsed time, polls the classifier
//! when a challenge is falling, and reports the discrete events that fired.
//! Rendering reads a [`SessionSnapshot`] and never mutates the session.

use crate::catalog::ChallengeCatalog;
use crate::classifier::Classifier;
use crate::config::GameConfig;
use crate::error::EngineError;
use crate::matcher::{evaluate, ClassificationReading, MatchResult};
use crate::queue::ChallengeQueue;
use crate::snapshot::{ActiveView, SessionSnapshot};
use crate::timing;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
pub enum Phase {
    NotStarted,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
pub enum Outcome {
    Win,
    Loss,
}

/// Player intent for a tick, already decoded from whatever device produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputEvent {
    Start,
    Retry,
    Quit,
    #[default]
    None,
}

/// Fired exactly once, on the tick where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted,
    Matched { identifier: String, score: u32 },
    Missed { identifier: String, lives: u32 },
    SessionWon { score: u32 },
    SessionLost { score: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub control: Control,
    pub events: Vec<SessionEvent>,
}

impl TickReport {
    fn new(control: Control, events: Vec<SessionEvent>) -> Self {
        Self { control, events }
    }

    pub fn should_quit(&self) -> bool {
        self.control == Control::Quit
    }
}

/// The single falling target of an active session.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChallenge {
    pub identifier: String,
    /// Top edge of the sprite; negative while still above the play area.
    pub vertical_position: f64,
    pub horizontal_position: f64,
    pub fall_velocity: f64,
    /// Seconds left in the success window, set once matched.
    pub resolution_timer: Option<f64>,
}

impl ActiveChallenge {
    pub fn spawn(
        identifier: String,
        vertical_position: f64,
        horizontal_position: f64,
        fall_velocity: f64,
    ) -> Self {
        Self {
            identifier,
            vertical_position,
            horizontal_position,
            fall_velocity,
            resolution_timer: None,
        }
    }

    pub fn is_resolving(&self) -> bool {
        self.resolution_timer.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub lives: u32,
    pub score: u32,
    pub queue: ChallengeQueue,
    pub active: Option<ActiveChallenge>,
    pub outcome: Option<Outcome>,
}

impl SessionState {
    fn fresh<R: Rng + ?Sized>(catalog: &ChallengeCatalog, lives: u32, rng: &mut R) -> Self {
        Self {
            phase: Phase::NotStarted,
            lives,
            score: 0,
            queue: ChallengeQueue::initialize(catalog, rng),
            active: None,
            outcome: None,
        }
    }
}

#[derive(Debug)]
pub struct Session<R: Rng = StdRng> {
    config: GameConfig,
    catalog: ChallengeCatalog,
    state: SessionState,
    rng: R,
    pending: Vec<SessionEvent>,
}

impl Session<StdRng> {
    pub fn new(config: GameConfig) -> Result<Self, EngineError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self, EngineError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Session<R> {
    pub fn with_rng(config: GameConfig, mut rng: R) -> Result<Self, EngineError> {
        let catalog = config
            .validate()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        let state = SessionState::fresh(&catalog, config.starting_lives, &mut rng);

        let mut session = Self {
            config,
            catalog,
            state,
            rng,
            pending: Vec::new(),
        };
        if session.config.skip_start_screen {
            session.begin();
        }
        Ok(session)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ChallengeCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Advance the session by one tick of `dt` seconds.
    pub fn tick<C: Classifier + ?Sized>(
        &mut self,
        input: InputEvent,
        dt: f64,
        classifier: &mut C,
    ) -> TickReport {
        let mut events = std::mem::take(&mut self.pending);

        match (input, self.state.phase) {
            (InputEvent::Quit, phase) => {
                info!(%phase, "quit requested");
                return TickReport::new(Control::Quit, events);
            }
            (InputEvent::Start, Phase::NotStarted) => {
                self.begin();
                events.append(&mut self.pending);
            }
            (InputEvent::Retry, Phase::Finished) => {
                self.reset();
                self.begin();
                events.append(&mut self.pending);
            }
            (InputEvent::None, _) => {}
            (input, phase) => debug!(?input, %phase, "ignoring input"),
        }

        if self.state.phase == Phase::Active {
            self.step_active(dt.max(0.0), classifier, &mut events);
        }

        TickReport::new(Control::Continue, events)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let pop = self.config.pop_duration_secs;
        SessionSnapshot {
            phase: self.state.phase,
            lives: self.state.lives,
            score: self.state.score,
            remaining: self.state.queue.len(),
            outcome: self.state.outcome,
            active: self.state.active.as_ref().map(|c| ActiveView {
                identifier: c.identifier.clone(),
                vertical_position: c.vertical_position,
                horizontal_position: c.horizontal_position,
                is_resolving: c.is_resolving(),
                resolution_progress: c
                    .resolution_timer
                    .map(|t| ((pop - t) / pop).clamp(0.0, 1.0)),
            }),
        }
    }

    fn begin(&mut self) {
        info!(
            challenges = self.state.queue.len(),
            lives = self.state.lives,
            "session started"
        );
        self.state.phase = Phase::Active;
        self.pending.push(SessionEvent::SessionStarted);
    }

    fn reset(&mut self) {
        self.state = SessionState::fresh(&self.catalog, self.config.starting_lives, &mut self.rng);
    }

    fn spawn_next(&mut self) {
        let identifier = match self.state.queue.pop_next() {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "spawn without a queued challenge");
                return;
            }
        };
        let max_x = (self.config.play_width - self.config.sprite_extent).max(0.0);
        let x = self.rng.gen_range(0.0..=max_x);
        debug!(%identifier, x, "spawning challenge");
        self.state.active = Some(ActiveChallenge::spawn(
            identifier,
            -self.config.sprite_extent,
            x,
            self.config.fall_velocity,
        ));
    }

    fn step_active<C: Classifier + ?Sized>(
        &mut self,
        dt: f64,
        classifier: &mut C,
        events: &mut Vec<SessionEvent>,
    ) {
        if self.state.active.is_none() && !self.state.queue.is_empty() {
            self.spawn_next();
        }

        if let Some(challenge) = self.state.active.as_mut() {
            match challenge.resolution_timer {
                Some(timer) => {
                    let timer = timer - dt;
                    if timer <= 0.0 {
                        debug!(identifier = %challenge.identifier, "challenge resolved");
                        self.state.active = None;
                    } else {
                        challenge.resolution_timer = Some(timer);
                    }
                }
                None => {
                    challenge.vertical_position =
                        timing::advance(challenge.vertical_position, challenge.fall_velocity, dt);

                    match classifier.classify() {
                        Ok(reading) => {
                            if let Some(ref r) = reading {
                                debug!(label = %r.label, confidence = r.confidence, "detected");
                            }
                            self.judge(reading, events);
                        }
                        Err(e) => warn!(error = %e, "classifier failed, skipping evaluation"),
                    }
                }
            }
        }

        if self.state.phase == Phase::Active
            && self.state.active.is_none()
            && self.state.queue.is_empty()
        {
            let outcome = if self.state.lives > 0 {
                Outcome::Win
            } else {
                Outcome::Loss
            };
            self.finish(outcome, events);
        }
    }

    /// Match has priority over a boundary miss on the same tick.
    fn judge(&mut self, reading: Option<ClassificationReading>, events: &mut Vec<SessionEvent>) {
        let Some(challenge) = self.state.active.as_mut() else {
            return;
        };

        let matched = reading.as_ref().is_some_and(|r| {
            evaluate(r, challenge, self.config.confidence_threshold) == MatchResult::Match
        });

        if matched {
            self.state.score += 1;
            challenge.resolution_timer = Some(self.config.pop_duration_secs);
            info!(identifier = %challenge.identifier, score = self.state.score, "matched");
            events.push(SessionEvent::Matched {
                identifier: challenge.identifier.clone(),
                score: self.state.score,
            });
        } else if timing::has_crossed_boundary(
            challenge.vertical_position,
            self.config.sprite_extent,
            self.config.play_height,
        ) {
            self.state.lives = self.state.lives.saturating_sub(1);
            let identifier = challenge.identifier.clone();
            self.state.active = None;
            info!(%identifier, lives = self.state.lives, "missed");
            events.push(SessionEvent::Missed {
                identifier,
                lives: self.state.lives,
            });
            if self.state.lives == 0 {
                self.finish(Outcome::Loss, events);
            }
        }
    }

    fn finish(&mut self, outcome: Outcome, events: &mut Vec<SessionEvent>) {
        self.state.phase = Phase::Finished;
        self.state.outcome = Some(outcome);
        self.state.active = None;
        info!(%outcome, score = self.state.score, lives = self.state.lives, "session finished");
        events.push(match outcome {
            Outcome::Win => SessionEvent::SessionWon {
                score: self.state.score,
            },
            Outcome::Loss => SessionEvent::SessionLost {
                score: self.state.score,
            },
        });
    }
}
