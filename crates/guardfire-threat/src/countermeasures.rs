//! Countermeasure dispensing sequences.
//!
//! Each sequence is a small task polled once per tick: it drops a fixed
//! number of countermeasures at a fixed interval, then holds its "busy" flag
//! for a wait period so a new sequence of the same kind cannot start early.

use guardfire_core::config::CountermeasureConfig;
use guardfire_core::constants::MAX_CLOSING_TIME_SECS;
use guardfire_core::enums::Countermeasure;
use guardfire_core::types::Velocity;

/// Sequence family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Flares,
    Chaff,
    /// Flares and chaff together, once per second.
    Salvo,
    Jammer,
}

/// Action the host must perform this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispenseAction {
    Drop(Countermeasure),
    JammerOn,
    JammerOff,
}

/// One running dispensing sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct CountermeasureSequence {
    pub kind: SequenceKind,
    /// Drops (or jammer activations) still to perform.
    remaining: u32,
    interval: f64,
    next_at: f64,
    /// Time the busy flag clears.
    release_at: f64,
}

impl CountermeasureSequence {
    fn repeating(kind: SequenceKind, repetitions: u32, interval: f64, wait: f64, now: f64) -> Self {
        let interval = interval.max(0.0);
        Self {
            kind,
            remaining: repetitions,
            interval,
            next_at: now,
            release_at: now + interval * repetitions as f64 + wait.max(0.0),
        }
    }

    /// Advance to `now`, returning everything due.
    fn poll(&mut self, now: f64, out: &mut Vec<DispenseAction>) {
        while self.remaining > 0 && now >= self.next_at {
            match self.kind {
                SequenceKind::Flares => out.push(DispenseAction::Drop(Countermeasure::Flare)),
                SequenceKind::Chaff => out.push(DispenseAction::Drop(Countermeasure::Chaff)),
                SequenceKind::Salvo => {
                    out.push(DispenseAction::Drop(Countermeasure::Flare));
                    out.push(DispenseAction::Drop(Countermeasure::Chaff));
                }
                SequenceKind::Jammer => out.push(DispenseAction::JammerOn),
            }
            self.remaining -= 1;
            self.next_at += self.interval;
        }
        if self.is_finished(now) && self.kind == SequenceKind::Jammer {
            out.push(DispenseAction::JammerOff);
        }
    }

    fn is_finished(&self, now: f64) -> bool {
        self.remaining == 0 && now >= self.release_at
    }
}

/// All dispensing sequences of one platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispenser {
    sequences: Vec<CountermeasureSequence>,
}

impl Dispenser {
    pub fn is_flaring(&self) -> bool {
        self.sequences
            .iter()
            .any(|s| matches!(s.kind, SequenceKind::Flares | SequenceKind::Salvo))
    }

    pub fn is_chaffing(&self) -> bool {
        self.sequences
            .iter()
            .any(|s| matches!(s.kind, SequenceKind::Chaff | SequenceKind::Salvo))
    }

    pub fn is_jamming(&self) -> bool {
        self.sequences.iter().any(|s| s.kind == SequenceKind::Jammer)
    }

    /// Start a flare sequence if the threat is inside the closing-time gate.
    pub fn start_flares(&mut self, closing_time: f64, config: &CountermeasureConfig, now: f64) -> bool {
        if self.is_flaring() || closing_time > config.cm_threshold {
            return false;
        }
        self.sequences.push(CountermeasureSequence::repeating(
            SequenceKind::Flares,
            config.flare_repetitions,
            config.flare_interval,
            config.flare_wait,
            now,
        ));
        true
    }

    /// Start a chaff sequence if the threat is inside the closing-time gate.
    pub fn start_chaff(&mut self, closing_time: f64, config: &CountermeasureConfig, now: f64) -> bool {
        if self.is_chaffing() || closing_time > config.cm_threshold {
            return false;
        }
        self.sequences.push(CountermeasureSequence::repeating(
            SequenceKind::Chaff,
            config.chaff_repetitions,
            config.chaff_interval,
            config.chaff_wait,
            now,
        ));
        true
    }

    /// Start the everything-at-once salvo when impact is imminent. A running
    /// flare or chaff sequence is replaced by the salvo.
    pub fn start_salvo(&mut self, closing_time: f64, config: &CountermeasureConfig, now: f64) -> bool {
        let imminent = config.cm_threshold * config.imminent_fraction;
        let salvo_running = self.sequences.iter().any(|s| s.kind == SequenceKind::Salvo);
        if salvo_running || closing_time > imminent {
            return false;
        }
        self.sequences
            .retain(|s| !matches!(s.kind, SequenceKind::Flares | SequenceKind::Chaff));
        self.sequences.push(CountermeasureSequence::repeating(
            SequenceKind::Salvo,
            config.salvo_repetitions,
            1.0,
            0.0,
            now,
        ));
        true
    }

    /// Switch the jammer on for a fixed burst.
    pub fn start_jammer(&mut self, config: &CountermeasureConfig, now: f64) -> bool {
        if self.is_jamming() {
            return false;
        }
        self.sequences.push(CountermeasureSequence {
            kind: SequenceKind::Jammer,
            remaining: 1,
            interval: 0.0,
            next_at: now,
            release_at: now + config.jammer_duration.max(0.0),
        });
        true
    }

    /// Advance every sequence and drop the finished ones.
    pub fn poll(&mut self, now: f64) -> Vec<DispenseAction> {
        let mut out = Vec::new();
        for seq in &mut self.sequences {
            seq.poll(now, &mut out);
        }
        self.sequences.retain(|s| !s.is_finished(now));
        out
    }

    /// Abort everything, switching the jammer off if it was on.
    pub fn cancel_all(&mut self) -> Vec<DispenseAction> {
        let was_jamming = self
            .sequences
            .iter()
            .any(|s| s.kind == SequenceKind::Jammer && s.remaining == 0);
        self.sequences.clear();
        if was_jamming {
            vec![DispenseAction::JammerOff]
        } else {
            Vec::new()
        }
    }
}

/// Seconds until a threat reaches us at the current relative speed,
/// clamped to `[0, MAX_CLOSING_TIME_SECS]`.
pub fn closing_time(distance: f64, threat_velocity: &Velocity, own_velocity: &Velocity) -> f64 {
    let relative = (threat_velocity.to_dvec3() - own_velocity.to_dvec3()).length();
    if relative <= f64::EPSILON || !distance.is_finite() {
        return MAX_CLOSING_TIME_SECS;
    }
    (distance / relative).clamp(0.0, MAX_CLOSING_TIME_SECS)
}
