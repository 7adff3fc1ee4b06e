use std::sync::{Arc, Mutex, MutexGuard};

use crate::tier::{derive_plans, normalize_tempo, TIME_EPSILON};
use crate::{
    AppConfig, ClockSource, CountsUpdate, MuteState, Pulse, Result, RhythmError, TierCounts,
    TierId, TierMap, TierRuntime, VoiceBank,
};

/// Default look-ahead horizon in seconds.
pub const DEFAULT_LOOKAHEAD: f64 = 0.2;

/// Longest accepted look-ahead horizon in seconds.
pub const MAX_LOOKAHEAD: f64 = 2.0;

/// Look-ahead scheduler driving the four nested tiers.
///
/// The host calls [`RhythmEngine::tick`] periodically (every 25 ms or so).
/// Each call hands every pulse due before `now + lookahead` to the voice
/// bank, which schedules it on the clock's own timeline.
#[derive(Debug)]
pub struct RhythmEngine<C, V> {
    clock: C,
    voices: V,
    tempo_bpm: f64,
    counts: TierCounts,
    muted: MuteState,
    gains: TierMap<f32>,
    lookahead: f64,
    is_playing: bool,
    start_time: f64,
    paused_elapsed: f64,
    tiers: TierMap<TierRuntime>,
    last_emitted: TierMap<Option<f64>>,
}

impl<C: ClockSource, V: VoiceBank> RhythmEngine<C, V> {
    pub fn new(clock: C, voices: V, tempo_bpm: f64, counts: TierCounts, muted: MuteState) -> Self {
        let mut engine = Self {
            clock,
            voices,
            tempo_bpm: normalize_tempo(1.0, tempo_bpm),
            counts: counts.normalized(),
            muted,
            gains: TierMap([1.0; 4]),
            lookahead: DEFAULT_LOOKAHEAD,
            is_playing: false,
            start_time: 0.0,
            paused_elapsed: 0.0,
            tiers: TierMap::default(),
            last_emitted: TierMap::default(),
        };
        engine.recompute_all();
        engine
    }

    /// Builds an engine from the engine and voice sections of `config`.
    pub fn from_config(clock: C, voices: V, config: &AppConfig) -> Self {
        let engine = &config.engine;
        let mut built = Self::new(
            clock,
            voices,
            engine.tempo_bpm,
            engine.counts,
            engine.muted,
        )
        .with_lookahead(engine.lookahead_seconds);
        for (tier, gain) in config.voices.gains.iter() {
            built.set_gain(tier, *gain);
        }
        built
    }

    pub fn with_lookahead(mut self, seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            if seconds > MAX_LOOKAHEAD {
                tracing::warn!(seconds, max = MAX_LOOKAHEAD, "look-ahead clamped");
            }
            self.lookahead = seconds.min(MAX_LOOKAHEAD);
        } else {
            tracing::warn!(seconds, "ignoring invalid look-ahead");
        }
        self
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn counts(&self) -> TierCounts {
        self.counts
    }

    pub fn is_muted(&self, tier: TierId) -> bool {
        self.muted[tier]
    }

    pub fn gain(&self, tier: TierId) -> f32 {
        self.gains[tier]
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn tier_runtime(&self, tier: TierId) -> &TierRuntime {
        &self.tiers[tier]
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn voices(&self) -> &V {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut V {
        &mut self.voices
    }

    /// Seconds of playback so far. Falls back to the last paused snapshot
    /// while stopped or while the clock is unavailable.
    pub fn elapsed(&self) -> f64 {
        if !self.is_playing {
            return self.paused_elapsed;
        }
        match self.clock.now() {
            Some(now) => (now - self.start_time).max(0.0),
            None => self.paused_elapsed,
        }
    }

    /// Fraction of `tier`'s cycle completed at the current elapsed time.
    pub fn tier_phase(&self, tier: TierId) -> f64 {
        self.tiers[tier].phase_at(self.elapsed())
    }

    /// Starts playback from the paused position. Returns the number of
    /// pulses emitted by the priming tick.
    pub fn start(&mut self) -> usize {
        if self.is_playing {
            return 0;
        }
        self.clock.resume_if_suspended();
        let Some(now) = self.clock.now() else {
            tracing::warn!("clock unavailable, staying stopped");
            return 0;
        };

        self.start_time = now - self.paused_elapsed;
        self.is_playing = true;
        tracing::info!(
            elapsed = self.paused_elapsed,
            tempo_bpm = self.tempo_bpm,
            "transport started"
        );
        self.recompute_all();
        self.tick()
    }

    /// Stops scheduling. Pulses already handed to the voice bank play out.
    pub fn stop(&mut self) {
        if !self.is_playing {
            return;
        }
        self.paused_elapsed = self.elapsed();
        self.is_playing = false;
        tracing::info!(elapsed = self.paused_elapsed, "transport stopped");
    }

    /// Stops and rewinds to zero. The only operation that discards phase.
    pub fn reset(&mut self) {
        self.stop();
        self.paused_elapsed = 0.0;
        self.last_emitted = TierMap::default();
        self.recompute_all();
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        let tempo = normalize_tempo(self.tempo_bpm, bpm);
        tracing::debug!(from = self.tempo_bpm, to = tempo, "retempo");
        self.tempo_bpm = tempo;
        self.rebase();
        self.recompute_all();
    }

    pub fn set_counts(&mut self, update: CountsUpdate) {
        let counts = self.counts.merged(update);
        tracing::debug!(?counts, "subdivision counts changed");
        self.counts = counts;
        self.rebase();
        self.recompute_all();
    }

    /// Mute only gates emission; the tier keeps advancing underneath.
    pub fn set_mute_state(&mut self, tier: TierId, muted: bool) {
        self.muted[tier] = muted;
    }

    pub fn set_gain(&mut self, tier: TierId, gain: f32) {
        if gain.is_finite() {
            self.gains[tier] = gain.clamp(0.0, 1.0);
        } else {
            tracing::warn!(%tier, "non-finite gain ignored");
        }
    }

    /// Emits every pulse due within the look-ahead horizon and advances the
    /// tiers past them. Returns the number of pulses handed to the voices.
    pub fn tick(&mut self) -> usize {
        if !self.is_playing {
            return 0;
        }
        let Some(now) = self.clock.now() else {
            return 0;
        };
        let horizon = now + self.lookahead;
        let mut emitted = 0;

        for tier in TierId::ALL {
            let runtime = &mut self.tiers[tier];
            if !runtime.is_active() {
                continue;
            }
            runtime.catch_up(now);

            while runtime.next_time <= horizon {
                let fresh = self.last_emitted[tier]
                    .map_or(true, |last| runtime.next_time > last + TIME_EPSILON);
                if fresh && runtime.fires() && !self.muted[tier] {
                    let pulse = Pulse {
                        tier,
                        time: runtime.next_time,
                        gain: self.gains[tier],
                    };
                    tracing::trace!(%tier, index = runtime.next_index, time = pulse.time, "emit");
                    self.voices.play(pulse);
                    self.last_emitted[tier] = Some(pulse.time);
                    emitted += 1;
                }
                runtime.advance();
            }
        }

        emitted
    }

    /// Keeps wall-clock elapsed continuous across a parameter change.
    fn rebase(&mut self) {
        self.paused_elapsed = self.elapsed();
        if self.is_playing {
            if let Some(now) = self.clock.now() {
                self.start_time = now - self.paused_elapsed;
            }
        }
    }

    fn recompute_all(&mut self) {
        let Some(now) = self.clock.now() else {
            tracing::debug!("clock unavailable, tiers left untouched");
            return;
        };
        let elapsed = self.elapsed();
        let plans = derive_plans(self.tempo_bpm, self.counts);
        for tier in TierId::ALL {
            self.tiers[tier].recompute(plans[tier], elapsed, now);
            tracing::debug!(
                %tier,
                segment = plans[tier].segment_duration,
                cycle = plans[tier].cycle_segments,
                next_index = self.tiers[tier].next_index,
                "tier recomputed"
            );
        }
    }
}

/// Thread-safe handle around a [`RhythmEngine`] for hosts that tick from a
/// background thread while a control thread retunes it.
pub struct SharedEngine<C, V> {
    shared: Arc<Mutex<RhythmEngine<C, V>>>,
}

impl<C, V> Clone for SharedEngine<C, V> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<C: ClockSource, V: VoiceBank> SharedEngine<C, V> {
    pub fn new(engine: RhythmEngine<C, V>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn start(&self) -> Result<usize> {
        Ok(self.lock()?.start())
    }

    pub fn stop(&self) -> Result<()> {
        self.lock()?.stop();
        Ok(())
    }

    pub fn tick(&self) -> Result<usize> {
        Ok(self.lock()?.tick())
    }

    pub fn set_tempo(&self, bpm: f64) -> Result<()> {
        self.lock()?.set_tempo(bpm);
        Ok(())
    }

    pub fn set_counts(&self, update: CountsUpdate) -> Result<()> {
        self.lock()?.set_counts(update);
        Ok(())
    }

    pub fn set_mute_state(&self, tier: TierId, muted: bool) -> Result<()> {
        self.lock()?.set_mute_state(tier, muted);
        Ok(())
    }

    pub fn elapsed(&self) -> Result<f64> {
        Ok(self.lock()?.elapsed())
    }

    pub fn is_playing(&self) -> Result<bool> {
        Ok(self.lock()?.is_playing())
    }

    /// Runs `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut RhythmEngine<C, V>) -> R) -> Result<R> {
        let mut engine = self.lock()?;
        Ok(f(&mut engine))
    }

    fn lock(&self) -> Result<MutexGuard<'_, RhythmEngine<C, V>>> {
        self.shared
            .lock()
            .map_err(|_| RhythmError::Poisoned("rhythm engine"))
    }
}

impl<C, V> std::fmt::Debug for SharedEngine<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEngine").finish()
    }
}
