//! The four nested pulse tiers and the arithmetic that derives them.
//!
//! Every tier's period depends on its parent: Div1 subdivides the base
//! beat, Div2 groups Div1's ticks into an audible cycle, and Div3
//! subdivides that full Div2 cycle. The formulas here decide the audible
//! rhythm, so they are kept in one place and covered by tests.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Floating point slack for time comparisons, in seconds.
pub const TIME_EPSILON: f64 = 1e-9;

/// Largest accepted subdivision count.
pub const MAX_COUNT: u32 = 64;

/// Largest accepted base tempo in beats per minute.
pub const MAX_TEMPO_BPM: f64 = 960.0;

/// One of the four pulse generators, ordered from the base beat down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierId {
    Base,
    Div1,
    Div2,
    Div3,
}

impl TierId {
    pub const ALL: [TierId; 4] = [TierId::Base, TierId::Div1, TierId::Div2, TierId::Div3];

    pub fn index(self) -> usize {
        match self {
            TierId::Base => 0,
            TierId::Div1 => 1,
            TierId::Div2 => 2,
            TierId::Div3 => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TierId::Base => "base",
            TierId::Div1 => "div1",
            TierId::Div2 => "div2",
            TierId::Div3 => "div3",
        }
    }
}

impl std::fmt::Display for TierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

impl std::str::FromStr for TierId {
    type Err = crate::RhythmError;

    fn from_str(value: &str) -> crate::Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "base" => Ok(TierId::Base),
            "div1" => Ok(TierId::Div1),
            "div2" => Ok(TierId::Div2),
            "div3" => Ok(TierId::Div3),
            other => Err(crate::RhythmError::UnknownTier(other.to_string())),
        }
    }
}

/// Fixed-size table with one slot per tier, indexed by [`TierId`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierMap<T>(pub [T; 4]);

impl<T> TierMap<T> {
    pub fn from_fn(mut f: impl FnMut(TierId) -> T) -> Self {
        Self(TierId::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TierId, &T)> {
        TierId::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<TierId> for TierMap<T> {
    type Output = T;

    fn index(&self, tier: TierId) -> &T {
        &self.0[tier.index()]
    }
}

impl<T> IndexMut<TierId> for TierMap<T> {
    fn index_mut(&mut self, tier: TierId) -> &mut T {
        &mut self.0[tier.index()]
    }
}

/// Per-tier mute flags.
pub type MuteState = TierMap<bool>;

/// Subdivision counts for the three dependent tiers. The base tier has an
/// implicit count of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierCounts {
    pub div1: u32,
    pub div2: u32,
    pub div3: u32,
}

impl Default for TierCounts {
    fn default() -> Self {
        Self {
            div1: 3,
            div2: 2,
            div3: 4,
        }
    }
}

/// Partial update for [`TierCounts`]; absent fields keep their value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountsUpdate {
    pub div1: Option<u32>,
    pub div2: Option<u32>,
    pub div3: Option<u32>,
}

impl TierCounts {
    pub fn new(div1: u32, div2: u32, div3: u32) -> Self {
        Self { div1, div2, div3 }.normalized()
    }

    /// Clamps every count into `1..=MAX_COUNT`.
    pub fn normalized(self) -> Self {
        Self {
            div1: clamp_count(self.div1),
            div2: clamp_count(self.div2),
            div3: clamp_count(self.div3),
        }
    }

    /// Applies a partial update and normalises the result.
    pub fn merged(self, update: CountsUpdate) -> Self {
        Self {
            div1: update.div1.unwrap_or(self.div1),
            div2: update.div2.unwrap_or(self.div2),
            div3: update.div3.unwrap_or(self.div3),
        }
        .normalized()
    }
}

fn clamp_count(count: u32) -> u32 {
    if count == 0 {
        tracing::warn!("subdivision count 0 clamped to 1");
        1
    } else if count > MAX_COUNT {
        tracing::warn!(count, max = MAX_COUNT, "subdivision count clamped");
        MAX_COUNT
    } else {
        count
    }
}

/// Normalises a requested tempo. Non-finite requests keep `previous`;
/// the result always lies in `1..=MAX_TEMPO_BPM`.
pub fn normalize_tempo(previous: f64, requested: f64) -> f64 {
    if !requested.is_finite() {
        tracing::warn!(requested, previous, "non-finite tempo ignored");
        return previous.clamp(1.0, MAX_TEMPO_BPM);
    }
    if requested > MAX_TEMPO_BPM {
        tracing::warn!(requested, max = MAX_TEMPO_BPM, "tempo clamped");
        return MAX_TEMPO_BPM;
    }
    if requested < 1.0 {
        tracing::warn!(requested, "tempo clamped to 1 bpm");
        return 1.0;
    }
    requested
}

/// Static shape of one tier, derived from tempo and counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPlan {
    pub segment_duration: f64,
    pub cycle_segments: u32,
    pub play_every_segment: bool,
}

impl TierPlan {
    /// Time between two audible pulses of this tier.
    pub fn audible_period(&self) -> f64 {
        if self.play_every_segment || self.cycle_segments <= 1 {
            self.segment_duration
        } else {
            self.segment_duration * f64::from(self.cycle_segments)
        }
    }
}

/// Derives all four tier plans from the tempo and the subdivision counts.
pub fn derive_plans(tempo_bpm: f64, counts: TierCounts) -> TierMap<TierPlan> {
    let base_period = 60.0 / tempo_bpm;

    let segments1 = if counts.div1 == 1 { 1 } else { counts.div1 };
    let div1 = TierPlan {
        segment_duration: base_period / f64::from(segments1),
        cycle_segments: segments1,
        play_every_segment: true,
    };

    // Div2 ticks at Div1's rate and only sounds on the first tick of each cycle.
    let side = base_period / f64::from(counts.div1.max(1));
    let segments2 = if counts.div2 == 1 { 1 } else { counts.div2 };
    let div2 = TierPlan {
        segment_duration: side,
        cycle_segments: segments2,
        play_every_segment: segments2 <= 1,
    };

    let cycle2 = side * f64::from(segments2);
    let segments3 = counts.div3.max(1);
    let div3 = TierPlan {
        segment_duration: cycle2 / f64::from(segments3),
        cycle_segments: segments3,
        play_every_segment: true,
    };

    let base = TierPlan {
        segment_duration: base_period,
        cycle_segments: 1,
        play_every_segment: true,
    };

    TierMap([base, div1, div2, div3])
}

/// Live phase counters of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierRuntime {
    pub segment_duration: f64,
    pub cycle_segments: u32,
    pub play_every_segment: bool,
    pub next_index: u64,
    pub next_time: f64,
    base_start: f64,
}

impl Default for TierRuntime {
    fn default() -> Self {
        Self {
            segment_duration: 0.0,
            cycle_segments: 1,
            play_every_segment: true,
            next_index: 0,
            next_time: 0.0,
            base_start: 0.0,
        }
    }
}

impl TierRuntime {
    /// Whether the tier can fire at all.
    pub fn is_active(&self) -> bool {
        self.segment_duration > 0.0
    }

    /// Rebases the tier onto `plan` using the engine's elapsed time.
    ///
    /// The index is taken from `elapsed`, never reset, and then pushed past
    /// any boundary that already lies in the past relative to `now`.
    pub fn recompute(&mut self, plan: TierPlan, elapsed: f64, now: f64) {
        self.segment_duration = plan.segment_duration;
        self.cycle_segments = plan.cycle_segments.max(1);
        self.play_every_segment = plan.play_every_segment;
        self.base_start = now - elapsed;

        if !(self.segment_duration.is_finite() && self.segment_duration > 0.0) {
            self.segment_duration = 0.0;
            self.next_index = 0;
            self.next_time = now + 1.0;
            return;
        }

        self.next_index = if elapsed <= 0.0 {
            0
        } else {
            (elapsed / self.segment_duration).floor() as u64
        };
        self.next_time = self.time_of(self.next_index);
        self.catch_up(now);
    }

    /// Skips boundaries earlier than `now` without replaying them.
    pub fn catch_up(&mut self, now: f64) {
        if !self.is_active() || self.next_time >= now - TIME_EPSILON {
            return;
        }
        let behind = ((now - self.base_start) / self.segment_duration).floor();
        if behind.is_finite() && behind > self.next_index as f64 {
            self.next_index = behind as u64;
            self.next_time = self.time_of(self.next_index);
        }
        while self.next_time < now - TIME_EPSILON {
            self.next_index += 1;
            self.next_time = self.time_of(self.next_index);
        }
    }

    /// Fire decision for the pending segment.
    pub fn fires(&self) -> bool {
        self.play_every_segment
            || self.cycle_segments <= 1
            || self.next_index % u64::from(self.cycle_segments) == 0
    }

    /// Moves to the following segment whether or not the current one fired.
    pub fn advance(&mut self) {
        self.next_index += 1;
        self.next_time = self.time_of(self.next_index);
    }

    /// Position within the current cycle as a fraction in `[0, 1)`.
    pub fn phase_at(&self, elapsed: f64) -> f64 {
        if !self.is_active() {
            return 0.0;
        }
        let cycle = self.segment_duration * f64::from(self.cycle_segments.max(1));
        (elapsed / cycle).rem_euclid(1.0)
    }

    fn time_of(&self, index: u64) -> f64 {
        self.base_start + index as f64 * self.segment_duration
    }
}
