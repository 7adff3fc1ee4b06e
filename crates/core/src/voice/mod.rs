use serde::{Deserialize, Serialize};

use crate::TierId;

/// A pulse that the scheduler decided should sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub tier: TierId,
    /// Clock time in seconds at which the pulse should start.
    pub time: f64,
    pub gain: f32,
}

/// Sink for scheduled pulses.
///
/// Implementations schedule the sound on their own timeline; `play` is
/// called ahead of `pulse.time` by up to the look-ahead horizon and must
/// not block.
pub trait VoiceBank {
    fn play(&mut self, pulse: Pulse);
}

impl<V: VoiceBank + ?Sized> VoiceBank for &mut V {
    fn play(&mut self, pulse: Pulse) {
        (**self).play(pulse);
    }
}

impl<V: VoiceBank + ?Sized> VoiceBank for Box<V> {
    fn play(&mut self, pulse: Pulse) {
        (**self).play(pulse);
    }
}

/// Keeps every pulse it receives, in emission order.
#[derive(Debug, Default, Clone)]
pub struct PulseRecorder {
    pulses: Vec<Pulse>,
}

impl PulseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// Pulses of a single tier, in time order.
    pub fn tier(&self, tier: TierId) -> Vec<Pulse> {
        self.pulses.iter().copied().filter(|p| p.tier == tier).collect()
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
    }

    pub fn take(&mut self) -> Vec<Pulse> {
        std::mem::take(&mut self.pulses)
    }
}

impl VoiceBank for PulseRecorder {
    fn play(&mut self, pulse: Pulse) {
        self.pulses.push(pulse);
    }
}

/// Voice bank that only logs pulses. Stands in for the click synth when no
/// audio backend is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingVoiceBank {
    played: u64,
}

impl TracingVoiceBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> u64 {
        self.played
    }
}

impl VoiceBank for TracingVoiceBank {
    fn play(&mut self, pulse: Pulse) {
        self.played += 1;
        tracing::info!(
            tier = %pulse.tier,
            time = format_args!("{:.3}", pulse.time),
            gain = pulse.gain,
            "pulse"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(tier: TierId, time: f64) -> Pulse {
        Pulse {
            tier,
            time,
            gain: 1.0,
        }
    }

    #[test]
    fn recorder_filters_by_tier() {
        let mut recorder = PulseRecorder::new();
        recorder.play(pulse(TierId::Base, 0.0));
        recorder.play(pulse(TierId::Div2, 0.0));
        recorder.play(pulse(TierId::Base, 1.0));

        let base = recorder.tier(TierId::Base);
        assert_eq!(base.len(), 2);
        assert_eq!(base[1].time, 1.0);
        assert_eq!(recorder.take().len(), 3);
        assert!(recorder.pulses().is_empty());
    }

    #[test]
    fn tracing_bank_counts_pulses() {
        fn drive(mut voices: impl VoiceBank) {
            voices.play(pulse(TierId::Div3, 0.25));
        }

        let mut bank = TracingVoiceBank::new();
        drive(&mut bank);
        bank.play(pulse(TierId::Div1, 0.5));
        assert_eq!(bank.played(), 2);
    }
}
