//! Core library for the Spiral Rhythm toys.
//!
//! Two independent subsystems live here. The [`timeline`] module holds a
//! look-ahead scheduler that derives four nested pulse tiers from a tempo and
//! three subdivision counts and stays phase-continuous across live retuning.
//! The [`geometry`] module rotates points about an in-plane axis so that
//! several copies of a dial can hinge around one shared anchor. Clocks and
//! voices are injected through the [`ClockSource`] and [`VoiceBank`] traits.

pub mod clock;
pub mod config;
pub mod error;
pub mod geometry;
pub mod render;
pub mod tier;
pub mod timeline;
pub mod voice;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use config::{AppConfig, EngineConfig, VoiceConfig};
pub use error::{Result, RhythmError};
pub use geometry::{
    create_axis_rotation_context, rotate_point_around_axis_on_plane, Point2D, RotatedPoint,
    RotationContext, UnitVector2D,
};
pub use render::{dial_angle, dial_outline, shade, CopyLayout, ProjectedCopy};
pub use tier::{CountsUpdate, MuteState, TierCounts, TierId, TierMap, TierPlan, TierRuntime};
pub use timeline::{RhythmEngine, SharedEngine, DEFAULT_LOOKAHEAD};
pub use voice::{Pulse, PulseRecorder, TracingVoiceBank, VoiceBank};
