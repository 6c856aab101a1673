//! Animation state: per-action frame sets, the per-entity playback
//! controller, and the transient effect pool.

mod controller;
mod effects;
mod frames;

pub use controller::{AnimationController, AnimationEvent};
pub use effects::{AnimationEffects, EffectInstance, LightningBolt};
pub use frames::{AnimationSet, Frame, FrameList, MobAnimationSet, NpcAnimationSet};
