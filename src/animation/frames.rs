//! Per-action animation frame storage.
//!
//! Loaded once from assets and shared read-only between every entity of a
//! type; controllers hold `Arc`s to individual action frame lists.
//!
//! Lookup priority for `frames(action)`:
//! 1. Exact match for the requested action
//! 2. Set-specific fallback (mobs alias move/walk)
//! 3. The default action ("stand")
//! 4. Any available animation (last resort)

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use crate::constants::DEFAULT_FRAME_DELAY;

/// One displayable animation frame.
///
/// `sprite` is an opaque handle the host renderer resolves to a texture;
/// the simulation only cares about timing and facing.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub sprite: u32,
    pub delay_ms: i32,
    pub flip: bool,
    pub origin: (i32, i32),
}

impl Frame {
    pub fn new(sprite: u32, delay_ms: i32) -> Self {
        Self {
            sprite,
            delay_ms,
            flip: false,
            origin: (0, 0),
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(0, DEFAULT_FRAME_DELAY)
    }
}

pub type FrameList = Arc<Vec<Frame>>;

/// Action-name-keyed animation storage with fallback lookup.
#[derive(Debug, Default)]
pub struct AnimationSet {
    animations: HashMap<String, FrameList>,
    action_list: Vec<String>,
    default_action: String,
}

impl AnimationSet {
    pub fn new() -> Self {
        Self {
            animations: HashMap::new(),
            action_list: Vec::new(),
            default_action: "stand".to_string(),
        }
    }

    /// Register frames for an action. Empty frame lists are ignored.
    pub fn add_animation(&mut self, action: &str, frames: Vec<Frame>) {
        if frames.is_empty() {
            return;
        }
        let key = action.to_lowercase();
        self.animations.insert(key.clone(), Arc::new(frames));
        if !self.action_list.contains(&key) {
            self.action_list.push(key);
        }
    }

    /// Exact lookup with no fallback.
    pub fn frames_exact(&self, action: &str) -> Option<FrameList> {
        self.animations.get(&action.to_lowercase()).cloned()
    }

    fn frames_with_fallback<F>(&self, action: &str, fallback: F) -> Option<FrameList>
    where
        F: FnOnce(&str) -> Option<FrameList>,
    {
        let key = action.to_lowercase();

        if let Some(frames) = self.animations.get(&key) {
            return Some(frames.clone());
        }
        if let Some(frames) = fallback(&key) {
            return Some(frames);
        }
        if key != self.default_action {
            if let Some(frames) = self.animations.get(&self.default_action) {
                return Some(frames.clone());
            }
        }
        self.animations.values().next().cloned()
    }

    /// Lookup with the default fallback chain (no set-specific aliasing).
    pub fn frames(&self, action: &str) -> Option<FrameList> {
        self.frames_with_fallback(action, |_| None)
    }

    pub fn has_animation(&self, action: &str) -> bool {
        self.animations.contains_key(&action.to_lowercase())
    }

    pub fn available_actions(&self) -> &[String] {
        &self.action_list
    }

    pub fn default_action(&self) -> &str {
        &self.default_action
    }

    pub fn set_default_action(&mut self, action: &str) {
        self.default_action = action.to_lowercase();
    }

    pub fn action_count(&self) -> usize {
        self.animations.len()
    }

    pub fn total_frame_count(&self) -> usize {
        self.animations.values().map(|f| f.len()).sum()
    }

    /// A random action name, for idle variety.
    pub fn random_action(&self, rng: &mut impl Rng) -> &str {
        if self.action_list.is_empty() {
            return &self.default_action;
        }
        &self.action_list[rng.gen_range(0..self.action_list.len())]
    }

    /// Whether a walking animation exists ("move" or "walk").
    pub fn can_walk(&self) -> bool {
        self.animations.contains_key("move") || self.animations.contains_key("walk")
    }
}

/// Mob animation set: move/walk aliasing, capability inference, and
/// per-attack hit-effect frames.
///
/// Movement capabilities are inferred from which animations exist, never
/// configured explicitly: a mob with a "fly" action flies, one with "jump"
/// jumps, one with "move"/"walk" walks.
#[derive(Debug, Default)]
pub struct MobAnimationSet {
    set: AnimationSet,
    attack_hit_effects: HashMap<String, FrameList>,
}

impl MobAnimationSet {
    pub fn new() -> Self {
        Self {
            set: AnimationSet::new(),
            attack_hit_effects: HashMap::new(),
        }
    }

    pub fn add_animation(&mut self, action: &str, frames: Vec<Frame>) {
        self.set.add_animation(action, frames);
    }

    /// Lookup with the mob fallback: "move" and "walk" alias each other.
    pub fn frames(&self, action: &str) -> Option<FrameList> {
        self.set.frames_with_fallback(action, |key| {
            if key == "move" || key == "walk" {
                self.set
                    .frames_exact("move")
                    .or_else(|| self.set.frames_exact("walk"))
            } else {
                None
            }
        })
    }

    /// Hit-effect frames played on the target of an attack action,
    /// falling back to attack1's when the specific attack has none.
    pub fn add_attack_hit_effect(&mut self, attack_action: &str, frames: Vec<Frame>) {
        if frames.is_empty() {
            return;
        }
        self.attack_hit_effects
            .insert(attack_action.to_lowercase(), Arc::new(frames));
    }

    pub fn attack_hit_effect(&self, attack_action: &str) -> Option<FrameList> {
        let key = attack_action.to_lowercase();
        if let Some(frames) = self.attack_hit_effects.get(&key) {
            return Some(frames.clone());
        }
        if key != "attack1" {
            return self.attack_hit_effects.get("attack1").cloned();
        }
        None
    }

    pub fn has_attack_hit_effect(&self, attack_action: &str) -> bool {
        self.attack_hit_effects
            .contains_key(&attack_action.to_lowercase())
    }

    pub fn can_fly(&self) -> bool {
        self.set.has_animation("fly")
    }

    pub fn can_jump(&self) -> bool {
        self.set.has_animation("jump")
    }

    pub fn can_move(&self) -> bool {
        self.set.can_walk()
    }

    pub fn inner(&self) -> &AnimationSet {
        &self.set
    }
}

/// NPC animation set: plain fallback chain, random idle actions.
#[derive(Debug, Default)]
pub struct NpcAnimationSet {
    set: AnimationSet,
}

impl NpcAnimationSet {
    pub fn new() -> Self {
        Self {
            set: AnimationSet::new(),
        }
    }

    pub fn add_animation(&mut self, action: &str, frames: Vec<Frame>) {
        self.set.add_animation(action, frames);
    }

    pub fn frames(&self, action: &str) -> Option<FrameList> {
        self.set.frames(action)
    }

    pub fn random_action(&self, rng: &mut impl Rng) -> &str {
        self.set.random_action(rng)
    }

    pub fn inner(&self) -> &AnimationSet {
        &self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frames_of(n: usize, delay: i32) -> Vec<Frame> {
        (0..n).map(|i| Frame::new(i as u32, delay)).collect()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut set = AnimationSet::new();
        set.add_animation("Stand", frames_of(3, 100));

        assert!(set.has_animation("stand"));
        assert_eq!(set.frames("STAND").unwrap().len(), 3);
    }

    #[test]
    fn test_empty_frames_ignored() {
        let mut set = AnimationSet::new();
        set.add_animation("stand", vec![]);
        assert_eq!(set.action_count(), 0);
    }

    #[test]
    fn test_fallback_to_default_then_any() {
        let mut set = AnimationSet::new();
        set.add_animation("stand", frames_of(2, 100));
        set.add_animation("attack1", frames_of(4, 50));

        // Unknown action falls back to stand
        assert_eq!(set.frames("die1").unwrap().len(), 2);

        let mut only_attack = AnimationSet::new();
        only_attack.add_animation("attack1", frames_of(4, 50));
        // No stand either: any animation is better than none
        assert_eq!(only_attack.frames("die1").unwrap().len(), 4);
    }

    #[test]
    fn test_mob_move_walk_aliasing() {
        let mut set = MobAnimationSet::new();
        set.add_animation("walk", frames_of(4, 80));

        assert_eq!(set.frames("move").unwrap().len(), 4);
        assert!(set.can_move());
    }

    #[test]
    fn test_capability_inference() {
        let mut flyer = MobAnimationSet::new();
        flyer.add_animation("fly", frames_of(2, 100));
        assert!(flyer.can_fly());
        assert!(!flyer.can_jump());
        assert!(!flyer.can_move());

        let mut jumper = MobAnimationSet::new();
        jumper.add_animation("jump", frames_of(2, 100));
        jumper.add_animation("move", frames_of(2, 100));
        assert!(jumper.can_jump());
        assert!(jumper.can_move());
    }

    #[test]
    fn test_attack_hit_effect_fallback() {
        let mut set = MobAnimationSet::new();
        set.add_attack_hit_effect("attack1", frames_of(3, 60));

        assert!(set.has_attack_hit_effect("attack1"));
        assert!(!set.has_attack_hit_effect("attack2"));
        // attack2 falls back to attack1's hit frames
        assert_eq!(set.attack_hit_effect("attack2").unwrap().len(), 3);
    }

    #[test]
    fn test_random_action_comes_from_set() {
        let mut set = AnimationSet::new();
        set.add_animation("stand", frames_of(1, 100));
        set.add_animation("say", frames_of(1, 100));

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let action = set.random_action(&mut rng);
            assert!(action == "stand" || action == "say");
        }
    }
}
