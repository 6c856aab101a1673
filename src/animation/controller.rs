//! Per-entity animation playback.
//!
//! Tracks the current action, frame index, and timing against the shared
//! frame set. Actions either loop or play once and hold on the last frame;
//! a one-shot can queue a follow-up action that activates on completion.
//!
//! Completion and action-change notifications are recorded into an event
//! list the owner drains after each tick, keeping side-effect ordering
//! visible to callers and tests.

use crate::animation::frames::FrameList;
use crate::animation::Frame;
use crate::constants::{DEFAULT_FRAME_DELAY, MIN_FRAME_DELAY};
use crate::time::tick_diff;

/// Notifications recorded during controller updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationEvent {
    ActionChanged { previous: String, current: String },
    Completed { action: String },
}

/// Animation playback state machine for one entity.
pub struct AnimationController {
    lookup: Box<dyn Fn(&str) -> Option<FrameList> + Send + Sync>,
    current_action: String,
    previous_action: String,
    current_frames: Option<FrameList>,
    current_frame_index: usize,
    last_frame_switch_tick: i32,
    playing_once: bool,
    completed: bool,
    transition_action: Option<String>,
    events: Vec<AnimationEvent>,
}

impl AnimationController {
    /// Create a controller over an animation-set lookup, starting on
    /// `initial_action` (falling back per the set's lookup rules).
    pub fn new<F>(lookup: F, initial_action: &str) -> Self
    where
        F: Fn(&str) -> Option<FrameList> + Send + Sync + 'static,
    {
        let current_frames = lookup(initial_action);
        Self {
            lookup: Box::new(lookup),
            current_action: initial_action.to_string(),
            previous_action: initial_action.to_string(),
            current_frames,
            current_frame_index: 0,
            last_frame_switch_tick: 0,
            playing_once: false,
            completed: false,
            transition_action: None,
            events: Vec::new(),
        }
    }

    pub fn current_action(&self) -> &str {
        &self.current_action
    }

    pub fn previous_action(&self) -> &str {
        &self.previous_action
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame_index
    }

    pub fn frame_count(&self) -> usize {
        self.current_frames.as_ref().map_or(0, |f| f.len())
    }

    pub fn is_animation_complete(&self) -> bool {
        self.completed
    }

    pub fn is_playing_once(&self) -> bool {
        self.playing_once
    }

    /// Drain notifications recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<AnimationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Switch to a looping action.
    ///
    /// No-op returning false when the action is already playing (and not
    /// completed) or when the set has no frames for it.
    pub fn set_action(&mut self, action: &str) -> bool {
        self.set_action_internal(action, false)
    }

    /// Play an action once, holding on its last frame when done.
    pub fn play_once(&mut self, action: &str) -> bool {
        self.set_action_internal(action, true)
    }

    /// Play an action once, then automatically switch to `next`.
    pub fn play_once_then(&mut self, action: &str, next: &str) -> bool {
        if self.set_action_internal(action, true) {
            self.transition_action = Some(next.to_string());
            true
        } else {
            false
        }
    }

    fn set_action_internal(&mut self, action: &str, play_once: bool) -> bool {
        if action == self.current_action && !self.completed {
            return false;
        }

        let Some(new_frames) = (self.lookup)(action) else {
            return false;
        };
        if new_frames.is_empty() {
            return false;
        }

        self.previous_action = std::mem::replace(&mut self.current_action, action.to_string());
        self.current_frames = Some(new_frames);
        self.current_frame_index = 0;
        self.last_frame_switch_tick = 0;
        self.playing_once = play_once;
        self.completed = false;
        self.transition_action = None;

        self.events.push(AnimationEvent::ActionChanged {
            previous: self.previous_action.clone(),
            current: self.current_action.clone(),
        });
        true
    }

    /// Rewind to the first frame without changing the action.
    pub fn reset(&mut self) {
        self.current_frame_index = 0;
        self.last_frame_switch_tick = 0;
        self.completed = false;
    }

    /// Switch back to the action that preceded the current one.
    pub fn revert_to_previous(&mut self) {
        if !self.previous_action.is_empty() && self.previous_action != self.current_action {
            let previous = self.previous_action.clone();
            self.set_action(&previous);
        }
    }

    /// Advance playback against the wall-clock tick.
    ///
    /// Returns whether the visible frame changed. Calling twice with the
    /// same tick changes state at most once: the second call sees the
    /// per-frame delay unelapsed and does nothing.
    pub fn update_frame(&mut self, tick: i32) -> bool {
        let Some(frames) = self.current_frames.clone() else {
            return false;
        };
        if frames.is_empty() {
            return false;
        }

        // First call after an action switch only arms the timer
        if self.last_frame_switch_tick == 0 {
            self.last_frame_switch_tick = tick;
            return false;
        }

        if self.playing_once && self.completed {
            // A queued transition fires on the tick after completion
            if let Some(next) = self.transition_action.take() {
                self.set_action(&next);
                return true;
            }
            return false;
        }

        let delay = self.current_frame_delay(&frames);
        if tick_diff(tick, self.last_frame_switch_tick) < delay {
            return false;
        }

        self.last_frame_switch_tick = tick;
        let previous_index = self.current_frame_index;
        self.current_frame_index += 1;

        if self.current_frame_index >= frames.len() {
            if self.playing_once {
                // Hold on the last frame
                self.current_frame_index = frames.len() - 1;
                self.completed = true;
                self.events.push(AnimationEvent::Completed {
                    action: self.current_action.clone(),
                });

                if let Some(next) = self.transition_action.take() {
                    self.set_action(&next);
                }
            } else {
                self.current_frame_index = 0;
                self.events.push(AnimationEvent::Completed {
                    action: self.current_action.clone(),
                });
            }
        }

        self.current_frame_index != previous_index
    }

    fn current_frame_delay(&self, frames: &[Frame]) -> i32 {
        let delay = frames
            .get(self.current_frame_index)
            .map_or(DEFAULT_FRAME_DELAY, |f| f.delay_ms);
        delay.max(MIN_FRAME_DELAY)
    }

    /// The frame to draw, index clamped into range.
    pub fn current_frame(&self) -> Option<Frame> {
        let frames = self.current_frames.as_ref()?;
        if frames.is_empty() {
            return None;
        }
        let index = self.current_frame_index.min(frames.len() - 1);
        Some(frames[index])
    }

    /// A specific frame by index, clamped into range.
    pub fn frame(&self, index: usize) -> Option<Frame> {
        let frames = self.current_frames.as_ref()?;
        if frames.is_empty() {
            return None;
        }
        Some(frames[index.min(frames.len() - 1)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationSet, Frame};
    use std::sync::Arc;

    fn test_set() -> Arc<AnimationSet> {
        let mut set = AnimationSet::new();
        set.add_animation("stand", (0..3).map(|i| Frame::new(i, 100)).collect());
        set.add_animation("move", (0..4).map(|i| Frame::new(i, 80)).collect());
        set.add_animation("attack1", (0..3).map(|i| Frame::new(i, 50)).collect());
        Arc::new(set)
    }

    fn controller(initial: &str) -> AnimationController {
        let set = test_set();
        AnimationController::new(move |action| set.frames_exact(action), initial)
    }

    #[test]
    fn test_initial_action() {
        let ctrl = controller("stand");
        assert_eq!(ctrl.current_action(), "stand");
        assert_eq!(ctrl.current_frame_index(), 0);
        assert_eq!(ctrl.frame_count(), 3);
    }

    #[test]
    fn test_set_action_changes_and_fires_event() {
        let mut ctrl = controller("stand");

        assert!(ctrl.set_action("move"));
        assert_eq!(ctrl.current_action(), "move");
        assert_eq!(ctrl.previous_action(), "stand");
        assert_eq!(
            ctrl.drain_events(),
            vec![AnimationEvent::ActionChanged {
                previous: "stand".into(),
                current: "move".into()
            }]
        );
    }

    #[test]
    fn test_set_action_same_is_noop() {
        let mut ctrl = controller("stand");
        assert!(!ctrl.set_action("stand"));
        assert!(ctrl.drain_events().is_empty());
    }

    #[test]
    fn test_set_action_unknown_is_noop() {
        let mut ctrl = controller("stand");
        assert!(!ctrl.set_action("no_such_action"));
        assert_eq!(ctrl.current_action(), "stand");
        // Prior state is untouched
        assert_eq!(ctrl.frame_count(), 3);
    }

    #[test]
    fn test_update_frame_advances_after_delay() {
        let mut ctrl = controller("stand");

        // First call arms the timer
        assert!(!ctrl.update_frame(1));
        assert_eq!(ctrl.current_frame_index(), 0);

        // Delay (100ms) not yet elapsed
        assert!(!ctrl.update_frame(50));
        assert_eq!(ctrl.current_frame_index(), 0);

        assert!(ctrl.update_frame(150));
        assert_eq!(ctrl.current_frame_index(), 1);
    }

    #[test]
    fn test_update_frame_same_tick_is_idempotent() {
        let mut ctrl = controller("stand");
        ctrl.update_frame(1);
        ctrl.update_frame(1000);
        let index = ctrl.current_frame_index();
        assert!(!ctrl.update_frame(1000));
        assert_eq!(ctrl.current_frame_index(), index);
    }

    #[test]
    fn test_looping_wraps_without_completing() {
        let mut ctrl = controller("stand");
        ctrl.update_frame(1);
        ctrl.update_frame(101); // -> 1
        ctrl.update_frame(201); // -> 2
        let changed = ctrl.update_frame(301); // wraps -> 0

        assert!(changed);
        assert_eq!(ctrl.current_frame_index(), 0);
        assert!(!ctrl.is_animation_complete());
        let events = ctrl.drain_events();
        assert_eq!(
            events,
            vec![AnimationEvent::Completed {
                action: "stand".into()
            }]
        );
    }

    #[test]
    fn test_play_once_holds_and_completes_exactly_once() {
        let mut ctrl = controller("stand");
        assert!(ctrl.play_once("attack1"));
        ctrl.drain_events();

        ctrl.update_frame(1);
        ctrl.update_frame(51); // -> 1
        ctrl.update_frame(101); // -> 2
        let changed = ctrl.update_frame(151); // would pass the end: holds

        assert!(!changed);
        assert_eq!(ctrl.current_frame_index(), 2);
        assert!(ctrl.is_animation_complete());

        let events = ctrl.drain_events();
        assert_eq!(
            events,
            vec![AnimationEvent::Completed {
                action: "attack1".into()
            }]
        );

        // Further ticks neither move nor re-complete
        assert!(!ctrl.update_frame(500));
        assert!(!ctrl.update_frame(1000));
        assert_eq!(ctrl.current_frame_index(), 2);
        assert!(ctrl.drain_events().is_empty());
    }

    #[test]
    fn test_play_once_then_transitions() {
        let mut ctrl = controller("stand");
        assert!(ctrl.play_once_then("attack1", "stand"));
        ctrl.drain_events();

        ctrl.update_frame(1);
        ctrl.update_frame(51);
        ctrl.update_frame(101);
        ctrl.update_frame(151); // completes and transitions

        assert_eq!(ctrl.current_action(), "stand");
        assert!(!ctrl.is_animation_complete());

        let events = ctrl.drain_events();
        assert_eq!(
            events,
            vec![
                AnimationEvent::Completed {
                    action: "attack1".into()
                },
                AnimationEvent::ActionChanged {
                    previous: "attack1".into(),
                    current: "stand".into()
                },
            ]
        );
    }

    #[test]
    fn test_completed_one_shot_can_restart() {
        let mut ctrl = controller("stand");
        ctrl.play_once("attack1");
        ctrl.update_frame(1);
        ctrl.update_frame(51);
        ctrl.update_frame(101);
        ctrl.update_frame(151);
        assert!(ctrl.is_animation_complete());

        // Same action again is allowed once completed
        assert!(ctrl.play_once("attack1"));
        assert_eq!(ctrl.current_frame_index(), 0);
        assert!(!ctrl.is_animation_complete());
    }

    #[test]
    fn test_revert_to_previous() {
        let mut ctrl = controller("stand");
        ctrl.set_action("move");
        ctrl.revert_to_previous();
        assert_eq!(ctrl.current_action(), "stand");
    }

    #[test]
    fn test_current_frame_clamps() {
        let ctrl = controller("stand");
        assert_eq!(ctrl.frame(99).unwrap().sprite, 2);
        assert_eq!(ctrl.current_frame().unwrap().sprite, 0);
    }

    #[test]
    fn test_min_frame_delay_floor() {
        let mut set = AnimationSet::new();
        set.add_animation("blink", vec![Frame::new(0, 0), Frame::new(1, 0)]);
        let set = Arc::new(set);
        let mut ctrl = AnimationController::new(move |a| set.frames_exact(a), "blink");

        ctrl.update_frame(1);
        // 5ms elapsed is under the 10ms floor even though the frame says 0
        assert!(!ctrl.update_frame(6));
        assert!(ctrl.update_frame(12));
    }
}
