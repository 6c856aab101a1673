//! Mob movement physics.
//!
//! Movement type is inferred from the mob's animation capabilities
//! (fly > jump > move > stand), never configured explicitly. Ground mobs
//! walk along footholds following the slope angle; jumping mobs add
//! gravity physics and periodic hops; flying mobs bob on a cosine wave
//! around their spawn height.
//!
//! Boundary hierarchy, outermost first: map VR bounds, then the rx0/rx1
//! spawn patrol range (or the whole connected platform for bosses), then
//! the current foothold's extent.

use rand::Rng;

use crate::components::Position;
use crate::constants::{FALL_RESET_MARGIN, FLY_EDGE_MARGIN, KNOCKBACK_RECOVERY_MS, MAP_EDGE_MARGIN};
use crate::foothold::{self, Foothold};
use crate::physics::PhysicsConstants;

/// Horizontal air drag applied per normalized frame during knockback.
const AIR_DRAG: f32 = 0.95;
/// Unique animation frames a mob must show before a queued turn applies.
const MIN_FRAMES_BEFORE_TURN: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Left,
    Right,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    /// Stationary, no horizontal movement.
    Stand,
    /// Walking along footholds.
    Move,
    /// Ground movement with periodic jumps.
    Jump,
    /// Floating free of footholds.
    Fly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpState {
    None,
    Jumping,
    Falling,
}

/// Animation action the movement state wants shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobAction {
    Stand,
    Move,
    Jump,
    Fly,
    Hit1,
    Die1,
    Attack1,
}

impl MobAction {
    pub fn name(&self) -> &'static str {
        match self {
            MobAction::Stand => "stand",
            MobAction::Move => "move",
            MobAction::Jump => "jump",
            MobAction::Fly => "fly",
            MobAction::Hit1 => "hit1",
            MobAction::Die1 => "die1",
            MobAction::Attack1 => "attack1",
        }
    }
}

/// Continuous physics state for one mob.
#[derive(Debug, Clone)]
pub struct Movement {
    pub move_direction: MoveDirection,
    pub move_type: MoveType,
    pub flip_x: bool,
    /// Mob may never change facing (noFlip map data).
    pub no_flip: bool,

    // Spawn anchor, also the respawn point after falling off the map.
    spawn_x: i32,
    spawn_y: i32,
    /// Mob display Y sits this far below the foothold.
    y_shift: i32,

    // Patrol range from spawn data.
    pub rx0: i32,
    pub rx1: i32,
    // Extent of the connected platform (boss patrol).
    pub platform_left: i32,
    pub platform_right: i32,
    /// Bosses patrol the whole platform instead of the rx range.
    pub use_platform_bounds: bool,

    // Map VR bounds.
    pub map_left: Option<i32>,
    pub map_right: Option<i32>,
    pub map_bottom: Option<i32>,

    pub move_speed: f32,
    pub fly_speed: f32,
    speed_multiplier: f32,
    stopped: bool,

    pub current_foothold: Option<usize>,

    // Flying bobbing phase and anchor.
    pub cos_y: f32,
    pub src_y: f32,

    pub jump_state: JumpState,
    pub velocity_x: f32,
    pub velocity_y: f32,
    // Per-frame physics (px/frame at the 60fps reference rate),
    // derived from the physics table on init.
    gravity_acc: f32,
    jump_velocity: f32,
    max_fall_speed: f32,

    // Pending knockback accumulation.
    impact_vx: f32,
    impact_vy: f32,
    has_pending_impact: bool,
    knockback_recovery_ms: i32,

    // Queued direction change, applied after enough animation frames.
    pending_direction: Option<MoveDirection>,
    frames_since_turn: i32,
    last_frame_index: i32,

    // Random scheduling timers (ms).
    next_direction_change_ms: i32,
    direction_change_cooldown_ms: i32,
    jump_cooldown_ms: i32,

    pub current_action: MobAction,
}

impl Movement {
    /// Build movement state from spawn data.
    ///
    /// `rx0_shift`/`rx1_shift` are offsets from the spawn point; `y_shift`
    /// is the display offset below the foothold. Capability flags come from
    /// the mob's animation set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: i32,
        y: i32,
        rx0_shift: i32,
        rx1_shift: i32,
        y_shift: i32,
        can_fly: bool,
        can_jump: bool,
        can_move: bool,
        no_flip: bool,
        physics: &PhysicsConstants,
        rng: &mut impl Rng,
    ) -> Self {
        let mut rx0 = x - rx0_shift;
        let mut rx1 = x + rx1_shift;
        if rx0 > rx1 {
            std::mem::swap(&mut rx0, &mut rx1);
        }
        // Degenerate patrol ranges get a usable default
        if rx1 - rx0 < 50 {
            rx0 = x - 100;
            rx1 = x + 100;
        }

        let move_type = if can_fly {
            MoveType::Fly
        } else if can_jump {
            MoveType::Jump
        } else if can_move {
            MoveType::Move
        } else {
            MoveType::Stand
        };

        let (move_direction, flip_x) = if no_flip {
            (MoveDirection::Left, false)
        } else if rng.gen_bool(0.5) {
            (MoveDirection::Left, false)
        } else {
            (MoveDirection::Right, true)
        };

        Self {
            move_direction,
            move_type,
            flip_x,
            no_flip,
            spawn_x: x,
            spawn_y: y,
            y_shift,
            rx0,
            rx1,
            platform_left: rx0,
            platform_right: rx1,
            use_platform_bounds: false,
            map_left: None,
            map_right: None,
            map_bottom: None,
            move_speed: 2.0,
            fly_speed: 2.0,
            speed_multiplier: 1.0,
            stopped: false,
            current_foothold: None,
            cos_y: 0.0,
            src_y: y as f32,
            jump_state: JumpState::None,
            velocity_x: 0.0,
            velocity_y: 0.0,
            // px/s at 60fps -> px/frame: /60; gravity px/s^2 -> px/frame^2: /3600
            gravity_acc: (physics.gravity_acc() / 3600.0) as f32,
            jump_velocity: (physics.jump_speed() / 60.0) as f32,
            max_fall_speed: (physics.fall_speed() / 60.0) as f32,
            impact_vx: 0.0,
            impact_vy: 0.0,
            has_pending_impact: false,
            knockback_recovery_ms: 0,
            pending_direction: None,
            frames_since_turn: 0,
            last_frame_index: -1,
            next_direction_change_ms: rng.gen_range(2000..5000),
            direction_change_cooldown_ms: 0,
            jump_cooldown_ms: if can_jump { rng.gen_range(1000..3000) } else { 0 },
            current_action: MobAction::Stand,
        }
    }

    pub fn spawn_x(&self) -> i32 {
        self.spawn_x
    }

    pub fn spawn_y(&self) -> i32 {
        self.spawn_y
    }

    pub fn effective_move_speed(&self) -> f32 {
        self.move_speed * self.speed_multiplier
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier.max(0.1);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn stop(&mut self) {
        self.stopped = true;
        self.velocity_x = 0.0;
        self.velocity_y = 0.0;
        self.current_action = MobAction::Stand;
    }

    pub fn resume(&mut self) {
        self.stopped = false;
    }

    pub fn is_in_knockback(&self) -> bool {
        self.knockback_recovery_ms > 0
    }

    /// Queue a knockback impulse; impulses in the same direction accumulate
    /// with clamping so repeated hits cannot launch the mob.
    pub fn apply_knockback(&mut self, vx: f32, vy: f32) {
        if !self.has_pending_impact {
            self.impact_vx = 0.0;
            self.impact_vy = 0.0;
        }
        self.has_pending_impact = true;

        self.impact_vx = combine_impact(self.impact_vx, vx);
        self.impact_vy = combine_impact(self.impact_vy, vy);
        self.knockback_recovery_ms = KNOCKBACK_RECOVERY_MS;
    }

    /// Directional knockback with a slight upward pop.
    pub fn apply_knockback_dir(&mut self, force: f32, knock_right: bool) {
        let vx = if knock_right { force } else { -force };
        self.apply_knockback(vx, -force * 0.5);
    }

    /// Immediate impact: sets velocity now instead of queueing. Used for
    /// heavy hits. An upward component detaches the mob from its foothold.
    pub fn apply_impact(&mut self, vx: f32, vy: f32) {
        self.velocity_x = vx;
        self.velocity_y = vy;
        self.has_pending_impact = false;
        self.impact_vx = 0.0;
        self.impact_vy = 0.0;
        self.knockback_recovery_ms = KNOCKBACK_RECOVERY_MS;
        if vy < 0.0 {
            self.current_foothold = None;
            self.jump_state = JumpState::Falling;
        }
    }

    /// Immediate impact away from a source position.
    pub fn apply_impact_from(&mut self, source_x: f32, pos_x: f32, force: f32, vertical: f32) {
        let vx = if source_x < pos_x { force } else { -force };
        self.apply_impact(vx, vertical);
    }

    /// Force a movement direction (chase AI). The change waits until the
    /// mob has shown a few unique animation frames so it cannot flip-flop
    /// mid-cycle.
    pub fn force_direction(&mut self, direction: MoveDirection, current_frame_index: i32) {
        if direction == MoveDirection::None {
            return;
        }
        if self.current_action == MobAction::Stand {
            self.current_action = MobAction::Move;
        }
        if self.move_direction == direction {
            self.pending_direction = None;
            return;
        }
        if self.move_direction == MoveDirection::None {
            self.apply_direction(direction);
            self.frames_since_turn = 0;
            self.last_frame_index = current_frame_index;
            return;
        }
        self.pending_direction = Some(direction);
    }

    /// Advance the queued direction change against the animation frame.
    pub fn update_pending_direction(&mut self, current_frame_index: i32, frame_count: i32) {
        if current_frame_index != self.last_frame_index {
            self.frames_since_turn += 1;
            self.last_frame_index = current_frame_index;
        }

        let Some(pending) = self.pending_direction else {
            return;
        };
        let min_frames = MIN_FRAMES_BEFORE_TURN.min((frame_count - 1).max(2));
        if self.frames_since_turn >= min_frames {
            self.apply_direction(pending);
            self.pending_direction = None;
            self.frames_since_turn = 0;
        }
    }

    fn apply_direction(&mut self, direction: MoveDirection) {
        self.move_direction = direction;
        self.frames_since_turn = 0;
        if !self.no_flip {
            self.flip_x = direction == MoveDirection::Right;
        }
    }

    fn turn_around(&mut self) {
        let direction = match self.move_direction {
            MoveDirection::Left => MoveDirection::Right,
            _ => MoveDirection::Left,
        };
        self.move_direction = direction;
        if !self.no_flip {
            self.flip_x = direction == MoveDirection::Right;
        }
    }

    /// Patrol bounds clamped into the map, widened to a sane range when
    /// degenerate.
    fn effective_bounds(&self, margin: i32) -> (f32, f32) {
        let (mut left, mut right) = if self.use_platform_bounds {
            (self.platform_left, self.platform_right)
        } else {
            (self.rx0, self.rx1)
        };
        if let Some(map_left) = self.map_left {
            left = left.max(map_left + margin);
        }
        if let Some(map_right) = self.map_right {
            right = right.min(map_right - margin);
        }
        if left >= right {
            left = self.spawn_x - 100;
            right = self.spawn_x + 100;
        }
        (left as f32, right as f32)
    }
}

/// Clamped accumulation of a knockback axis (repeat hits cap, not stack).
fn combine_impact(current: f32, add: f32) -> f32 {
    if add < 0.0 && add < current {
        let combined = add + current;
        if combined < add {
            add
        } else {
            combined
        }
    } else if add > 0.0 && add > current {
        let combined = add + current;
        if combined > add {
            add
        } else {
            combined
        }
    } else {
        current
    }
}

// --- 256-unit circle helpers ------------------------------------------------
// Angle 0 = right, 64 = up, 128 = left, 192 = down.

#[inline]
pub fn cos256(angle: f32) -> f32 {
    (angle * std::f32::consts::TAU / 256.0).cos()
}

#[inline]
pub fn sin256(angle: f32) -> f32 {
    (angle * std::f32::consts::TAU / 256.0).sin()
}

/// Angle between two points in 256-unit form, normalized to 0..256.
pub fn angle256(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    let angle = dy.atan2(dx) * 256.0 / std::f32::consts::TAU;
    angle.rem_euclid(256.0)
}

// --- per-tick update --------------------------------------------------------

/// Integrate one mob's movement for `dt_ms` of wall time.
///
/// Death gating happens at the call site; this function assumes the mob is
/// allowed to move.
pub fn update_movement(
    pos: &mut Position,
    mv: &mut Movement,
    footholds: &[Foothold],
    rng: &mut impl Rng,
    dt_ms: i32,
) {
    puffin::profile_function!();

    if mv.knockback_recovery_ms > 0 {
        mv.knockback_recovery_ms -= dt_ms;
    }

    // Normalize to the 60fps reference frame the per-frame constants assume
    let speed_factor = dt_ms as f32 / 16.67;

    if mv.has_pending_impact {
        process_pending_knockback(pos, mv);
    }
    if mv.knockback_recovery_ms > 0 {
        update_knockback_physics(pos, mv, footholds, speed_factor);
        return;
    }

    if mv.stopped || mv.move_type == MoveType::Stand {
        return;
    }

    // Ground mobs wait for a foothold before integrating, or they would
    // fall through the map on the first frames after load
    if matches!(mv.move_type, MoveType::Move | MoveType::Jump)
        && mv.current_foothold.is_none()
        && mv.jump_state == JumpState::None
    {
        return;
    }

    match mv.move_type {
        MoveType::Fly => update_flying(pos, mv, speed_factor),
        MoveType::Jump => update_jumping(pos, mv, footholds, rng, dt_ms, speed_factor),
        MoveType::Move => update_walking(pos, mv, footholds, rng, dt_ms, speed_factor),
        MoveType::Stand => {}
    }
}

fn process_pending_knockback(pos: &mut Position, mv: &mut Movement) {
    mv.velocity_x = mv.impact_vx;
    mv.velocity_y = mv.impact_vy;

    if mv.current_foothold.is_some() && mv.impact_vy.abs() > 0.5 {
        mv.jump_state = JumpState::Falling;
    }

    mv.impact_vx = 0.0;
    mv.impact_vy = 0.0;
    mv.has_pending_impact = false;
    mv.current_action = MobAction::Hit1;
    let _ = pos;
}

fn update_knockback_physics(
    pos: &mut Position,
    mv: &mut Movement,
    footholds: &[Foothold],
    speed_factor: f32,
) {
    mv.velocity_y = (mv.velocity_y + mv.gravity_acc * speed_factor).min(mv.max_fall_speed);
    mv.velocity_x *= AIR_DRAG.powf(speed_factor);

    pos.x += mv.velocity_x * speed_factor;
    pos.y += mv.velocity_y * speed_factor;

    let (left, right) = mv.effective_bounds(MAP_EDGE_MARGIN);
    if pos.x < left {
        pos.x = left;
        mv.velocity_x = -mv.velocity_x * 0.5;
    } else if pos.x > right {
        pos.x = right;
        mv.velocity_x = -mv.velocity_x * 0.5;
    }

    // Landing check, looking ahead by the fall velocity
    if mv.jump_state == JumpState::Falling || mv.velocity_y > 0.0 {
        if let Some(below) = foothold::find_below(footholds, pos.x, pos.y - mv.velocity_y - 2.0) {
            let fh_y = footholds[below].y_at(pos.x);
            if pos.y >= fh_y - 3.0 {
                pos.y = fh_y;
                mv.jump_state = JumpState::None;
                mv.velocity_x = 0.0;
                mv.velocity_y = 0.0;
                mv.current_foothold = Some(below);
            }
        }
    }

    // Fell off the map: reset to spawn
    if let Some(bottom) = mv.map_bottom {
        if pos.y > bottom as f32 + FALL_RESET_MARGIN {
            pos.x = mv.spawn_x as f32;
            pos.y = mv.spawn_y as f32;
            mv.jump_state = JumpState::None;
            mv.velocity_x = 0.0;
            mv.velocity_y = 0.0;
            mv.knockback_recovery_ms = 0;
            find_current_foothold(pos, mv, footholds);
        }
    }
}

fn update_flying(pos: &mut Position, mv: &mut Movement, speed_factor: f32) {
    mv.current_action = MobAction::Fly;

    let (left, right) = mv.effective_bounds(FLY_EDGE_MARGIN);
    let fly_amount = 1.5 * mv.fly_speed * speed_factor;

    match mv.move_direction {
        MoveDirection::Left => {
            pos.x -= fly_amount;
            if !mv.no_flip {
                mv.flip_x = false;
            }
            if pos.x <= left {
                pos.x = left;
                mv.move_direction = MoveDirection::Right;
                if !mv.no_flip {
                    mv.flip_x = true;
                }
            }
        }
        MoveDirection::Right => {
            pos.x += fly_amount;
            if !mv.no_flip {
                mv.flip_x = true;
            }
            if pos.x >= right {
                pos.x = right;
                mv.move_direction = MoveDirection::Left;
                if !mv.no_flip {
                    mv.flip_x = false;
                }
            }
        }
        MoveDirection::None => {}
    }

    // Vertical bobbing: +/-16px cosine wave around the spawn height
    mv.cos_y += 7.0 * speed_factor;
    if mv.cos_y >= 256.0 {
        mv.cos_y -= 256.0;
    }
    pos.y = mv.src_y - cos256(mv.cos_y) * 16.0;
}

fn update_jumping(
    pos: &mut Position,
    mv: &mut Movement,
    footholds: &[Foothold],
    rng: &mut impl Rng,
    dt_ms: i32,
    speed_factor: f32,
) {
    if mv.jump_cooldown_ms > 0 {
        mv.jump_cooldown_ms -= dt_ms;
    }

    if mv.jump_state != JumpState::None {
        mv.current_action = MobAction::Jump;

        mv.velocity_y = (mv.velocity_y + mv.gravity_acc * speed_factor).min(mv.max_fall_speed);
        if mv.jump_state == JumpState::Jumping && mv.velocity_y >= 0.0 {
            mv.jump_state = JumpState::Falling;
        }
        pos.y += mv.velocity_y * speed_factor;

        // Air control, slightly slower than ground speed
        let air_amount = mv.move_speed * 0.8 * speed_factor;
        let new_x = match mv.move_direction {
            MoveDirection::Left => {
                if !mv.no_flip {
                    mv.flip_x = false;
                }
                pos.x - air_amount
            }
            MoveDirection::Right => {
                if !mv.no_flip {
                    mv.flip_x = true;
                }
                pos.x + air_amount
            }
            MoveDirection::None => pos.x,
        };

        if foothold::find_below(footholds, new_x, pos.y).is_some() {
            pos.x = new_x;
        } else if let Some(fh) = mv.current_foothold.and_then(|i| footholds.get(i)) {
            // No landing spot ahead: stay within the current foothold
            if new_x >= fh.min_x() as f32 && new_x <= fh.max_x() as f32 {
                pos.x = new_x;
            } else if mv.move_direction == MoveDirection::Left {
                pos.x = fh.min_x() as f32;
            } else {
                pos.x = fh.max_x() as f32;
            }
        }

        if mv.jump_state == JumpState::Falling {
            check_landing(pos, mv, footholds);
        }
    } else {
        update_walking_for_jumper(pos, mv, footholds, rng, dt_ms, speed_factor);
    }

    // Hard clamp to bounds
    let (left, right) = mv.effective_bounds(MAP_EDGE_MARGIN);
    if pos.x < left {
        pos.x = left;
        mv.move_direction = MoveDirection::Right;
        if !mv.no_flip {
            mv.flip_x = true;
        }
    } else if pos.x > right {
        pos.x = right;
        mv.move_direction = MoveDirection::Left;
        if !mv.no_flip {
            mv.flip_x = false;
        }
    }
}

fn update_walking_for_jumper(
    pos: &mut Position,
    mv: &mut Movement,
    footholds: &[Foothold],
    rng: &mut impl Rng,
    dt_ms: i32,
    speed_factor: f32,
) {
    if mv.direction_change_cooldown_ms > 0 {
        mv.direction_change_cooldown_ms -= dt_ms;
    }

    mv.next_direction_change_ms -= dt_ms;
    if mv.next_direction_change_ms <= 0 {
        let roll = rng.gen_range(0..100);
        if roll < 30 {
            trigger_jump(mv, pos, rng);
        } else if roll < 50 && mv.direction_change_cooldown_ms <= 0 {
            mv.turn_around();
            mv.direction_change_cooldown_ms = 500;
        }
        mv.next_direction_change_ms = rng.gen_range(800..2000);
    }

    // Platform edge: jump off or turn back
    if let Some(fh) = mv.current_foothold.and_then(|i| footholds.get(i)) {
        if mv.direction_change_cooldown_ms <= 0 {
            let fh_min = fh.min_x();
            let fh_max = fh.max_x();
            if fh_max - fh_min > 60 {
                let near_left =
                    pos.x <= (fh_min + 15) as f32 && mv.move_direction == MoveDirection::Left;
                let near_right =
                    pos.x >= (fh_max - 15) as f32 && mv.move_direction == MoveDirection::Right;
                if near_left || near_right {
                    if mv.jump_cooldown_ms <= 0 && rng.gen_range(0..100) < 60 {
                        trigger_jump(mv, pos, rng);
                    } else {
                        mv.turn_around();
                        mv.direction_change_cooldown_ms = 500;
                    }
                    return;
                }
            }
        }
    }

    mv.current_action = MobAction::Move;
    let move_amount = mv.effective_move_speed() * speed_factor;

    if wall_ahead(pos, mv, footholds, move_amount) {
        if mv.jump_cooldown_ms <= 0 && rng.gen_range(0..100) < 40 {
            trigger_jump(mv, pos, rng);
        } else {
            mv.turn_around();
            mv.direction_change_cooldown_ms = 500;
        }
        return;
    }

    let move_dir = mv.move_direction;
    if !walk_along_foothold(pos, mv, footholds, move_amount) {
        // Walked off the edge: pull back and jump or turn
        if let Some(fh) = mv.current_foothold.and_then(|i| footholds.get(i)) {
            if mv.direction_change_cooldown_ms <= 0 {
                pos.x = if move_dir == MoveDirection::Left {
                    (fh.min_x() + 2) as f32
                } else {
                    (fh.max_x() - 2) as f32
                };
                pos.y = fh.y_at(pos.x);
                if mv.jump_cooldown_ms <= 0 && rng.gen_range(0..100) < 50 {
                    trigger_jump(mv, pos, rng);
                } else {
                    mv.turn_around();
                    mv.direction_change_cooldown_ms = 500;
                }
            }
        }
    }
}

fn update_walking(
    pos: &mut Position,
    mv: &mut Movement,
    footholds: &[Foothold],
    rng: &mut impl Rng,
    dt_ms: i32,
    speed_factor: f32,
) {
    // Random walk scheduling: move, pause, or turn
    mv.next_direction_change_ms -= dt_ms;
    if mv.next_direction_change_ms <= 0 {
        let roll = rng.gen_range(0..100);
        if roll < 20 {
            mv.turn_around();
            mv.current_action = MobAction::Move;
            mv.next_direction_change_ms = rng.gen_range(1500..4000);
        } else if roll < 40 {
            mv.current_action = MobAction::Stand;
            mv.next_direction_change_ms = rng.gen_range(1000..2500);
        } else {
            mv.current_action = MobAction::Move;
            mv.next_direction_change_ms = rng.gen_range(1500..4000);
        }
    }

    if mv.current_action != MobAction::Move {
        return;
    }

    let (left, right) = mv.effective_bounds(MAP_EDGE_MARGIN);
    let move_amount = mv.effective_move_speed() * speed_factor;

    if wall_ahead(pos, mv, footholds, move_amount) {
        mv.turn_around();
        return;
    }

    let move_dir = mv.move_direction;
    let on_foothold = walk_along_foothold(pos, mv, footholds, move_amount);

    // Patrol bounds turn the mob around
    if pos.x <= left {
        pos.x = left;
        mv.move_direction = MoveDirection::Right;
        if !mv.no_flip {
            mv.flip_x = true;
        }
    } else if pos.x >= right {
        pos.x = right;
        mv.move_direction = MoveDirection::Left;
        if !mv.no_flip {
            mv.flip_x = false;
        }
    }

    if !on_foothold {
        if let Some(fh) = mv.current_foothold.and_then(|i| footholds.get(i)) {
            // Platform edge: clamp back on and turn
            if move_dir == MoveDirection::Left {
                pos.x = (fh.min_x() + 2) as f32;
                mv.move_direction = MoveDirection::Right;
                if !mv.no_flip {
                    mv.flip_x = true;
                }
            } else {
                pos.x = (fh.max_x() - 2) as f32;
                mv.move_direction = MoveDirection::Left;
                if !mv.no_flip {
                    mv.flip_x = false;
                }
            }
            pos.y = fh.y_at(pos.x);
        }
    }
}

/// Wall collision check: clamps the mob against a wall ahead of the next
/// step. Returns true when a wall blocked the move; the caller decides
/// whether to jump or turn.
fn wall_ahead(
    pos: &mut Position,
    mv: &Movement,
    footholds: &[Foothold],
    move_amount: f32,
) -> bool {
    match mv.move_direction {
        MoveDirection::Left => {
            if let Some(wall) = foothold::find_wall_left(footholds, pos.x - 4.0, pos.y - 4.0) {
                let wall_x = footholds[wall].x1 as f32;
                if pos.x - move_amount <= wall_x {
                    pos.x = wall_x + 1.0;
                    return true;
                }
            }
        }
        MoveDirection::Right => {
            if let Some(wall) = foothold::find_wall_right(footholds, pos.x + 4.0, pos.y - 4.0) {
                let wall_x = footholds[wall].x1 as f32;
                if pos.x + move_amount >= wall_x {
                    pos.x = wall_x - 1.0;
                    return true;
                }
            }
        }
        MoveDirection::None => {}
    }
    false
}

/// Slope-following step along the current foothold. Returns false when the
/// mob is no longer over a foothold after the step.
fn walk_along_foothold(
    pos: &mut Position,
    mv: &mut Movement,
    footholds: &[Foothold],
    move_amount: f32,
) -> bool {
    let Some(fh) = mv.current_foothold.and_then(|i| footholds.get(i).copied()) else {
        // Flat fallback movement with a foothold re-search
        match mv.move_direction {
            MoveDirection::Left => {
                pos.x -= move_amount;
                if !mv.no_flip {
                    mv.flip_x = false;
                }
            }
            MoveDirection::Right => {
                pos.x += move_amount;
                if !mv.no_flip {
                    mv.flip_x = true;
                }
            }
            MoveDirection::None => {}
        }
        return update_y_position(pos, mv, footholds);
    };

    if fh.wall {
        return update_y_position(pos, mv, footholds);
    }

    // Decompose the step along the foothold's slope angle
    let (x1, y1, x2, y2) = (fh.x1 as f32, fh.y1 as f32, fh.x2 as f32, fh.y2 as f32);
    let direction = match mv.move_direction {
        MoveDirection::Right => {
            if !mv.no_flip {
                mv.flip_x = true;
            }
            if x1 < x2 {
                angle256(x1, y1, x2, y2)
            } else {
                angle256(x2, y2, x1, y1)
            }
        }
        _ => {
            if !mv.no_flip {
                mv.flip_x = false;
            }
            if x1 > x2 {
                angle256(x1, y1, x2, y2)
            } else {
                angle256(x2, y2, x1, y1)
            }
        }
    };

    pos.x += cos256(direction) * move_amount;
    pos.y += sin256(direction) * move_amount;

    if pos.x >= fh.min_x() as f32 && pos.x <= fh.max_x() as f32 {
        return true;
    }

    // Off the segment end: try the connected foothold, then a re-search
    try_transition_foothold(pos, mv, footholds) || update_y_position(pos, mv, footholds)
}

/// Move to a foothold sharing the edge endpoint in the walk direction.
fn try_transition_foothold(pos: &mut Position, mv: &mut Movement, footholds: &[Foothold]) -> bool {
    let Some(current) = mv.current_foothold else {
        return false;
    };
    let Some(fh) = footholds.get(current).copied() else {
        return false;
    };

    let mut best: Option<(usize, f32)> = None;
    for (i, other) in footholds.iter().enumerate() {
        if i == current || other.wall {
            continue;
        }
        let continues = match mv.move_direction {
            MoveDirection::Left => (other.min_x() as f32) < pos.x,
            MoveDirection::Right => (other.max_x() as f32) > pos.x,
            MoveDirection::None => false,
        };
        if !continues {
            continue;
        }
        // Must share an endpoint with the current segment
        let touches = (other.x1 == fh.x1 && other.y1 == fh.y1)
            || (other.x1 == fh.x2 && other.y1 == fh.y2)
            || (other.x2 == fh.x1 && other.y2 == fh.y1)
            || (other.x2 == fh.x2 && other.y2 == fh.y2);
        if !touches {
            continue;
        }
        let y_diff = (other.y_at(pos.x) - pos.y).abs();
        if y_diff < 50.0 && best.map_or(true, |(_, best_diff)| y_diff < best_diff) {
            best = Some((i, y_diff));
        }
    }

    if let Some((next, _)) = best {
        let fh = footholds[next];
        mv.current_foothold = Some(next);
        pos.x = pos.x.clamp(fh.min_x() as f32, fh.max_x() as f32);
        pos.y = fh.y_at(pos.x);
        true
    } else {
        false
    }
}

/// Re-derive the foothold under the current X. Returns false when nothing
/// supports the mob there.
fn update_y_position(pos: &mut Position, mv: &mut Movement, footholds: &[Foothold]) -> bool {
    // Stay on the current foothold while X remains in its range; keeps
    // mobs glued across curvy platforms
    if let Some(fh) = mv.current_foothold.and_then(|i| footholds.get(i)) {
        if !fh.wall && pos.x >= fh.min_x() as f32 && pos.x <= fh.max_x() as f32 {
            pos.y = fh.y_at(pos.x);
            return true;
        }
    }

    let mut best: Option<(usize, f32)> = None;
    for (i, fh) in footholds.iter().enumerate() {
        if fh.wall {
            continue;
        }
        if pos.x < fh.min_x() as f32 || pos.x > fh.max_x() as f32 {
            continue;
        }
        let fh_y = fh.y_at(pos.x);
        // A new foothold at most 50px above keeps slope walks connected
        if fh_y < pos.y - 50.0 {
            continue;
        }
        let y_distance = (fh_y - pos.y).abs();
        if best.map_or(true, |(_, best_dist)| y_distance < best_dist) {
            best = Some((i, y_distance));
        }
    }

    if let Some((i, _)) = best {
        let fh = footholds[i];
        mv.current_foothold = Some(i);
        pos.x = pos.x.clamp(fh.min_x() as f32, fh.max_x() as f32);
        pos.y = fh.y_at(pos.x);
        true
    } else {
        false
    }
}

fn trigger_jump(mv: &mut Movement, pos: &mut Position, rng: &mut impl Rng) {
    if mv.jump_state != JumpState::None || mv.jump_cooldown_ms > 0 {
        return;
    }

    // Too close to the map edge in the travel direction: turn instead of
    // jumping off
    let (left, right) = mv.effective_bounds(FLY_EDGE_MARGIN);
    let too_close_left = pos.x <= left + 30.0 && mv.move_direction == MoveDirection::Left;
    let too_close_right = pos.x >= right - 30.0 && mv.move_direction == MoveDirection::Right;
    if too_close_left || too_close_right {
        mv.turn_around();
        mv.jump_cooldown_ms = rng.gen_range(500..1500);
        return;
    }

    mv.jump_state = JumpState::Jumping;
    mv.velocity_y = -mv.jump_velocity;
    mv.jump_cooldown_ms = rng.gen_range(1500..3500);
    mv.current_action = MobAction::Jump;
}

fn check_landing(pos: &mut Position, mv: &mut Movement, footholds: &[Foothold]) {
    if mv.jump_state != JumpState::Falling {
        return;
    }

    if let Some(below) = foothold::find_below(footholds, pos.x, pos.y - mv.velocity_y - 2.0) {
        let fh_y = footholds[below].y_at(pos.x);
        if pos.y >= fh_y - 3.0 {
            pos.y = fh_y;
            mv.jump_state = JumpState::None;
            mv.velocity_y = 0.0;
            mv.current_foothold = Some(below);
            mv.current_action = MobAction::Stand;
            return;
        }
    }

    if let Some(bottom) = mv.map_bottom {
        if pos.y > bottom as f32 + FALL_RESET_MARGIN {
            pos.x = mv.spawn_x as f32;
            pos.y = mv.spawn_y as f32;
            mv.jump_state = JumpState::None;
            mv.velocity_y = 0.0;
            find_current_foothold(pos, mv, footholds);
        }
    }
}

/// Locate and latch the foothold under the spawn position, snapping the
/// mob onto it and deriving the platform patrol extent.
pub fn find_current_foothold(pos: &mut Position, mv: &mut Movement, footholds: &[Foothold]) {
    // Display Y sits y_shift below the foothold
    let expected_y = (mv.spawn_y - mv.y_shift) as f32;

    if let Some(below) = foothold::find_below(footholds, pos.x, expected_y - 5.0) {
        mv.current_foothold = Some(below);
        pos.y = footholds[below].y_at(pos.x);
        let (left, right) = foothold::platform_extent(footholds, below);
        mv.platform_left = left;
        mv.platform_right = right;
        return;
    }

    // Fallback: nearest foothold by Y at this X, then anywhere in the
    // patrol range
    let mut best: Option<(usize, f32)> = None;
    for (i, fh) in footholds.iter().enumerate() {
        if fh.wall {
            continue;
        }
        let (in_x_range, probe_x) = if pos.x >= fh.min_x() as f32 && pos.x <= fh.max_x() as f32 {
            (true, pos.x)
        } else if fh.max_x() >= mv.rx0 && fh.min_x() <= mv.rx1 {
            (false, pos.x.clamp(fh.min_x() as f32, fh.max_x() as f32))
        } else {
            continue;
        };
        let y_dist = (fh.y_at(probe_x) - expected_y).abs();
        let tolerance = if in_x_range { 100.0 } else { 150.0 };
        if y_dist < tolerance && best.map_or(true, |(_, best_dist)| y_dist < best_dist) {
            best = Some((i, y_dist));
        }
    }

    if let Some((i, _)) = best {
        let fh = footholds[i];
        mv.current_foothold = Some(i);
        pos.x = pos.x.clamp(fh.min_x() as f32, fh.max_x() as f32);
        pos.y = fh.y_at(pos.x);
        let (left, right) = foothold::platform_extent(footholds, i);
        mv.platform_left = left;
        mv.platform_right = right;
    } else {
        mv.current_foothold = None;
        mv.platform_left = mv.rx0;
        mv.platform_right = mv.rx1;
        pos.x = mv.spawn_x as f32;
        pos.y = mv.spawn_y as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn physics() -> PhysicsConstants {
        PhysicsConstants::new()
    }

    fn flat_ground() -> Vec<Foothold> {
        vec![Foothold::new(-500, 100, 500, 100)]
    }

    fn walker(rng: &mut StdRng) -> (Position, Movement) {
        let physics = physics();
        let mv = Movement::new(0, 100, 200, 200, 0, false, false, true, false, &physics, rng);
        (Position::new(0.0, 100.0), mv)
    }

    #[test]
    fn test_mode_inference_priority() {
        let physics = physics();
        let mut rng = StdRng::seed_from_u64(1);

        let fly = Movement::new(0, 0, 10, 10, 0, true, true, true, false, &physics, &mut rng);
        assert_eq!(fly.move_type, MoveType::Fly);

        let jump = Movement::new(0, 0, 10, 10, 0, false, true, true, false, &physics, &mut rng);
        assert_eq!(jump.move_type, MoveType::Jump);

        let walk = Movement::new(0, 0, 10, 10, 0, false, false, true, false, &physics, &mut rng);
        assert_eq!(walk.move_type, MoveType::Move);

        let stand = Movement::new(0, 0, 10, 10, 0, false, false, false, false, &physics, &mut rng);
        assert_eq!(stand.move_type, MoveType::Stand);
    }

    #[test]
    fn test_degenerate_patrol_range_widens() {
        let physics = physics();
        let mut rng = StdRng::seed_from_u64(1);
        let mv = Movement::new(50, 0, 5, 5, 0, false, false, true, false, &physics, &mut rng);
        assert_eq!(mv.rx0, -50);
        assert_eq!(mv.rx1, 150);
    }

    #[test]
    fn test_ground_mob_waits_for_foothold() {
        let mut rng = StdRng::seed_from_u64(2);
        let (mut pos, mut mv) = walker(&mut rng);
        let footholds = flat_ground();

        // No foothold assigned yet: position must not move
        update_movement(&mut pos, &mut mv, &footholds, &mut rng, 16);
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.y, 100.0);
    }

    #[test]
    fn test_walker_stays_on_ground_and_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let (mut pos, mut mv) = walker(&mut rng);
        let footholds = flat_ground();
        find_current_foothold(&mut pos, &mut mv, &footholds);
        assert_eq!(mv.current_foothold, Some(0));

        for _ in 0..600 {
            update_movement(&mut pos, &mut mv, &footholds, &mut rng, 16);
            assert!(pos.x >= mv.rx0 as f32 - 1.0 && pos.x <= mv.rx1 as f32 + 1.0);
            assert!((pos.y - 100.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_walker_follows_slope() {
        let mut rng = StdRng::seed_from_u64(4);
        let physics = physics();
        let footholds = vec![Foothold::new(-200, 100, 200, 180)];
        let mut mv =
            Movement::new(0, 140, 200, 200, 0, false, false, true, false, &physics, &mut rng);
        let mut pos = Position::new(0.0, 140.0);
        find_current_foothold(&mut pos, &mut mv, &footholds);

        // Pin the walk scheduler so the mob is guaranteed to be moving
        mv.current_action = MobAction::Move;
        mv.next_direction_change_ms = 1_000_000;

        for _ in 0..100 {
            update_movement(&mut pos, &mut mv, &footholds, &mut rng, 16);
            let expected = footholds[0].y_at(pos.x);
            assert!(
                (pos.y - expected).abs() < 2.0,
                "mob left the slope: y={} expected={}",
                pos.y,
                expected
            );
        }
    }

    #[test]
    fn test_flying_bobs_around_spawn_height() {
        let mut rng = StdRng::seed_from_u64(5);
        let physics = physics();
        let mut mv =
            Movement::new(0, 50, 300, 300, 0, true, false, false, false, &physics, &mut rng);
        let mut pos = Position::new(0.0, 50.0);
        let footholds = flat_ground();

        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for _ in 0..400 {
            update_movement(&mut pos, &mut mv, &footholds, &mut rng, 16);
            min_y = min_y.min(pos.y);
            max_y = max_y.max(pos.y);
        }

        // Oscillates within +/-16 of the spawn height, both halves reached
        assert!(min_y >= 50.0 - 16.5);
        assert!(max_y <= 50.0 + 16.5);
        assert!(min_y < 40.0);
        assert!(max_y > 60.0);
    }

    #[test]
    fn test_flying_bounces_at_bounds() {
        let mut rng = StdRng::seed_from_u64(6);
        let physics = physics();
        let mut mv =
            Movement::new(0, 50, 100, 100, 0, true, false, false, false, &physics, &mut rng);
        mv.move_direction = MoveDirection::Right;
        let mut pos = Position::new(0.0, 50.0);
        let footholds = flat_ground();

        let mut seen_left = false;
        let mut seen_right = false;
        for _ in 0..2000 {
            update_movement(&mut pos, &mut mv, &footholds, &mut rng, 16);
            assert!(pos.x >= -101.0 && pos.x <= 101.0);
            if mv.move_direction == MoveDirection::Left {
                seen_left = true;
            } else {
                seen_right = true;
            }
        }
        assert!(seen_left && seen_right);
    }

    #[test]
    fn test_jump_arc_lands_back() {
        let mut rng = StdRng::seed_from_u64(7);
        let physics = physics();
        let footholds = flat_ground();
        let mut mv =
            Movement::new(0, 100, 400, 400, 0, false, true, true, false, &physics, &mut rng);
        let mut pos = Position::new(0.0, 100.0);
        find_current_foothold(&mut pos, &mut mv, &footholds);

        mv.jump_cooldown_ms = 0;
        trigger_jump(&mut mv, &mut pos, &mut rng);
        assert_eq!(mv.jump_state, JumpState::Jumping);
        assert!(mv.velocity_y < 0.0);

        let mut landed = false;
        for _ in 0..600 {
            update_movement(&mut pos, &mut mv, &footholds, &mut rng, 16);
            if mv.jump_state == JumpState::None {
                landed = true;
                break;
            }
        }
        assert!(landed, "mob never landed");
        assert!((pos.y - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_knockback_accumulation_clamps() {
        let mut rng = StdRng::seed_from_u64(8);
        let (_, mut mv) = walker(&mut rng);

        mv.apply_knockback(6.0, -3.0);
        mv.apply_knockback(6.0, -3.0);
        // Same-direction impulses cap at the stronger one, not the sum
        assert_eq!(mv.impact_vx, 6.0);
        assert_eq!(mv.impact_vy, -3.0);

        mv.apply_knockback(10.0, 0.0);
        assert_eq!(mv.impact_vx, 10.0);
        assert!(mv.is_in_knockback());
    }

    #[test]
    fn test_knockback_moves_mob_and_recovers() {
        let mut rng = StdRng::seed_from_u64(9);
        let (mut pos, mut mv) = walker(&mut rng);
        let footholds = flat_ground();
        find_current_foothold(&mut pos, &mut mv, &footholds);

        mv.apply_knockback_dir(8.0, true);
        let start_x = pos.x;
        update_movement(&mut pos, &mut mv, &footholds, &mut rng, 16);
        assert!(pos.x > start_x);
        assert_eq!(mv.current_action, MobAction::Hit1);

        // Recovery window expires after 500ms of updates
        for _ in 0..40 {
            update_movement(&mut pos, &mut mv, &footholds, &mut rng, 16);
        }
        assert!(!mv.is_in_knockback());
    }

    #[test]
    fn test_impact_detaches_from_foothold() {
        let mut rng = StdRng::seed_from_u64(10);
        let (mut pos, mut mv) = walker(&mut rng);
        let footholds = flat_ground();
        find_current_foothold(&mut pos, &mut mv, &footholds);

        mv.apply_impact(5.0, -50.0);
        assert_eq!(mv.current_foothold, None);
        assert_eq!(mv.jump_state, JumpState::Falling);
        let _ = pos;
    }

    #[test]
    fn test_force_direction_waits_for_frames() {
        let mut rng = StdRng::seed_from_u64(11);
        let (_, mut mv) = walker(&mut rng);
        mv.move_direction = MoveDirection::Left;
        mv.flip_x = false;

        mv.force_direction(MoveDirection::Right, 0);
        // Queued, not applied yet
        assert_eq!(mv.move_direction, MoveDirection::Left);

        for frame in 1..=4 {
            mv.update_pending_direction(frame, 6);
        }
        assert_eq!(mv.move_direction, MoveDirection::Right);
        assert!(mv.flip_x);
    }

    #[test]
    fn test_no_flip_mob_keeps_facing() {
        let mut rng = StdRng::seed_from_u64(12);
        let physics = physics();
        let mut mv =
            Movement::new(0, 100, 200, 200, 0, false, false, true, true, &physics, &mut rng);
        let initial_flip = mv.flip_x;

        mv.force_direction(MoveDirection::Right, 0);
        for frame in 1..=5 {
            mv.update_pending_direction(frame, 6);
        }
        assert_eq!(mv.flip_x, initial_flip);
    }

    #[test]
    fn test_angle256_quadrants() {
        assert_eq!(angle256(0.0, 0.0, 10.0, 0.0), 0.0);
        // Y grows downward, so "down" is 64
        assert!((angle256(0.0, 0.0, 0.0, 10.0) - 64.0).abs() < 0.5);
        assert!((angle256(0.0, 0.0, -10.0, 0.0) - 128.0).abs() < 0.5);
        assert!((angle256(0.0, 0.0, 0.0, -10.0) - 192.0).abs() < 0.5);
    }

    #[test]
    fn test_foothold_transition_across_segments() {
        let mut rng = StdRng::seed_from_u64(13);
        let physics = physics();
        // Two connected segments forming one platform
        let footholds = vec![
            Foothold::new(-200, 100, 0, 100),
            Foothold::new(0, 100, 200, 140),
        ];
        let mut mv =
            Movement::new(-100, 100, 300, 300, 0, false, false, true, false, &physics, &mut rng);
        mv.move_direction = MoveDirection::Right;
        // Pin the walk scheduler: keep walking right until the transition
        mv.current_action = MobAction::Move;
        mv.next_direction_change_ms = 1_000_000;
        let mut pos = Position::new(-100.0, 100.0);
        find_current_foothold(&mut pos, &mut mv, &footholds);

        let mut reached_second = false;
        for _ in 0..2000 {
            update_movement(&mut pos, &mut mv, &footholds, &mut rng, 16);
            if mv.current_foothold == Some(1) {
                reached_second = true;
                break;
            }
        }
        assert!(reached_second, "never crossed onto the second segment");
    }
}
