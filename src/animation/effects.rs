//! Transient effect animations: one-shot hits, looping auras, chain
//! lightning, falling debris, and target-following effects.
//!
//! These are pure presentation state - spawned, ticked, and discarded
//! without touching game logic. One-shot and falling instances churn
//! hardest, so they recycle through an index pool; a reused slot is fully
//! re-initialized on spawn, never assumed clean.

use glam::Vec2;
use rand::Rng;

use crate::animation::frames::FrameList;
use crate::animation::Frame;
use crate::time::tick_diff;

/// Snapshot of a live effect for the renderer.
#[derive(Debug, Clone)]
pub struct EffectInstance {
    pub x: f32,
    pub y: f32,
    pub flip: bool,
    pub frame: Frame,
    pub alpha: f32,
    pub rotation: f32,
    pub z_order: i32,
}

// --- index pool -------------------------------------------------------------

struct Pool<T> {
    slots: Vec<T>,
    free: Vec<usize>,
}

impl<T: Default> Pool<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Hand out a slot index, reusing a freed one when available.
    fn acquire(&mut self) -> usize {
        match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(T::default());
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) {
        self.free.push(index);
    }
}

// --- effect records ---------------------------------------------------------

#[derive(Default)]
struct OneTimeAnim {
    frames: Option<FrameList>,
    x: f32,
    y: f32,
    flip: bool,
    current_frame: usize,
    last_frame_tick: i32,
    z_order: i32,
    tint: Option<glam::Vec3>,
    fade_out: bool,
    alpha: f32,
}

impl OneTimeAnim {
    fn init(&mut self, frames: FrameList, x: f32, y: f32, flip: bool, tick: i32, z_order: i32) {
        self.frames = Some(frames);
        self.x = x;
        self.y = y;
        self.flip = flip;
        self.current_frame = 0;
        self.last_frame_tick = tick;
        self.z_order = z_order;
        self.tint = None;
        self.fade_out = false;
        self.alpha = 1.0;
    }

    /// Advance; false when finished.
    fn update(&mut self, tick: i32) -> bool {
        let Some(frames) = &self.frames else {
            return false;
        };
        let delay = frames[self.current_frame].delay_ms;
        if tick_diff(tick, self.last_frame_tick) > delay {
            self.current_frame += 1;
            self.last_frame_tick = tick;
            if self.current_frame >= frames.len() {
                return false;
            }
        }
        if self.fade_out {
            let progress = self.current_frame as f32 / frames.len() as f32;
            self.alpha = 1.0 - progress * 0.5;
        }
        true
    }
}

struct RepeatAnim {
    id: i32,
    frames: FrameList,
    x: f32,
    y: f32,
    flip: bool,
    start_tick: i32,
    duration_ms: i32,
    current_frame: usize,
    last_frame_tick: i32,
}

impl RepeatAnim {
    fn update(&mut self, tick: i32) -> bool {
        if self.duration_ms > 0 && tick_diff(tick, self.start_tick) > self.duration_ms {
            return false;
        }
        if tick_diff(tick, self.last_frame_tick) > self.frames[self.current_frame].delay_ms {
            self.current_frame = (self.current_frame + 1) % self.frames.len();
            self.last_frame_tick = tick;
        }
        true
    }
}

/// Lightning polyline for the renderer; `points` are pre-jittered.
#[derive(Debug, Clone)]
pub struct LightningBolt {
    pub points: Vec<Vec2>,
    pub color: glam::Vec3,
    pub width: f32,
    pub alpha: f32,
}

struct ChainLightning {
    bolts: Vec<Vec<Vec2>>,
    color: glam::Vec3,
    width: f32,
    start_tick: i32,
    duration_ms: i32,
    alpha: f32,
}

impl ChainLightning {
    fn update(&mut self, tick: i32) -> bool {
        let elapsed = tick_diff(tick, self.start_tick);
        if elapsed >= self.duration_ms {
            return false;
        }
        // Fade over the last 30%
        let progress = elapsed as f32 / self.duration_ms as f32;
        self.alpha = if progress > 0.7 {
            1.0 - (progress - 0.7) / 0.3
        } else {
            1.0
        };
        true
    }
}

#[derive(Default)]
struct FallingAnim {
    frames: Option<FrameList>,
    x: f32,
    y: f32,
    end_y: f32,
    fall_speed: f32,
    horizontal_drift: f32,
    rotation: f32,
    rotation_speed: f32,
    current_frame: usize,
    last_frame_tick: i32,
}

impl FallingAnim {
    #[allow(clippy::too_many_arguments)]
    fn init(
        &mut self,
        frames: FrameList,
        x: f32,
        y: f32,
        end_y: f32,
        fall_speed: f32,
        horizontal_drift: f32,
        rotate: bool,
        tick: i32,
        rng: &mut impl Rng,
    ) {
        self.frames = Some(frames);
        self.x = x;
        self.y = y;
        self.end_y = end_y;
        self.fall_speed = fall_speed;
        self.horizontal_drift = horizontal_drift;
        self.rotation = 0.0;
        self.rotation_speed = if rotate { rng.gen_range(-2.0..2.0) } else { 0.0 };
        self.current_frame = 0;
        self.last_frame_tick = tick;
    }

    fn update(&mut self, tick: i32, dt: f32) -> bool {
        let Some(frames) = &self.frames else {
            return false;
        };

        self.y += self.fall_speed * dt;
        self.x += self.horizontal_drift * self.fall_speed * dt * 0.5;
        self.rotation += self.rotation_speed * dt;

        if self.y >= self.end_y {
            return false;
        }

        if frames.len() > 1
            && tick_diff(tick, self.last_frame_tick) > frames[self.current_frame].delay_ms
        {
            self.current_frame = (self.current_frame + 1) % frames.len();
            self.last_frame_tick = tick;
        }
        true
    }
}

struct FollowAnim {
    id: i32,
    frames: FrameList,
    target: Box<dyn Fn() -> Vec2 + Send + Sync>,
    offset: Vec2,
    start_tick: i32,
    duration_ms: i32,
    current_frame: usize,
    last_frame_tick: i32,
}

impl FollowAnim {
    fn update(&mut self, tick: i32) -> bool {
        if self.duration_ms > 0 && tick_diff(tick, self.start_tick) > self.duration_ms {
            return false;
        }
        if tick_diff(tick, self.last_frame_tick) > self.frames[self.current_frame].delay_ms {
            self.current_frame = (self.current_frame + 1) % self.frames.len();
            self.last_frame_tick = tick;
        }
        true
    }
}

// --- manager ----------------------------------------------------------------

/// Pool of transient effect animations, ticked once per frame.
pub struct AnimationEffects {
    one_time_pool: Pool<OneTimeAnim>,
    falling_pool: Pool<FallingAnim>,
    live_one_time: Vec<usize>,
    live_falling: Vec<usize>,
    repeats: Vec<RepeatAnim>,
    chains: Vec<ChainLightning>,
    follows: Vec<FollowAnim>,
    next_id: i32,
}

impl AnimationEffects {
    pub fn new() -> Self {
        Self {
            one_time_pool: Pool::new(),
            falling_pool: Pool::new(),
            live_one_time: Vec::new(),
            live_falling: Vec::new(),
            repeats: Vec::new(),
            chains: Vec::new(),
            follows: Vec::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// One-shot animation that plays through and disappears.
    pub fn add_one_time(&mut self, frames: FrameList, x: f32, y: f32, flip: bool, tick: i32) {
        self.add_one_time_ordered(frames, x, y, flip, tick, 0);
    }

    pub fn add_one_time_ordered(
        &mut self,
        frames: FrameList,
        x: f32,
        y: f32,
        flip: bool,
        tick: i32,
        z_order: i32,
    ) {
        if frames.is_empty() {
            return;
        }
        let slot = self.one_time_pool.acquire();
        self.one_time_pool.slots[slot].init(frames, x, y, flip, tick, z_order);
        self.live_one_time.push(slot);
    }

    /// One-shot with a color tint.
    pub fn add_one_time_tinted(
        &mut self,
        frames: FrameList,
        x: f32,
        y: f32,
        flip: bool,
        tint: glam::Vec3,
        tick: i32,
    ) {
        if frames.is_empty() {
            return;
        }
        let slot = self.one_time_pool.acquire();
        self.one_time_pool.slots[slot].init(frames, x, y, flip, tick, 0);
        self.one_time_pool.slots[slot].tint = Some(tint);
        self.live_one_time.push(slot);
    }

    /// One-shot fading to half alpha by its end.
    pub fn add_one_time_fading(&mut self, frames: FrameList, x: f32, y: f32, flip: bool, tick: i32) {
        if frames.is_empty() {
            return;
        }
        let slot = self.one_time_pool.acquire();
        self.one_time_pool.slots[slot].init(frames, x, y, flip, tick, 0);
        self.one_time_pool.slots[slot].fade_out = true;
        self.live_one_time.push(slot);
    }

    /// Looping animation at a fixed position. `duration_ms` < 0 loops until
    /// removed. Returns an id for [`remove_repeat`](Self::remove_repeat).
    pub fn add_repeat(
        &mut self,
        frames: FrameList,
        x: f32,
        y: f32,
        flip: bool,
        duration_ms: i32,
        tick: i32,
    ) -> i32 {
        if frames.is_empty() {
            return -1;
        }
        let id = self.next_id();
        self.repeats.push(RepeatAnim {
            id,
            frames,
            x,
            y,
            flip,
            start_tick: tick,
            duration_ms,
            current_frame: 0,
            last_frame_tick: tick,
        });
        id
    }

    pub fn remove_repeat(&mut self, id: i32) -> bool {
        let before = self.repeats.len();
        self.repeats.retain(|r| r.id != id);
        self.repeats.len() != before
    }

    /// Lightning chaining through `points`, jagged by `segments` jittered
    /// subdivisions per hop.
    pub fn add_chain_lightning(
        &mut self,
        points: &[Vec2],
        color: glam::Vec3,
        duration_ms: i32,
        tick: i32,
        width: f32,
        segments: usize,
        rng: &mut impl Rng,
    ) {
        if points.len() < 2 {
            return;
        }
        let bolts = points
            .windows(2)
            .map(|pair| jitter_bolt(pair[0], pair[1], segments, rng))
            .collect();
        self.chains.push(ChainLightning {
            bolts,
            color,
            width,
            start_tick: tick,
            duration_ms,
            alpha: 1.0,
        });
    }

    /// Two-point lightning bolt.
    pub fn add_lightning_bolt(
        &mut self,
        start: Vec2,
        end: Vec2,
        color: glam::Vec3,
        duration_ms: i32,
        tick: i32,
        rng: &mut impl Rng,
    ) {
        self.add_chain_lightning(&[start, end], color, duration_ms, tick, 3.0, 8, rng);
    }

    /// Falling object with drift and optional spin.
    #[allow(clippy::too_many_arguments)]
    pub fn add_falling(
        &mut self,
        frames: FrameList,
        x: f32,
        y: f32,
        end_y: f32,
        fall_speed: f32,
        horizontal_drift: f32,
        rotate: bool,
        tick: i32,
        rng: &mut impl Rng,
    ) {
        if frames.is_empty() {
            return;
        }
        let slot = self.falling_pool.acquire();
        self.falling_pool.slots[slot].init(
            frames,
            x,
            y,
            end_y,
            fall_speed,
            horizontal_drift,
            rotate,
            tick,
            rng,
        );
        self.live_falling.push(slot);
    }

    /// Burst of falling objects spread around `center_x`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_falling_burst(
        &mut self,
        frames: FrameList,
        center_x: f32,
        start_y: f32,
        end_y: f32,
        spread_x: f32,
        count: usize,
        fall_speed: f32,
        tick: i32,
        rng: &mut impl Rng,
    ) {
        for _ in 0..count {
            let x = center_x + rng.gen_range(-1.0..1.0) * spread_x;
            let drift = rng.gen_range(-0.2..0.2);
            let stagger = rng.gen_range(0..300);
            self.add_falling(
                frames.clone(),
                x,
                start_y,
                end_y,
                fall_speed,
                drift,
                true,
                tick + stagger,
                rng,
            );
        }
    }

    /// Animation glued to a moving target via a position callback.
    /// Returns an id for [`remove_follow`](Self::remove_follow).
    pub fn add_follow<F>(
        &mut self,
        frames: FrameList,
        target: F,
        offset_x: f32,
        offset_y: f32,
        duration_ms: i32,
        tick: i32,
    ) -> i32
    where
        F: Fn() -> Vec2 + Send + Sync + 'static,
    {
        if frames.is_empty() {
            return -1;
        }
        let id = self.next_id();
        self.follows.push(FollowAnim {
            id,
            frames,
            target: Box::new(target),
            offset: Vec2::new(offset_x, offset_y),
            start_tick: tick,
            duration_ms,
            current_frame: 0,
            last_frame_tick: tick,
        });
        id
    }

    pub fn remove_follow(&mut self, id: i32) -> bool {
        let before = self.follows.len();
        self.follows.retain(|f| f.id != id);
        self.follows.len() != before
    }

    /// Tick every live effect; finished pooled instances return to their
    /// pools.
    pub fn update(&mut self, tick: i32, dt: f32) {
        puffin::profile_function!();

        let pool = &mut self.one_time_pool;
        self.live_one_time.retain(|&slot| {
            let alive = pool.slots[slot].update(tick);
            if !alive {
                pool.release(slot);
            }
            alive
        });

        self.repeats.retain_mut(|anim| anim.update(tick));
        self.chains.retain_mut(|chain| chain.update(tick));

        let pool = &mut self.falling_pool;
        self.live_falling.retain(|&slot| {
            let alive = pool.slots[slot].update(tick, dt);
            if !alive {
                pool.release(slot);
            }
            alive
        });

        self.follows.retain_mut(|anim| anim.update(tick));
    }

    /// Live frame-based effects for the renderer, one-shot first.
    pub fn instances(&self) -> Vec<EffectInstance> {
        let mut out = Vec::new();

        for &slot in &self.live_one_time {
            let anim = &self.one_time_pool.slots[slot];
            if let Some(frames) = &anim.frames {
                if anim.current_frame < frames.len() {
                    out.push(EffectInstance {
                        x: anim.x,
                        y: anim.y,
                        flip: anim.flip,
                        frame: frames[anim.current_frame],
                        alpha: anim.alpha,
                        rotation: 0.0,
                        z_order: anim.z_order,
                    });
                }
            }
        }

        for anim in &self.repeats {
            out.push(EffectInstance {
                x: anim.x,
                y: anim.y,
                flip: anim.flip,
                frame: anim.frames[anim.current_frame],
                alpha: 1.0,
                rotation: 0.0,
                z_order: 0,
            });
        }

        for &slot in &self.live_falling {
            let anim = &self.falling_pool.slots[slot];
            if let Some(frames) = &anim.frames {
                out.push(EffectInstance {
                    x: anim.x,
                    y: anim.y,
                    flip: false,
                    frame: frames[anim.current_frame],
                    alpha: 1.0,
                    rotation: anim.rotation,
                    z_order: 0,
                });
            }
        }

        for anim in &self.follows {
            let pos = (anim.target)() + anim.offset;
            out.push(EffectInstance {
                x: pos.x,
                y: pos.y,
                flip: false,
                frame: anim.frames[anim.current_frame],
                alpha: 1.0,
                rotation: 0.0,
                z_order: 0,
            });
        }

        out
    }

    /// Live lightning polylines for the renderer.
    pub fn lightning_bolts(&self) -> Vec<LightningBolt> {
        self.chains
            .iter()
            .flat_map(|chain| {
                chain.bolts.iter().map(move |points| LightningBolt {
                    points: points.clone(),
                    color: chain.color,
                    width: chain.width,
                    alpha: chain.alpha,
                })
            })
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.live_one_time.len()
            + self.repeats.len()
            + self.chains.len()
            + self.live_falling.len()
            + self.follows.len()
    }

    /// Drop every effect; pooled slots become reusable.
    pub fn clear(&mut self) {
        for &slot in &self.live_one_time {
            self.one_time_pool.free.push(slot);
        }
        self.live_one_time.clear();
        for &slot in &self.live_falling {
            self.falling_pool.free.push(slot);
        }
        self.live_falling.clear();
        self.repeats.clear();
        self.chains.clear();
        self.follows.clear();
    }
}

impl Default for AnimationEffects {
    fn default() -> Self {
        Self::new()
    }
}

/// Subdivide a bolt into jittered segments perpendicular to its axis.
fn jitter_bolt(start: Vec2, end: Vec2, segments: usize, rng: &mut impl Rng) -> Vec<Vec2> {
    let mut points = vec![start];

    let delta = end - start;
    let length = delta.length();
    if length > f32::EPSILON && segments > 1 {
        let direction = delta / length;
        let perpendicular = Vec2::new(-direction.y, direction.x);
        let displacement = length * 0.15;

        for i in 1..segments {
            let t = i as f32 / segments as f32;
            let offset = rng.gen_range(-1.0..1.0) * displacement;
            points.push(start + delta * t + perpendicular * offset);
        }
    }

    points.push(end);
    points
}
