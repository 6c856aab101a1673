//! Cross-map mob state persistence.
//!
//! Leaving a map snapshots its mobs; returning restores them, so maps feel
//! persistent without simulating them in the background. Snapshots match
//! fresh spawns by (spawn index, mob id) - anything that no longer lines
//! up is silently skipped, and a partial restore is normal.

use std::collections::{HashMap, VecDeque};

use hecs::World;

use crate::components::{Health, Position, Spawn};
use crate::constants::{MAX_CACHED_MAPS, STATE_EXPIRY_MS};
use crate::systems::ai::{MobAi, MobAiState};
use crate::systems::movement::{JumpState, MoveDirection, MoveType, Movement};
use crate::time::tick_diff;

/// Snapshot of one mob.
#[derive(Debug, Clone)]
pub struct MobState {
    pub spawn_index: usize,
    pub mob_id: String,

    pub x: f32,
    pub y: f32,

    pub move_direction: MoveDirection,
    pub move_type: MoveType,
    pub flip_x: bool,

    pub velocity_x: f32,
    pub velocity_y: f32,
    pub jump_state: JumpState,

    // Flying mob parameters.
    pub cos_y: f32,
    pub src_y: f32,

    pub current_hp: i32,
    pub max_hp: i32,
    pub ai_state: MobAiState,
    pub dead: bool,
    pub removed: bool,
}

/// Everything saved for one map.
#[derive(Debug, Clone)]
pub struct MapState {
    pub map_id: i32,
    pub save_tick: i32,
    pub mob_states: Vec<MobState>,
}

/// LRU + TTL cache of per-map mob snapshots.
pub struct MapStateCache {
    cached: HashMap<i32, MapState>,
    /// Save-recency order, oldest in front.
    access_order: VecDeque<i32>,

    pub max_cached_maps: usize,
    /// Snapshot lifetime in ms; 0 disables expiry.
    pub state_expiry_ms: i32,
    /// Keep dead mobs dead on return instead of respawning them fresh.
    pub preserve_dead_mobs: bool,
}

impl MapStateCache {
    pub fn new() -> Self {
        Self {
            cached: HashMap::new(),
            access_order: VecDeque::new(),
            max_cached_maps: MAX_CACHED_MAPS,
            state_expiry_ms: STATE_EXPIRY_MS,
            preserve_dead_mobs: false,
        }
    }

    /// Snapshot a map's mobs before leaving it.
    ///
    /// Removed mobs never save; dead mobs save only when preserved. An
    /// all-filtered map stores nothing.
    pub fn save_map_state(&mut self, map_id: i32, world: &World, tick: i32) {
        let mut mob_states = Vec::new();

        for (_, (spawn, pos, mv, ai, health)) in world
            .query::<(&Spawn, &Position, &Movement, &MobAi, &Health)>()
            .iter()
        {
            if ai.state() == MobAiState::Removed {
                continue;
            }
            if !self.preserve_dead_mobs && ai.is_dead() {
                continue;
            }

            mob_states.push(MobState {
                spawn_index: spawn.index,
                mob_id: spawn.mob_id.clone(),
                x: pos.x,
                y: pos.y,
                move_direction: mv.move_direction,
                move_type: mv.move_type,
                flip_x: mv.flip_x,
                velocity_x: mv.velocity_x,
                velocity_y: mv.velocity_y,
                jump_state: mv.jump_state,
                cos_y: mv.cos_y,
                src_y: mv.src_y,
                current_hp: health.current,
                max_hp: health.max,
                ai_state: ai.state(),
                dead: ai.is_dead(),
                removed: ai.state() == MobAiState::Removed,
            });
        }

        if mob_states.is_empty() {
            return;
        }

        self.cached.insert(
            map_id,
            MapState {
                map_id,
                save_tick: tick,
                mob_states,
            },
        );
        self.update_access_order(map_id);
        self.enforce_cache_limit();
    }

    /// Whether a usable snapshot exists. Expired entries are dropped as a
    /// side effect of the check.
    pub fn has_state(&mut self, map_id: i32, tick: i32) -> bool {
        let Some(state) = self.cached.get(&map_id) else {
            return false;
        };
        if self.state_expiry_ms > 0 && tick_diff(tick, state.save_tick) > self.state_expiry_ms {
            self.cached.remove(&map_id);
            return false;
        }
        true
    }

    /// Restore a saved snapshot onto freshly spawned mobs.
    ///
    /// Matching is by (spawn index, mob id); mismatched entries are
    /// skipped. Returns the number of mobs restored.
    pub fn restore_map_state(&mut self, map_id: i32, world: &mut World, tick: i32) -> usize {
        if !self.has_state(map_id, tick) {
            return 0;
        }
        let Some(state) = self.cached.get(&map_id) else {
            return 0;
        };
        let mob_states = state.mob_states.clone();
        let mut restored = 0;

        for saved in &mob_states {
            let mut matched = None;
            for (entity, spawn) in world.query::<&Spawn>().iter() {
                if spawn.index == saved.spawn_index && spawn.mob_id == saved.mob_id {
                    matched = Some(entity);
                    break;
                }
            }
            let Some(entity) = matched else {
                continue;
            };

            let Ok(mut query) =
                world.query_one::<(&mut Position, &mut Movement, &mut MobAi, &mut Health)>(entity)
            else {
                continue;
            };
            let Some((pos, mv, ai, health)) = query.get() else {
                continue;
            };

            pos.x = saved.x;
            pos.y = saved.y;

            mv.move_direction = saved.move_direction;
            mv.flip_x = saved.flip_x;
            mv.velocity_x = saved.velocity_x;
            mv.velocity_y = saved.velocity_y;
            mv.jump_state = saved.jump_state;
            mv.cos_y = saved.cos_y;
            mv.src_y = saved.src_y;

            health.restore(saved.current_hp);

            if saved.dead && self.preserve_dead_mobs {
                ai.restore_state(MobAiState::Death, tick);
            }

            restored += 1;
        }

        self.update_access_order(map_id);
        restored
    }

    /// Drop one map's snapshot.
    pub fn clear_map_state(&mut self, map_id: i32) {
        self.cached.remove(&map_id);
    }

    /// Drop everything.
    pub fn clear_all(&mut self) {
        self.cached.clear();
        self.access_order.clear();
    }

    pub fn cached_map_count(&self) -> usize {
        self.cached.len()
    }

    // O(n) rebuild per save; the cache holds ten maps, so recency of save
    // stays the exact eviction order.
    fn update_access_order(&mut self, map_id: i32) {
        self.access_order.retain(|&id| id != map_id);
        self.access_order.push_back(map_id);
    }

    fn enforce_cache_limit(&mut self) {
        while self.cached.len() > self.max_cached_maps {
            let Some(oldest) = self.access_order.pop_front() else {
                break;
            };
            self.cached.remove(&oldest);
        }
    }
}

impl Default for MapStateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsConstants;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spawn_test_mob(world: &mut World, index: usize, mob_id: &str, x: f32, y: f32) -> hecs::Entity {
        let physics = PhysicsConstants::new();
        let mut rng = StdRng::seed_from_u64(index as u64);
        let mv = Movement::new(
            x as i32, y as i32, 100, 100, 0, false, false, true, false, &physics, &mut rng,
        );
        world.spawn((
            Spawn::new(index, mob_id),
            Position::new(x, y),
            mv,
            MobAi::new(1, 10, false, false, false),
            Health::new(100),
        ))
    }

    fn populated_world() -> World {
        let mut world = World::new();
        spawn_test_mob(&mut world, 0, "100100", 10.0, 50.0);
        spawn_test_mob(&mut world, 1, "100101", 200.0, 50.0);
        world
    }

    #[test]
    fn test_save_restore_round_trip() {
        let mut cache = MapStateCache::new();
        let mut world = populated_world();

        // Mutate positions and HP away from spawn values
        for (_, (pos, health)) in world.query_mut::<(&mut Position, &mut Health)>() {
            pos.x += 33.5;
            pos.y -= 7.25;
            health.current = 42;
        }

        cache.save_map_state(5, &world, 1000);
        assert!(cache.has_state(5, 1001));

        // Fresh spawns with the same indices and ids
        let mut fresh = populated_world();
        let restored = cache.restore_map_state(5, &mut fresh, 1001);
        assert_eq!(restored, 2);

        for (_, (spawn, pos, health)) in fresh.query::<(&Spawn, &Position, &Health)>().iter() {
            let expected_x = if spawn.index == 0 { 43.5 } else { 233.5 };
            assert_eq!(pos.x, expected_x);
            assert_eq!(pos.y, 42.75);
            assert_eq!(health.current, 42);
        }
    }

    #[test]
    fn test_restore_skips_mismatched_ids() {
        let mut cache = MapStateCache::new();
        let world = populated_world();
        cache.save_map_state(5, &world, 1000);

        // Fresh world where spawn 1 holds a different mob type
        let mut fresh = World::new();
        spawn_test_mob(&mut fresh, 0, "100100", 10.0, 50.0);
        spawn_test_mob(&mut fresh, 1, "999999", 200.0, 50.0);

        let restored = cache.restore_map_state(5, &mut fresh, 1001);
        assert_eq!(restored, 1);
    }

    #[test]
    fn test_empty_snapshot_stores_nothing() {
        let mut cache = MapStateCache::new();
        let world = World::new();
        cache.save_map_state(5, &world, 1000);
        assert!(!cache.has_state(5, 1001));
        assert_eq!(cache.cached_map_count(), 0);
    }

    #[test]
    fn test_removed_and_dead_mobs_filtered() {
        let mut cache = MapStateCache::new();
        let mut world = populated_world();

        // Kill mob 0 outright and advance it to Removed; leave mob 1 alive
        {
            let mut ai_query = world.query::<(&Spawn, &mut MobAi)>();
            for (_, (spawn, ai)) in ai_query.iter() {
                if spawn.index == 0 {
                    ai.kill(1000, crate::systems::ai::MobDeathType::Killed);
                    ai.update(5000, 0.0, 0.0, None);
                    assert_eq!(ai.state(), MobAiState::Removed);
                }
            }
        }

        cache.save_map_state(5, &world, 6000);
        let state = cache.cached.get(&5).unwrap();
        assert_eq!(state.mob_states.len(), 1);
        assert_eq!(state.mob_states[0].spawn_index, 1);
    }

    #[test]
    fn test_preserve_dead_mobs_restores_death_state() {
        let mut cache = MapStateCache::new();
        cache.preserve_dead_mobs = true;
        let mut world = populated_world();

        for (_, (spawn, ai, health)) in world
            .query_mut::<(&Spawn, &mut MobAi, &mut Health)>()
        {
            if spawn.index == 0 {
                health.current = 0;
                ai.kill(1000, crate::systems::ai::MobDeathType::Killed);
            }
        }

        cache.save_map_state(5, &world, 2000);

        let mut fresh = populated_world();
        let restored = cache.restore_map_state(5, &mut fresh, 2001);
        assert_eq!(restored, 2);

        for (_, (spawn, ai, health)) in fresh.query::<(&Spawn, &MobAi, &Health)>().iter() {
            if spawn.index == 0 {
                assert_eq!(ai.state(), MobAiState::Death);
                assert_eq!(health.current, 0);
            } else {
                assert_eq!(ai.state(), MobAiState::Idle);
            }
        }
    }

    #[test]
    fn test_ttl_expiry_is_lazy() {
        let mut cache = MapStateCache::new();
        cache.state_expiry_ms = 5000;
        let world = populated_world();
        cache.save_map_state(5, &world, 1000);

        assert!(cache.has_state(5, 5999));
        // Past the TTL the check itself removes the entry
        assert!(!cache.has_state(5, 6001));
        assert_eq!(cache.cached_map_count(), 0);
    }

    #[test]
    fn test_zero_expiry_never_expires() {
        let mut cache = MapStateCache::new();
        cache.state_expiry_ms = 0;
        let world = populated_world();
        cache.save_map_state(5, &world, 1000);
        assert!(cache.has_state(5, i32::MAX));
    }

    #[test]
    fn test_lru_evicts_least_recently_saved() {
        let mut cache = MapStateCache::new();
        cache.max_cached_maps = 3;
        let world = populated_world();

        for map_id in 1..=3 {
            cache.save_map_state(map_id, &world, 1000 + map_id);
        }
        // Re-save map 1 so map 2 becomes the oldest
        cache.save_map_state(1, &world, 2000);

        cache.save_map_state(4, &world, 3000);

        assert!(!cache.has_state(2, 3001));
        assert!(cache.has_state(1, 3001));
        assert!(cache.has_state(3, 3001));
        assert!(cache.has_state(4, 3001));
        assert_eq!(cache.cached_map_count(), 3);
    }

    #[test]
    fn test_clear_map_state_and_all() {
        let mut cache = MapStateCache::new();
        let world = populated_world();
        cache.save_map_state(1, &world, 1000);
        cache.save_map_state(2, &world, 1000);

        cache.clear_map_state(1);
        assert!(!cache.has_state(1, 1001));
        assert!(cache.has_state(2, 1001));

        cache.clear_all();
        assert_eq!(cache.cached_map_count(), 0);
    }
}
