//! Host facade: owns the pool and managers and runs the fixed tick order.
//!
//! The host calls [`Simulation::update`] once per frame with the wall
//! clock's millisecond tick. Order within a tick is fixed: AI decisions,
//! movement integration, combat/skills, entity animation, transient
//! effects. Afterwards the host drains [`Simulation::events`] and reads
//! positions/frames for rendering.

use hecs::World;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::animation::{AnimationController, AnimationEffects, AnimationEvent};
use crate::components::Position;
use crate::events::EventQueue;
use crate::foothold::Foothold;
use crate::map_state::MapStateCache;
use crate::player::Player;
use crate::skills::{SkillLoader, SkillManager};
use crate::spawning::{self, MobSpawn};
use crate::systems::ai::{self, MobAi, MobAiState};
use crate::systems::movement::{self, Movement};
use crate::time::GameClock;

pub struct Simulation {
    pub world: World,
    pub player: Player,
    pub physics: crate::physics::PhysicsConstants,
    pub skills: SkillManager,
    pub effects: AnimationEffects,
    pub map_cache: MapStateCache,
    pub events: EventQueue,
    pub clock: GameClock,
    pub footholds: Vec<Foothold>,
    current_map_id: Option<i32>,
    rng: StdRng,
}

impl Simulation {
    pub fn new(loader: SkillLoader) -> Self {
        Self::with_seed(loader, 0x5eed)
    }

    /// Deterministic construction for tests and replays.
    pub fn with_seed(loader: SkillLoader, seed: u64) -> Self {
        Self {
            world: World::new(),
            player: Player::new(),
            physics: crate::physics::PhysicsConstants::new(),
            skills: SkillManager::new(loader),
            effects: AnimationEffects::new(),
            map_cache: MapStateCache::new(),
            events: EventQueue::new(),
            clock: GameClock::new(),
            footholds: Vec::new(),
            current_map_id: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn current_map_id(&self) -> Option<i32> {
        self.current_map_id
    }

    /// Load a map: spawn its mobs and restore cached state if the player
    /// has been here recently.
    pub fn enter_map(&mut self, map_id: i32, spawns: &[MobSpawn], footholds: Vec<Foothold>) {
        self.footholds = footholds;
        self.current_map_id = Some(map_id);

        for spawn in spawns {
            spawning::spawn_mob(
                &mut self.world,
                spawn,
                &self.footholds,
                &self.physics,
                &mut self.rng,
            );
        }

        self.map_cache
            .restore_map_state(map_id, &mut self.world, self.clock.tick);
    }

    /// Leave the current map: snapshot mob state, then drop map-scoped
    /// combat and effect state. Skills and cooldowns survive the hop.
    pub fn leave_map(&mut self) {
        if let Some(map_id) = self.current_map_id.take() {
            self.map_cache
                .save_map_state(map_id, &self.world, self.clock.tick);
        }
        self.skills.clear_map_state(&mut self.player);
        self.effects.clear();
        self.world.clear();
        self.footholds.clear();
    }

    /// Advance one frame.
    pub fn update(&mut self, tick: i32) {
        puffin::profile_function!();

        self.clock.advance(tick);
        let dt_ms = (self.clock.delta * 1000.0) as i32;
        let player_pos = Some((self.player.x, self.player.y));

        // 1. AI decisions
        ai::update_ai(&mut self.world, player_pos, tick, &mut self.events);

        // 2. Movement integration, gated by AI state
        for (_, (pos, mv, ai_state, controller)) in self.world.query_mut::<(
            &mut Position,
            &mut Movement,
            &MobAi,
            Option<&AnimationController>,
        )>() {
            let frame_index = controller.map_or(0, |c| c.current_frame_index() as i32);
            ai::drive_movement(pos, ai_state, mv, frame_index);
            if ai_state.is_dead() {
                continue;
            }
            movement::update_movement(pos, mv, &self.footholds, &mut self.rng, dt_ms);
        }

        // 3. Combat and skills
        self.skills.update(
            &mut self.world,
            &mut self.player,
            &mut self.events,
            &mut self.rng,
            tick,
            dt_ms,
        );

        // 4. Entity animation
        self.sync_animations(tick);

        // 5. Transient effects
        self.effects.update(tick, self.clock.delta);

        // Removed mobs leave the pool
        for entity in ai::collect_removed(&self.world) {
            let _ = self.world.despawn(entity);
        }
    }

    /// Keep each mob's animation in step with its AI and movement state,
    /// and feed completion notifications back into the AI.
    fn sync_animations(&mut self, tick: i32) {
        for (_, (ai_state, mv, controller)) in
            self.world
                .query_mut::<(&mut MobAi, &mut Movement, &mut AnimationController)>()
        {
            match ai_state.state() {
                MobAiState::Attack | MobAiState::Skill => {
                    let action = ai_state.recommended_action();
                    if controller.current_action() != action {
                        controller.play_once(&action);
                    }
                }
                MobAiState::Hit => {
                    if controller.current_action() != "hit1" {
                        controller.play_once("hit1");
                    }
                }
                MobAiState::Death | MobAiState::Removed => {
                    if controller.current_action() != "die1" {
                        controller.play_once("die1");
                    }
                }
                _ => {
                    controller.set_action(mv.current_action.name());
                }
            }

            controller.update_frame(tick);
            mv.update_pending_direction(
                controller.current_frame_index() as i32,
                controller.frame_count() as i32,
            );

            for event in controller.drain_events() {
                if let AnimationEvent::Completed { action } = event {
                    if action.starts_with("attack") || action.starts_with("skill") {
                        ai_state.notify_attack_animation_complete(tick);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Frame, MobAnimationSet};
    use crate::components::{Health, Spawn};
    use crate::skills::data::{SkillData, SkillKind, SkillLevelData};
    use std::sync::Arc;

    fn walker_animations() -> Arc<MobAnimationSet> {
        let mut set = MobAnimationSet::new();
        for action in ["stand", "move", "attack1", "hit1", "die1"] {
            set.add_animation(action, vec![Frame::new(0, 100), Frame::new(1, 100)]);
        }
        Arc::new(set)
    }

    fn test_map() -> (Vec<MobSpawn>, Vec<Foothold>) {
        let animations = walker_animations();
        let spawns = vec![
            MobSpawn::new(0, "100100", -50, 100, animations.clone()),
            MobSpawn::new(1, "100100", 150, 100, animations),
        ];
        let footholds = vec![Foothold::new(-400, 100, 400, 100)];
        (spawns, footholds)
    }

    fn buff_loader() -> SkillLoader {
        let mut loader = SkillLoader::new();
        let mut skill = SkillData::new(1101003, "Rage", SkillKind::Buff);
        skill.max_level = 1;
        skill.levels = vec![SkillLevelData {
            level: 1,
            mp_cost: 10,
            duration_s: 10,
            pad: 10,
            ..Default::default()
        }];
        loader.register(skill);
        loader
    }

    #[test]
    fn test_tick_runs_all_phases() {
        let mut sim = Simulation::with_seed(SkillLoader::new(), 7);
        let (spawns, footholds) = test_map();
        sim.enter_map(100, &spawns, footholds);
        assert_eq!(sim.world.len(), 2);

        for frame in 1..=120 {
            sim.update(frame * 16);
        }

        // Mobs stayed on the ground line and inside their patrol ranges
        for (_, (spawn, pos)) in sim.world.query::<(&Spawn, &Position)>().iter() {
            assert!((pos.y - 100.0).abs() < 0.01, "mob {} left ground", spawn.index);
            let spawn_x = if spawn.index == 0 { -50.0 } else { 150.0 };
            assert!((pos.x - spawn_x).abs() <= 101.0);
        }
    }

    #[test]
    fn test_dead_mob_despawns_after_death_animation() {
        let mut sim = Simulation::with_seed(SkillLoader::new(), 8);
        let (spawns, footholds) = test_map();
        sim.enter_map(100, &spawns, footholds);

        let victim = sim
            .world
            .query::<&Spawn>()
            .iter()
            .find(|(_, s)| s.index == 0)
            .map(|(e, _)| e)
            .unwrap();

        sim.update(16);
        ai::damage_mob(&mut sim.world, victim, 10_000, 16, Some((0.0, 0.0)));
        assert!(sim.world.get::<&MobAi>(victim).unwrap().is_dead());

        // Death animation holds the mob for a second, then the pool drops it
        for frame in 2..=90 {
            sim.update(frame * 16);
        }
        assert!(!sim.world.contains(victim));
        assert_eq!(sim.world.len(), 1);
    }

    #[test]
    fn test_map_transition_round_trip() {
        let mut sim = Simulation::with_seed(buff_loader(), 9);
        sim.skills.set_skill_level(1101003, 1);
        let (spawns, footholds) = test_map();
        sim.enter_map(100, &spawns, footholds.clone());

        // Wound a mob and buff the player
        let victim = sim
            .world
            .query::<&Spawn>()
            .iter()
            .find(|(_, s)| s.index == 0)
            .map(|(e, _)| e)
            .unwrap();
        sim.update(16);
        ai::damage_mob(&mut sim.world, victim, 60, 16, None);
        let base_attack = sim.player.attack;
        let mut rng = StdRng::seed_from_u64(1);
        sim.skills.try_cast_skill(
            &mut sim.world,
            &mut sim.player,
            &mut sim.events,
            &mut rng,
            1101003,
            32,
        );
        assert_ne!(sim.player.attack, base_attack);

        sim.update(48);
        sim.leave_map();

        // Buff reverted on transition; world emptied
        assert_eq!(sim.player.attack, base_attack);
        assert_eq!(sim.world.len(), 0);
        // Skill book survives
        assert_eq!(sim.skills.skill_level(1101003), 1);

        // Return: the wounded mob keeps its HP
        sim.update(1000);
        sim.enter_map(100, &spawns, footholds);
        let mut found = false;
        for (_, (spawn, health)) in sim.world.query::<(&Spawn, &Health)>().iter() {
            if spawn.index == 0 {
                assert_eq!(health.current, 40);
                found = true;
            } else {
                assert_eq!(health.current, 100);
            }
        }
        assert!(found);
    }

    #[test]
    fn test_attack_animation_completion_resumes_chase() {
        let mut sim = Simulation::with_seed(SkillLoader::new(), 10);
        let (spawns, footholds) = test_map();
        sim.enter_map(100, &spawns, footholds);
        sim.player.x = -40.0;
        sim.player.y = 100.0;

        let mob = sim
            .world
            .query::<&Spawn>()
            .iter()
            .find(|(_, s)| s.index == 0)
            .map(|(e, _)| e)
            .unwrap();

        // Force the mob into attack range aggression
        sim.world
            .get::<&mut MobAi>(mob)
            .unwrap()
            .force_aggro(-40.0, 100.0, 100_000);

        let mut saw_attack = false;
        let mut resumed = false;
        for frame in 0..300 {
            sim.update(100_000 + frame * 16);
            let state = sim.world.get::<&MobAi>(mob).unwrap().state();
            if state == MobAiState::Attack {
                saw_attack = true;
            }
            if saw_attack && state == MobAiState::Chase {
                resumed = true;
                break;
            }
        }
        assert!(saw_attack, "mob never attacked");
        assert!(resumed, "attack animation completion never resumed the chase");
    }
}
