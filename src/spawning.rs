//! Mob entity construction from map spawn data.
//!
//! A spawn entry plus the mob's shared animation set produce the full
//! component bundle. Movement capabilities come from which animations the
//! mob has, not from spawn configuration.

use std::sync::Arc;

use hecs::{Entity, World};
use rand::Rng;

use crate::animation::{AnimationController, MobAnimationSet};
use crate::components::{Health, Position, Spawn};
use crate::constants::{ATTACK_COOLDOWN, DEFAULT_ATTACK_RANGE};
use crate::physics::PhysicsConstants;
use crate::systems::ai::{MobAi, MobAttackEntry};
use crate::systems::movement::{self, Movement};
use crate::foothold::Foothold;

/// One entry of a map's mob spawn table.
#[derive(Clone)]
pub struct MobSpawn {
    pub index: usize,
    pub mob_id: String,
    pub x: i32,
    pub y: i32,
    pub rx0_shift: i32,
    pub rx1_shift: i32,
    pub y_shift: i32,
    pub no_flip: bool,

    pub max_hp: i32,
    pub level: i32,
    pub exp: i32,
    pub boss: bool,
    pub undead: bool,
    /// firstAttack map data: hostile on proximity.
    pub auto_aggro: bool,

    pub animations: Arc<MobAnimationSet>,
}

impl MobSpawn {
    pub fn new(index: usize, mob_id: &str, x: i32, y: i32, animations: Arc<MobAnimationSet>) -> Self {
        Self {
            index,
            mob_id: mob_id.to_string(),
            x,
            y,
            rx0_shift: 100,
            rx1_shift: 100,
            y_shift: 0,
            no_flip: false,
            max_hp: 100,
            level: 1,
            exp: 10,
            boss: false,
            undead: false,
            auto_aggro: false,
            animations,
        }
    }
}

/// Spawn a mob into the pool.
pub fn spawn_mob(
    world: &mut World,
    spawn: &MobSpawn,
    footholds: &[Foothold],
    physics: &PhysicsConstants,
    rng: &mut impl Rng,
) -> Entity {
    let set = &spawn.animations;
    let mut mv = Movement::new(
        spawn.x,
        spawn.y,
        spawn.rx0_shift,
        spawn.rx1_shift,
        spawn.y_shift,
        set.can_fly(),
        set.can_jump(),
        set.can_move(),
        spawn.no_flip,
        physics,
        rng,
    );
    // Bosses roam their whole platform
    mv.use_platform_bounds = spawn.boss;

    let mut pos = Position::new(spawn.x as f32, spawn.y as f32);
    if !set.can_fly() {
        movement::find_current_foothold(&mut pos, &mut mv, footholds);
    }

    let mut ai = MobAi::new(spawn.level, spawn.exp, spawn.boss, spawn.undead, spawn.auto_aggro);
    // An attack animation implies an attack, same as the movement modes
    if set.inner().has_animation("attack1") {
        ai.add_attack(MobAttackEntry::new(
            1,
            "attack1",
            5 + spawn.level * 2,
            DEFAULT_ATTACK_RANGE,
            ATTACK_COOLDOWN,
        ));
    }

    let animations = spawn.animations.clone();
    let controller = AnimationController::new(move |action| animations.frames(action), "stand");

    world.spawn((
        Spawn::new(spawn.index, spawn.mob_id.clone()),
        pos,
        mv,
        ai,
        Health::new(spawn.max_hp),
        controller,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Frame;
    use crate::systems::movement::MoveType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn animation_set(actions: &[&str]) -> Arc<MobAnimationSet> {
        let mut set = MobAnimationSet::new();
        for action in actions {
            set.add_animation(action, vec![Frame::new(0, 100), Frame::new(1, 100)]);
        }
        Arc::new(set)
    }

    #[test]
    fn test_spawn_walker_snaps_to_foothold() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(1);
        let physics = PhysicsConstants::new();
        let footholds = vec![Foothold::new(-300, 120, 300, 120)];

        let spawn = MobSpawn::new(0, "100100", 0, 120, animation_set(&["stand", "move"]));
        let entity = spawn_mob(&mut world, &spawn, &footholds, &physics, &mut rng);

        let mv = world.get::<&Movement>(entity).unwrap();
        assert_eq!(mv.move_type, MoveType::Move);
        assert_eq!(mv.current_foothold, Some(0));
        assert_eq!(world.get::<&Position>(entity).unwrap().y, 120.0);
        assert_eq!(world.get::<&Spawn>(entity).unwrap().index, 0);
    }

    #[test]
    fn test_spawn_flyer_ignores_footholds() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(2);
        let physics = PhysicsConstants::new();
        let footholds = vec![Foothold::new(-300, 400, 300, 400)];

        let spawn = MobSpawn::new(0, "100200", 0, 100, animation_set(&["stand", "fly"]));
        let entity = spawn_mob(&mut world, &spawn, &footholds, &physics, &mut rng);

        let mv = world.get::<&Movement>(entity).unwrap();
        assert_eq!(mv.move_type, MoveType::Fly);
        assert_eq!(mv.current_foothold, None);
    }

    #[test]
    fn test_attack_animation_implies_attack_entry() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(3);
        let physics = PhysicsConstants::new();

        let armed = MobSpawn::new(0, "a", 0, 0, animation_set(&["stand", "move", "attack1"]));
        let passive = MobSpawn::new(1, "b", 0, 0, animation_set(&["stand", "move"]));
        let armed_entity = spawn_mob(&mut world, &armed, &[], &physics, &mut rng);
        let passive_entity = spawn_mob(&mut world, &passive, &[], &physics, &mut rng);

        // The armed mob can reach Attack state; the passive one cannot
        let mut armed_ai = world.get::<&mut MobAi>(armed_entity).unwrap();
        armed_ai.force_aggro(10.0, 0.0, 100_000);
        armed_ai.update(100_010, 0.0, 0.0, Some((10.0, 0.0)));
        assert_eq!(armed_ai.state(), crate::systems::ai::MobAiState::Attack);
        drop(armed_ai);

        let mut passive_ai = world.get::<&mut MobAi>(passive_entity).unwrap();
        passive_ai.force_aggro(10.0, 0.0, 100_000);
        passive_ai.update(100_010, 0.0, 0.0, Some((10.0, 0.0)));
        assert_eq!(passive_ai.state(), crate::systems::ai::MobAiState::Chase);
    }

    #[test]
    fn test_boss_uses_platform_bounds() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(4);
        let physics = PhysicsConstants::new();

        let mut spawn = MobSpawn::new(0, "8800000", 0, 0, animation_set(&["stand", "move"]));
        spawn.boss = true;
        let entity = spawn_mob(&mut world, &spawn, &[], &physics, &mut rng);

        assert!(world.get::<&Movement>(entity).unwrap().use_platform_bounds);
        assert!(world.get::<&MobAi>(entity).unwrap().is_boss());
    }
}
