//! Skill definition loading from the asset document.
//!
//! Skills arrive as a JSON object keyed by skill id. Every field is
//! optional: missing or malformed values fall back to defaults, never
//! errors - incomplete asset sets are normal during development. Parsed
//! definitions are cached by id and shared.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::skills::data::{
    ProjectileData, SkillAnimation, SkillAttackType, SkillData, SkillElement, SkillFrame,
    SkillKind, SkillLevelData, SkillTarget,
};

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawFrame {
    sprite: u32,
    delay: i32,
    flip: bool,
    origin: (i32, i32),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawAnimation {
    frames: Vec<RawFrame>,
    #[serde(rename = "loop")]
    looping: bool,
    z: i32,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawProjectile {
    speed: f32,
    gravity: f32,
    #[serde(rename = "lifeTime")]
    lifetime: f32,
    piercing: bool,
    #[serde(rename = "maxHits")]
    max_hits: i32,
    #[serde(rename = "explosionRadius")]
    explosion_radius: f32,
    animation: Option<RawAnimation>,
    explosion: Option<RawAnimation>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawLevel {
    level: i32,
    damage: i32,
    #[serde(rename = "attackCount")]
    attack_count: i32,
    #[serde(rename = "mobCount")]
    mob_count: i32,
    #[serde(rename = "mpCon")]
    mp_con: i32,
    #[serde(rename = "hpCon")]
    hp_con: i32,
    cooldown: i32,
    time: i32,
    range: i32,
    #[serde(rename = "rangeR")]
    range_r: i32,
    #[serde(rename = "rangeL")]
    range_l: i32,
    #[serde(rename = "rangeY")]
    range_y: i32,
    pad: i32,
    mad: i32,
    pdd: i32,
    mdd: i32,
    acc: i32,
    eva: i32,
    speed: i32,
    jump: i32,
    hp: i32,
    mp: i32,
    prop: i32,
    x: i32,
    y: i32,
    z: i32,
    #[serde(rename = "bulletCount")]
    bullet_count: i32,
    #[serde(rename = "bulletSpeed")]
    bullet_speed: i32,
    mastery: i32,
    #[serde(rename = "criticalRate")]
    critical_rate: i32,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSkill {
    name: String,
    description: String,
    #[serde(rename = "maxLevel")]
    max_level: i32,
    kind: String,
    element: String,
    target: String,
    #[serde(rename = "attackType")]
    attack_type: String,
    job: i32,
    invisible: bool,
    action: Option<String>,
    levels: Vec<RawLevel>,
    effect: Option<RawAnimation>,
    #[serde(rename = "hitEffect")]
    hit_effect: Option<RawAnimation>,
    #[serde(rename = "affectedEffect")]
    affected_effect: Option<RawAnimation>,
    projectile: Option<RawProjectile>,
}

fn parse_kind(raw: &str) -> SkillKind {
    match raw {
        "buff" | "partyBuff" => SkillKind::Buff,
        "heal" => SkillKind::Heal,
        "summon" => SkillKind::Summon,
        "movement" => SkillKind::Movement,
        "passive" => SkillKind::Passive,
        _ => SkillKind::Attack,
    }
}

fn parse_element(raw: &str) -> SkillElement {
    match raw {
        "fire" => SkillElement::Fire,
        "ice" => SkillElement::Ice,
        "lightning" => SkillElement::Lightning,
        "poison" => SkillElement::Poison,
        "holy" => SkillElement::Holy,
        "dark" => SkillElement::Dark,
        _ => SkillElement::Physical,
    }
}

fn parse_target(raw: &str) -> SkillTarget {
    match raw {
        "multipleEnemy" => SkillTarget::MultipleEnemy,
        "self" => SkillTarget::SelfTarget,
        "party" => SkillTarget::Party,
        "ground" => SkillTarget::Ground,
        "direction" => SkillTarget::Direction,
        _ => SkillTarget::SingleEnemy,
    }
}

fn parse_attack_type(raw: &str) -> SkillAttackType {
    match raw {
        "ranged" => SkillAttackType::Ranged,
        "magic" => SkillAttackType::Magic,
        "summon" => SkillAttackType::Summon,
        "special" => SkillAttackType::Special,
        _ => SkillAttackType::Melee,
    }
}

fn build_animation(name: &str, raw: RawAnimation) -> SkillAnimation {
    let mut anim = SkillAnimation::new(
        name,
        raw.frames
            .into_iter()
            .map(|f| {
                let mut frame = SkillFrame::new(
                    f.sprite,
                    if f.delay > 0 { f.delay } else { 100 },
                );
                frame.flip = f.flip;
                frame.origin = f.origin;
                frame
            })
            .collect(),
    );
    anim.looping = raw.looping;
    anim.z_order = raw.z;
    anim
}

fn build_projectile(skill_id: i32, raw: RawProjectile) -> ProjectileData {
    let defaults = ProjectileData::default();
    ProjectileData {
        skill_id,
        animation: raw.animation.map(|a| build_animation("ball", a)),
        speed: if raw.speed > 0.0 { raw.speed } else { defaults.speed },
        gravity: raw.gravity,
        lifetime_ms: if raw.lifetime > 0.0 {
            raw.lifetime
        } else {
            defaults.lifetime_ms
        },
        piercing: raw.piercing,
        max_hits: raw.max_hits.max(1),
        explosion_radius: raw.explosion_radius,
        explosion_animation: raw.explosion.map(|a| build_animation("explosion", a)),
    }
}

fn build_skill(skill_id: i32, raw: RawSkill) -> SkillData {
    let mut skill = SkillData::new(skill_id, &raw.name, parse_kind(&raw.kind));
    skill.description = raw.description;
    skill.element = parse_element(&raw.element);
    skill.target = parse_target(&raw.target);
    skill.attack_type = parse_attack_type(&raw.attack_type);
    skill.job = raw.job;
    skill.invisible = raw.invisible;
    skill.action_name = raw.action;

    skill.levels = raw
        .levels
        .into_iter()
        .map(|l| SkillLevelData {
            level: l.level,
            damage: l.damage,
            attack_count: l.attack_count.max(1),
            mob_count: l.mob_count.max(1),
            mp_cost: l.mp_con,
            hp_cost: l.hp_con,
            cooldown_ms: l.cooldown,
            duration_s: l.time,
            range: l.range,
            range_right: l.range_r,
            range_left: l.range_l,
            range_y: l.range_y,
            pad: l.pad,
            mad: l.mad,
            pdd: l.pdd,
            mdd: l.mdd,
            acc: l.acc,
            eva: l.eva,
            speed: l.speed,
            jump: l.jump,
            hp: l.hp,
            mp: l.mp,
            prop: l.prop,
            x: l.x,
            y: l.y,
            z: l.z,
            bullet_count: l.bullet_count.max(1),
            bullet_speed: l.bullet_speed,
            mastery: l.mastery,
            critical_rate: l.critical_rate,
        })
        .collect();
    skill.max_level = if raw.max_level > 0 {
        raw.max_level
    } else {
        skill.levels.len().max(1) as i32
    };

    skill.effect = raw.effect.map(|a| build_animation("effect", a));
    skill.hit_effect = raw.hit_effect.map(|a| build_animation("hit", a));
    skill.affected_effect = raw.affected_effect.map(|a| build_animation("affected", a));
    skill.projectile = raw.projectile.map(|p| build_projectile(skill_id, p));

    skill
}

/// Id-keyed skill definition store.
#[derive(Default)]
pub struct SkillLoader {
    skills: HashMap<i32, Arc<SkillData>>,
}

impl SkillLoader {
    pub fn new() -> Self {
        Self {
            skills: HashMap::new(),
        }
    }

    /// Parse a skill document. Entries with unparseable ids or bodies are
    /// skipped; the rest load normally.
    pub fn from_json(json: &str) -> Self {
        let mut loader = Self::new();
        loader.load_json(json);
        loader
    }

    pub fn load_json(&mut self, json: &str) {
        let Ok(document) = serde_json::from_str::<serde_json::Value>(json) else {
            return;
        };
        let Some(entries) = document.as_object() else {
            return;
        };

        for (key, value) in entries {
            let Ok(skill_id) = key.parse::<i32>() else {
                continue;
            };
            let Ok(raw) = serde_json::from_value::<RawSkill>(value.clone()) else {
                continue;
            };
            self.skills
                .insert(skill_id, Arc::new(build_skill(skill_id, raw)));
        }
    }

    /// Register a programmatically built definition (tests, tooling).
    pub fn register(&mut self, skill: SkillData) {
        self.skills.insert(skill.skill_id, Arc::new(skill));
    }

    pub fn skill(&self, skill_id: i32) -> Option<Arc<SkillData>> {
        self.skills.get(&skill_id).cloned()
    }

    /// Skills owned by a job path (id prefix match on the job id).
    pub fn skills_for_job(&self, job_id: i32) -> Vec<Arc<SkillData>> {
        let mut skills: Vec<_> = self
            .skills
            .values()
            .filter(|s| s.job == job_id || job_id == 0)
            .cloned()
            .collect();
        skills.sort_by_key(|s| s.skill_id);
        skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
