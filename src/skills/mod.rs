//! Skill definitions, the asset loader, and the combat resolution engine.

pub mod data;
pub mod loader;
pub mod manager;

pub use data::{
    ActiveBuff, ActiveHitEffect, ActiveProjectile, BuffStat, ProjectileData, SkillAnimation,
    SkillAttackType, SkillCastInfo, SkillData, SkillElement, SkillFrame, SkillKind,
    SkillLevelData, SkillTarget,
};
pub use loader::SkillLoader;
pub use manager::SkillManager;
