//! Caster-side state the combat engine reads and mutates.
//!
//! Only what the skill pipeline needs: position/facing, resource pools,
//! buffable stats, and the movement state that gates attacking. The full
//! character (input, animation, inventory) lives with the host.

/// Player movement context. Attacks are impossible on ladders, ropes, and
/// in water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerMoveState {
    #[default]
    Ground,
    Ladder,
    Rope,
    Swim,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub facing_right: bool,

    pub hp: i32,
    pub max_hp: i32,
    pub mp: i32,
    pub max_mp: i32,

    // Buffable stats; buffs add and remove symmetric deltas.
    pub attack: i32,
    pub magic_attack: i32,
    pub defense: i32,
    pub magic_defense: i32,
    pub accuracy: i32,
    pub avoidability: i32,
    pub speed: i32,
    pub jump: i32,

    pub weapon_attack: i32,

    pub move_state: PlayerMoveState,

    triggered_action: Option<String>,
}

impl Player {
    pub fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            facing_right: true,
            hp: 500,
            max_hp: 500,
            mp: 200,
            max_mp: 200,
            attack: 10,
            magic_attack: 10,
            defense: 5,
            magic_defense: 5,
            accuracy: 10,
            avoidability: 10,
            speed: 100,
            jump: 100,
            weapon_attack: 0,
            move_state: PlayerMoveState::Ground,
            triggered_action: None,
        }
    }

    /// Attacking is blocked while climbing or swimming.
    pub fn can_attack(&self) -> bool {
        self.move_state == PlayerMoveState::Ground
    }

    /// Total physical attack including the equipped weapon.
    pub fn total_attack(&self) -> i32 {
        self.attack + self.weapon_attack
    }

    /// Queue a caster animation action for the host to play.
    pub fn trigger_action(&mut self, action: &str) {
        self.triggered_action = Some(action.to_string());
    }

    /// The pending caster action, consumed by the host's animation layer.
    pub fn take_triggered_action(&mut self) -> Option<String> {
        self.triggered_action.take()
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}
