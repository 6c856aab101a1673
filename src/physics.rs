//! Movement physics constants and integration formulas.
//!
//! Client formulas:
//!   AccSpeed: v += (force / mass) * dt, clamped to max_speed
//!   DecSpeed: v -= (drag / mass) * dt, clamped to 0
//!   Position: pos += (v_old + v_new) * 0.5 * dt (trapezoidal integration)
//!
//! The raw table stores forces that character attributes scale:
//!   final_walk_speed = shoe_walk_speed * physics_walk_speed * foothold_walk
//!
//! Constructed once at startup and passed by reference into movement code;
//! tests build their own instances per scenario.

use serde_json::Value;

/// Read a named numeric field, falling back when missing or malformed.
///
/// The asset table is development data; absent fields are expected and
/// never an error.
pub fn get_f64(table: &Value, name: &str, default: f64) -> f64 {
    table.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Physics constant table, loadable from the map data's physics table.
///
/// Raw fields mirror the data table; the tuned accessors below override a
/// few of them for game feel and must stay independent of the raw values.
#[derive(Debug, Clone)]
pub struct PhysicsConstants {
    // Naked-character attribute defaults; equipment would scale these.
    pub shoe_walk_speed: f64,
    pub shoe_walk_acc: f64,
    pub shoe_walk_drag: f64,

    // Raw table values.
    raw_walk_force: f64,
    raw_walk_speed: f64,
    raw_walk_drag: f64,
    raw_slip_force: f64,
    raw_slip_speed: f64,
    raw_float_drag1: f64,
    raw_float_drag2: f64,
    raw_float_coefficient: f64,
    raw_swim_force: f64,
    raw_swim_speed: f64,
    raw_swim_speed_dec: f64,
    raw_fly_force: f64,
    raw_fly_speed: f64,
    raw_fly_jump_dec: f64,
    raw_gravity_acc: f64,
    raw_fall_speed: f64,
    raw_jump_speed: f64,
    raw_max_friction: f64,
    raw_min_friction: f64,

    default_mass: f64,
    loaded: bool,
}

impl Default for PhysicsConstants {
    fn default() -> Self {
        Self {
            shoe_walk_speed: 1.0,
            shoe_walk_acc: 1.0,
            shoe_walk_drag: 1.0,

            raw_walk_force: 999_999.0,
            raw_walk_speed: 1250.0,
            raw_walk_drag: 10_000.0,
            raw_slip_force: 90_000.0,
            raw_slip_speed: 420.0,
            raw_float_drag1: 300_000.0,
            raw_float_drag2: 30_000.0,
            raw_float_coefficient: 0.03,
            raw_swim_force: 320_000.0,
            raw_swim_speed: 440.0,
            raw_swim_speed_dec: 0.1,
            raw_fly_force: 420_000.0,
            raw_fly_speed: 600.0,
            raw_fly_jump_dec: 0.15,
            raw_gravity_acc: 3000.0,
            raw_fall_speed: 1670.0,
            raw_jump_speed: 1555.0,
            raw_max_friction: 10.0,
            raw_min_friction: 0.2,

            default_mass: 100.0,
            loaded: false,
        }
    }
}

impl PhysicsConstants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load raw values from a physics data table.
    ///
    /// Every field defaults individually; a partial or empty table is fine.
    /// Tuned values (gravity, jump, fall, walk drag) are unaffected.
    pub fn load_from_table(&mut self, table: &Value) {
        self.raw_walk_force = get_f64(table, "walkForce", self.raw_walk_force);
        self.raw_walk_speed = get_f64(table, "walkSpeed", self.raw_walk_speed);
        self.raw_walk_drag = get_f64(table, "walkDrag", self.raw_walk_drag);

        self.raw_slip_force = get_f64(table, "slipForce", self.raw_slip_force);
        self.raw_slip_speed = get_f64(table, "slipSpeed", self.raw_slip_speed);

        self.raw_float_drag1 = get_f64(table, "floatDrag1", self.raw_float_drag1);
        self.raw_float_drag2 = get_f64(table, "floatDrag2", self.raw_float_drag2);
        self.raw_float_coefficient = get_f64(table, "floatCoefficient", self.raw_float_coefficient);

        self.raw_swim_force = get_f64(table, "swimForce", self.raw_swim_force);
        self.raw_swim_speed = get_f64(table, "swimSpeed", self.raw_swim_speed);
        self.raw_swim_speed_dec = get_f64(table, "swimSpeedDec", self.raw_swim_speed_dec);

        self.raw_fly_force = get_f64(table, "flyForce", self.raw_fly_force);
        self.raw_fly_speed = get_f64(table, "flySpeed", self.raw_fly_speed);
        self.raw_fly_jump_dec = get_f64(table, "flyJumpDec", self.raw_fly_jump_dec);

        self.raw_gravity_acc = get_f64(table, "gravityAcc", self.raw_gravity_acc);
        self.raw_fall_speed = get_f64(table, "fallSpeed", self.raw_fall_speed);
        self.raw_jump_speed = get_f64(table, "jumpSpeed", self.raw_jump_speed);

        self.raw_max_friction = get_f64(table, "maxFriction", self.raw_max_friction);
        self.raw_min_friction = get_f64(table, "minFriction", self.raw_min_friction);

        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    // --- scaled values -----------------------------------------------------

    /// Walk force with the shoe acceleration attribute applied.
    pub fn walk_force(&self) -> f64 {
        self.raw_walk_force * self.shoe_walk_acc
    }

    /// Max walk speed base (raw 1250) with the shoe speed attribute applied.
    ///
    /// With default attributes the character Speed stat ends up equal to the
    /// walk speed in px/s: Speed 100 = 100 px/s, Speed 140 = 140 px/s.
    pub fn walk_speed(&self) -> f64 {
        self.raw_walk_speed * self.shoe_walk_speed
    }

    /// Walk drag, tuned for responsive stopping.
    ///
    /// The raw table value (10000) stops from full walk speed far too
    /// slowly; 80000 gives 800 px/s² and stops from 125 px/s in ~0.15 s.
    pub fn walk_drag(&self) -> f64 {
        80_000.0
    }

    pub fn slip_force(&self) -> f64 {
        self.raw_slip_force * self.shoe_walk_acc
    }

    pub fn slip_speed(&self) -> f64 {
        self.raw_slip_speed * self.shoe_walk_speed
    }

    pub fn float_drag1(&self) -> f64 {
        self.raw_float_drag1
    }

    pub fn float_drag2(&self) -> f64 {
        self.raw_float_drag2
    }

    pub fn float_coefficient(&self) -> f64 {
        self.raw_float_coefficient
    }

    pub fn swim_force(&self) -> f64 {
        self.raw_swim_force
    }

    pub fn swim_speed(&self) -> f64 {
        self.raw_swim_speed
    }

    pub fn swim_speed_dec(&self) -> f64 {
        self.raw_swim_speed_dec
    }

    pub fn fly_force(&self) -> f64 {
        self.raw_fly_force
    }

    pub fn fly_speed(&self) -> f64 {
        self.raw_fly_speed
    }

    pub fn fly_jump_dec(&self) -> f64 {
        self.raw_fly_jump_dec
    }

    /// Gravity acceleration (px/s²). Tuned; the raw table value (3000) is
    /// too heavy for natural-feeling movement.
    pub fn gravity_acc(&self) -> f64 {
        2000.0
    }

    /// Terminal fall velocity (px/s). Tuned; ignores the raw value.
    pub fn fall_speed(&self) -> f64 {
        670.0
    }

    /// Jump velocity (px/s). Tuned; ignores the raw value.
    pub fn jump_speed(&self) -> f64 {
        555.0
    }

    pub fn max_friction(&self) -> f64 {
        self.raw_max_friction
    }

    pub fn min_friction(&self) -> f64 {
        self.raw_min_friction
    }

    // --- derived -----------------------------------------------------------

    pub fn default_mass(&self) -> f64 {
        self.default_mass
    }

    /// Walk acceleration = walk force / mass (px/s²).
    pub fn walk_acceleration(&self) -> f64 {
        self.walk_force() / self.default_mass
    }

    /// Walk deceleration = walk drag / mass (px/s²).
    pub fn walk_deceleration(&self) -> f64 {
        self.walk_drag() / self.default_mass
    }

    /// Swim speed multiplier applied on top of walk speed.
    pub fn swim_speed_multiplier(&self) -> f64 {
        self.raw_swim_speed_dec
    }
}

// --- integration helpers ---------------------------------------------------

/// AccSpeed: accelerate `v` toward `max_speed`, never past it.
#[inline]
pub fn acc_speed(v: f64, force: f64, mass: f64, max_speed: f64, dt: f64) -> f64 {
    (v + (force / mass) * dt).min(max_speed)
}

/// DecSpeed: decelerate `v` toward zero, never below it.
#[inline]
pub fn dec_speed(v: f64, drag: f64, mass: f64, dt: f64) -> f64 {
    (v - (drag / mass) * dt).max(0.0)
}

/// Trapezoidal position step.
#[inline]
pub fn integrate_position(pos: f64, v_old: f64, v_new: f64, dt: f64) -> f64 {
    pos + (v_old + v_new) * 0.5 * dt
}
