//! Extended buffer: plugin state that the game's own API does not expose

use super::{CBool, MAX_MAPPED_IDS, MAX_MAPPED_VEHICLES, decode_text};

/// Driving aids and physics options selected by the player
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct PhysicsOptions {
    pub traction_control: u8,
    pub anti_lock_brakes: u8,
    pub stability_control: u8,
    pub auto_shift: u8,
    pub auto_clutch: u8,
    pub invulnerable: u8,
    pub opposite_lock: u8,
    pub steering_help: u8,
    pub braking_help: u8,
    pub spin_recovery: u8,
    pub auto_pit: u8,
    pub auto_lift: u8,
    pub auto_blip: u8,
    pub fuel_mult: u8,
    pub tire_mult: u8,
    pub mech_fail: u8,
    pub allow_pitcrew_push: u8,
    pub repeat_shifts: u8,
    pub hold_clutch: u8,
    pub auto_reverse: u8,
    pub alternate_neutral: u8,
    pub ai_control: u8,
    pub unused1: u8,
    pub unused2: u8,
    pub manual_shift_override_time: f32,
    pub auto_shift_override_time: f32,
    pub speed_sensitive_steering: f32,
    pub steer_ratio_speed: f32,
}

/// Impact magnitudes accumulated for one vehicle id
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct TrackedDamage {
    pub max_impact_magnitude: f64,
    pub accumulated_impact_magnitude: f64,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct VehScoringCapture {
    pub id: i32,
    pub place: u8,
    pub is_player: CBool,
    pub finish_status: i8,
}

/// Scoring state captured at the last session transition
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct SessionTransitionCapture {
    pub game_phase: u8,
    pub session: i32,
    pub num_scoring_vehicles: i32,
    pub scoring_vehicles: [VehScoringCapture; MAX_MAPPED_VEHICLES],
}

/// `$rFactor2SMMP_Extended$`
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct Extended {
    pub version_update_begin: u32,
    pub version_update_end: u32,
    /// Plugin version string, empty while the plugin is not running
    pub version: [u8; 12],
    pub is_64bit: CBool,
    pub physics: PhysicsOptions,
    /// Indexed by vehicle id modulo [`MAX_MAPPED_IDS`]
    pub tracked_damages: [TrackedDamage; MAX_MAPPED_IDS],
    pub in_realtime_fc: CBool,
    pub multimedia_thread_started: CBool,
    pub simulation_thread_started: CBool,
    pub session_started: CBool,
    pub ticks_session_started: i64,
    pub ticks_session_ended: i64,
    pub session_transition_capture: SessionTransitionCapture,
    pub displayed_message_update_capture: [u8; 128],
    pub direct_memory_access_enabled: CBool,
    pub ticks_status_message_updated: i64,
    pub status_message: [u8; 128],
    pub ticks_last_history_message_updated: i64,
    pub last_history_message: [u8; 128],
    pub current_pit_speed_limit: f32,
    pub scr_plugin_enabled: CBool,
    pub scr_plugin_double_file_type: i32,
    pub ticks_lsi_phase_message_updated: i64,
    pub lsi_phase_message: [u8; 96],
    pub ticks_lsi_pit_state_message_updated: i64,
    pub lsi_pit_state_message: [u8; 96],
    pub ticks_lsi_order_instruction_message_updated: i64,
    pub lsi_order_instruction_message: [u8; 96],
    pub ticks_lsi_rules_instruction_message_updated: i64,
    pub lsi_rules_instruction_message: [u8; 96],
    pub unsubscribed_buffers_mask: i32,
    pub hw_control_input_enabled: CBool,
    pub weather_control_input_enabled: CBool,
    pub rules_control_input_enabled: CBool,
}

shared_buffer!(Extended, "$rFactor2SMMP_Extended$");

impl Extended {
    /// Plugin version, e.g. `3.7.15.1`. Empty until the plugin has written the buffer.
    pub fn plugin_version(&self) -> String {
        decode_text(&self.version)
    }

    /// Damage tracked for a vehicle id.
    pub fn tracked_damage(&self, id: i32) -> TrackedDamage {
        self.tracked_damages[id.rem_euclid(MAX_MAPPED_IDS as i32) as usize]
    }

    pub fn status_message(&self) -> String {
        decode_text(&self.status_message)
    }

    pub fn last_history_message(&self) -> String {
        decode_text(&self.last_history_message)
    }
}
