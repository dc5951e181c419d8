//! Scoring buffer: session info plus one entry per vehicle in scoring order

use super::{CBool, MAX_MAPPED_VEHICLES, Vec3, decode_text};

/// Session-wide scoring information
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct ScoringInfo {
    pub track_name: [u8; 64],
    pub session: i32,
    pub current_et: f64,
    pub end_et: f64,
    pub max_laps: i32,
    pub lap_dist: f64,
    pub pointer1: [u8; 8],
    pub num_vehicles: i32,
    pub game_phase: u8,
    pub yellow_flag_state: i8,
    pub sector_flag: [i8; 3],
    pub start_light: u8,
    pub num_red_lights: u8,
    pub in_realtime: CBool,
    pub player_name: [u8; 32],
    pub plr_file_name: [u8; 64],
    pub dark_cloud: f64,
    pub raining: f64,
    pub ambient_temp: f64,
    pub track_temp: f64,
    pub wind: Vec3,
    pub min_path_wetness: f64,
    pub max_path_wetness: f64,
    pub game_mode: u8,
    pub is_password_protected: CBool,
    pub server_port: u16,
    pub server_public_ip: u32,
    pub max_players: i32,
    pub server_name: [u8; 32],
    pub start_et: f32,
    pub avg_path_wetness: f64,
    pub expansion: [u8; 200],
    pub pointer2: [u8; 8],
}

impl ScoringInfo {
    pub fn track_name(&self) -> String {
        decode_text(&self.track_name)
    }

    pub fn player_name(&self) -> String {
        decode_text(&self.player_name)
    }

    pub fn server_name(&self) -> String {
        decode_text(&self.server_name)
    }
}

/// Scoring entry for one vehicle
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct VehicleScoring {
    /// Slot-independent vehicle id, shared with the telemetry buffer
    pub id: i32,
    pub driver_name: [u8; 32],
    pub vehicle_name: [u8; 64],
    pub total_laps: i16,
    pub sector: i8,
    pub finish_status: i8,
    pub lap_dist: f64,
    pub path_lateral: f64,
    pub track_edge: f64,
    pub best_sector1: f64,
    pub best_sector2: f64,
    pub best_lap_time: f64,
    pub last_sector1: f64,
    pub last_sector2: f64,
    pub last_lap_time: f64,
    pub cur_sector1: f64,
    pub cur_sector2: f64,
    pub num_pitstops: i16,
    pub num_penalties: i16,
    /// Set on the vehicle driven on this machine
    pub is_player: CBool,
    pub control: i8,
    pub in_pits: CBool,
    pub place: u8,
    pub vehicle_class: [u8; 32],
    pub time_behind_next: f64,
    pub laps_behind_next: i32,
    pub time_behind_leader: f64,
    pub laps_behind_leader: i32,
    pub lap_start_et: f64,
    pub pos: Vec3,
    pub local_vel: Vec3,
    pub local_accel: Vec3,
    pub ori: [Vec3; 3],
    pub local_rot: Vec3,
    pub local_rot_accel: Vec3,
    pub headlights: u8,
    pub pit_state: u8,
    pub server_scored: u8,
    pub individual_phase: u8,
    pub qualification: i32,
    pub time_into_lap: f64,
    pub estimated_lap_time: f64,
    pub pit_group: [u8; 24],
    pub flag: u8,
    pub under_yellow: CBool,
    pub count_lap_flag: u8,
    pub in_garage_stall: CBool,
    pub upgrade_pack: [u8; 16],
    pub pit_lap_dist: f32,
    pub best_lap_sector1: f32,
    pub best_lap_sector2: f32,
    pub expansion: [u8; 48],
}

impl VehicleScoring {
    pub fn driver_name(&self) -> String {
        decode_text(&self.driver_name)
    }

    pub fn vehicle_name(&self) -> String {
        decode_text(&self.vehicle_name)
    }

    pub fn vehicle_class(&self) -> String {
        decode_text(&self.vehicle_class)
    }
}

/// `$rFactor2SMMP_Scoring$`
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct Scoring {
    pub version_update_begin: u32,
    pub version_update_end: u32,
    pub bytes_updated_hint: i32,
    pub scoring_info: ScoringInfo,
    pub vehicles: [VehicleScoring; MAX_MAPPED_VEHICLES],
}

shared_buffer!(Scoring, "$rFactor2SMMP_Scoring$");

impl Scoring {
    /// Vehicle in scoring slot `index`, if the slot exists.
    pub fn vehicle(&self, index: usize) -> Option<&VehicleScoring> {
        self.vehicles.get(index)
    }
}
