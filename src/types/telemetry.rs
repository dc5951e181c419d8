//! Telemetry buffer: per-vehicle physics in telemetry order

use super::{CBool, MAX_MAPPED_VEHICLES, Vec3, decode_text};

/// Per-wheel telemetry
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct Wheel {
    pub suspension_deflection: f64,
    pub ride_height: f64,
    pub susp_force: f64,
    pub brake_temp: f64,
    pub brake_pressure: f64,
    pub rotation: f64,
    pub lateral_patch_vel: f64,
    pub longitudinal_patch_vel: f64,
    pub lateral_ground_vel: f64,
    pub longitudinal_ground_vel: f64,
    pub camber: f64,
    pub lateral_force: f64,
    pub longitudinal_force: f64,
    pub tire_load: f64,
    pub grip_fract: f64,
    pub pressure: f64,
    pub temperature: [f64; 3],
    pub wear: f64,
    pub terrain_name: [u8; 16],
    pub surface_type: u8,
    pub flat: CBool,
    pub detached: CBool,
    pub static_undeflected_radius: u8,
    pub vertical_tire_deflection: f64,
    pub wheel_y_location: f64,
    pub toe: f64,
    pub tire_carcass_temperature: f64,
    pub tire_inner_layer_temperature: [f64; 3],
    pub expansion: [u8; 24],
}

/// Telemetry entry for one vehicle
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct VehicleTelemetry {
    /// Slot-independent vehicle id, shared with the scoring buffer
    pub id: i32,
    pub delta_time: f64,
    pub elapsed_time: f64,
    pub lap_number: i32,
    pub lap_start_et: f64,
    pub vehicle_name: [u8; 64],
    pub track_name: [u8; 64],
    pub pos: Vec3,
    pub local_vel: Vec3,
    pub local_accel: Vec3,
    pub ori: [Vec3; 3],
    pub local_rot: Vec3,
    pub local_rot_accel: Vec3,
    pub gear: i32,
    pub engine_rpm: f64,
    pub engine_water_temp: f64,
    pub engine_oil_temp: f64,
    pub clutch_rpm: f64,
    pub unfiltered_throttle: f64,
    pub unfiltered_brake: f64,
    pub unfiltered_steering: f64,
    pub unfiltered_clutch: f64,
    pub filtered_throttle: f64,
    pub filtered_brake: f64,
    pub filtered_steering: f64,
    pub filtered_clutch: f64,
    pub steering_shaft_torque: f64,
    pub front_3rd_deflection: f64,
    pub rear_3rd_deflection: f64,
    pub front_wing_height: f64,
    pub front_ride_height: f64,
    pub rear_ride_height: f64,
    pub drag: f64,
    pub front_downforce: f64,
    pub rear_downforce: f64,
    pub fuel: f64,
    pub engine_max_rpm: f64,
    pub scheduled_stops: u8,
    pub overheating: CBool,
    pub detached: CBool,
    pub headlights: CBool,
    pub dent_severity: [u8; 8],
    pub last_impact_et: f64,
    pub last_impact_magnitude: f64,
    pub last_impact_pos: Vec3,
    pub engine_torque: f64,
    pub current_sector: i32,
    pub speed_limiter: u8,
    pub max_gears: u8,
    pub front_tire_compound_index: u8,
    pub rear_tire_compound_index: u8,
    pub fuel_capacity: f64,
    pub front_flap_activated: u8,
    pub rear_flap_activated: u8,
    pub rear_flap_legal_status: u8,
    pub ignition_starter: u8,
    pub front_tire_compound_name: [u8; 18],
    pub rear_tire_compound_name: [u8; 18],
    pub speed_limiter_available: u8,
    pub anti_stall_activated: u8,
    pub unused: [u8; 2],
    pub visual_steering_wheel_range: f32,
    pub rear_brake_bias: f64,
    pub turbo_boost_pressure: f64,
    pub physics_to_graphics_offset: [f32; 3],
    pub physical_steering_wheel_range: f32,
    pub delta_best: f64,
    pub battery_charge_fraction: f64,
    pub electric_boost_motor_torque: f64,
    pub electric_boost_motor_rpm: f64,
    pub electric_boost_motor_temperature: f64,
    pub electric_boost_water_temperature: f64,
    pub electric_boost_motor_state: u8,
    pub expansion: [u8; 103],
    pub wheels: [Wheel; 4],
}

impl VehicleTelemetry {
    pub fn vehicle_name(&self) -> String {
        decode_text(&self.vehicle_name)
    }

    pub fn track_name(&self) -> String {
        decode_text(&self.track_name)
    }
}

/// `$rFactor2SMMP_Telemetry$`
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct Telemetry {
    pub version_update_begin: u32,
    pub version_update_end: u32,
    pub bytes_updated_hint: i32,
    /// Number of leading `vehicles` entries written this frame
    pub num_vehicles: i32,
    pub vehicles: [VehicleTelemetry; MAX_MAPPED_VEHICLES],
}

shared_buffer!(Telemetry, "$rFactor2SMMP_Telemetry$");

impl Telemetry {
    /// Entries written this frame, never more than the array capacity.
    pub fn active_vehicles(&self) -> &[VehicleTelemetry] {
        let count = usize::try_from(self.num_vehicles).unwrap_or(0).min(MAX_MAPPED_VEHICLES);
        &self.vehicles[..count]
    }

    /// Vehicle in telemetry slot `index`, if the slot exists.
    pub fn vehicle(&self, index: usize) -> Option<&VehicleTelemetry> {
        self.vehicles.get(index)
    }
}
