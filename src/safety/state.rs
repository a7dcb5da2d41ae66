/// Vehicle state shared with the other safety checks.
///
/// Only a safety model's receive hook updates it; everybody else gets read access through the getters.
///
/// ```compile_fail
/// let mut state = automotive_safety::safety::VehicleState::default();
/// state.set_brake_pressed(true);
/// ```
#[derive(Debug, Default, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleState {
    brake_pressed: bool,
    gas_pressed: bool,
    vehicle_moving: bool,
    vehicle_speed: f32,
    cruise_engaged: bool,
}

impl VehicleState {
    pub fn brake_pressed(&self) -> bool {
        self.brake_pressed
    }

    pub fn gas_pressed(&self) -> bool {
        self.gas_pressed
    }

    pub fn vehicle_moving(&self) -> bool {
        self.vehicle_moving
    }

    /// Last reported speed in physical units
    pub fn vehicle_speed(&self) -> f32 {
        self.vehicle_speed
    }

    pub fn cruise_engaged(&self) -> bool {
        self.cruise_engaged
    }

    pub(in crate::safety) fn set_brake_pressed(&mut self, pressed: bool) {
        self.brake_pressed = pressed;
    }

    pub(in crate::safety) fn set_gas_pressed(&mut self, pressed: bool) {
        self.gas_pressed = pressed;
    }

    pub(in crate::safety) fn set_vehicle_moving(&mut self, moving: bool) {
        self.vehicle_moving = moving;
    }

    pub(in crate::safety) fn set_vehicle_speed(&mut self, speed: f32) {
        self.vehicle_speed = speed;
    }

    pub(in crate::safety) fn set_cruise_engaged(&mut self, engaged: bool) {
        self.cruise_engaged = engaged;
    }
}
