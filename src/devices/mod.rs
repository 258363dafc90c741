//! Traffic devices grouped by family.
//!
//! A [`DeviceFactory`] hands out sensors and actuators that always belong to
//! the factory's [`DeviceFamily`], so a control loop built on one factory can
//! never mix urban and highway hardware.

pub mod actuator;
pub mod factory;
pub mod family;
pub mod sensor;
pub mod source;

pub use actuator::{Actuator, ControlAction, ControlResult};
pub use factory::DeviceFactory;
pub use family::DeviceFamily;
pub use sensor::Sensor;
pub use source::{FixedSource, IdleSource, ReadingSource, SimulatedSource};
