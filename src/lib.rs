// Aeon - Autonomous longevity research companion
// Library exports

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod persistence;
pub mod progression;
pub mod scheduling;

pub use controller::AutonomousController;
