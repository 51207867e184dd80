pub mod controller;
pub mod error;
pub mod status;

pub use controller::LoadController;
pub use error::ControllerError;
pub use status::LoadStatus;
