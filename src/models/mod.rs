pub mod registration;
pub mod report;
pub mod upload;

pub use registration::{RegistrationRequest, RegistrationResponse};
pub use report::{Coaching, Pace, Report, VocalVariety};
pub use upload::UploadAck;
