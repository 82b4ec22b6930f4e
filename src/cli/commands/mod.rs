pub mod cancel;
pub mod status;
pub mod submit;
pub mod wait;

pub use cancel::CancelCommand;
pub use status::StatusCommand;
pub use submit::SubmitCommand;
pub use wait::WaitCommand;
