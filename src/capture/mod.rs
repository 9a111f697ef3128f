pub mod backend;
pub mod service;
pub mod synthetic;
pub mod types;

pub use backend::{Acquirer, AnyAcquirer, CommandAcquirer, commit_part, discard_partial};
pub use service::{ServiceAcquirer, check_health};
pub use synthetic::{Framebuffer, SyntheticAcquirer, render_page};
pub use types::{CaptureError, CaptureRequest, CaptureResult, part_path};
