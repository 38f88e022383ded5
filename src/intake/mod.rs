pub mod adapter;
pub mod grid_reader;
pub mod upload;

pub use adapter::{DEFAULT_MAX_PAYLOAD_BYTES, InputAdapter, IntakeConfig};
pub use grid_reader::GridData;
pub use upload::Upload;
