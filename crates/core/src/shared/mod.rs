pub mod constants;
pub mod error;
pub mod frame;
pub mod frame_file;
pub mod http;
pub mod settings;
pub mod video_metadata;
