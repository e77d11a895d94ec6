pub mod image_writer;
pub mod video_asset;
pub mod video_reader;
