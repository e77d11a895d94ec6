pub mod plate_reader;
pub mod plate_response;
