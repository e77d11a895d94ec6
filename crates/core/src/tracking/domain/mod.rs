pub mod person_tracker;
pub mod tracking_response;
