pub const TRACKING_SERVICE: &str = "Eden AI";
pub const TRACKING_ENDPOINT: &str = "https://api.edenai.run/v2/video/person_tracking_async";
pub const TRACKING_PROVIDER: &str = "google";

pub const PLATE_SERVICE: &str = "Plate Recognizer";
pub const PLATE_ENDPOINT: &str = "https://api.platerecognizer.com/v1/plate-reader/";
pub const DEFAULT_REGIONS: &[&str] = &["in"];

pub const OUTPUT_CSV_FILE: &str = "detected_faces_and_plates.csv";
pub const TRACKING_RESPONSE_FILE: &str = "faces.json";
pub const PLATE_RESPONSE_FILE: &str = "plates.json";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_JPEG_QUALITY: u8 = 95;
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

/// File name of the extracted image for a given frame index.
pub fn frame_file_name(index: usize) -> String {
    format!("frame{index}.jpg")
}
