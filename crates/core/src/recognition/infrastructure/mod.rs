pub mod plate_recognizer_client;
