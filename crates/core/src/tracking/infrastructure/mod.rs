pub mod eden_ai_tracker;
