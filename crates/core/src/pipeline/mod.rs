pub mod analyze_video_use_case;
pub mod frame_extractor;
pub mod pipeline_logger;
pub mod response_audit;
pub mod run_workspace;
