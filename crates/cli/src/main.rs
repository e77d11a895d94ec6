use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;

use plate_scan_core::aggregation::result_table::FillMode;
use plate_scan_core::pipeline::analyze_video_use_case::{AnalysisReport, AnalyzeVideoUseCase};
use plate_scan_core::pipeline::frame_extractor::FrameExtractor;
use plate_scan_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use plate_scan_core::pipeline::response_audit::ResponseAudit;
use plate_scan_core::pipeline::run_workspace::RunWorkspace;
use plate_scan_core::recognition::infrastructure::plate_recognizer_client::PlateRecognizerClient;
use plate_scan_core::shared::constants::DEFAULT_VIDEO_EXTENSION;
use plate_scan_core::shared::http::build_client;
use plate_scan_core::shared::settings::AnalysisSettings;
use plate_scan_core::tracking::domain::person_tracker::PersonTracker;
use plate_scan_core::tracking::infrastructure::eden_ai_tracker::EdenAiTracker;
use plate_scan_core::video::domain::video_asset::VideoAsset;
use plate_scan_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use plate_scan_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Number plate recognition and person tracking for videos.
#[derive(Parser)]
#[command(name = "plate-scan")]
struct Cli {
    /// Input video file, or `-` to read the video from stdin.
    input: PathBuf,

    /// Output CSV file (defaults to detected_faces_and_plates.csv in the
    /// current directory).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Plate Recognizer API token.
    #[arg(long, env = "PLATE_RECOGNIZER_API_KEY", hide_env_values = true)]
    plate_api_key: Option<String>,

    /// Eden AI API key for person tracking.
    #[arg(long, env = "EDEN_AI_API_KEY", hide_env_values = true)]
    tracking_api_key: Option<String>,

    /// Region hints for plate recognition (comma-separated, e.g. in,us-ca).
    #[arg(long, value_delimiter = ',')]
    regions: Option<Vec<String>>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Directory under which per-run frame directories are created.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Keep extracted frames after the run.
    #[arg(long)]
    keep_frames: bool,

    /// Write the last raw API responses (faces.json, plates.json) here.
    /// Saved with --save-settings like the other options.
    #[arg(long)]
    audit_dir: Option<PathBuf>,

    /// Pad the shorter column with empty cells instead of repeating its
    /// last value.
    #[arg(long)]
    no_fill: bool,

    /// Skip the person-tracking upload.
    #[arg(long)]
    skip_tracking: bool,

    /// Settings file to use instead of the platform default.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Persist the effective settings before running.
    #[arg(long)]
    save_settings: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut settings = match &cli.settings {
        Some(path) => AnalysisSettings::load_from(path)?,
        None => AnalysisSettings::load(),
    };
    apply_overrides(&mut settings, &cli);
    settings.validate()?;

    if cli.save_settings {
        let path = cli
            .settings
            .clone()
            .or_else(AnalysisSettings::config_path)
            .ok_or("Could not determine settings path")?;
        settings.save_to(&path)?;
        log::info!("Settings saved to {}", path.display());
    }

    let video = open_video(&cli.input)?;
    let client = build_client(Duration::from_secs(settings.timeout_secs))?;

    let tracker: Option<Box<dyn PersonTracker>> = cli
        .tracking_api_key
        .clone()
        .filter(|_| !cli.skip_tracking)
        .map(|key| {
            Box::new(EdenAiTracker::new(client.clone(), key)) as Box<dyn PersonTracker>
        });
    let plate_key = cli.plate_api_key.clone().unwrap_or_default();
    let plate_reader = Box::new(PlateRecognizerClient::new(
        client,
        plate_key,
        settings.regions.clone(),
    ));
    let extractor = FrameExtractor::new(
        Box::new(FfmpegReader::new()),
        Box::new(ImageFileWriter::new()),
    );

    let workspace = RunWorkspace::create(&settings.work_root(), settings.keep_frames)?;
    let progress: Box<dyn Fn(usize, usize) -> bool + Send> = Box::new(|current, total| {
        if total > 0 {
            eprint!("\rAnalyzing frame {current}/{total}");
        } else {
            eprint!("\rAnalyzing frame {current}");
        }
        true
    });

    let mut use_case = AnalyzeVideoUseCase::new(
        extractor,
        tracker,
        plate_reader,
        Box::new(StdoutPipelineLogger::default()),
    )
    .with_fill_mode(settings.fill_mode)
    .with_progress(progress);
    if let Some(dir) = &settings.audit_dir {
        use_case = use_case.with_audit(ResponseAudit::new(dir.clone()));
    }

    let report = use_case.execute(&video, &workspace.frames_dir())?;
    eprintln!();
    if workspace.is_kept() {
        log::info!("Frames kept in {}", workspace.frames_dir().display());
    }

    let written = write_report(&report, cli.output.as_deref())?;
    log::info!(
        "Wrote {} rows ({} plates, {} tracking ids) to {}",
        report.table.len(),
        report.plates.len(),
        report.tracking_ids.len(),
        written.display()
    );
    if !report.failures.is_empty() {
        eprintln!(
            "{} of {} remote calls failed; results are partial",
            report.failures.len(),
            report.plate_requests + usize::from(!cli.skip_tracking)
        );
    }
    Ok(())
}

fn is_stdin(input: &Path) -> bool {
    input == Path::new("-")
}

fn open_video(input: &Path) -> Result<VideoAsset, Box<dyn std::error::Error>> {
    if is_stdin(input) {
        let mut stdin = std::io::stdin().lock();
        let video = VideoAsset::ingest_reader(&mut stdin, DEFAULT_VIDEO_EXTENSION)?;
        log::info!("Buffered stdin video at {}", video.path().display());
        return Ok(video);
    }
    Ok(VideoAsset::from_path(input)?)
}

fn write_report(
    report: &AnalysisReport,
    output: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let export = report.export();
    match output {
        Some(path) => {
            export.write_file(path)?;
            Ok(path.to_path_buf())
        }
        None => Ok(export.write_to(Path::new("."))?),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !is_stdin(&cli.input) && !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.plate_api_key.as_deref().map_or(true, str::is_empty) {
        return Err(
            "A Plate Recognizer API key is required \
             (--plate-api-key or PLATE_RECOGNIZER_API_KEY)"
                .into(),
        );
    }
    if !cli.skip_tracking && cli.tracking_api_key.as_deref().map_or(true, str::is_empty) {
        return Err(
            "An Eden AI API key is required \
             (--tracking-api-key or EDEN_AI_API_KEY), or pass --skip-tracking"
                .into(),
        );
    }
    if cli.timeout == Some(0) {
        return Err("Timeout must be at least 1 second".into());
    }
    if let Some(regions) = &cli.regions {
        if regions.is_empty() || regions.iter().any(|r| r.trim().is_empty()) {
            return Err("Regions must be a comma-separated list of region codes".into());
        }
    }
    Ok(())
}

fn apply_overrides(settings: &mut AnalysisSettings, cli: &Cli) {
    if let Some(regions) = &cli.regions {
        settings.regions = regions.iter().map(|r| r.trim().to_string()).collect();
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout_secs = timeout;
    }
    if let Some(dir) = &cli.work_dir {
        settings.work_root = Some(dir.clone());
    }
    if cli.keep_frames {
        settings.keep_frames = true;
    }
    if cli.no_fill {
        settings.fill_mode = FillMode::Independent;
    }
    if let Some(dir) = &cli.audit_dir {
        settings.audit_dir = Some(dir.clone());
    }
}
