use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use wms_globe::body::WmsBody;
use wms_globe::config::{Properties, SettingsLoader};
use wms_globe::domain::PixelBuffer;
use wms_globe::error::GlobeError;
use wms_globe::fetch::FetchPipeline;
use wms_globe::interval::{parse_date, parse_duration, parse_time_spec};
use wms_globe::output::{
    DataSetEntry, DataSetsResult, FrameRecord, IntervalsResult, JsonOutput, OutputMode,
    PlayResult,
};
use wms_globe::selector::{Primary, TextureSink, TextureSlot};
use wms_globe::timeline::timeline_events;

#[derive(Parser)]
#[command(name = "wms-globe")]
#[command(about = "Time-varying WMS imagery for planetary bodies")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Parse a WMS time dimension and show its intervals")]
    Intervals(IntervalsArgs),
    #[command(about = "List the data sets of every configured body")]
    DataSets(SettingsArgs),
    #[command(about = "Run the tick loop over a time range without rendering")]
    Play(PlayArgs),
}

#[derive(Args)]
struct IntervalsArgs {
    spec: String,
}

#[derive(Args)]
struct SettingsArgs {
    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct PlayArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    body: String,

    #[arg(long)]
    data_set: Option<String>,

    #[arg(long)]
    start: String,

    #[arg(long)]
    end: String,

    #[arg(long, default_value = "PT1H")]
    step: String,

    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    #[arg(long)]
    no_interpolation: bool,

    #[arg(long)]
    timespan: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<GlobeError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GlobeError) -> u8 {
    match error {
        GlobeError::MissingConfig
        | GlobeError::UnknownBody(_)
        | GlobeError::UnknownDataSet(_) => 2,
        GlobeError::FetchHttp(_) | GlobeError::FetchStatus { .. } => 3,
        err if err.is_parse() => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Intervals(args) => run_intervals(args, output_mode),
        Commands::DataSets(args) => run_data_sets(args, output_mode),
        Commands::Play(args) => run_play(args, output_mode),
    }
}

fn run_intervals(args: IntervalsArgs, output_mode: OutputMode) -> miette::Result<()> {
    let intervals = parse_time_spec(&args.spec)?;
    let result = IntervalsResult {
        timeline: timeline_events(&intervals, "", ""),
        spec: args.spec,
        intervals,
    };
    match output_mode {
        OutputMode::Json => JsonOutput::print_intervals(&result).into_diagnostic(),
        OutputMode::Human => {
            for interval in &result.intervals {
                println!(
                    "{} .. {}  every {}s  ({} buckets)",
                    interval.start.to_rfc3339(),
                    interval.end.to_rfc3339(),
                    interval.duration,
                    interval.format
                );
            }
            Ok(())
        }
    }
}

fn run_data_sets(args: SettingsArgs, output_mode: OutputMode) -> miette::Result<()> {
    let settings = SettingsLoader::resolve(args.config.as_deref())?;
    let data_sets = settings
        .bodies
        .iter()
        .flat_map(|(body, body_settings)| {
            body_settings.wms.iter().map(move |wms| DataSetEntry {
                body: body.clone(),
                name: wms.name.clone(),
                copyright: wms.copyright.clone(),
                layers: wms.layers.clone(),
                time: wms.time.clone(),
                prefetch: wms.prefetch(),
            })
        })
        .collect::<Vec<_>>();
    let result = DataSetsResult { data_sets };
    match output_mode {
        OutputMode::Json => JsonOutput::print_data_sets(&result).into_diagnostic(),
        OutputMode::Human => {
            for entry in &result.data_sets {
                let time = entry.time.as_deref().unwrap_or("static");
                println!("{} / {}  [{}]  {}", entry.body, entry.name, entry.layers, time);
                if !entry.copyright.is_empty() {
                    println!("    (c) {}", entry.copyright);
                }
            }
            Ok(())
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    uploads: Vec<TextureSlot>,
}

impl TextureSink for RecordingSink {
    fn upload(&mut self, slot: TextureSlot, pixels: &PixelBuffer, _generate_mipmaps: bool) {
        tracing::debug!(?slot, width = pixels.width, height = pixels.height, "texture upload");
        self.uploads.push(slot);
    }
}

fn run_play(args: PlayArgs, output_mode: OutputMode) -> miette::Result<()> {
    let settings = SettingsLoader::resolve(args.config.as_deref())?;
    let body_settings = settings.body(&args.body)?.clone();
    let pipeline = FetchPipeline::with_defaults(settings.tile_store()?)?;
    tracing::debug!(
        workers = pipeline.workers(),
        cache_root = %pipeline.store().cache_root(),
        "fetch pipeline ready"
    );
    let mut body = WmsBody::new(args.body.clone(), body_settings, pipeline)?;
    if let Some(name) = &args.data_set {
        body.activate_by_name(name)?;
    }

    let start = parse_date(&args.start)?;
    let end = parse_date(&args.end)?;
    let step = match parse_duration(&args.step)? {
        seconds if seconds > 0 => chrono::TimeDelta::try_seconds(seconds),
        _ => None,
    }
    .ok_or_else(|| GlobeError::MalformedDuration(args.step.clone()))?;
    let properties = Properties {
        enable_interpolation: !args.no_interpolation,
        enable_timespan: args.timespan,
    };

    let mut frames = Vec::new();
    let mut time = start;
    while time <= end {
        let mut sink = RecordingSink::default();
        let frame = body.tick(time, properties, &mut sink);
        if matches!(output_mode, OutputMode::Human) {
            let primary = match &frame.primary {
                Primary::Background => "background".to_string(),
                Primary::Static => "static".to_string(),
                Primary::Tile(id) => id.to_string(),
            };
            let secondary = frame
                .secondary
                .as_ref()
                .map(|id| format!(" -> {id} (fade {:.2})", frame.fade))
                .unwrap_or_default();
            println!("{}  {primary}{secondary}", time.to_rfc3339());
        }
        frames.push(FrameRecord {
            time: time.to_rfc3339(),
            frame,
            uploads: sink.uploads,
            cache: body.cache_stats(),
        });
        let Some(next) = time.checked_add_signed(step) else {
            break;
        };
        time = next;
        thread::sleep(Duration::from_millis(args.frame_ms));
    }

    let result = PlayResult {
        body: body.name().to_string(),
        data_set: body.active().name.clone(),
        request: body.request().to_string(),
        frames,
        cache: body.cache_stats(),
    };
    match output_mode {
        OutputMode::Json => JsonOutput::print_play(&result).into_diagnostic(),
        OutputMode::Human => {
            let stats = result.cache;
            println!(
                "cache: {} ready, {} decoding, {} downloading",
                stats.ready, stats.decoding, stats.downloading
            );
            Ok(())
        }
    }
}
