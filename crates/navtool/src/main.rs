// navtool - offline tools for chunk waypoint data
// - inspect: chunks and waypoint sets of a space description
// - query: nearest waypoint to a world point
// - bind-report: bind every chunk and list the resulting connections
// - pack: convert navPolySet sections to a binary navmesh

use std::path::{Path, PathBuf};

use anyhow::Context;
use chunknav_shared::config::get_config;
use chunknav_shared::log::{initialize_logging, map_log_level};
use chunknav_shared::{CONFIG_ENV_PREFIX, DEFAULT_CONFIG};
use chunknav_waypoint::{ChunkSpace, DEFAULT_GIRTH, DataSection, NavigatorConfig};
use clap::{Args, Parser, Subcommand};
use glam::Vec3;

mod pack;
mod report;

#[derive(Parser, Debug)]
#[command(name = "navtool")]
#[command(about = "Chunk waypoint navigation tools")]
#[command(version)]
struct Cli {
    /// Console log level override (0=Minimum, 1=Error, 2=Detail, 3=Full/Debug, 4=Trace)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<i32>,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise the chunks and waypoint sets of a space
    Inspect(SpaceArgs),
    /// Find the waypoint containing or nearest to a world point
    Query(QueryArgs),
    /// Bind every chunk and report connections and unbound edges
    BindReport(BindReportArgs),
    /// Pack the navPolySet sections of a chunk into a navmesh file
    Pack(PackArgs),
}

#[derive(Args, Debug)]
struct SpaceArgs {
    /// Space description (JSON data section)
    space: PathBuf,

    /// Directory navmesh resources are relative to (default: the space file's directory)
    #[arg(long = "resources")]
    resources: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long = "json")]
    json: bool,
}

fn parse_point(input: &str) -> Result<Vec3, String> {
    let parts: Vec<f32> = input
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|_| format!("Invalid coordinate '{}'", p)))
        .collect::<Result<_, _>>()?;
    match parts[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err("Point must be X,Y,Z".to_string()),
    }
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    space: SpaceArgs,

    /// World point (format: X,Y,Z)
    #[arg(long = "point", value_parser = parse_point, allow_hyphen_values = true)]
    point: Vec3,

    /// Girth of the waypoint sets to search
    #[arg(long = "girth", default_value_t = DEFAULT_GIRTH)]
    girth: f32,

    /// Match on X-Z only, preferring the nearest height layer
    #[arg(long = "ignore-height")]
    ignore_height: bool,

    /// Search only this chunk (by identifier) instead of every chunk holding the point
    #[arg(long = "chunk")]
    chunk: Option<String>,
}

#[derive(Args, Debug)]
struct BindReportArgs {
    #[command(flatten)]
    space: SpaceArgs,

    /// Chunks to unload after binding, by identifier
    #[arg(long = "unload")]
    unload: Vec<String>,
}

#[derive(Args, Debug)]
struct PackArgs {
    /// Chunk description holding navPolySet sections (JSON data section)
    input: PathBuf,

    /// Navmesh file to write
    output: PathBuf,
}

fn init_logging(log_level: Option<i32>) {
    let (log_dir, configured_level) = {
        let config = get_config().lock();
        let dir = config.get_string_default("LogsDir", "");
        (
            if dir.is_empty() { None } else { Some(dir) },
            config.get_int_default("LogLevel", 2),
        )
    };
    let console_level = map_log_level(log_level.unwrap_or(configured_level));
    initialize_logging(log_dir.as_deref(), console_level, Some("navtool.log"));
}

/// Read a space description into a fresh space. Chunks are loaded, not bound.
fn load_space(args: &SpaceArgs) -> anyhow::Result<ChunkSpace> {
    let section = DataSection::from_file(&args.space)
        .with_context(|| format!("reading space '{}'", args.space.display()))?;

    let config = NavigatorConfig::from_config(&get_config().lock());
    let mut space = ChunkSpace::new(config);
    let root = match &args.resources {
        Some(dir) => dir.clone(),
        None => args
            .space
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    space.set_resource_root(root);

    let chunks = space.load_space(&section)?;
    tracing::info!(
        "Space '{}': {} chunks, girth grids {}",
        args.space.display(),
        chunks.len(),
        if space.config().use_girth_grids { "on" } else { "off" }
    );
    Ok(space)
}

fn bind_all(space: &mut ChunkSpace) -> usize {
    let ids: Vec<_> = space.chunks().map(|(id, _)| id).collect();
    ids.into_iter().map(|id| space.bind_chunk(id)).sum()
}

fn print<T: serde::Serialize + std::fmt::Display>(value: &T, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", value);
    }
    Ok(())
}

fn run_inspect(args: SpaceArgs) -> anyhow::Result<()> {
    let space = load_space(&args)?;
    print(&report::SpaceReport::new(&space), args.json)
}

fn run_query(args: QueryArgs) -> anyhow::Result<()> {
    let mut space = load_space(&args.space)?;
    bind_all(&mut space);

    let found = match &args.chunk {
        Some(name) => {
            let id = space
                .chunk_by_name(name)
                .ok_or_else(|| anyhow::anyhow!("No chunk '{}' in the space", name))?;
            let local = space
                .chunk(id)
                .map(|c| c.transform_inverse.transform_point3(args.point))
                .unwrap_or(args.point);
            space
                .find(id, local, args.girth, args.ignore_height)
                .map(|r| (id, r))
        }
        None => space.find_world(args.point, args.girth, args.ignore_height),
    };
    let result = report::QueryReport::new(&space, args.point, found);
    if found.is_none() {
        tracing::warn!("Query: no waypoint of girth {} near {}", args.girth, args.point);
    }
    print(&result, args.space.json)
}

fn run_bind_report(args: BindReportArgs) -> anyhow::Result<()> {
    let mut space = load_space(&args.space)?;
    let bound = bind_all(&mut space);
    tracing::info!("BindReport: connected {} edges", bound);

    for name in &args.unload {
        let id = space
            .chunk_by_name(name)
            .ok_or_else(|| anyhow::anyhow!("No chunk '{}' in the space", name))?;
        space.unload_chunk(id);
        tracing::info!("BindReport: unloaded '{}'", name);
    }

    print(&report::BindReport::new(&space), args.space.json)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // a missing config file just means defaults
    let config_loaded = get_config().lock().set_source(&cli.config, CONFIG_ENV_PREFIX);
    init_logging(cli.log_level);
    if config_loaded {
        tracing::info!("Using configuration file: {}", cli.config);
    } else {
        tracing::debug!("No configuration file '{}', using defaults", cli.config);
    }

    match cli.command {
        Command::Inspect(args) => run_inspect(args),
        Command::Query(args) => run_query(args),
        Command::BindReport(args) => run_bind_report(args),
        Command::Pack(args) => pack::run_pack(&args.input, &args.output),
    }
}
