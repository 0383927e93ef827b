use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::{Local, Timelike};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use transit_router::domain::{Mode, ModeSet, ServiceTime, StopId};
use transit_router::planner::{Criterion, Router, RouterConfig, SearchRequest, SearchResult};
use transit_router::realtime::FileSource;
use transit_router::timetable::{NetworkHandle, TimetableFile};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Plan journeys over a timetable file.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// timetable JSON with stops, connections and optional transfers
    timetable: PathBuf,
    /// origin stop id
    #[arg(value_parser = StopId::parse)]
    from: StopId,
    /// destination stop id
    #[arg(value_parser = StopId::parse)]
    to: StopId,
    /// departure time as HH:MM:SS; defaults to now
    #[arg(value_parser = ServiceTime::parse)]
    departure: Option<ServiceTime>,
    /// router settings (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// delay snapshot to overlay (JSON), re-read on every plan
    #[arg(long)]
    realtime: Option<PathBuf>,
    /// arrival, duration, transfers or walking
    #[arg(long, default_value_t = Criterion::Arrival)]
    optimize: Criterion,
    /// comma-separated modes, e.g. rail,tram,walk; all when omitted
    #[arg(long, value_delimiter = ',')]
    modes: Vec<Mode>,
    /// drop journeys beaten on every criterion
    #[arg(long)]
    pareto: bool,
    /// re-plan every this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    watch: Option<u64>,
}

impl Args {
    fn mode_set(&self) -> ModeSet {
        if self.modes.is_empty() {
            ModeSet::all()
        } else {
            self.modes.iter().copied().collect()
        }
    }
}

fn now() -> ServiceTime {
    ServiceTime::from_secs(Local::now().time().num_seconds_from_midnight())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), BoxError> {
    let config = match &args.config {
        Some(path) => RouterConfig::from_json(&tokio::fs::read_to_string(path).await?)?,
        None => RouterConfig::default(),
    };

    let timetable = TimetableFile::from_json(&tokio::fs::read_to_string(&args.timetable).await?)?;
    let network = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || timetable.into_network(&config)).await??
    };
    info!(
        stops = network.store.stop_count(),
        connections = network.store.len(),
        trips = network.store.trip_count(),
        "Timetable loaded"
    );

    let router = Router::new(NetworkHandle::new(network), config);
    let source = args.realtime.clone().map(FileSource::new);
    let modes = args.mode_set();

    loop {
        let departure = args.departure.unwrap_or_else(now);
        let request = SearchRequest::new(args.from.clone(), args.to.clone(), departure)
            .with_modes(modes)
            .optimize_for(args.optimize)
            .pareto(args.pareto);

        let result = plan(&router, request, source.clone()).await?;
        print_result(&router, &result);

        let Some(secs) = args.watch else {
            break;
        };
        tokio::time::sleep(Duration::from_secs(secs)).await;
        println!();
    }

    Ok(())
}

/// Run one search off the async workers.
async fn plan(
    router: &Router,
    request: SearchRequest,
    source: Option<FileSource>,
) -> Result<SearchResult, BoxError> {
    let router = router.clone();
    let result = tokio::task::spawn_blocking(move || match &source {
        Some(source) => router.find_journeys_live(&request, source),
        None => router.find_journeys(&request, None),
    })
    .await??;
    Ok(result)
}

fn print_result(router: &Router, result: &SearchResult) {
    let network = router.network();
    if result.journeys.is_empty() {
        println!("No journeys found.");
    }
    for (i, journey) in result.journeys.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!(
            "{}",
            journey.format_summary(|id| network.store.stop_name(id))
        );
    }
    if !result.complete {
        println!("(search incomplete)");
    }
}
