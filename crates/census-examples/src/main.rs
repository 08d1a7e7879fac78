use facet::Facet;
use figue as args;

mod scenarios;

type AnyResult<T> = Result<T, String>;

const DEFAULT_COUNT: usize = 8;
const DEFAULT_THREADS: usize = 4;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    #[facet(args::named, default)]
    json: bool,
    #[facet(args::named, default)]
    count: Option<u32>,
    #[facet(args::named, default)]
    threads: Option<u32>,
    #[facet(args::subcommand)]
    command: ScenarioKind,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum ScenarioKind {
    RegistrationOrder,
    Sort,
    RemoveDuringTraversal,
    Churn,
    LeakReport,
}

pub(crate) struct Config {
    pub(crate) json: bool,
    pub(crate) count: usize,
    pub(crate) threads: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> AnyResult<()> {
    let cli = parse_cli()?;
    let cfg = config_from_cli(&cli)?;

    match cli.command {
        ScenarioKind::RegistrationOrder => scenarios::registration_order::run(&cfg),
        ScenarioKind::Sort => scenarios::sort::run(&cfg),
        ScenarioKind::RemoveDuringTraversal => scenarios::remove_during_traversal::run(&cfg),
        ScenarioKind::Churn => scenarios::churn::run(&cfg),
        ScenarioKind::LeakReport => scenarios::leak_report::run(&cfg),
    }
}

fn parse_cli() -> AnyResult<Cli> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("census-examples")
                .description("Run census scenarios as subcommands")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();

    args::Driver::new(figue_config)
        .run()
        .into_result()
        .map(|v| v.value)
        .map_err(|e| e.to_string())
}

fn config_from_cli(cli: &Cli) -> AnyResult<Config> {
    let count = cli.count.map_or(DEFAULT_COUNT, |n| n as usize);
    let threads = cli.threads.map_or(DEFAULT_THREADS, |n| n as usize);
    if threads == 0 {
        return Err("--threads must be at least 1".to_string());
    }

    Ok(Config {
        json: cli.json,
        count,
        threads,
    })
}
