mod display;

use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::{Level, warn};
use viajero_ai::generate::DEFAULT_GEMINI_MODEL;
use viajero_ai::{
    DEFAULT_PLACE_LIMIT, GeminiClient, GeminiSettings, HeuristicExtractor, LlmExtractor,
    LlmNormalizer, WhitespaceNormalizer,
};
use viajero_chat::Orchestrator;
use viajero_client::backend::DEFAULT_BACKEND_URL;
use viajero_client::images::DEFAULT_WIKIPEDIA_API;
use viajero_client::{BackendClient, BackendSettings, ImageSettings, WikipediaImages};
use viajero_core::map_link::{DEFAULT_COUNTRY, DEFAULT_MAP_SEARCH_BASE};
use viajero_core::{Location, MapSettings, PlaceExtractor, TextNormalizer};

#[derive(Parser)]
#[command(
    name = "viajero",
    version,
    about = "Tourism chat assistant with place, image and map enrichment"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question and print the enriched answer.
    Ask(AskArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum NormalizerKind {
    /// Rewrite through the text generator.
    Llm,
    /// Collapse whitespace only.
    Whitespace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExtractorKind {
    /// Structured JSON extraction through the text generator (uncapped).
    Llm,
    /// Capitalised-phrase heuristic (capped by --place-limit).
    Heuristic,
}

#[derive(Args)]
struct AskArgs {
    /// The question for the assistant.
    prompt: String,

    /// Latitude of the user's position.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude of the user's position.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Print the result as JSON instead of a card.
    #[arg(long)]
    json: bool,

    #[arg(long, env = "VIAJERO_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    #[arg(long, env = "VIAJERO_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    model: String,

    #[arg(long, env = "VIAJERO_NORMALIZER", value_enum, default_value_t = NormalizerKind::Llm)]
    normalizer: NormalizerKind,

    #[arg(long, env = "VIAJERO_EXTRACTOR", value_enum, default_value_t = ExtractorKind::Llm)]
    extractor: ExtractorKind,

    /// Maximum places kept by the heuristic extractor.
    #[arg(long, env = "VIAJERO_PLACE_LIMIT", default_value_t = DEFAULT_PLACE_LIMIT)]
    place_limit: usize,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "VIAJERO_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[arg(long, env = "VIAJERO_COUNTRY", default_value = DEFAULT_COUNTRY)]
    country: String,

    #[arg(long, env = "VIAJERO_MAP_BASE", default_value = DEFAULT_MAP_SEARCH_BASE)]
    map_base: String,

    #[arg(long, env = "VIAJERO_WIKIPEDIA_API", default_value = DEFAULT_WIKIPEDIA_API)]
    wikipedia_api: String,
}

impl AskArgs {
    fn location(&self) -> Option<Location> {
        match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

/// Wire the HTTP and generative collaborators into an orchestrator.
fn build_orchestrator(args: &AskArgs) -> anyhow::Result<Orchestrator> {
    let timeout = Duration::from_secs(args.timeout_secs);

    let backend = BackendClient::new(BackendSettings {
        url: args.backend_url.clone(),
        timeout,
    })?;

    let gemini = Arc::new(GeminiClient::new(GeminiSettings {
        api_key: args.gemini_api_key.clone(),
        model: args.model.clone(),
        timeout,
        ..GeminiSettings::default()
    })?);
    let uses_generator =
        args.normalizer == NormalizerKind::Llm || args.extractor == ExtractorKind::Llm;
    if uses_generator && !gemini.is_configured() {
        warn!("GEMINI_API_KEY is not set; LLM normalization and extraction will fall back");
    }

    let normalizer: Arc<dyn TextNormalizer> = match args.normalizer {
        NormalizerKind::Llm => Arc::new(LlmNormalizer::new(gemini.clone())),
        NormalizerKind::Whitespace => Arc::new(WhitespaceNormalizer),
    };
    let extractor: Arc<dyn PlaceExtractor> = match args.extractor {
        ExtractorKind::Llm => Arc::new(LlmExtractor::new(gemini)),
        ExtractorKind::Heuristic => Arc::new(HeuristicExtractor::new(args.place_limit)),
    };

    let images = WikipediaImages::new(ImageSettings {
        api_url: args.wikipedia_api.clone(),
        timeout,
        ..ImageSettings::default()
    })?;

    let map = MapSettings {
        search_base: args.map_base.clone(),
        country: args.country.clone(),
    };

    Ok(
        Orchestrator::new(Arc::new(backend), normalizer, extractor, Arc::new(images))
            .with_map_links(Arc::new(map)),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("viajero v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Ask(args) => {
            let orchestrator = build_orchestrator(&args)?;
            let result = orchestrator.run_chat(&args.prompt, args.location()).await;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                display::print_chat_card(&result);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(argv: &[&str]) -> AskArgs {
        let cli = Cli::try_parse_from(argv).expect("valid arguments");
        match cli.command {
            Command::Ask(args) => args,
        }
    }

    #[test]
    fn ask_defaults() {
        let args = ask(&["viajero", "ask", "¿Qué visitar en Boyacá?"]);
        assert_eq!(args.prompt, "¿Qué visitar en Boyacá?");
        assert!(args.location().is_none());
        assert_eq!(args.extractor, ExtractorKind::Llm);
        assert_eq!(args.normalizer, NormalizerKind::Llm);
        assert_eq!(args.place_limit, DEFAULT_PLACE_LIMIT);
        assert_eq!(args.country, "Colombia");
    }

    #[test]
    fn ask_with_negative_longitude() {
        let args = ask(&[
            "viajero", "ask", "cerca", "--lat", "4.60", "--lon", "-74.08",
        ]);
        assert_eq!(
            args.location(),
            Some(Location {
                latitude: 4.60,
                longitude: -74.08
            })
        );
    }

    #[test]
    fn latitude_requires_longitude() {
        assert!(Cli::try_parse_from(["viajero", "ask", "x", "--lat", "4.6"]).is_err());
    }

    #[test]
    fn heuristic_extractor_flag() {
        let args = ask(&[
            "viajero",
            "ask",
            "x",
            "--extractor",
            "heuristic",
            "--place-limit",
            "5",
        ]);
        assert_eq!(args.extractor, ExtractorKind::Heuristic);
        assert_eq!(args.place_limit, 5);
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(log_level(0), Level::WARN);
        assert_eq!(log_level(1), Level::INFO);
        assert_eq!(log_level(3), Level::DEBUG);
    }

    #[test]
    fn orchestrator_builds_without_api_key() {
        let args = ask(&["viajero", "ask", "x", "--normalizer", "whitespace"]);
        assert!(build_orchestrator(&args).is_ok());
    }
}
