use lookup_engine::config::Config;
use lookup_engine::context::LookupContext;
use lookup_engine::search::policy::AccessLevel;
use lookup_engine::search::types::{SearchError, SearchKind};
use tracing_subscriber::EnvFilter;

const EXIT_NO_RESULTS: i32 = 1;
const EXIT_INVALID: i32 = 2;
const EXIT_FAILED: i32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} <search-type> <input> [--level basic|medium|advanced]",
            args[0]
        );
        eprintln!("Example: {} cpf 111.222.333-44", args[0]);
        eprintln!("Example: {} placa ABC1D23 --level medium", args[0]);
        eprintln!(
            "Search types: {}",
            SearchKind::ALL.map(|kind| kind.as_str()).join(", ")
        );

        std::process::exit(EXIT_INVALID);
    }

    let mut level = AccessLevel::default();
    let mut positional: Vec<&str> = vec![];

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--level" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("--level needs a value");
                    std::process::exit(EXIT_INVALID);
                };
                level = match value.parse() {
                    Ok(level) => level,
                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(EXIT_INVALID);
                    }
                };
                i += 2;
            }
            other => {
                positional.push(other);
                i += 1;
            }
        }
    }

    let (kind, input) = match positional.as_slice() {
        [kind, input, ..] => (*kind, *input),
        _ => {
            eprintln!("Expected <search-type> <input>");
            std::process::exit(EXIT_INVALID);
        }
    };

    let kind: SearchKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_INVALID);
        }
    };

    tracing::info!("Data directory: {}", config.data_dir.display());

    let context = LookupContext::build(&config)?;
    tracing::info!("Started {} workers", context.pool.size());

    let outcome = context.search.search(kind, input, level).await;
    context.shutdown().await?;

    match outcome {
        Ok(results) if results.is_empty() => {
            eprintln!("No results for {} {:?}", kind, input);
            std::process::exit(EXIT_NO_RESULTS);
        }
        Ok(results) => {
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Err(SearchError::Validation(message)) => {
            eprintln!("Invalid input: {}", message);
            std::process::exit(EXIT_INVALID);
        }
        Err(e) => {
            tracing::error!("Search failed: {}", e);
            std::process::exit(EXIT_FAILED);
        }
    }
}
