use invisible_king::options::{Options, AUTO_MOVE_DELAY};
use invisible_king::session::Session;
use invisible_king::shell::Shell;
use invisible_king::Error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Expected : invisible-king [--pgn <text> | --pgn-file <path>] [--delay <ms>]\n           invisible-king perft <depth> [<FEN>]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    println!("invisible-king v{}, by {}", env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_AUTHORS"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = if args.first().map(String::as_str) == Some("perft") {
        perft(&args[1..])
    } else {
        interactive(&args)
    };
    if let Err(e) = outcome {
        eprintln!("{}\n{}", e, USAGE);
        std::process::exit(1);
    }
}

fn perft(args: &[String]) -> Result<(), Error> {
    let depth = args
        .first()
        .and_then(|d| d.parse::<u32>().ok())
        .ok_or_else(|| Error::Usage("missing perft depth".to_string()))?;
    invisible_king::perft(depth, args.get(1).cloned())
}

fn interactive(args: &[String]) -> Result<(), Error> {
    let mut document = None;
    let mut options = Options::default();
    let mut rest = args.iter();
    while let Some(flag) = rest.next() {
        let value = rest.next().ok_or_else(|| Error::Usage(format!("no value after {}", flag)))?;
        match flag.as_str() {
            "--pgn" => document = Some(value.clone()),
            "--pgn-file" => document = Some(std::fs::read_to_string(value)?),
            "--delay" => {
                options.set(AUTO_MOVE_DELAY, value);
            }
            other => return Err(Error::Usage(format!("unknown flag {}", other))),
        }
    }

    let mut session = Session::default();
    if document.is_some() {
        // A broken document still starts a default game
        if let Err(e) = session.load(document.as_deref()) {
            eprintln!("{}", e);
        }
    }
    let mut shell = Shell::new(session, options);
    shell.run();
    Ok(())
}
