use std::env;
use std::process;

use minicc::generate_assembly;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive for diagnostics.
const LOG_ENV: &str = "MINICC_LOG";

fn init_logging() {
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
  // Assembly goes to stdout, so logs must stay on stderr.
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .with_level(true)
    .init();
}

fn main() {
  init_logging();

  let args: Vec<String> = env::args().collect();
  if args.len() != 2 {
    let program = args.first().map(String::as_str).unwrap_or("minicc");
    eprintln!("usage: {program} <program>");
    process::exit(1);
  }

  debug!(bytes = args[1].len(), "compiling");
  match generate_assembly(&args[1]) {
    Ok(asm) => print!("{asm}"),
    Err(err) => {
      debug!(loc = ?err.loc(), "compilation failed");
      eprintln!("{err}");
      process::exit(1);
    }
  }
}
