use clap::Parser;
use srec_addr::cli::Args;
use srec_addr::converter::ConvertError;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    init_logging(&args);

    if let Err(err) = srec_addr::run(args) {
        eprintln!("ERROR: {err:#}");
        let code = err
            .downcast_ref::<ConvertError>()
            .map_or(1, ConvertError::exit_code);
        std::process::exit(code);
    }
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("srec_addr={level}")));

    // stdout carries the converted records
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
