use clap::Parser;
use std::process;
use stylec::cli::{self, Cli};

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = cli::run(&cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
