use std::time::Instant;

use triad::prelude::*;

fn main() {
    env_logger::init();
    let (config, args) = match EnvironmentConfig::from_args() {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    if args.is_empty() || args.len() > 2 {
        eprintln!("Usage: count_triangles [options] <edges> [output]");
        std::process::exit(2);
    }

    let start = Instant::now();
    let count = match count_triangles(config, FileSource::new(&args[0])) {
        Ok(count) => count,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    match args.get(1) {
        Some(output) => {
            if let Err(e) = write_count(output, &count) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        None => println!("{count}"),
    }
    eprintln!("Elapsed: {elapsed:?}");
}
