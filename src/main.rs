use std::io::Write;
use std::process;

use log::LevelFilter;

use ucgrep::cli;
use ucgrep::run;

fn init_logger(level: LevelFilter) {
    let mut log_builder = env_logger::Builder::new();

    log_builder
        .format(|buf, r| writeln!(buf, "*** {}", r.args()))
        .filter(None, level)
        .init();
}

fn main() {
    let (config, level) = match cli::get_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("ucgrep: {}", err);
            process::exit(err.exit_code());
        }
    };

    init_logger(level);

    match run::run(&config) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("ucgrep: {}", err);
            process::exit(err.exit_code());
        }
    }
}
