use anyhow::{anyhow, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::LevelFilter;
use std::io::{self, BufRead, Write};
use std::time::Instant;
use tessera::build::build_site;
use tessera::config::{Config, Overrides, DEFAULT_ENV};

fn main() {
    if let Err(err) = main_result() {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}

fn main_result() -> Result<()> {
    let matches = App::new("tessera")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a static site from a source directory")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Build the site into its destination directory")
                .arg(
                    Arg::with_name("env")
                        .help("The environment to build, selecting `tessera.{env}.yaml`")
                        .default_value(DEFAULT_ENV)
                        .index(1),
                )
                .arg(
                    Arg::with_name("pretty")
                        .long("pretty")
                        .takes_value(true)
                        .possible_values(&["true", "false"])
                        .help("Whether to write pretty URLs (`about/index.html`)"),
                )
                .arg(
                    Arg::with_name("cache")
                        .short("c")
                        .long("cache")
                        .help("Keep the cache directory between builds"),
                )
                .arg(
                    Arg::with_name("threads")
                        .short("t")
                        .long("threads")
                        .takes_value(true)
                        .value_name("N")
                        .help("The number of worker threads"),
                )
                .arg(
                    Arg::with_name("quiet")
                        .short("q")
                        .long("quiet")
                        .help("Only log warnings and errors; never prompt"),
                )
                .arg(
                    Arg::with_name("verbose")
                        .short("v")
                        .long("verbose")
                        .multiple(true)
                        .help("Log more detail (repeat for more)"),
                )
                .arg(
                    Arg::with_name("yes")
                        .short("y")
                        .long("yes")
                        .help("Overwrite a custom destination without asking"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("build", Some(matches)) => build(matches),
        (other, _) => Err(anyhow!("Unknown subcommand `{}`", other)),
    }
}

fn build(matches: &ArgMatches) -> Result<()> {
    let quiet = matches.is_present("quiet");
    init_logger(quiet, matches.occurrences_of("verbose"));

    let overrides = Overrides {
        pretty: matches.value_of("pretty").map(|pretty| pretty == "true"),
        cache: matches.is_present("cache"),
        threads: matches
            .value_of("threads")
            .map(str::parse::<usize>)
            .transpose()
            .context("`--threads` must be a positive integer")?,
    };
    let env = matches.value_of("env").unwrap_or(DEFAULT_ENV);
    let config = Config::from_directory(&std::env::current_dir()?, env, &overrides)?;
    log::debug!("{:?}", config);

    if config.custom_destination
        && config.output_directory.exists()
        && !quiet
        && !matches.is_present("yes")
        && !confirm(&format!(
            "Overwrite the contents of `{}`?",
            config.output_directory.display()
        ))?
    {
        log::warn!("Build aborted");
        return Ok(());
    }

    let start = Instant::now();
    log::info!("Building {} site", config.env);
    let manifest = build_site(&config)?;
    log::info!(
        "Wrote {} files to `{}` in {:.2?}",
        manifest.len(),
        config.output_directory.display(),
        start.elapsed()
    );
    Ok(())
}

fn init_logger(quiet: bool, verbosity: u64) {
    let level = match (quiet, verbosity) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
