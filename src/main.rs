extern crate clap;
extern crate mandel;
extern crate num_cpus;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{App, AppSettings, Arg, ArgMatches};
use tracing_subscriber::EnvFilter;

use mandel::raster::Format;
use mandel::{Config, Coordinator, Dispatch};

fn validate_parse<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    match T::from_str(s) {
        Ok(_) => Ok(()),
        Err(_) => Err(format!("{}: '{}'", err, s)),
    }
}

const DOMAIN: &str = "domain";
const VIRTUALIZATION: &str = "virtualization";
const THREADS: &str = "threads";
const ITERATIONS: &str = "iterations";
const OUTPUT: &str = "output";
const FORMAT: &str = "format";
const MULTIPASS: &str = "multipass";
const TIMEOUT: &str = "timeout";
const PROGRESS: &str = "progress";
const VERBOSE: &str = "verbose";

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandel")
        .version("0.1.0")
        .about("Mandelbrot renderer with tunable over-decomposition")
        .setting(AppSettings::AllowNegativeNumbers)
        .arg(
            Arg::with_name(DOMAIN)
                .index(1)
                .required(false)
                .default_value("600")
                .validator(|s| validate_parse::<i64>(&s, "Could not parse domain size"))
                .help("Width and height of the image, in pixels"),
        )
        .arg(
            Arg::with_name(VIRTUALIZATION)
                .index(2)
                .required(false)
                .default_value("0.0")
                .validator(|s| validate_parse::<f64>(&s, "Could not parse virtualization"))
                .help("Over-decomposition, from 0.0 (one unit per thread) to 1.0 (one unit per row)"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| validate_parse::<i64>(&s, "Could not parse thread count"))
                .help("Execution units to partition for [default: number of CPUs]"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("100")
                .validator(|s| validate_parse::<i64>(&s, "Could not parse iteration count"))
                .help("Maximum escape-time iterations per pixel"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value(".")
                .help("Directory the images are written to"),
        )
        .arg(
            Arg::with_name(FORMAT)
                .long(FORMAT)
                .short("f")
                .takes_value(true)
                .default_value("ppm")
                .validator(|s| s.parse::<Format>().map(|_| ()))
                .help("Image format: ppm or jpeg"),
        )
        .arg(
            Arg::with_name(MULTIPASS)
                .long(MULTIPASS)
                .short("m")
                .help("Render each unit as a sequence of sub-passes"),
        )
        .arg(
            Arg::with_name(TIMEOUT)
                .long(TIMEOUT)
                .takes_value(true)
                .validator(|s| validate_parse::<f64>(&s, "Could not parse timeout"))
                .help("Give up if the render takes longer than this many seconds"),
        )
        .arg(
            Arg::with_name(PROGRESS)
                .long(PROGRESS)
                .short("p")
                .help("Print a line as each unit finishes"),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .short("v")
                .multiple(true)
                .help("More logging on stderr; RUST_LOG overrides"),
        )
        .get_matches()
}

fn init_tracing(verbosity: u64) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Validators have already run, so the values all parse.
fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Option<T> {
    matches.value_of(name).and_then(|s| T::from_str(s).ok())
}

fn config(matches: &ArgMatches) -> Config {
    let defaults = Config::default();
    Config {
        domain_size: value(matches, DOMAIN).unwrap_or(defaults.domain_size),
        virtualization: value(matches, VIRTUALIZATION).unwrap_or(defaults.virtualization),
        workers: value(matches, THREADS).unwrap_or(num_cpus::get() as i64),
        iterations: value(matches, ITERATIONS).unwrap_or(defaults.iterations),
        output_dir: matches
            .value_of(OUTPUT)
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir),
        format: value(matches, FORMAT).unwrap_or(defaults.format),
        dispatch: if matches.is_present(MULTIPASS) {
            Dispatch::MultiPass
        } else {
            Dispatch::SinglePass
        },
        timeout: value(matches, TIMEOUT),
        progress: matches.is_present(PROGRESS),
    }
}

fn main() {
    let matches = args();
    init_tracing(matches.occurrences_of(VERBOSE));

    let coordinator = match Coordinator::new(&config(&matches)) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            eprintln!("Mandel: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = coordinator.run() {
        eprintln!("Mandel: render failure: {}", e);
        std::process::exit(1);
    }
}
