use std::io::{self, Write};

use clap::{crate_version, App, Arg};
use color_eyre::eyre::{Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use vm8::memory::{StdMem, SAMPLE_IMAGE};
use vm8::processor::{Processor, ENTRYPOINT};
use vm8::report;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling

    let matches = App::new("vm8")
        .version(crate_version!())
        .about("Runs a program on a minimal 8-bit fetch-decode-execute machine")
        .arg(
            Arg::with_name("program")
                .value_name("PROGRAM")
                .help("Assembly source to run. Runs the built-in sample when omitted.")
                .index(1),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Log more. Repeat to trace every instruction."),
        )
        .arg(
            Arg::with_name("dump")
                .long("dump")
                .help("Print the whole memory once the program halted."),
        )
        .get_matches();

    let level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .wrap_err("Failed to set up logging")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(
        matches.value_of("program"),
        matches.is_present("dump"),
        &mut out,
    )
}

/// Loads `program` (or the built-in sample) and runs it
fn run<W: Write>(program: Option<&str>, dump: bool, out: &mut W) -> Result<()> {
    let (name, mem) = match program {
        Some(path) => (path, StdMem::from_file(path)?),
        None => ("sample", StdMem::from_image(&SAMPLE_IMAGE)?),
    };

    run_memory(name, mem, dump, out)
}

/// Runs the program in `mem` to `HALT`, then writes the report to `out`.
/// Nothing is written if the program fails.
fn run_memory<W: Write>(name: &str, mut mem: StdMem, dump: bool, out: &mut W) -> Result<()> {
    let mut cpu = Processor::new(ENTRYPOINT);

    cpu.run_until_halt(&mut mem)
        .wrap_err_with(|| format!("Program {} aborted at 0x{:02X}", name, cpu.pc()))?;

    report::write_data_region(out, &mem)?;
    if dump {
        report::write_hex_dump(out, &mem)?;
    }

    Ok(())
}
