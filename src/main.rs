use std::path::Path;
use std::process::ExitCode;
use clap::Parser;
use log::error;
use jbc::{NoopPreverifier, Preverifier};

/// Assembles and disassembles Java class files.
///
/// The input and the output can be .class/.jbc/.jar/.jmod files or
/// directories, where .jbc files contain disassembled Java bytecode. The
/// classpath (with runtime classes and library classes) is only necessary
/// for preverifying assembled code.
#[derive(Debug, Parser)]
#[command(name = "jbc", version)]
struct Args {
	/// Classpath, or the input when only two arguments are given
	#[arg(value_name = "classpath")]
	first: String,

	/// Input file or directory
	#[arg(value_name = "input")]
	second: String,

	/// Output file or directory
	#[arg(value_name = "output")]
	third: Option<String>,
}

fn main() -> ExitCode {
	simple_logger::SimpleLogger::new()
		.with_level(log::LevelFilter::Info)
		.env()
		.init()
		.expect("failed to initialize logging");

	let args = match Args::try_parse() {
		Ok(args) => args,
		Err(e) => {
			let _ = e.print();
			return ExitCode::from(1);
		},
	};

	let (classpath, input, output) = match args.third {
		Some(output) => (Some(args.first), args.second, output),
		None => (None, args.first, args.second),
	};

	let preverifier = classpath.map(|classpath| {
		for library in std::env::split_paths(&classpath) {
			log::info!("Using library file [{}]...", library.display());
		}
		NoopPreverifier
	});

	let result = jbc::io::process(
		Path::new(&input),
		Path::new(&output),
		preverifier.as_ref().map(|preverifier| preverifier as &dyn Preverifier),
	);

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e:#}");
			ExitCode::from(1)
		},
	}
}
