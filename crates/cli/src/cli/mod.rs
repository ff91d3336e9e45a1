use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;
use crate::styles::cli_styles;

#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(name = "pdfb")]
#[command(about = "Drive an embedded document viewer from the command line")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: json (default), ndjson, or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "json")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List the host methods a viewer answers to
	Methods,

	/// Load a document into a loopback viewer and invoke one method on it
	Call(CallArgs),

	/// Serve a document over stdin/stdout as the viewer side of a pipe channel
	Serve(ServeArgs),
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Methods => "methods",
			Commands::Call(_) => "call",
			Commands::Serve(_) => "serve",
		}
	}
}

/// Where the served document comes from.
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
	/// Document fixture (JSON: title, metadata, pages, outline)
	#[arg(short, long, value_name = "FILE")]
	pub document: PathBuf,

	/// Viewer options file (JSON, camelCase keys)
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
	/// Host method name, e.g. goToPage or highlightText
	pub method: String,

	/// Method parameters as JSON; bare values are wrapped into the method's argument field
	#[arg(short, long, value_name = "JSON")]
	pub params: Option<String>,

	#[command(flatten)]
	pub source: DocumentArgs,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
	#[command(flatten)]
	pub source: DocumentArgs,

	/// Viewer version reported in the ready event
	#[arg(long, value_name = "VERSION")]
	pub viewer_version: Option<String>,

	/// Origins accepted by the router (repeatable); all origins when absent
	#[arg(long = "allow-origin", value_name = "ORIGIN")]
	pub allowed_origins: Vec<String>,
}
