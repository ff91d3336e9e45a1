use clap::Parser;
use pdf_bridge_cli::cli::Cli;
use pdf_bridge_cli::error::CliError;
use pdf_bridge_cli::output::{self, OutputFormat, ResultBuilder};
use pdf_bridge_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli, format).await {
		handle_error(command, err, format);
		std::process::exit(1);
	}
}

fn handle_error(command: &str, err: CliError, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	// Always print to stderr for humans
	output::print_error_stderr(&cmd_error);

	// Also emit the envelope to stdout with ok=false for scripts. Under `serve`
	// stdout belongs to the frame stream.
	if format != OutputFormat::Text && command != "serve" {
		let result: output::CommandResult<()> = ResultBuilder::new(command).command_error(cmd_error).build();
		output::print_result(&result, format);
	}
}
