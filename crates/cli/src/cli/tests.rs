use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_methods_command() {
	let cli = Cli::try_parse_from(["pdfb", "methods"]).unwrap();

	assert!(matches!(cli.command, Commands::Methods));
	assert_eq!(cli.format, OutputFormat::Json);
	assert_eq!(cli.verbose, 0);
}

#[test]
fn parse_call_command() {
	let args = vec![
		"pdfb",
		"call",
		"goToPage",
		"--params",
		"3",
		"-d",
		"report.json",
		"--config",
		"viewer.json",
	];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Call(args) => {
			assert_eq!(args.method, "goToPage");
			assert_eq!(args.params.as_deref(), Some("3"));
			assert_eq!(args.source.document, PathBuf::from("report.json"));
			assert_eq!(args.source.config, Some(PathBuf::from("viewer.json")));
		}
		_ => panic!("Expected Call command"),
	}
}

#[test]
fn call_requires_document() {
	assert!(Cli::try_parse_from(["pdfb", "call", "getPageCount"]).is_err());
}

#[test]
fn parse_serve_command() {
	let args = vec![
		"pdfb",
		"serve",
		"--document",
		"report.json",
		"--viewer-version",
		"4.2.67",
		"--allow-origin",
		"https://a.example",
		"--allow-origin",
		"https://b.example",
	];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Serve(args) => {
			assert_eq!(args.viewer_version.as_deref(), Some("4.2.67"));
			assert_eq!(args.allowed_origins, ["https://a.example", "https://b.example"]);
			assert!(args.source.config.is_none());
		}
		_ => panic!("Expected Serve command"),
	}
}

#[test]
fn global_flags_after_subcommand() {
	let cli = Cli::try_parse_from(["pdfb", "methods", "-vv", "--format", "text"]).unwrap();

	assert_eq!(cli.verbose, 2);
	assert_eq!(cli.format, OutputFormat::Text);
	assert_eq!(cli.command.name(), "methods");
}
