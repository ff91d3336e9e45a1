//! Command dispatch for `pdfb`.

use std::sync::Arc;
use std::time::Instant;

use pdf_bridge::delegation::{self, DELEGATES, Delegate, Target};
use pdf_bridge::{DocumentEngine, LoopbackFactory, Router, RouterConfig, ViewerRegistry};
use pdf_bridge_runtime::{ContextId, PipeTransport};
use serde::Serialize;
use serde_json::Value;

use crate::cli::{CallArgs, Cli, Commands, ServeArgs};
use crate::config;
use crate::error::{CliError, Result};
use crate::output::{self, CommandInputs, OutputFormat, ResultBuilder};

/// Container id of the single viewer `call` creates.
const CONTAINER: &str = "pdfb";

pub async fn dispatch(cli: Cli, format: OutputFormat) -> Result<()> {
	match cli.command {
		Commands::Methods => methods(format),
		Commands::Call(args) => call(args, format).await,
		Commands::Serve(args) => serve(args).await,
	}
}

/// One row of `pdfb methods`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodEntry {
	pub method: &'static str,
	/// Request type, aliased method, or `reconnect`.
	pub target: &'static str,
	pub kind: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub arg: Option<&'static str>,
}

impl From<&Delegate> for MethodEntry {
	fn from(delegate: &Delegate) -> Self {
		let (kind, target) = match delegate.target {
			Target::Request(message) => ("request", message.as_str()),
			Target::Alias(method) => ("alias", method),
			Target::Reconnect => ("local", "reconnect"),
		};
		Self {
			method: delegate.method,
			target,
			kind,
			arg: delegate.arg,
		}
	}
}

fn methods(format: OutputFormat) -> Result<()> {
	let entries: Vec<MethodEntry> = DELEGATES.iter().map(MethodEntry::from).collect();
	let result = ResultBuilder::new("methods").data(entries).build();
	output::print_result(&result, format);
	Ok(())
}

/// Parses `--params`: absent means no parameters.
fn parse_params(raw: Option<&str>) -> Result<Value> {
	match raw {
		None => Ok(Value::Null),
		Some(raw) => serde_json::from_str(raw).map_err(|e| CliError::InvalidParams(e.to_string())),
	}
}

async fn call(args: CallArgs, format: OutputFormat) -> Result<()> {
	let params = parse_params(args.params.as_deref())?;
	match delegation::resolve(&args.method) {
		Ok(Some(_)) => {}
		Ok(None) => return Err(CliError::UnknownMethod(args.method)),
		Err(e) => return Err(anyhow::Error::from(e).into()),
	}

	let patch = config::load_options_or_default(args.source.config.as_deref())?;
	let engine = Arc::new(config::load_document(&args.source.document)?);
	let registry = ViewerRegistry::new(Arc::new(LoopbackFactory::with_engine(engine)));
	let viewer = registry.get_or_create(CONTAINER, patch)?;

	let document = args.source.document.display().to_string();
	let inputs = CommandInputs {
		method: Some(args.method.clone()),
		document: Some(document.clone()),
		params: (!params.is_null()).then(|| params.clone()),
	};

	let started = Instant::now();
	let outcome = async {
		viewer.load(&document).await?;
		let load_time = started.elapsed();
		tracing::info!(document = %document, ms = load_time.as_millis() as u64, "Viewer ready");
		let value = viewer.invoke(&args.method, params).await?;
		Ok::<_, pdf_bridge::Error>((value, load_time))
	}
	.await;
	viewer.destroy(true);

	let (value, load_time) = outcome?;
	let result = ResultBuilder::new("call")
		.inputs(inputs)
		.data(value)
		.load_time(load_time)
		.build();
	output::print_result(&result, format);
	Ok(())
}

/// Runs the viewer side over stdin/stdout until the host closes the pipe.
async fn serve(args: ServeArgs) -> Result<()> {
	if args.source.config.is_some() {
		tracing::warn!("--config has no effect on the viewer side");
	}
	let engine: Arc<dyn DocumentEngine> = Arc::new(config::load_document(&args.source.document)?);
	let router_config = RouterConfig {
		allowed_origins: (!args.allowed_origins.is_empty()).then_some(args.allowed_origins),
		version: args.viewer_version,
	};

	let parts = PipeTransport::spawn(
		ContextId::new("viewer"),
		ContextId::new("host"),
		tokio::io::stdout(),
		tokio::io::stdin(),
	);
	let router = Router::spawn(parts, Arc::clone(&engine), router_config);
	engine.open().await.map_err(|e| CliError::Document {
		path: args.source.document.clone(),
		message: e.to_string(),
	})?;
	tracing::info!(document = %args.source.document.display(), "Serving viewer over stdio");

	tokio::select! {
		_ = router.closed() => {
			tracing::info!("Host closed the pipe");
		}
		signal = tokio::signal::ctrl_c() => {
			signal?;
			tracing::info!("Interrupted");
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn params_are_json() {
		assert_eq!(parse_params(None).unwrap(), Value::Null);
		assert_eq!(parse_params(Some("3")).unwrap(), json!(3));
		assert_eq!(parse_params(Some(r#"{"page": 2}"#)).unwrap(), json!({ "page": 2 }));
		assert!(matches!(parse_params(Some("three")), Err(CliError::InvalidParams(_))));
	}

	#[test]
	fn method_entries_describe_targets() {
		let entries: Vec<MethodEntry> = DELEGATES.iter().map(MethodEntry::from).collect();

		let go_to_page = entries.iter().find(|e| e.method == "goToPage").unwrap();
		assert_eq!(go_to_page.kind, "request");
		assert_eq!(go_to_page.target, "pdfjs.goToPage");

		let alias = entries.iter().find(|e| e.method == "highlightText").unwrap();
		assert_eq!(alias.kind, "alias");

		let reconnect = entries.iter().find(|e| e.method == "reconnect").unwrap();
		assert_eq!(reconnect.kind, "local");
	}
}
