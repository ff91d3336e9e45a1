//! End-to-end tests for the `pdfb` binary.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};
use tempfile::TempDir;

fn pdfb_binary() -> PathBuf {
	PathBuf::from(env!("CARGO_BIN_EXE_pdfb"))
}

struct Fixture {
	dir: TempDir,
}

impl Fixture {
	fn new() -> Self {
		let dir = tempfile::tempdir().unwrap();
		let document = json!({
			"title": "Quarterly report",
			"author": "Finance",
			"pages": [
				{ "text": "revenue grew" },
				{ "text": "costs fell" },
				{ "text": "outlook is stable" }
			]
		});
		std::fs::write(dir.path().join("report.json"), document.to_string()).unwrap();
		Self { dir }
	}

	fn document(&self) -> PathBuf {
		self.dir.path().join("report.json")
	}

	fn write(&self, name: &str, contents: &str) -> PathBuf {
		let path = self.dir.path().join(name);
		std::fs::write(&path, contents).unwrap();
		path
	}
}

fn run(args: &[&str]) -> Output {
	Command::new(pdfb_binary())
		.args(args)
		.output()
		.expect("failed to execute pdfb")
}

fn call(document: &Path, method: &str, params: Option<&str>) -> (Value, Output) {
	let mut command = Command::new(pdfb_binary());
	command.args(["-f", "ndjson", "call", method, "--document"]).arg(document);
	if let Some(params) = params {
		command.args(["--params", params]);
	}
	let output = command.output().expect("failed to execute pdfb");
	let stdout = String::from_utf8_lossy(&output.stdout);
	let envelope = serde_json::from_str(stdout.trim()).unwrap_or_else(|e| panic!("bad envelope {stdout:?}: {e}"));
	(envelope, output)
}

#[test]
fn methods_lists_the_delegation_table() {
	let output = run(&["methods"]);
	assert!(output.status.success());

	let envelope: Value = serde_json::from_slice(&output.stdout).unwrap();
	assert_eq!(envelope["ok"], true);
	assert_eq!(envelope["command"], "methods");
	let methods = envelope["data"].as_array().unwrap();
	assert!(methods.iter().any(|m| m["method"] == "goToPage" && m["arg"] == "pageNumber"));
	assert!(methods.iter().any(|m| m["method"] == "clearAllHighlights" && m["kind"] == "alias"));
}

#[test]
fn call_returns_page_count() {
	let fixture = Fixture::new();

	let (envelope, output) = call(&fixture.document(), "getPageCount", None);

	assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
	assert_eq!(envelope["ok"], true);
	assert_eq!(envelope["data"], 3);
	assert_eq!(envelope["inputs"]["method"], "getPageCount");
	assert!(envelope["timings"]["loadMs"].is_u64());
}

#[test]
fn call_wraps_bare_params() {
	let fixture = Fixture::new();

	let (envelope, output) = call(&fixture.document(), "goToPage", Some("2"));

	assert!(output.status.success());
	assert_eq!(envelope["data"], json!({ "success": true, "page": 2 }));
}

#[test]
fn call_reports_remote_failure() {
	let fixture = Fixture::new();

	let (envelope, output) = call(&fixture.document(), "goToPage", Some("9"));

	assert_eq!(output.status.code(), Some(1));
	assert_eq!(envelope["ok"], false);
	assert_eq!(envelope["error"]["code"], "REMOTE_ERROR");
	assert_eq!(envelope["error"]["message"], "Remote error: Invalid page number: 9");
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("Error [REMOTE_ERROR]"), "stderr: {stderr}");
}

#[test]
fn unknown_method_fails_before_loading() {
	let fixture = Fixture::new();

	let (envelope, output) = call(&fixture.document(), "explode", None);

	assert_eq!(output.status.code(), Some(1));
	assert_eq!(envelope["command"], "call");
	assert_eq!(envelope["error"]["code"], "UNKNOWN_METHOD");
}

#[test]
fn malformed_params_are_rejected() {
	let fixture = Fixture::new();

	let (envelope, _) = call(&fixture.document(), "findText", Some("{not json"));

	assert_eq!(envelope["error"]["code"], "INVALID_INPUT");
}

#[test]
fn options_file_is_applied() {
	let fixture = Fixture::new();
	let options = fixture.write("viewer.json", r#"{ "timeout": 4000, "enableDownload": false }"#);

	let output = Command::new(pdfb_binary())
		.args(["-f", "text", "call", "getDocumentInfo", "--document"])
		.arg(fixture.document())
		.arg("--config")
		.arg(&options)
		.output()
		.unwrap();

	assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
	let info: Value = serde_json::from_slice(&output.stdout).unwrap();
	assert_eq!(info["title"], "Quarterly report");
	assert_eq!(info["author"], "Finance");
}

#[test]
fn broken_options_file_is_reported() {
	let fixture = Fixture::new();
	let options = fixture.write("viewer.json", "{ timeout: 4000 }");

	let output = Command::new(pdfb_binary())
		.args(["call", "getPageCount", "--document"])
		.arg(fixture.document())
		.arg("--config")
		.arg(&options)
		.output()
		.unwrap();

	assert_eq!(output.status.code(), Some(1));
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("Error [INVALID_INPUT]: Invalid viewer options"), "stderr: {stderr}");
}

fn write_frame(stdin: &mut impl Write, payload: &Value) {
	let bytes = serde_json::to_vec(payload).unwrap();
	stdin.write_all(&(bytes.len() as u32).to_le_bytes()).unwrap();
	stdin.write_all(&bytes).unwrap();
	stdin.flush().unwrap();
}

fn read_frame(stdout: &mut impl Read) -> Value {
	let mut len = [0u8; 4];
	stdout.read_exact(&mut len).unwrap();
	let mut body = vec![0u8; u32::from_le_bytes(len) as usize];
	stdout.read_exact(&mut body).unwrap();
	serde_json::from_slice(&body).unwrap()
}

#[test]
fn serve_answers_framed_requests_until_stdin_closes() {
	let fixture = Fixture::new();
	let mut child = Command::new(pdfb_binary())
		.args(["serve", "--viewer-version", "4.2.67", "--document"])
		.arg(fixture.document())
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::null())
		.spawn()
		.unwrap();
	let mut stdin = child.stdin.take().unwrap();
	let mut stdout = child.stdout.take().unwrap();

	let ready = read_frame(&mut stdout);
	assert_eq!(ready["type"], "pdfjs.interface.ready");
	assert_eq!(ready["data"], json!({ "version": "4.2.67", "title": "Quarterly report", "numPages": 3 }));

	write_frame(&mut stdin, &json!({ "type": "pdfjs.getPageText", "data": { "page": 3 }, "requestId": "r1" }));
	let reply = loop {
		let frame = read_frame(&mut stdout);
		if frame["requestId"] == "r1" {
			break frame;
		}
	};
	assert_eq!(reply["data"], json!({ "page": 3, "text": "outlook is stable" }));

	drop(stdin);
	assert!(child.wait().unwrap().success());
}
