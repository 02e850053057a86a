//! The generator run behind the `autoss` command.
//!
//! Inputs are validated and read up front, parsed in parallel with the
//! selected front end, registered into one [`Design`] in input order and
//! handed to [`autoss_core::generate`]. Output is committed only after every
//! module has been generated.

use crate::error::CliError;
use crate::output;
use crate::tools::Toolchain;
use crate::{Cli, Frontend, GlobalArgs, ReportFormat};
use autoss_config::{load_config, validate_config, AutossConfig};
use autoss_core::{extract_modules, Design};
use autoss_diagnostics::{
    DiagnosticRenderer, DiagnosticSink, JsonRenderer, Severity, TerminalRenderer,
};
use autoss_source::{FileId, SourceDb};
use autoss_syntax::{verible, SyntaxTree};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// One input after reading (and, for Verible, preprocessing).
struct Input {
    path: PathBuf,
    file: FileId,
    text: String,
}

/// Runs the generator and returns the process exit code. Diagnostics are
/// printed to stderr.
pub fn run(cli: &Cli, global: &GlobalArgs) -> i32 {
    let mut source_db = SourceDb::new();
    let sink = DiagnosticSink::new();
    let result = generate(cli, global, &mut source_db, &sink)
        .and_then(|text| output::commit(&cli.output, &text).map_err(CliError::from));
    if let Err(e) = &result {
        sink.emit(e.to_diagnostic());
    }
    render_diagnostics(&sink, &source_db, global, cli.message_format);
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Produces the complete instrumented text for the root module.
pub fn generate(
    cli: &Cli,
    global: &GlobalArgs,
    source_db: &mut SourceDb,
    sink: &DiagnosticSink,
) -> Result<String, CliError> {
    let config = resolve_config(global.config.as_deref(), cli.prefix.as_deref())?;
    let toolchain = Toolchain::new(&config.tools);

    let contents = read_inputs(&cli.files)?;
    let texts: Vec<String> = match cli.frontend {
        Frontend::Builtin => contents.into_iter().map(|(_, text)| text).collect(),
        Frontend::Verible => cli
            .files
            .par_iter()
            .map(|path| toolchain.preprocess(path))
            .collect::<Result<_, _>>()?,
    };
    let inputs: Vec<Input> = cli
        .files
        .iter()
        .zip(texts)
        .map(|(path, text)| Input {
            path: path.clone(),
            file: source_db.add_source(path.clone(), text.clone()),
            text,
        })
        .collect();

    let trees: Vec<SyntaxTree> = inputs
        .par_iter()
        .map(|input| parse_input(input, cli.frontend, &toolchain, &config, sink))
        .collect::<Result<_, _>>()?;
    let parse_errors = sink.error_count();
    if parse_errors > 0 {
        return Err(CliError::ParseErrors {
            count: parse_errors,
        });
    }

    let mut design = Design::new();
    for (input, tree) in inputs.iter().zip(trees) {
        let tree_id = design.add_tree(input.path.display().to_string(), tree);
        for module in extract_modules(design.tree(tree_id), tree_id, &config)? {
            design.add_module(module)?;
        }
    }
    tracing::info!(
        files = inputs.len(),
        modules = design.module_count(),
        "loaded design"
    );

    let emitted = autoss_core::generate(&mut design, &cli.module, &config)?;
    let mut text = String::new();
    for module in &emitted {
        if cli.no_format {
            text.push_str(&module.text);
        } else {
            text.push_str(&toolchain.format(&module.text));
        }
    }
    tracing::info!(root = %cli.module, modules = emitted.len(), "generated save-state logic");
    Ok(text)
}

/// Loads `path` (or the defaults) and applies the `--prefix` override.
pub fn resolve_config(path: Option<&str>, prefix: Option<&str>) -> Result<AutossConfig, CliError> {
    let mut config = match path {
        Some(path) => load_config(Path::new(path))?,
        None => AutossConfig::default(),
    };
    if let Some(prefix) = prefix {
        config.prefix = prefix.to_string();
        validate_config(&config)?;
    }
    Ok(config)
}

/// Checks every input before anything is processed and returns the
/// contents in input order.
fn read_inputs(files: &[PathBuf]) -> Result<Vec<(PathBuf, String)>, CliError> {
    files
        .iter()
        .map(|path| {
            if detect_extension(path).is_none() {
                return Err(CliError::invalid(path, "not a `.v` or `.sv` file"));
            }
            if !path.exists() {
                return Err(CliError::invalid(path, "file not found"));
            }
            if !path.is_file() {
                return Err(CliError::invalid(path, "not a regular file"));
            }
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::invalid(path, format!("unreadable: {e}")))?;
            Ok((path.clone(), text))
        })
        .collect()
}

/// The Verilog flavor implied by `path`'s extension.
fn detect_extension(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("v") => Some("verilog"),
        Some("sv") => Some("systemverilog"),
        _ => None,
    }
}

fn parse_input(
    input: &Input,
    frontend: Frontend,
    toolchain: &Toolchain<'_>,
    config: &AutossConfig,
    sink: &DiagnosticSink,
) -> Result<SyntaxTree, CliError> {
    tracing::debug!(path = %input.path.display(), ?frontend, "parsing");
    match frontend {
        Frontend::Builtin => Ok(autoss_syntax::parse(
            &input.text,
            input.file,
            &config.tools.defines,
            sink,
        )),
        Frontend::Verible => {
            let json = toolchain.export_tree(&input.text)?;
            Ok(verible::load_json(&json, input.file, input.text.clone())?)
        }
    }
}

/// Prints the collected diagnostics; warnings are dropped in quiet mode.
pub fn render_diagnostics(
    sink: &DiagnosticSink,
    source_db: &SourceDb,
    global: &GlobalArgs,
    format: ReportFormat,
) -> usize {
    let renderer: Box<dyn DiagnosticRenderer> = match format {
        ReportFormat::Text => Box::new(TerminalRenderer::new(global.color)),
        ReportFormat::Json => Box::new(JsonRenderer),
    };
    let mut printed = 0;
    for diag in sink.take_all() {
        if global.quiet && diag.severity != Severity::Error {
            continue;
        }
        eprintln!("{}", renderer.render(&diag, source_db));
        printed += 1;
    }
    printed
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    const COUNTER: &str = "\
module A(input clk, input rst);
  reg [7:0] cnt;
  always @(posedge clk or posedge rst) begin
    if (rst) cnt <= 0;
    else cnt <= cnt + 1;
  end
endmodule
";

    const TOP: &str = "\
module TOP(input clk, input rst);
  A a0(.clk(clk), .rst(rst));
  A a1(.clk(clk), .rst(rst));
endmodule
";

    fn global() -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: None,
        }
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["autoss", "--frontend", "builtin", "--no-format"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    fn write(dir: &TempDir, name: &str, text: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn generates_hierarchy_from_files() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.v", COUNTER);
        let top = write(&dir, "top.sv", TOP);
        let out = dir.path().join("out.v");
        let cli = cli(&["TOP", out.to_str().unwrap(), &top, &a]);
        assert_eq!(run(&cli, &global()), 0);

        let text = fs::read_to_string(&out).unwrap();
        let a_pos = text.find("// MODULE A\n").unwrap();
        let top_pos = text.find("// MODULE TOP\n").unwrap();
        assert!(a_pos < top_pos);
        assert!(text.contains("output [15:0] auto_ss_out"), "{text}");
        assert!(text.contains(".auto_ss_in(auto_ss_in[8 +: 8])"), "{text}");
        assert!(text.contains("assign auto_ss_out[0 +: 8] = cnt;"), "{text}");
    }

    #[test]
    fn prefix_override_renames_ports() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.v", COUNTER);
        let cli = cli(&["--prefix", "snap", "A", "-", &a]);
        let mut db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let text = generate(&cli, &global(), &mut db, &sink).unwrap();
        assert!(text.contains("input [7:0] snap_in"), "{text}");
        assert!(!text.contains("auto_ss"), "{text}");
    }

    #[test]
    fn config_file_is_applied() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.v", COUNTER);
        let config = write(&dir, "autoss.toml", "prefix = \"st\"\n");
        let cli = cli(&["A", "-", &a]);
        let global = GlobalArgs {
            config: Some(config),
            ..global()
        };
        let mut db = SourceDb::new();
        let text = generate(&cli, &global, &mut db, &DiagnosticSink::new()).unwrap();
        assert!(text.contains("st_wr"), "{text}");
    }

    #[test]
    fn invalid_prefix_is_rejected() {
        let err = resolve_config(None, Some("9bad")).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn wrong_extension_is_rejected_before_processing() {
        let dir = TempDir::new().unwrap();
        let vhd = write(&dir, "a.vhd", "entity a is end;");
        let err = read_inputs(&[PathBuf::from(vhd)]).unwrap_err();
        assert!(matches!(err, CliError::InvalidSourceInput { .. }));
    }

    #[test]
    fn missing_and_directory_inputs_are_rejected() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.v");
        match read_inputs(&[missing]).unwrap_err() {
            CliError::InvalidSourceInput { reason, .. } => assert_eq!(reason, "file not found"),
            other => panic!("unexpected error {other:?}"),
        }
        let sub = dir.path().join("rtl.v");
        fs::create_dir(&sub).unwrap();
        match read_inputs(&[sub]).unwrap_err() {
            CliError::InvalidSourceInput { reason, .. } => {
                assert_eq!(reason, "not a regular file")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn failure_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let top = write(&dir, "top.v", TOP);
        let out = dir.path().join("out.v");
        let cli = cli(&["TOP", out.to_str().unwrap(), &top]);
        assert_eq!(run(&cli, &global()), 1);
        assert!(!out.exists());
    }

    #[test]
    fn duplicate_definitions_across_files_fail() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.v", COUNTER);
        let b = write(&dir, "b.v", COUNTER);
        let cli = cli(&["A", "-", &a, &b]);
        let mut db = SourceDb::new();
        let err = generate(&cli, &global(), &mut db, &DiagnosticSink::new()).unwrap_err();
        assert!(err.to_string().contains("defined in both"), "{err}");
    }

    #[test]
    fn syntax_errors_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "bad.v", "module m;\n`endif\nendmodule\n");
        let cli = cli(&["m", "-", &bad]);
        let mut db = SourceDb::new();
        let sink = DiagnosticSink::new();
        let err = generate(&cli, &global(), &mut db, &sink).unwrap_err();
        assert!(matches!(err, CliError::ParseErrors { .. }), "{err}");
        assert!(sink.has_errors());
    }

    #[test]
    fn quiet_mode_prints_only_errors() {
        use autoss_diagnostics::{Category, Diagnostic, DiagnosticCode};
        use autoss_source::Span;

        let db = SourceDb::new();
        let code = DiagnosticCode::new(Category::Warning, 1);
        let warn = || Diagnostic::warning(code, "instance array treated as one instance", Span::DUMMY);

        let sink = DiagnosticSink::new();
        sink.emit(warn());
        assert_eq!(render_diagnostics(&sink, &db, &global(), ReportFormat::Json), 0);

        let loud = GlobalArgs {
            quiet: false,
            ..global()
        };
        sink.emit(warn());
        sink.emit(CliError::ParseErrors { count: 2 }.to_diagnostic());
        assert_eq!(render_diagnostics(&sink, &db, &loud, ReportFormat::Text), 2);
    }

    #[test]
    fn extensions() {
        assert_eq!(detect_extension(Path::new("a.v")), Some("verilog"));
        assert_eq!(detect_extension(Path::new("a.sv")), Some("systemverilog"));
        assert_eq!(detect_extension(Path::new("a.vh")), None);
        assert_eq!(detect_extension(Path::new("Makefile")), None);
    }
}
