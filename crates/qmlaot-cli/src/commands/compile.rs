//! `qmlaot compile`: visit the document, then generate native code for
//! its functions.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use qmlaot_codegen::{compile_unit, emit_compilation_unit, RawUnit, TypeNames, TypeResolver};
use qmlaot_scope::logger::COMPILER;
use qmlaot_scope::Span;

use crate::output::{emit, line_span, Report};

use super::{GlobalOptions, Session};

pub struct CompileArgs<'a> {
    pub document: &'a Path,
    pub types: &'a [PathBuf],
    pub functions: &'a Path,
    pub output: Option<&'a Path>,
}

pub fn execute(options: &GlobalOptions, args: CompileArgs<'_>) -> anyhow::Result<ExitCode> {
    let mut session = Session::load(args.document, args.types)?;
    let config = session.manifest.logger_config()?;
    let mut result = session.visit(config);
    let file_path = session.document.file_path.clone();

    let json_to_stdout = args.output.is_some();
    if result.logger.has_errors() {
        let report = Report::new(file_path, session.source.take(), result.logger.into_diagnostics());
        emit_report(&report, options, json_to_stdout)?;
        return Ok(ExitCode::FAILURE);
    }

    let text = std::fs::read_to_string(args.functions)
        .with_context(|| format!("Failed to read functions {}", args.functions.display()))?;
    let resolver = TypeResolver::new(&session.arena, &session.builtins);
    let names = TypeNames::new(resolver, &session.types).with_document(&result, session.document.component_name());
    let unit = RawUnit::from_json(&text)
        .and_then(|raw| raw.resolve(&names))
        .with_context(|| format!("Failed to load functions {}", args.functions.display()))?;

    let compiled = compile_unit(resolver, &unit, session.manifest.compiler);
    for rejected in &compiled.rejected {
        let span = match (&session.source, rejected.line) {
            (Some(source), Some(line)) => line_span(source, line),
            (None, Some(line)) => Span::new(0, 0, line, 1),
            (_, None) => Span::default(),
        };
        result
            .logger
            .log(&COMPILER, format!("{}: {}", rejected.function, rejected.rejection), span);
    }

    let code = emit_compilation_unit(&file_path, &compiled.compiled);
    match args.output {
        Some(path) => std::fs::write(path, &code).with_context(|| format!("Failed to write {}", path.display()))?,
        None => std::io::stdout().write_all(code.as_bytes())?,
    }
    tracing::info!(
        file = %file_path,
        compiled = compiled.compiled.len(),
        rejected = compiled.rejected.len(),
        "wrote compilation unit"
    );

    // `compiler` may be configured as an error.
    let has_errors = result.logger.has_errors();
    let report = Report::new(file_path, session.source.take(), result.logger.into_diagnostics());
    emit_report(&report, options, json_to_stdout)?;
    Ok(if has_errors { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn emit_report(report: &Report, options: &GlobalOptions, json_to_stdout: bool) -> anyhow::Result<()> {
    if json_to_stdout {
        emit(report, options.format, options.color, &mut std::io::stdout())
    } else {
        emit(report, options.format, options.color, &mut std::io::stderr())
    }
}
