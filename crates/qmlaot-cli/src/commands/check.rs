//! `qmlaot check`: run the import visitor and report its diagnostics.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::output::{emit, Report};

use super::{GlobalOptions, Session};

pub fn execute(options: &GlobalOptions, document: &Path, types: &[PathBuf]) -> anyhow::Result<ExitCode> {
    let mut session = Session::load(document, types)?;
    let config = session.manifest.logger_config()?;
    let result = session.visit(config);
    let has_errors = result.logger.has_errors();

    let report = Report::new(
        session.document.file_path.clone(),
        session.source.take(),
        result.logger.into_diagnostics(),
    );
    emit(&report, options.format, options.color, &mut std::io::stdout())?;

    Ok(if has_errors { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
