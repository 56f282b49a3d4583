//! Process-backed remapping engine.

use super::{RemapEngine, RemapEngineError, RemapRequest};
use crate::process;
use camino::Utf8PathBuf;
use std::io::{BufWriter, Write};
use std::process::Command;

const SOURCE_LABEL: &str = "source";
const TARGET_LABEL: &str = "target";

/// Runs a tiny-remapper fat jar with the request's mappings written to a
/// temporary Tiny v1 file.
#[derive(Debug, Clone)]
pub struct TinyRemapperEngine {
    pub java: Utf8PathBuf,
    pub jar: Utf8PathBuf,
    pub threads: Option<usize>,
}

impl TinyRemapperEngine {
    pub fn new(java: impl Into<Utf8PathBuf>, jar: impl Into<Utf8PathBuf>) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
            threads: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    fn command(&self, request: &RemapRequest<'_>, mappings: &std::path::Path) -> Command {
        let mut command = Command::new(self.java.as_std_path());
        command
            .arg("-jar")
            .arg(&self.jar)
            .arg(request.input)
            .arg(request.output)
            .arg(mappings)
            .arg(SOURCE_LABEL)
            .arg(TARGET_LABEL)
            .args(request.classpath)
            .arg("--rebuildsourcefilenames");
        if request.rename_invalid_locals {
            command.arg("--renameinvalidlocals");
        }
        if let Some(threads) = self.threads {
            command.arg(format!("--threads={threads}"));
        }
        command
    }
}

impl RemapEngine for TinyRemapperEngine {
    fn remap(&self, request: &RemapRequest<'_>) -> Result<(), RemapEngineError> {
        // Labels are fixed: `from` and `to` may be the same namespace.
        let mut mappings = tempfile::Builder::new()
            .prefix("jarpatch-")
            .suffix(".tiny")
            .tempfile()?;
        {
            let mut writer = BufWriter::new(mappings.as_file_mut());
            request
                .mappings
                .write_tiny_v1(&mut writer, SOURCE_LABEL, TARGET_LABEL)?;
            writer.flush()?;
        }
        tracing::debug!(
            "Remapping {} ({} -> {}) with {} entries",
            request.input,
            request.from,
            request.to,
            request.mappings.len()
        );

        let mut command = self.command(request, mappings.path());
        process::run(&mut command).map_err(RemapEngineError::new)
    }
}
