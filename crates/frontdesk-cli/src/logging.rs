// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_ENV: &str = "FRONTDESK_LOG";
const DEFAULT_DIRECTIVE: &str = "frontdesk=info";
const KEEP_DAILY_FILES: usize = 7;

pub fn default_log_path() -> Result<PathBuf> {
    let root = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or_else(|| anyhow!("cannot resolve a log directory; pass --log-file <path>"))?;
    Ok(root.join("frontdesk").join("frontdesk.log"))
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// File appender for `path`. Daily rotation keeps a week of files named
/// `<file>.<date>`; `Rotation::NEVER` writes to `path` itself.
pub fn file_appender(path: &Path, rotation: Rotation) -> Result<RollingFileAppender> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("log path {} has no file name", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("create log directory {}", dir.display()))?;

    let daily = rotation == Rotation::DAILY;
    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file_name);
    if daily {
        builder = builder.max_log_files(KEEP_DAILY_FILES);
    }
    builder.build(dir).with_context(|| {
        format!(
            "open log file {} -- pass --log-file to use another path",
            path.display()
        )
    })
}

/// Sends events to a background writer for `path`. The terminal belongs to
/// the UI, so nothing goes to stdout or stderr. Keep the guard alive until
/// exit so buffered events are flushed.
pub fn init(path: &Path, rotation: Rotation) -> Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(path, rotation)?);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .try_init()
        .context("install log subscriber")?;
    Ok(guard)
}
