// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use frontdesk_api::Client;
use frontdesk_app::{AppState, ScreenKind};
use frontdesk_store::Store;
use frontdesk_testkit::{BackendData, DEMO_PASSWORD, DEMO_USERNAME, MockBackend};
use runtime::ApiRuntime;
use std::env;
use std::path::PathBuf;
use tracing_appender::rolling::Rotation;

const DEMO_SEED: u64 = 2026;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `frontdesk --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let (log_path, rotation) = match options.log_file.clone() {
        Some(path) => (path, Rotation::NEVER),
        None => (logging::default_log_path()?, Rotation::DAILY),
    };
    let _log_guard = logging::init(&log_path, rotation)?;

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or FRONTDESK_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    if options.logout {
        if store.clear_session()? {
            println!("signed out");
        } else {
            println!("no stored session");
        }
        return Ok(());
    }

    let demo_backend = if options.demo {
        Some(MockBackend::start(BackendData::demo(DEMO_SEED))?)
    } else {
        None
    };
    let base_url = match &demo_backend {
        Some(backend) => backend.base_url().to_owned(),
        None => config.base_url().to_owned(),
    };

    let client = Client::new(&base_url, config.timeout()?, config.retry_transport())
        .with_context(|| {
            format!(
                "invalid [server] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
    if options.check_only {
        client
            .ping()
            .with_context(|| format!("backend check against {base_url}"))?;
        println!("ok: {base_url} reachable, database {}", db_path.display());
        return Ok(());
    }

    let mut runtime = ApiRuntime::new(client, &store);
    if options.demo {
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;
    }

    let mut state = AppState::default();
    state.active_screen = store
        .get_start_screen()?
        .or_else(|| config.start_screen())
        .unwrap_or(ScreenKind::Dashboard);
    state.room_filter = store.get_room_filter()?;
    tracing::info!(
        base_url = %base_url,
        demo = options.demo,
        screen = state.active_screen.as_str(),
        page_size = config.page_size(),
        "starting"
    );

    let result = frontdesk_tui::run_app(&mut state, &mut runtime, config.page_size());
    if !options.demo
        && let Err(error) = store.put_start_screen(state.active_screen)
    {
        tracing::warn!(error = %error, "save last screen");
    }
    tracing::info!("exiting");
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    log_file: Option<PathBuf>,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    logout: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        log_file: None,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        logout: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--log-file" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--log-file requires a file path"))?;
                if value.as_ref().starts_with("--") {
                    return Err(anyhow::anyhow!(
                        "--log-file requires a file path, got flag {:?}",
                        value.as_ref()
                    ));
                }
                options.log_file = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--logout" => {
                options.logout = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    if options.logout && (options.check_only || options.demo) {
        return Err(anyhow::anyhow!(
            "--logout only clears the stored session; run it without --check or --demo"
        ));
    }

    Ok(options)
}

fn print_help() {
    println!("frontdesk: hotel admin console");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Run against a built-in fake backend (in-memory)");
    println!("  --check                  Validate config + DB and ping the backend");
    println!("  --logout                 Forget the stored session");
    println!("  --log-file <path>        Write logs to <path>");
    println!("  --help                   Show this help");
}
