//! Binary entry point for the scriptgen CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use clap::Parser;
use thiserror::Error;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use scriptgen::{
    ConfigError, InitBuilder, LibraryFunction, OsFamily, Script, ScriptError, ScriptgenConfig,
    statement::interpret,
};

use cli::{Cli, FamilyArg, FunctionsCommand, RenderCommand};

mod cli;

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("invalid export `{0}`: expected KEY=VALUE with a non-empty key")]
    InvalidExport(String),
    #[error("failed to write `{path}`: {message}")]
    Write { path: String, message: String },
    #[error("rendered script is {bytes} bytes, above the {limit} byte payload limit")]
    Oversize { bytes: usize, limit: u64 },
    #[error("failed to encode diagnostics: {0}")]
    Diagnostics(String),
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).without_time())
        .try_init()
        .ok();
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Render(command) => {
            let config = ScriptgenConfig::load_without_cli_args()?;
            config.validate()?;
            render(&command, &config)
        }
        Cli::Functions(command) => list_functions(&command, io::stdout()),
    }
}

const fn family_from_arg(arg: FamilyArg) -> OsFamily {
    match arg {
        FamilyArg::Unix => OsFamily::Unix,
        FamilyArg::Windows => OsFamily::Windows,
    }
}

fn render(args: &RenderCommand, config: &ScriptgenConfig) -> Result<(), CliError> {
    let family = args
        .family
        .map_or_else(|| config.family(), |arg| Ok(family_from_arg(arg)))?;
    let script = build_script(args, config, family)?;
    let diagnostics = script.diagnostics();
    debug!(
        instance = %args.name,
        family = %family,
        bytes = diagnostics.bytes,
        "rendered control script"
    );

    if args.diagnostics {
        let encoded = serde_json::to_string(&diagnostics)
            .map_err(|err| CliError::Diagnostics(err.to_string()))?;
        writeln!(io::stderr(), "{encoded}").ok();
    }

    check_payload_size(&script, config)?;

    match args.output.as_deref() {
        Some(path) => write_script_file(Utf8Path::new(path), &script),
        None => io::stdout()
            .write_all(script.as_str().as_bytes())
            .map_err(|err| CliError::Write {
                path: String::from("<stdout>"),
                message: err.to_string(),
            }),
    }
}

fn build_script(
    args: &RenderCommand,
    config: &ScriptgenConfig,
    family: OsFamily,
) -> Result<Script, CliError> {
    let mut builder = InitBuilder::new(args.name.as_str());
    if let Some(home) = args
        .home
        .as_deref()
        .or(config.default_instance_home.as_deref())
    {
        builder = builder.instance_home(home);
    }
    if let Some(log_dir) = args.log_dir.as_deref().or(config.default_log_dir.as_deref()) {
        builder = builder.log_dir(log_dir);
    }
    for export in &args.exports {
        let (key, value) = parse_export(export)?;
        builder = builder.export_variable(key, value);
    }
    for line in &args.init {
        builder = builder.init_statement(interpret([line.as_str()]));
    }
    for line in &args.run {
        builder = builder.run_statement(interpret([line.as_str()]));
    }
    Ok(builder.build()?.build(family)?)
}

fn parse_export(export: &str) -> Result<(&str, &str), CliError> {
    export
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim(), value))
        .ok_or_else(|| CliError::InvalidExport(export.to_owned()))
}

fn check_payload_size(script: &Script, config: &ScriptgenConfig) -> Result<(), CliError> {
    if !script.exceeds(config.max_payload_bytes) {
        return Ok(());
    }
    if config.fail_on_oversize {
        return Err(CliError::Oversize {
            bytes: script.len(),
            limit: config.max_payload_bytes,
        });
    }
    warn!(
        bytes = script.len(),
        limit = config.max_payload_bytes,
        "rendered script exceeds the payload limit"
    );
    Ok(())
}

fn write_script_file(path: &Utf8Path, script: &Script) -> Result<(), CliError> {
    let failure = |message: String| CliError::Write {
        path: path.to_string(),
        message,
    };
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| failure(String::from("output path is missing a file name")))?;

    Dir::create_ambient_dir_all(parent, ambient_authority())
        .map_err(|err| failure(err.to_string()))?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| failure(err.to_string()))?;
    dir.write(file_name, script.as_str())
        .map_err(|err| failure(err.to_string()))?;
    debug!(path = %path, bytes = script.len(), "wrote control script");
    Ok(())
}

fn list_functions(args: &FunctionsCommand, mut target: impl Write) -> Result<(), CliError> {
    let failure = |err: io::Error| CliError::Write {
        path: String::from("<stdout>"),
        message: err.to_string(),
    };
    for function in LibraryFunction::ALL {
        if let Some(arg) = args.family {
            target
                .write_all(function.definition(family_from_arg(arg)).as_bytes())
                .map_err(failure)?;
            continue;
        }
        let dependencies: Vec<&str> = function
            .dependencies()
            .iter()
            .map(|dependency| dependency.name())
            .collect();
        if dependencies.is_empty() {
            writeln!(target, "{}", function.name()).map_err(failure)?;
        } else {
            writeln!(target, "{}: {}", function.name(), dependencies.join(", "))
                .map_err(failure)?;
        }
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
