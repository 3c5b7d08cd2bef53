use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use clap::Parser;
use cs_core::{ScriptError, ScriptSettings, WeightUnit};
use cs_model::{create_resolver, resolver_options, Entity, Sheet};
use cs_runtime::{ScriptResolver, ScriptSelfProvider};
use serde_json::Value;

mod cli_args;
mod error_map;

pub(crate) use cli_args::{Cli, Mode};
pub(crate) use error_map::{
    emit_error, map_cli_self_not_found, map_cli_self_without_sheet, map_cli_sheet_invalid,
    map_cli_sheet_read,
};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    install_logging(cli.verbose);
    match run(cli) {
        Ok(value) => emit_value(&value),
        Err(error) => emit_error(error),
    }
}

/// Writes log output to stderr so stdout keeps the line protocol.
fn install_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn emit_value(value: &Value) -> i32 {
    println!("RESULT:OK");
    println!(
        "VALUE_JSON:{}",
        serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
    );
    0
}

fn run(cli: Cli) -> Result<Value, ScriptError> {
    let mut options = resolver_options(cli.seed);
    if let Some(seconds) = cli.timeout {
        options.settings = ScriptSettings::with_exec_time(seconds);
    }
    let resolver = create_resolver(options)?;
    let entity = match &cli.sheet {
        Some(path) => Some(load_entity(path, &resolver, cli.seed)?),
        None => None,
    };
    let self_provider = match (&cli.self_id, &entity) {
        (None, _) => None,
        (Some(_), None) => return Err(map_cli_self_without_sheet()),
        (Some(id), Some(entity)) => Some(
            entity
                .self_provider_for(id)
                .ok_or_else(|| map_cli_self_not_found(id))?,
        ),
    };
    tracing::debug!(sheet = ?cli.sheet, self_id = ?cli.self_id, "resolving from the command line");

    let target = Target {
        resolver: &resolver,
        entity: entity.as_ref(),
        self_provider: self_provider.as_ref(),
    };
    Ok(match cli.command {
        Mode::Script(args) => Value::from(target.script(&args.text)),
        Mode::Text(args) => Value::from(target.text(&args.text)),
        Mode::Number(args) => Value::from(target.number(&args.text)),
        Mode::Weight(args) => Value::from(target.weight_in_pounds(&args.text)),
    })
}

fn load_entity(
    path: &str,
    resolver: &Arc<ScriptResolver>,
    seed: Option<u32>,
) -> Result<Arc<Entity>, ScriptError> {
    let raw = fs::read_to_string(path).map_err(map_cli_sheet_read)?;
    let sheet = Sheet::from_json(&raw).map_err(map_cli_sheet_invalid)?;
    Ok(Entity::with_random_seed(sheet, Arc::clone(resolver), seed))
}

/// Routes a resolution through the entity when a sheet was loaded.
struct Target<'a> {
    resolver: &'a Arc<ScriptResolver>,
    entity: Option<&'a Arc<Entity>>,
    self_provider: Option<&'a ScriptSelfProvider>,
}

impl Target<'_> {
    fn script(&self, text: &str) -> String {
        match self.entity {
            Some(entity) => entity.resolve_script(self.self_provider, text),
            None => self.resolver.resolve_script(None, self.self_provider, text),
        }
    }

    fn text(&self, text: &str) -> String {
        match self.entity {
            Some(entity) => entity.resolve_text(self.self_provider, text),
            None => self.resolver.resolve_text(None, self.self_provider, text),
        }
    }

    fn number(&self, text: &str) -> f64 {
        match self.entity {
            Some(entity) => entity.resolve_to_number(self.self_provider, text),
            None => self.resolver.resolve_to_number(None, self.self_provider, text),
        }
    }

    fn weight_in_pounds(&self, text: &str) -> f64 {
        match self.entity {
            Some(entity) => entity.resolve_to_weight(self.self_provider, text).pounds(),
            None => self
                .resolver
                .resolve_to_weight(None, self.self_provider, text, WeightUnit::default())
                .pounds(),
        }
    }
}

#[cfg(test)]
mod tests;
