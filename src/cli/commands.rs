use crate::cli::args::{DebugArgs, DisasmArgs, OutputFormat, RunArgs};
use crate::config::Config;
use crate::debugger::{realign, Instrumentation, PositionOracle, StepTracer};
use crate::runtime::disasm::{render_text, UnitListing};
use crate::runtime::error::{RuntimeError, TraceEntry};
use crate::runtime::executor::Engine;
use crate::runtime::loader::load_program;
use crate::runtime::value::Value;
use crate::source::SourceCache;
use crate::ui::{ConsoleRenderer, RustylinePrompt};
use crate::{DebuggerError, Result};
use std::path::Path;
use std::rc::Rc;
use tracing::info;

fn program_args(args: &[String]) -> Value {
    Value::list(args.iter().map(|arg| Value::str(arg)).collect())
}

/// Exit status after the operator confirms an interrupt.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Process exit status for a failed command.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DebuggerError>() {
        Some(DebuggerError::Terminated) => EXIT_INTERRUPTED,
        _ => 1,
    }
}

/// Turn the outcome of a run into the command result, printing the
/// traceback of runtime errors with lines mapped through `resolve`.
fn finish(result: std::result::Result<Value, RuntimeError>, resolve: impl Fn(&TraceEntry) -> u32) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.is_halted() => Err(DebuggerError::Terminated.into()),
        Err(err) => {
            eprintln!("{}", err.render_traceback(resolve));
            Err(DebuggerError::ExecutionError(err.kind.to_string()).into())
        }
    }
}

/// Execute the run command.
pub fn run(args: RunArgs) -> Result<()> {
    let program = load_program(&args.program)?;

    let mut engine = Engine::new();
    engine.set_global("args", program_args(&args.args));
    let result = engine.run_module(Rc::new(program.unit));

    finish(result, |entry| entry.line)
}

/// Execute the debug command.
pub fn debug(args: DebugArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path).map_err(|e| DebuggerError::ConfigError(e.to_string()))?;
    let program = load_program(&args.program)?;

    let mut options = config.console_options();
    if args.no_clear {
        options.clear_screen = false;
    }
    if args.no_color {
        options.color = false;
    }

    let mut sources = SourceCache::new();
    sources.register(&program.unit.filename, &program.source);

    let prompt = RustylinePrompt::new()
        .map_err(|e| DebuggerError::ExecutionError(format!("Failed to open input: {}", e)))?;

    let oracle = Rc::new(PositionOracle::new());
    let tracer = Rc::new(
        StepTracer::new(
            Rc::clone(&oracle),
            Box::new(ConsoleRenderer::stdout(options)),
            Box::new(prompt),
        )
        .with_settings(config.tracer_settings())
        .with_sources(sources),
    );

    let mut engine = Engine::new();
    engine.set_global("args", program_args(&args.args));

    let guard = Instrumentation::install(engine.hooks(), Rc::clone(&oracle), tracer.clone());
    let result = engine.run_module(Rc::new(program.unit));
    guard.restore();

    info!(
        activations = tracer.activations(),
        units = oracle.len(),
        "Debug session finished"
    );

    finish(result, |entry| {
        oracle.resolve(entry.unit, entry.offset).unwrap_or(entry.line)
    })
}

/// Execute the disasm command.
pub fn disasm(args: DisasmArgs) -> Result<()> {
    let program = load_program(&args.program)?;
    let mut unit = program.unit;

    let oracle = PositionOracle::new();
    if args.realign {
        let rewritten = realign(&oracle, &mut unit);
        info!(units = rewritten, "Realigned program");
    }

    let listings: Vec<UnitListing> = unit
        .walk()
        .into_iter()
        .map(|unit| {
            let listing = UnitListing::new(unit);
            match oracle.table(unit.id()) {
                Some(table) => listing.with_true_lines((*table).clone()),
                None => listing,
            }
        })
        .collect();

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&listings)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listings)?),
    }
    Ok(())
}
