//! # locus - Main Entry Point
//!
//! Supports two modes:
//! - **Check** (default): print the filter decision for each FILE
//! - **Demo** (`--demo`): register the filter, build a one-thread stack from
//!   FILES on the in-memory runtime and resolve its location through the
//!   sampler dispatch, exactly as a live sample would

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::sync::Arc;

use locus::cli::Args;
use locus::filter;
use locus::registration::{dump_current_filter, register_config, LocatorSlot};
use locus::runtime::memory::{FrameSpec, MemoryRuntime};
use locus::ThreadId;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.to_string().contains("Missing required argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = args.filter_config().context("Failed to load filter configuration")?;

    if args.files.is_empty() && !args.dump {
        anyhow::bail!(
            "Missing required argument: FILE or --dump\n\n\
             Usage:\n  \
             locus -p mymodule -b ~/proj app.py\n\n\
             Run 'locus --help' for more options"
        );
    }

    if args.demo {
        return run_demo(&args, &config);
    }

    let trace_filter = config.build().context("Invalid filter")?;
    drop(filter::install(trace_filter));
    if args.dump {
        dump_current_filter();
    }

    let Some(active) = filter::current() else {
        anyhow::bail!("No filter installed");
    };
    for file in &args.files {
        let decision = active.evaluate(file);
        if args.quiet {
            if decision.is_traced() {
                println!("{file}");
            }
        } else {
            println!("{:<28} {file}", decision.to_string());
        }
    }

    Ok(())
}

fn run_demo(args: &Args, config: &locus::config::FilterConfig) -> Result<()> {
    const DEMO_THREAD: ThreadId = ThreadId(1);

    let runtime = Arc::new(MemoryRuntime::new());
    runtime.bind_current_thread(DEMO_THREAD);
    runtime.set_stack(
        DEMO_THREAD,
        args.files.iter().zip(1..).map(|(file, line)| FrameSpec::new(file.as_str(), line * 10)),
    );

    let sampler = LocatorSlot::new();
    register_config(&runtime, &sampler, config).context("Registration failed")?;
    if args.dump {
        dump_current_filter();
    }

    let location = sampler.sample();
    info!("Demo sample resolved to {location}");
    if location.found {
        println!("{location}");
    } else {
        println!("{} (no traceable frame)", location.filename);
    }

    Ok(())
}
