//! Developer tool: prints the layout tables for a runtime build. It is a
//! debugging aid for layout work and not part of the library's inspection API.

use clap::Parser;
use heapview::{
    bridge::{HostBridge, RuntimeBridge},
    layout::{Layout, LayoutKind, LayoutRegistry, RuntimeBuild},
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Developer tool: print the field layouts heapview uses for a runtime build"
)]
struct Args {
    /// Runtime build (e.g. 1.0); defaults to the in-process runtime
    #[arg(short, long)]
    build: Option<RuntimeBuild>,
    /// Layout to print (e.g. tuple, Type)
    #[arg(short, long, conflicts_with = "all")]
    kind: Option<LayoutKind>,
    /// Print every layout
    #[arg(short, long)]
    all: bool,
}

fn print_layout(layout: &Layout) {
    let parent = layout
        .parent
        .map(|p| format!(" : {}", p))
        .unwrap_or_default();
    println!(
        "{}{} (basic size {}, item size {})",
        layout.name(),
        parent,
        layout.basic_size,
        layout.item_size
    );
    for field in &layout.fields {
        let mut notes = Vec::new();
        if field.guarded {
            notes.push("guarded");
        }
        if layout.length_field == Some(field.name) {
            notes.push("length");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!("  [{}]", notes.join(", "))
        };
        println!(
            "  {:>4}  {:<22} {}{}",
            field.offset,
            field.name,
            field.kind.type_tag(),
            notes
        );
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let build = args.build.unwrap_or_else(|| HostBridge.build());
    let registry = match LayoutRegistry::for_build(build) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("runtime build {}", registry.build());
    if args.all {
        for layout in registry.layouts() {
            println!();
            print_layout(layout);
        }
        return ExitCode::SUCCESS;
    }

    let kind = args.kind.unwrap_or(LayoutKind::Object);
    match registry.get(kind) {
        Ok(layout) => {
            println!();
            print_layout(&layout);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
