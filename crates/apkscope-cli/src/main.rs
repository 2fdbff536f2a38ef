//! apkscope CLI: query decompiled Android applications and trace callers of
//! sensitive methods back to their entry points.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

use apkscope_core::config::{AnalysisConfig, ComponentType};
use apkscope_core::output::{build_report, render_call_tree, write_output};
use apkscope_core::pipeline;
use apkscope_core::session::AnalysisSession;

#[derive(Parser)]
#[command(
    name = "apkscope",
    about = "apkscope - Map the attack surface of a decompiled Android application"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Decompiler output directory (sources/ + resources/) or JSON corpus dump
    path: PathBuf,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Additional file or directory names to skip while loading
    #[arg(long)]
    exclude: Vec<String>,

    /// Log debug output and per-phase timings
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except results and errors
    #[arg(long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise the loaded application
    Info {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the raw AndroidManifest.xml
    Manifest {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the launcher activity
    MainActivity {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// List exported components
    Components {
        #[command(flatten)]
        source: SourceArgs,

        /// Only show one component type (activity, service, receiver, provider)
        #[arg(long = "type")]
        component_type: Option<String>,
    },
    /// List every class
    Classes {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show a class's details and source
    Class {
        #[command(flatten)]
        source: SourceArgs,

        /// Fully qualified class name
        name: String,
    },
    /// List the methods of a class
    Methods {
        #[command(flatten)]
        source: SourceArgs,

        class: String,
    },
    /// List the fields of a class
    Fields {
        #[command(flatten)]
        source: SourceArgs,

        class: String,
    },
    /// Print the source of one method
    Method {
        #[command(flatten)]
        source: SourceArgs,

        class: String,
        method: String,
    },
    /// Search classes by name
    SearchClass {
        #[command(flatten)]
        source: SourceArgs,

        query: String,
    },
    /// Search methods by name across all classes
    SearchMethod {
        #[command(flatten)]
        source: SourceArgs,

        query: String,
    },
    /// List resource files
    Resources {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print one resource file
    Resource {
        #[command(flatten)]
        source: SourceArgs,

        name: String,
    },
    /// Trace the callers of a method back to its entry points
    Callgraph {
        #[command(flatten)]
        source: SourceArgs,

        /// Method name, `Class.method`, or a qualified suffix
        method: String,

        /// Maximum caller hops from a target
        #[arg(long)]
        max_depth: Option<usize>,

        /// Write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { source } => {
            let session = open_session(&source, None);
            let info = session.apk_info();
            if source.json {
                print_json(&info);
            } else {
                println!("{}", style("=== APK INFO ===").bold());
                println!("  {:<22} {}", "Input:", info.input_path);
                println!(
                    "  {:<22} {}",
                    "Package:",
                    info.package_name.as_deref().unwrap_or("-")
                );
                println!("  {:<22} {}", "Classes:", info.total_classes);
                println!("  {:<22} {}", "Resources:", info.total_resources);
                println!("  {:<22} {}", "Exported components:", info.exported_components);
                println!(
                    "  {:<22} {}",
                    "Main activity:",
                    info.main_activity.as_deref().unwrap_or("-")
                );
            }
            print_timings(&session, &source);
        }
        Commands::Manifest { source } => {
            let session = open_session(&source, None);
            let manifest = session.android_manifest().unwrap_or_else(|e| fail(e));
            if source.json {
                print_json(&manifest);
            } else {
                println!("{manifest}");
            }
        }
        Commands::MainActivity { source } => {
            let session = open_session(&source, None);
            let main = session.main_activity().unwrap_or_else(|e| fail(e));
            match (source.json, main) {
                (true, main) => print_json(&main),
                (false, Some(name)) => println!("{name}"),
                (false, None) => println!("No main activity declared"),
            }
        }
        Commands::Components {
            source,
            component_type,
        } => {
            let session = open_session(&source, None);
            let filter = component_type.map(|t| {
                ComponentType::from_str_value(&t)
                    .unwrap_or_else(|| fail(format!("unknown component type: {t}")))
            });
            let components: Vec<_> = session
                .exported_components()
                .unwrap_or_else(|e| fail(e))
                .iter()
                .filter(|c| filter.map_or(true, |t| c.component_type == t))
                .collect();
            if source.json {
                print_json(&components);
            } else {
                println!(
                    "{}",
                    style(format!("=== EXPORTED COMPONENTS ({}) ===", components.len())).bold()
                );
                for component in components {
                    println!("\n{component}");
                }
            }
        }
        Commands::Classes { source } => {
            let session = open_session(&source, None);
            let classes = session.all_classes();
            if source.json {
                print_json(&classes);
            } else {
                println!(
                    "{}",
                    style(format!("=== ALL CLASSES ({}) ===", classes.len())).bold()
                );
                for name in classes {
                    println!("{name}");
                }
            }
        }
        Commands::Class { source, name } => {
            let session = open_session(&source, None);
            let details = session.class_details(&name).unwrap_or_else(|e| fail(e));
            if source.json {
                print_json(&details);
            } else {
                println!("{}", style(format!("=== CLASS: {} ===", details.full_name)).bold());
                println!("  {:<10} {}", "Package:", details.package);
                println!("  {:<10} {}", "Methods:", details.method_count);
                println!("  {:<10} {}", "Fields:", details.field_count);
                println!("\n{}", details.source_code);
            }
        }
        Commands::Methods { source, class } => {
            let session = open_session(&source, None);
            let methods = session.methods_of_class(&class).unwrap_or_else(|e| fail(e));
            print_list(&source, &format!("METHODS IN: {class}"), &methods);
        }
        Commands::Fields { source, class } => {
            let session = open_session(&source, None);
            let fields = session.fields_of_class(&class).unwrap_or_else(|e| fail(e));
            print_list(&source, &format!("FIELDS IN: {class}"), &fields);
        }
        Commands::Method {
            source,
            class,
            method,
        } => {
            let session = open_session(&source, None);
            let code = session
                .method_source(&class, &method)
                .unwrap_or_else(|e| fail(e));
            if source.json {
                print_json(&code);
            } else {
                println!("{code}");
            }
        }
        Commands::SearchClass { source, query } => {
            let session = open_session(&source, None);
            let names: Vec<&str> = session
                .search_classes(&query)
                .iter()
                .map(|c| c.full_name.as_str())
                .collect();
            print_list(&source, &format!("CLASSES MATCHING: {query}"), &names);
        }
        Commands::SearchMethod { source, query } => {
            let session = open_session(&source, None);
            let results = session.search_methods(&query);
            if source.json {
                print_json(&results);
            } else {
                println!(
                    "{}",
                    style(format!("=== METHODS MATCHING: {query} ===")).bold()
                );
                for (class, methods) in &results {
                    println!("\n{}", style(class).cyan());
                    for method in methods {
                        println!("  - {method}");
                    }
                }
            }
        }
        Commands::Resources { source } => {
            let session = open_session(&source, None);
            let names = session.resource_names();
            print_list(&source, "RESOURCE FILES", &names);
        }
        Commands::Resource { source, name } => {
            let session = open_session(&source, None);
            let content = session.resource(&name).unwrap_or_else(|e| fail(e));
            if source.json {
                print_json(&content);
            } else {
                println!("{content}");
            }
        }
        Commands::Callgraph {
            source,
            method,
            max_depth,
            output,
        } => run_callgraph(&source, &method, max_depth, output),
    }
}

// ---------------------------------------------------------------------------
// Session setup
// ---------------------------------------------------------------------------

fn init_logging(source: &SourceArgs) {
    let level = if source.quiet {
        LevelFilter::ERROR
    } else if source.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_config(source: &SourceArgs, max_depth: Option<usize>) -> AnalysisConfig {
    let mut config = match &source.config {
        Some(path) => AnalysisConfig::from_file(path).unwrap_or_else(|e| fail(e)),
        None => AnalysisConfig::default(),
    };
    let input = source.path.canonicalize().unwrap_or_else(|_| source.path.clone());
    config.input_path = input.to_string_lossy().to_string();
    config.exclude_patterns.extend(source.exclude.iter().cloned());
    config.verbose |= source.verbose;
    config.quiet |= source.quiet;
    if let Some(depth) = max_depth {
        config.max_depth = depth;
    }
    config
}

fn open_session(source: &SourceArgs, max_depth: Option<usize>) -> AnalysisSession {
    init_logging(source);
    let config = build_config(source, max_depth);

    if config.quiet || source.json {
        return pipeline::run_pipeline(&config, None)
            .unwrap_or_else(|e| fail(format!("Loading failed: {e}")));
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(spinner) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(spinner.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message("Initialising...");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let session = match pipeline::run_pipeline(&config, Some(progress)) {
        Ok(s) => s,
        Err(e) => {
            pb.finish_and_clear();
            fail(format!("Loading failed: {e}"));
        }
    };
    pb.finish_and_clear();
    session
}

// ---------------------------------------------------------------------------
// Printing helpers
// ---------------------------------------------------------------------------

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {message}", style("error:").red().bold());
    std::process::exit(1);
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(format!("Error serialising output: {e}")),
    }
}

fn print_list<T: AsRef<str> + Serialize>(source: &SourceArgs, title: &str, items: &[T]) {
    if source.json {
        print_json(items);
        return;
    }
    println!("{}", style(format!("=== {title} ===")).bold());
    for item in items {
        println!("  - {}", item.as_ref());
    }
    println!("\nTotal: {}", items.len());
}

fn print_timings(session: &AnalysisSession, source: &SourceArgs) {
    if !source.verbose || source.json {
        return;
    }
    println!("\n  Phase Timings:");
    let mut timings: Vec<_> = session.timings().iter().collect();
    timings.sort_by(|a, b| a.0.cmp(b.0));
    for (phase, secs) in timings {
        println!("    {:<14} {:.1}ms", phase, secs * 1000.0);
    }
}

// ---------------------------------------------------------------------------
// Call graph
// ---------------------------------------------------------------------------

fn run_callgraph(
    source: &SourceArgs,
    method: &str,
    max_depth: Option<usize>,
    output: Option<PathBuf>,
) {
    let session = open_session(source, max_depth);
    let start = Instant::now();
    let result = session.call_graph(method);
    let report = build_report(method, &result, &session.config().input_path);

    if let Some(path) = &output {
        if let Err(e) = write_output(&report, path) {
            fail(format!("Error writing output: {e}"));
        }
    }

    if source.json {
        print_json(&report);
    } else if !result.success {
        println!("{} {}", style("✗").red().bold(), result.message);
        if !result.suggestions.is_empty() {
            println!("\nDid you mean:");
            for suggestion in &result.suggestions {
                println!("  - {suggestion}");
            }
        }
    } else {
        println!(
            "{}",
            style(format!("=== CALL GRAPH FOR: {method} ===")).bold()
        );
        print!("{}", render_call_tree(&result));

        println!("\n{}", style("=== ENTRY POINTS ===").bold());
        if report.entry_points.is_empty() {
            println!("No clear entry points found.");
        }
        for entry in &report.entry_points {
            println!("  - {}", entry.signature);
            if let Some(component) = &entry.exported {
                println!(
                    "    {} {}",
                    style("^ EXPORTED").yellow().bold(),
                    style(component.component_type.as_str().to_uppercase()).yellow()
                );
            }
        }

        println!("\n{}", style("=== SUMMARY ===").bold());
        println!("  {:<14} {}", "Targets:", report.targets.len());
        println!("  {:<14} {}", "Nodes:", result.graph.node_count());
        println!("  {:<14} {}", "Entry points:", report.entry_points.len());
        println!(
            "  {:<14} {:.1}ms",
            "Duration:",
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    if let Some(path) = output {
        if !source.quiet && !source.json {
            println!(
                "\n  {} {}",
                style("Output written to:").green(),
                path.display()
            );
        }
    }

    if !result.success {
        std::process::exit(1);
    }
}
