use clap::Parser;
use kairo::prelude::*;
use log::info;
use std::fs;
use std::time::Instant;

/// Inspects a pipeline definition: slots, resolved types, edges and parameters
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the pipeline definition JSON file
    pipeline_path: String,

    /// Also print the parameter tree of every node
    #[arg(short, long)]
    parameters: bool,

    /// Include hidden parameters in the parameter trees
    #[arg(long, requires = "parameters")]
    hidden: bool,

    /// Only show the node with this name
    #[arg(short, long)]
    node: Option<String>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    run(cli);
}

fn run(cli: Cli) {
    let total_start = Instant::now();

    // --- 1. Loading ---
    let json = fs::read_to_string(&cli.pipeline_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read pipeline file '{}': {}",
            &cli.pipeline_path, e
        ))
    });
    let definition = PipelineDefinition::from_json(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse pipeline: {}", e)));

    // --- 2. Building ---
    let build_start = Instant::now();
    let loaded = definition
        .build()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to build pipeline: {}", e)));
    let build_duration = build_start.elapsed();
    let graph = &loaded.graph;
    info!("Loaded '{}'", cli.pipeline_path);

    let selected = cli.node.as_deref().map(|name| {
        graph
            .find_node(name)
            .map(GraphNode::id)
            .unwrap_or_else(|| exit_with_error(&format!("No node named '{}'", name)))
    });

    // --- 3. Structure ---
    let display = match selected {
        Some(id) => DisplayGraph::new(graph).only(id),
        None => DisplayGraph::new(graph),
    };
    println!("{}", display);

    // --- 4. Validation ---
    let issues: Vec<ValidationIssue> = graph
        .validate()
        .into_iter()
        .filter(|issue| selected.is_none_or(|id| issue_node(issue) == id))
        .collect();
    if issues.is_empty() {
        println!("No validation issues.");
    } else {
        println!("Validation issues:");
        for issue in &issues {
            println!("  -> {}", issue);
        }
    }

    // --- 5. Parameters ---
    if cli.parameters {
        for node in graph.nodes() {
            if selected.is_some_and(|id| id != node.id()) {
                continue;
            }
            let tree = graph.parameter_tree(node.id()).unwrap_or_else(|e| {
                exit_with_error(&format!(
                    "Failed to read parameters of '{}': {}",
                    node.name(),
                    e
                ))
            });
            println!();
            print!("{}", DisplayParameterTree::new(&tree).show_hidden(cli.hidden));
        }
    }

    println!("\n--- Summary ---");
    println!("Nodes:                {}", graph.node_count());
    println!("Edges:                {}", graph.edge_count());
    println!("Registered Types:     {}", graph.registry().len());
    println!("Build:                {:?}", build_duration);
    println!("Total Execution:      {:?}", total_start.elapsed());
}

fn issue_node(issue: &ValidationIssue) -> NodeId {
    match issue {
        ValidationIssue::UnconnectedInput { node, .. } => *node,
        ValidationIssue::IncompatibleEdge { edge, .. } => edge.target.node,
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
