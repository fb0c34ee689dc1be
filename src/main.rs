//! wxflow CLI - weather-file translation tasks

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use wxflow::{
    export, Catalog, ExportFormat, FixSuggestion, Function, ProcessRunner, Task, TaskExecutor,
    ToolRunner, WxConfig, WxError,
};

#[derive(Parser)]
#[command(name = "wxflow")]
#[command(about = "Run EPW/WEA/DDY weather-file translation tasks")]
#[command(version)]
struct Cli {
    /// Config file (default: ./wxflow.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extra function definitions (YAML or JSON)
    #[arg(long, global = true)]
    definitions: Vec<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available functions
    List,

    /// Describe a function's inputs, command and outputs
    Show {
        /// Function name
        name: String,
    },

    /// Print the command a task would run
    Render {
        /// Function name
        name: String,

        /// Input value as name=value (repeatable)
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },

    /// Run a task and collect its outputs
    Run {
        /// Function name
        name: String,

        /// Input value as name=value (repeatable)
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Where declared outputs are copied
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Run in this directory instead of a temporary one
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Keep the temporary working directory
        #[arg(long)]
        keep_workdir: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print function declarations in interchange form
    Export {
        /// Function name (all functions when omitted)
        name: Option<String>,

        #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },

    /// Validate a definitions file
    Validate {
        /// Path to a definitions file
        file: PathBuf,
    },

    /// Check that the translation tool is reachable
    Doctor,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

impl From<Format> for ExportFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Yaml => ExportFormat::Yaml,
            Format::Json => ExportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "wxflow=debug" } else { "wxflow=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dispatch(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.downcast_ref::<WxError>().and_then(|w| w.fix_suggestion()) {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = WxConfig::load(cli.config.as_deref())?.with_env()?;
    let catalog = || load_catalog(&config, &cli.definitions);

    match cli.command {
        Commands::List => {
            list(&catalog()?);
            Ok(())
        }
        Commands::Show { name } => {
            let function = catalog()?.require(&name)?;
            show(&function)
        }
        Commands::Render { name, set } => {
            let task = Task::bind_raw(catalog()?.require(&name)?, &set)?;
            println!("{}", task.command()?);
            Ok(())
        }
        Commands::Run {
            name,
            set,
            output_dir,
            workdir,
            timeout,
            keep_workdir,
            json,
        } => {
            let task = Task::bind_raw(catalog()?.require(&name)?, &set)?;
            let mut executor = TaskExecutor::from_config(runner(&config), &config);
            if let Some(secs) = timeout {
                executor = executor.with_timeout(Duration::from_secs(secs));
            }
            if keep_workdir {
                executor = executor.keep_workdir(true);
            }
            run(&executor, &task, &output_dir, workdir.as_deref(), json).await
        }
        Commands::Export { name, format } => {
            let catalog = catalog()?;
            let text = match name {
                Some(name) => {
                    let function = catalog.require(&name)?;
                    export::export_function(&function, format.into())?
                }
                None => export::export_functions(catalog.iter(), format.into())?,
            };
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        Commands::Validate { file } => validate_file(&file),
        Commands::Doctor => doctor(&config).await,
    }
}

fn runner(config: &WxConfig) -> Arc<dyn ToolRunner> {
    Arc::new(
        ProcessRunner::new()
            .with_tool(config.tool.clone())
            .with_tool_dir(config.tool_dir.clone()),
    )
}

fn load_catalog(config: &WxConfig, extra: &[PathBuf]) -> Result<Catalog> {
    let mut catalog = Catalog::builtin()?;
    for path in config.definitions.iter().chain(extra) {
        catalog
            .extend_from_file(path)
            .with_context(|| format!("Failed to load definitions from {}", path.display()))?;
    }
    Ok(catalog)
}

fn list(catalog: &Catalog) {
    for function in catalog.iter() {
        let name = format!("{:<18}", function.name.as_str());
        println!("{} {}", name.cyan(), function.description);
    }
}

fn show(function: &Function) -> Result<()> {
    println!("{}", function.name.as_str().cyan().bold());
    if !function.description.is_empty() {
        println!("  {}", function.description);
    }

    println!("\n{}", "Inputs:".bold());
    for input in &function.inputs {
        let default = match &input.default {
            Some(value) => format!("default: {:?}", value.render()),
            None => "required".yellow().to_string(),
        };
        let mut line = format!("  {:<12} {:<8} {}", input.name.as_str(), input.kind, default);
        if let Some(path) = &input.path {
            line.push_str(&format!("  staged at {}", path));
        }
        if !input.extensions.is_empty() {
            line.push_str(&format!("  [.{}]", input.extensions.join(", .")));
        }
        println!("{}", line);
        if !input.description.is_empty() {
            println!("      {}", input.description.dimmed());
        }
    }

    println!("\n{}", "Command:".bold());
    println!("  {}", function.command);

    println!("\n{}", "Outputs:".bold());
    for output in &function.outputs {
        println!("  {:<12} {}", output.name.as_str(), output.path);
        if !output.description.is_empty() {
            println!("      {}", output.description.dimmed());
        }
    }

    Ok(())
}

async fn run(
    executor: &TaskExecutor,
    task: &Task,
    output_dir: &Path,
    workdir: Option<&Path>,
    json: bool,
) -> Result<()> {
    if !json {
        println!("{} {}", "→".cyan(), task.command()?);
    }

    let outcome = executor.execute(task, output_dir, workdir).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    for output in &outcome.outputs {
        println!("{} {} → {}", "✓".green(), output.name, output.path.display());
    }
    if let Some(dir) = &outcome.workdir {
        println!("  workdir: {}", dir.display());
    }
    println!("  finished in {:.2}s", outcome.elapsed.as_secs_f64());
    Ok(())
}

fn validate_file(file: &Path) -> Result<()> {
    let functions = export::load_file(file)
        .with_context(|| format!("Invalid definitions in {}", file.display()))?;

    println!("{} '{}' is valid", "✓".green(), file.display());
    for function in &functions {
        println!(
            "  {} ({} inputs, {} outputs)",
            function.name,
            function.inputs.len(),
            function.outputs.len()
        );
    }
    Ok(())
}

async fn doctor(config: &WxConfig) -> Result<()> {
    let runner = ProcessRunner::new()
        .with_tool(config.tool.clone())
        .with_tool_dir(config.tool_dir.clone());

    if runner.is_available().await {
        println!("{} '{}' is available", "✓".green(), runner.tool());
        Ok(())
    } else {
        anyhow::bail!(
            "'{}' did not answer --version (set tool_dir in wxflow.yaml or WXFLOW_TOOL_DIR)",
            runner.tool()
        )
    }
}
