#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # shaderpp CLI
//!
//! A command-line interface for the shaderpp shader preprocessor library.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use shaderpp::{LoadError, LoadedShader, PreprocessorConfig};
use std::path::PathBuf;

/// Exit codes for different error conditions
mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const IO_ERROR: i32 = 2;
    pub const PREPROCESS_ERROR: i32 = 3;
    #[allow(dead_code)]
    pub const ARGUMENT_ERROR: i32 = 4;
}

/// Command-line interface for the shaderpp shader preprocessor
#[derive(Parser)]
#[command(
    name = "shaderpp",
    version,
    author,
    about = "A shader source preprocessor",
    long_about = "shaderpp preprocesses shader source code: it strips comments, runs #if/#ifdef conditional compilation, expands #define macros and resolves #include directives, while keeping output line numbers aligned with the input.",
    after_help = "EXAMPLES:
  # Preprocess a single shader
  $ shaderpp sky.gdshader -o sky.pp.gdshader

  # Preprocess with include search directories
  $ shaderpp water.gdshader -I shaders/common -I shaders/lib

  # Define macros on the command line
  $ shaderpp terrain.gdshader -D QUALITY=2 -D USE_FOG

  # Preprocess as an editor host (EDITOR expands to true)
  $ shaderpp gizmo.gdshader --editor

  # Read from stdin and write to stdout
  $ cat sky.gdshader | shaderpp -"
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Input file to preprocess (use '-' for stdin)
    #[arg(help = "Input shader file to preprocess (use '-' for stdin)")]
    input: PathBuf,

    /// Output file (use '-' for stdout, default: stdout)
    #[arg(
        short = 'o',
        long,
        help = "Output file (use '-' for stdout, default: stdout)"
    )]
    output: Option<PathBuf>,

    /// Add include directory
    #[arg(
        short = 'I',
        long = "include",
        value_name = "DIR",
        help = "Add directory to include search path"
    )]
    include_dirs: Vec<PathBuf>,

    /// Define a macro before user code runs
    #[arg(
        short = 'D',
        long = "define",
        value_name = "NAME[=VALUE]",
        help = "Define a macro (VALUE defaults to 'true')"
    )]
    defines: Vec<String>,

    /// Override the built-in platform macro name
    #[arg(
        long,
        value_name = "NAME",
        help = "Override the built-in platform macro name (default: host OS)"
    )]
    platform: Option<String>,

    /// Preprocess as an editor host
    #[arg(long, help = "Preprocess as an editor host (EDITOR expands to true)")]
    editor: bool,

    /// Maximum #include recursion depth
    #[arg(
        long,
        default_value = "25",
        help = "Maximum #include recursion depth"
    )]
    depth_limit: usize,

    /// Maximum macro expansion passes per line
    #[arg(
        long,
        default_value = "64",
        help = "Maximum macro expansion passes per line"
    )]
    expansion_limit: usize,

    /// Output in JSON format
    #[arg(long, help = "Output preprocessing result in JSON format")]
    #[cfg(feature = "json")]
    json: bool,

    /// Enable verbose output
    #[arg(
        short = 'v',
        long,
        help = "Enable verbose output with diagnostic information"
    )]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short = 'q', long, help = "Suppress non-error output (quiet mode)")]
    quiet: bool,

    /// Disable colored output
    #[arg(long, help = "Disable colored output")]
    no_color: bool,

    /// Force colored output
    #[arg(long, help = "Force colored output even when not a terminal")]
    force_color: bool,
}

/// Main application entry point
fn main() {
    std::process::exit(match run() {
        Ok(_) => exit_code::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "Error:".red().bold());
            determine_exit_code(&e)
        }
    });
}

/// Determine the appropriate exit code based on the error
fn determine_exit_code(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<std::io::Error>().is_some() {
        exit_code::IO_ERROR
    } else if error.downcast_ref::<shaderpp::PreprocessError>().is_some() {
        exit_code::PREPROCESS_ERROR
    } else {
        exit_code::GENERAL_ERROR
    }
}

/// Run the main application logic
fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_colors(&cli);
    setup_logging(&cli);

    validate_args(&cli)?;

    // Read input
    let input_content = read_input(&cli.input)?;

    // Create preprocessor configuration
    let config = create_config(&cli);

    // Preprocess the input
    let start_time = std::time::Instant::now();
    let processed_output = match shaderpp::preprocess(&input_content, &config) {
        Ok(output) => output,
        Err(e) => {
            return Err(anyhow::Error::new(e).context("Failed to preprocess input"));
        }
    };
    let processing_time = start_time.elapsed();

    // Write output
    write_output(&cli, &processed_output)?;

    // Show verbose information
    if cli.verbose {
        show_verbose_info(&cli, processing_time);
    }

    if cli.verbose && !cli.quiet {
        let input_display = format_input(&cli.input);
        let output_display = cli
            .output
            .as_ref()
            .map_or("stdout".to_string(), format_output);
        eprintln!("Preprocessed {input_display} -> {output_display}");
    }

    Ok(())
}

/// Configure colored output based on flags and terminal detection
fn setup_colors(cli: &Cli) {
    if cli.no_color {
        colored::control::set_override(false);
    } else if cli.force_color {
        colored::control::set_override(true);
    } else if !atty::is(atty::Stream::Stderr) {
        colored::control::set_override(false);
    }
}

/// Initialize the logger, honoring -v/-q and RUST_LOG
fn setup_logging(cli: &Cli) {
    let default_filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Validate command-line arguments
fn validate_args(cli: &Cli) -> Result<()> {
    // Check that input and output are not the same file
    if let Some(output) = &cli.output
        && output != &PathBuf::from("-")
        && std::fs::canonicalize(output).ok() == std::fs::canonicalize(&cli.input).ok()
    {
        return Err(anyhow::anyhow!(
            "Input and output files cannot be the same: {}",
            output.display()
        ));
    }

    if cli.depth_limit == 0 {
        return Err(anyhow::anyhow!("Include depth limit must be greater than 0"));
    }
    if cli.expansion_limit == 0 {
        return Err(anyhow::anyhow!("Expansion pass limit must be greater than 0"));
    }

    Ok(())
}

/// Create preprocessor configuration from CLI arguments
fn create_config(cli: &Cli) -> PreprocessorConfig {
    let mut config = if cli.editor {
        PreprocessorConfig::editor()
    } else {
        PreprocessorConfig::runtime()
    };

    if let Some(platform) = &cli.platform {
        config = config.with_platform(platform.clone());
    }

    for define in &cli.defines {
        let (name, body) = parse_define(define);
        config = config.with_define(name, body);
    }

    config.include_depth_limit = cli.depth_limit;
    config.expansion_pass_limit = cli.expansion_limit;

    // Includes resolve relative to the input file first, then -I dirs.
    let mut search_dirs = Vec::new();
    if let Some(parent) = cli.input.parent()
        && cli.input != PathBuf::from("-")
    {
        search_dirs.push(parent.to_path_buf());
    }
    search_dirs.extend(cli.include_dirs.iter().cloned());

    config.with_loader(filesystem_loader(search_dirs))
}

/// Split a `-D NAME[=VALUE]` argument; the value defaults to `true`.
fn parse_define(arg: &str) -> (String, String) {
    match arg.split_once('=') {
        Some((name, value)) => (name.to_string(), value.to_string()),
        None => (arg.to_string(), "true".to_string()),
    }
}

/// A loader that resolves include paths against the search directories.
/// Canonical filesystem paths deduplicate diamond includes.
fn filesystem_loader(
    search_dirs: Vec<PathBuf>,
) -> impl Fn(&str) -> Result<LoadedShader, LoadError> + 'static {
    move |path: &str| {
        let mut candidates = vec![PathBuf::from(path)];
        for dir in &search_dirs {
            candidates.push(dir.join(path));
        }

        for candidate in candidates {
            if !candidate.is_file() {
                continue;
            }
            log::debug!("resolved include {path:?} -> {}", candidate.display());
            let code = std::fs::read_to_string(&candidate)
                .map_err(|e| LoadError::Other(format!("{}: {e}", candidate.display())))?;
            let canonical_path = std::fs::canonicalize(&candidate)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| candidate.display().to_string());
            return Ok(LoadedShader {
                code,
                canonical_path,
            });
        }
        Err(LoadError::NotFound(path.to_string()))
    }
}

/// Read input from file or stdin
fn read_input(input_path: &PathBuf) -> Result<String> {
    if input_path == &PathBuf::from("-") {
        use std::io::Read;
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read input file: {}", input_path.display()))
    }
}

/// Write output to file or stdout
fn write_output(cli: &Cli, content: &str) -> Result<()> {
    #[cfg(feature = "json")]
    if cli.json {
        return write_json_output(cli, content);
    }

    match &cli.output {
        Some(output_path) if output_path != &PathBuf::from("-") => {
            std::fs::write(output_path, content).with_context(|| {
                format!("Failed to write to output file: {}", output_path.display())
            })?;
        }
        _ => {
            print!("{content}");
        }
    }

    Ok(())
}

/// Write JSON output
#[cfg(feature = "json")]
fn write_json_output(cli: &Cli, content: &str) -> Result<()> {
    use serde_json::json;

    let result = json!({
        "success": true,
        "output": content,
        "input_file": format_input(&cli.input),
        "output_file": cli.output.as_ref().map(format_output),
        "editor": cli.editor,
        "defines": cli.defines,
        "include_dirs": cli.include_dirs.iter().map(|p| p.to_string_lossy().to_string()).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Show verbose information
fn show_verbose_info(cli: &Cli, processing_time: std::time::Duration) {
    if cli.quiet {
        return;
    }

    eprintln!("Editor host: {}", cli.editor);
    eprintln!("Include depth limit: {}", cli.depth_limit);
    eprintln!("Expansion pass limit: {}", cli.expansion_limit);
    eprintln!("Processing time: {processing_time:?}");

    if !cli.include_dirs.is_empty() {
        eprintln!("Include directories ({}):", cli.include_dirs.len());
        for dir in &cli.include_dirs {
            eprintln!("  {}", dir.display());
        }
    }
}

/// Format input path for display
fn format_input(path: &PathBuf) -> String {
    if path == &PathBuf::from("-") {
        "stdin".to_string()
    } else {
        path.display().to_string()
    }
}

/// Format output path for display
fn format_output(path: &PathBuf) -> String {
    if path == &PathBuf::from("-") {
        "stdout".to_string()
    } else {
        path.display().to_string()
    }
}
