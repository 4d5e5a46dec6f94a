use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the sn binary.
#[derive(Parser, Debug)]
#[command(name = "sn", version, about = "Sindarin compiler - Sn to native via C")]
pub struct CliArgs {
    /// Source file to compile.
    pub input: PathBuf,

    /// Write the generated C only; do not invoke the C compiler.
    #[arg(long = "emit-c")]
    pub emit_c: bool,

    /// Output file name. Defaults to the input name with its extension
    /// stripped (the `.c` for --emit-c).
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Verbose diagnostics.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Compile the generated C with the debug flag set (address
    /// sanitizer, frame pointers, -g) instead of the release set.
    #[arg(long)]
    pub debug: bool,

    /// Dump the parsed AST to stdout before checking.
    #[arg(long = "print-ast")]
    pub print_ast: bool,
}
