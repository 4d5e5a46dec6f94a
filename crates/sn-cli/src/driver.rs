//! Compilation driver: front-end pipeline plus the shell-out to the
//! external C compiler.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use sn_common::{Diagnostic, ErrorKind};
use tracing::{debug, info};

use crate::args::CliArgs;

/// Snapshot of the environment variables the driver honors, taken once so
/// command assembly is a pure function of its inputs.
#[derive(Clone, Debug, Default)]
pub struct CcEnv {
    pub cc: Option<String>,
    pub std: Option<String>,
    pub debug_cflags: Option<String>,
    pub release_cflags: Option<String>,
    pub cflags: Option<String>,
    pub ldflags: Option<String>,
    pub ldlibs: Option<String>,
}

impl CcEnv {
    pub fn from_env() -> Self {
        let get = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            cc: get("SN_CC"),
            std: get("SN_STD"),
            debug_cflags: get("SN_DEBUG_CFLAGS"),
            release_cflags: get("SN_RELEASE_CFLAGS"),
            cflags: get("SN_CFLAGS"),
            ldflags: get("SN_LDFLAGS"),
            ldlibs: get("SN_LDLIBS"),
        }
    }

    pub fn cc(&self) -> &str {
        self.cc.as_deref().unwrap_or("gcc")
    }
}

/// Everything a C compiler invocation depends on.
#[derive(Debug)]
pub struct CcInvocation {
    pub env: CcEnv,
    pub compiler_dir: PathBuf,
    pub c_file: PathBuf,
    pub out_file: PathBuf,
    pub runtime_objects: Vec<PathBuf>,
    pub debug: bool,
}

impl CcInvocation {
    /// The argv after the compiler name. Pure over the struct, so the
    /// flag matrix is testable without gcc installed.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = Vec::new();
        args.push(format!("-std={}", self.env.std.as_deref().unwrap_or("c99")));
        args.push("-w".to_string());
        args.push("-D_GNU_SOURCE".to_string());
        args.push(format!("-I{}", self.compiler_dir.display()));
        if self.debug {
            match &self.env.debug_cflags {
                Some(flags) => args.extend(split_flags(flags)),
                None => args.extend(
                    ["-fsanitize=address", "-fno-omit-frame-pointer", "-g"]
                        .map(str::to_string),
                ),
            }
        } else {
            match &self.env.release_cflags {
                Some(flags) => args.extend(split_flags(flags)),
                None => args.extend(["-O3", "-flto"].map(str::to_string)),
            }
        }
        if let Some(flags) = &self.env.cflags {
            args.extend(split_flags(flags));
        }
        args.push(self.c_file.display().to_string());
        for object in &self.runtime_objects {
            args.push(object.display().to_string());
        }
        if let Some(flags) = &self.env.ldflags {
            args.extend(split_flags(flags));
        }
        args.push("-o".to_string());
        args.push(self.out_file.display().to_string());
        args.push("-lpthread".to_string());
        args.push("-lm".to_string());
        if let Some(libs) = &self.env.ldlibs {
            args.extend(split_flags(libs));
        }
        args
    }
}

fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}

/// Locate the precompiled runtime objects next to the compiler binary.
/// `arena.o` and `runtime.o` are always required; each import adds its
/// `runtime_<module>.o`.
pub fn runtime_objects(
    compiler_dir: &Path,
    imports: &[String],
) -> Result<Vec<PathBuf>, Diagnostic> {
    let mut names = vec!["arena.o".to_string(), "runtime.o".to_string()];
    for import in imports {
        names.push(format!("runtime_{import}.o"));
    }
    let mut objects = Vec::new();
    for name in names {
        let path = compiler_dir.join(&name);
        if !path.exists() {
            return Err(Diagnostic::new(
                ErrorKind::RuntimeObjectMissing,
                path.display().to_string(),
                0,
                format!("runtime object '{name}' not found next to the compiler"),
            )
            .with_hint("rebuild the runtime or reinstall the compiler"));
        }
        objects.push(path);
    }
    Ok(objects)
}

/// Run the whole pipeline for one source file. Returns the process exit
/// code to propagate.
pub fn run_compile(args: &CliArgs) -> Result<i32> {
    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(e) => {
            let diagnostic = Diagnostic::new(
                ErrorKind::IoError,
                args.input.display().to_string(),
                0,
                format!("cannot read source file: {e}"),
            );
            crate::print_diagnostics(std::slice::from_ref(&diagnostic));
            return Ok(1);
        }
    };
    let filename = args.input.display().to_string();
    let (mut module, parse_diagnostics) = sn_parser::parse(&filename, &source);
    if args.print_ast {
        print!("{}", sn_ast::printer::print_module(&module));
    }
    if !parse_diagnostics.is_empty() {
        crate::print_diagnostics(&parse_diagnostics);
        return Ok(1);
    }
    let check_diagnostics = sn_checker::check_module(&mut module);
    if !check_diagnostics.is_empty() {
        crate::print_diagnostics(&check_diagnostics);
        return Ok(1);
    }
    let c_text = match sn_emitter::emit_module(&module) {
        Ok(text) => text,
        Err(diagnostic) => {
            crate::print_diagnostics(std::slice::from_ref(&diagnostic));
            return Ok(1);
        }
    };

    let c_file = c_file_path(args);
    if let Err(diagnostic) = sn_emitter::write_c_file(&c_file, &c_text) {
        crate::print_diagnostics(std::slice::from_ref(&diagnostic));
        return Ok(1);
    }
    info!(c_file = %c_file.display(), "wrote generated C");
    if args.emit_c {
        return Ok(0);
    }

    let compiler_dir = compiler_dir()?;
    let objects = match runtime_objects(&compiler_dir, &module.imports) {
        Ok(objects) => objects,
        Err(diagnostic) => {
            crate::print_diagnostics(std::slice::from_ref(&diagnostic));
            return Ok(1);
        }
    };
    let invocation = CcInvocation {
        env: CcEnv::from_env(),
        compiler_dir,
        c_file,
        out_file: exe_path(args),
        runtime_objects: objects,
        debug: args.debug,
    };
    run_cc(&invocation)
}

/// The compiler's own directory, resolved once per invocation.
fn compiler_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the compiler binary")?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

fn c_file_path(args: &CliArgs) -> PathBuf {
    if args.emit_c {
        if let Some(output) = &args.output {
            return output.clone();
        }
    }
    args.input.with_extension("c")
}

/// Default executable name strips the `.c` from the generated file.
fn exe_path(args: &CliArgs) -> PathBuf {
    if let Some(output) = &args.output {
        return output.clone();
    }
    args.input.with_extension("")
}

/// Invoke the C compiler with stderr captured to a temp file; the capture
/// is replayed only when the compile fails.
fn run_cc(invocation: &CcInvocation) -> Result<i32> {
    let arguments = invocation.arguments();
    debug!(cc = invocation.env.cc(), ?arguments, "invoking C compiler");
    let mut stderr_file = tempfile::tempfile().context("cannot create stderr capture file")?;
    let capture = stderr_file
        .try_clone()
        .context("cannot clone stderr capture handle")?;
    let status = Command::new(invocation.env.cc())
        .args(&arguments)
        .stderr(Stdio::from(capture))
        .status();
    let status = match status {
        Ok(status) => status,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let diagnostic = Diagnostic::new(
                ErrorKind::CCompilerMissing,
                invocation.c_file.display().to_string(),
                0,
                format!("C compiler '{}' not found", invocation.env.cc()),
            )
            .with_hint("install gcc (e.g. apt install gcc) or point SN_CC at a compiler");
            crate::print_diagnostics(std::slice::from_ref(&diagnostic));
            return Ok(1);
        }
        Err(e) => return Err(e).context("cannot spawn the C compiler"),
    };
    if !status.success() {
        stderr_file
            .seek(SeekFrom::Start(0))
            .context("cannot rewind stderr capture")?;
        let mut captured = String::new();
        stderr_file
            .read_to_string(&mut captured)
            .context("cannot read stderr capture")?;
        eprint!("{captured}");
    }
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_invocation(env: CcEnv, debug: bool) -> CcInvocation {
        CcInvocation {
            env,
            compiler_dir: PathBuf::from("/opt/sn"),
            c_file: PathBuf::from("prog.c"),
            out_file: PathBuf::from("prog"),
            runtime_objects: vec![
                PathBuf::from("/opt/sn/arena.o"),
                PathBuf::from("/opt/sn/runtime.o"),
            ],
            debug,
        }
    }

    #[test]
    fn release_arguments_carry_the_standard_set() {
        let args = base_invocation(CcEnv::default(), false).arguments();
        assert_eq!(args[0], "-std=c99");
        assert!(args.contains(&"-w".to_string()));
        assert!(args.contains(&"-D_GNU_SOURCE".to_string()));
        assert!(args.contains(&"-I/opt/sn".to_string()));
        assert!(args.contains(&"-O3".to_string()));
        assert!(args.contains(&"-flto".to_string()));
        assert!(args.contains(&"/opt/sn/arena.o".to_string()));
        assert!(args.contains(&"/opt/sn/runtime.o".to_string()));
        assert!(args.contains(&"-lpthread".to_string()));
        assert!(args.contains(&"-lm".to_string()));
        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "prog");
    }

    #[test]
    fn debug_arguments_enable_the_sanitizer() {
        let args = base_invocation(CcEnv::default(), true).arguments();
        assert!(args.contains(&"-fsanitize=address".to_string()));
        assert!(args.contains(&"-fno-omit-frame-pointer".to_string()));
        assert!(args.contains(&"-g".to_string()));
        assert!(!args.contains(&"-O3".to_string()));
    }

    #[test]
    fn env_overrides_replace_flag_sets() {
        let env = CcEnv {
            std: Some("c11".to_string()),
            release_cflags: Some("-O2 -pipe".to_string()),
            cflags: Some("-DEXTRA".to_string()),
            ldflags: Some("-L/usr/local/lib".to_string()),
            ldlibs: Some("-lcurl".to_string()),
            ..CcEnv::default()
        };
        let args = base_invocation(env, false).arguments();
        assert_eq!(args[0], "-std=c11");
        assert!(args.contains(&"-O2".to_string()));
        assert!(args.contains(&"-pipe".to_string()));
        assert!(!args.contains(&"-O3".to_string()));
        assert!(args.contains(&"-DEXTRA".to_string()));
        assert!(args.contains(&"-L/usr/local/lib".to_string()));
        assert_eq!(args.last(), Some(&"-lcurl".to_string()));
    }

    #[test]
    fn missing_runtime_object_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = runtime_objects(dir.path(), &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RuntimeObjectMissing);
        assert!(err.hint.is_some());
    }

    #[test]
    fn imports_add_runtime_modules() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["arena.o", "runtime.o", "runtime_net.o"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let objects = runtime_objects(dir.path(), &["net".to_string()]).unwrap();
        assert_eq!(objects.len(), 3);
        assert!(objects[2].ends_with("runtime_net.o"));
    }
}
