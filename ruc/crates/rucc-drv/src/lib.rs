//! Driver: wires lexing, parsing, semantic checking, and bytecode emission
//! into the one pipeline a command-line invocation runs (§6.1).
//!
//! Deliberately minimal: one positional input list, one `--emit` selector,
//! an optional `-o` output path. Full flag parsing (optimization levels,
//! target triples, incremental compilation) is an explicit Non-goal — this
//! is a teaching compiler's front end, not a production toolchain driver.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use rucc_par::{NodeId, Tree};
use rucc_sem::Sema;
use thiserror::Error;

/// What a compilation run should print, chosen by `--emit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitKind {
    Tokens,
    Ast,
    #[default]
    Bytecode,
}

impl EmitKind {
    fn parse(s: &str) -> Result<Self, DriverError> {
        match s {
            "tokens" => Ok(EmitKind::Tokens),
            "ast" => Ok(EmitKind::Ast),
            "bytecode" => Ok(EmitKind::Bytecode),
            other => Err(DriverError::UnknownEmitKind(other.to_string())),
        }
    }
}

/// Parsed command line. Hand-rolled rather than built on a framework — the
/// whole surface is a positional file list, `--emit`, and `-o` (§6.1: full
/// flag parsing is out of scope).
#[derive(Debug, Default)]
pub struct Cli {
    pub inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub emit: EmitKind,
}

impl Cli {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, DriverError> {
        let mut cli = Cli::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-o" | "--output" => {
                    let path = args.next().ok_or(DriverError::MissingArgument("-o"))?;
                    cli.output = Some(PathBuf::from(path));
                }
                "--emit" => {
                    let kind = args.next().ok_or(DriverError::MissingArgument("--emit"))?;
                    cli.emit = EmitKind::parse(&kind)?;
                }
                other if other.starts_with("--emit=") => {
                    cli.emit = EmitKind::parse(&other["--emit=".len()..])?;
                }
                other if other.starts_with('-') && other != "-" => {
                    return Err(DriverError::UnknownFlag(other.to_string()));
                }
                other => cli.inputs.push(PathBuf::from(other)),
            }
        }
        if cli.inputs.is_empty() {
            return Err(DriverError::NoInputFiles);
        }
        Ok(cli)
    }
}

/// Errors the driver itself raises, distinct from the typed errors each
/// pipeline stage reports, which [`CompileError`] composes instead.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no input files given")]
    NoInputFiles,

    #[error("missing argument to `{0}`")]
    MissingArgument(&'static str),

    #[error("unknown flag `{0}`")]
    UnknownFlag(String),

    #[error("unknown --emit kind `{0}` (expected tokens, ast, or bytecode)")]
    UnknownEmitKind(String),

    #[error("reading `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Every diagnostic a pipeline stage can raise, composed behind one error
/// type so a run reports whichever stage failed (§7).
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] rucc_par::ParseError),

    #[error("semantic errors:\n{}", join_sem_errors(.0))]
    Semantic(Vec<rucc_sem::SemError>),

    #[error(transparent)]
    Gen(#[from] rucc_gen::GenError),
}

fn join_sem_errors(errors: &[rucc_sem::SemError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One source file's tree and translation-unit root, kept alongside the
/// `Sema` shared across every file compiled in the same run.
pub struct ParsedUnit {
    pub path: PathBuf,
    pub tree: Tree,
    pub root: NodeId,
}

/// Lexes and parses every file in turn against one shared `Sema` (§8
/// scenario 6: a second file's top-level `int g;` must collide with the
/// first file's), then runs semantic checking once over the combined
/// global scope.
pub fn parse_units(sources: &[(PathBuf, String)]) -> Result<(Vec<ParsedUnit>, Sema), CompileError> {
    let mut sema = Sema::new();
    let mut units = Vec::with_capacity(sources.len());
    for (path, source) in sources {
        log::debug!("lexing and parsing {}", path.display());
        let (tree, next_sema, root) = rucc_par::parse_with_sema(source, sema)?;
        sema = next_sema;
        units.push(ParsedUnit {
            path: path.clone(),
            tree,
            root,
        });
    }

    log::debug!("running semantic checks over {} unit(s)", units.len());
    let errors = sema.check();
    if !errors.is_empty() {
        return Err(CompileError::Semantic(errors));
    }

    Ok((units, sema))
}

/// Runs the whole pipeline for a CLI invocation: read every input file,
/// compile them against a shared scope, then emit whatever `--emit` asked
/// for to the chosen output (stdout, unless `-o` was given).
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut sources = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let text = fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.clone(),
            source,
        })?;
        sources.push((path.clone(), text));
    }

    let rendered = match cli.emit {
        EmitKind::Tokens => render_tokens(&sources)?,
        EmitKind::Ast => {
            let (units, _sema) = parse_units(&sources)?;
            render_ast(&units)
        }
        EmitKind::Bytecode => {
            let (units, sema) = parse_units(&sources)?;
            render_bytecode(&units, &sema)?
        }
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, rendered).map_err(|source| DriverError::Io {
                path: path.clone(),
                source,
            })?;
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn render_tokens(sources: &[(PathBuf, String)]) -> Result<String, CompileError> {
    let mut out = String::new();
    for (path, source) in sources {
        log::debug!("tokenizing {}", path.display());
        let (tokens, errors) = rucc_lex::lex(source);
        if let Some(err) = errors.into_iter().next() {
            return Err(rucc_par::ParseError::Lex(err).into());
        }
        for token in &tokens {
            let _ = writeln!(out, "{token:?}");
        }
    }
    Ok(out)
}

fn render_ast(units: &[ParsedUnit]) -> String {
    let mut out = String::new();
    for unit in units {
        let _ = writeln!(out, "{:#?}", unit.tree.get(unit.root));
    }
    out
}

fn render_bytecode(units: &[ParsedUnit], sema: &Sema) -> Result<String, CompileError> {
    let mut out = String::new();
    for unit in units {
        log::debug!("emitting bytecode for {}", unit.path.display());
        let image = rucc_gen::generate(&unit.tree, sema, unit.root)?;
        let _ = writeln!(
            out,
            "entry={} functions={} cells={}",
            image.entry,
            image.function_count,
            image.cells.len()
        );
        for (i, cell) in image.cells.iter().enumerate() {
            let _ = writeln!(out, "{i:>5}: {cell}");
        }
    }
    Ok(out)
}

/// The CLI's `main`-facing entry point: parse `argv`, run the pipeline.
pub fn main_impl(args: impl IntoIterator<Item = String>) -> anyhow::Result<()> {
    let cli = Cli::parse(args)?;
    run(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cli_rejects_empty_input_list() {
        assert!(matches!(Cli::parse(strs(&[])), Err(DriverError::NoInputFiles)));
    }

    #[test]
    fn cli_parses_output_and_emit_flags() {
        let cli = Cli::parse(strs(&["a.ruc", "-o", "out.txt", "--emit=ast"])).unwrap();
        assert_eq!(cli.inputs, vec![PathBuf::from("a.ruc")]);
        assert_eq!(cli.output, Some(PathBuf::from("out.txt")));
        assert_eq!(cli.emit, EmitKind::Ast);
    }

    #[test]
    fn cli_rejects_unknown_emit_kind() {
        assert!(matches!(
            Cli::parse(strs(&["a.ruc", "--emit=llvm"])),
            Err(DriverError::UnknownEmitKind(_))
        ));
    }

    #[test]
    fn single_file_with_main_compiles_to_a_nonempty_image() {
        let sources = vec![(PathBuf::from("a.ruc"), "int main(){ return 0; }".to_string())];
        let (units, sema) = parse_units(&sources).unwrap();
        let image = rucc_gen::generate(&units[0].tree, &sema, units[0].root).unwrap();
        assert!(!image.cells.is_empty());
    }

    #[test]
    fn predeclared_but_undefined_function_fails_semantic_check() {
        let sources = vec![(
            PathBuf::from("a.ruc"),
            "void f(); int main(){ f(); }".to_string(),
        )];
        match parse_units(&sources) {
            Ok(_) => panic!("expected a semantic error"),
            Err(CompileError::Semantic(errors)) => assert!(errors
                .iter()
                .any(|e| matches!(e, rucc_sem::SemError::PredeclaredButUndefined(_)))),
            Err(other) => panic!("expected a semantic error, got {other}"),
        }
    }

    #[test]
    fn duplicate_struct_declaration_is_not_an_error() {
        let sources = vec![(
            PathBuf::from("a.ruc"),
            "struct S{int a; float b;}; struct S{int a; float b;};".to_string(),
        )];
        // Fails on NoMain (no `main` in this snippet), never on a
        // duplicate-definition: the struct redeclaration itself dedups.
        match parse_units(&sources) {
            Ok(_) => panic!("expected NoMain"),
            Err(CompileError::Semantic(errors)) => {
                assert!(errors.iter().all(|e| !matches!(e, rucc_sem::SemError::DuplicateDefinition(_))));
                assert!(errors.contains(&rucc_sem::SemError::NoMain));
            }
            Err(other) => panic!("expected a semantic error, got {other}"),
        }
    }

    #[test]
    fn block_scope_round_trip_compiles() {
        let sources = vec![(
            PathBuf::from("a.ruc"),
            "int main(){ int x; { int x; x=1; } return 0; }".to_string(),
        )];
        let (units, sema) = parse_units(&sources).unwrap();
        assert!(rucc_gen::generate(&units[0].tree, &sema, units[0].root).is_ok());
    }

    #[test]
    fn cross_file_duplicate_global_is_rejected() {
        let sources = vec![
            (
                PathBuf::from("a.ruc"),
                "int g; void h(){} int main(){ return 0; }".to_string(),
            ),
            (PathBuf::from("b.ruc"), "int g;".to_string()),
        ];
        match parse_units(&sources) {
            Ok(_) => panic!("expected a duplicate-definition error"),
            Err(CompileError::Semantic(errors)) => assert!(errors
                .iter()
                .any(|e| matches!(e, rucc_sem::SemError::DuplicateDefinition(_)))),
            Err(CompileError::Parse(rucc_par::ParseError::Sem(
                rucc_sem::SemError::DuplicateDefinition(_),
            ))) => {}
            Err(other) => panic!("expected a duplicate-definition error, got {other}"),
        }
    }
}
