use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
    process,
};

use getopts::Options;
use log::{error, info, LevelFilter};

use jack_compiler::common::{SourceMap, SpanError};
use jack_compiler::jack;

static USAGE: &str = "usage: jack_compiler [options] [PATH]

Compiles PATH to Hack VM code. PATH may be a .jack file or a directory,
which is searched recursively for .jack files; it defaults to the current
directory. Each foo.jack produces a foo.vm next to it.";

fn main() {
    let args = std::env::args().collect::<Vec<String>>();

    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help message");
    opts.optflag("q", "quiet", "only report errors");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("{}", opts.usage(USAGE));
            process::exit(2);
        }
    };

    if matches.opt_present("h") {
        println!("{}", opts.usage(USAGE));
        return;
    }

    let level = if matches.opt_present("q") {
        LevelFilter::Error
    } else {
        LevelFilter::Info
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .unwrap();

    let path = matches.free.first().map(String::as_str).unwrap_or(".");
    process::exit(run(Path::new(path)));
}

fn run(path: &Path) -> i32 {
    let sources = match find_source_files(path) {
        Ok(sources) => sources,
        Err(msg) => {
            error!("{}", msg);
            return 2;
        }
    };

    // A file that fails to compile doesn't stop the rest of the batch
    let failures = sources
        .iter()
        .filter(|source_path| compile_file(source_path).is_err())
        .count();

    if failures > 0 {
        1
    } else {
        0
    }
}

fn find_source_files(path: &Path) -> Result<Vec<PathBuf>, String> {
    if path.is_dir() {
        let mut files = vec![];
        collect_jack_files(path, &mut files)
            .map_err(|err| format!("listing directory {}: {}", path.display(), err))?;
        if files.is_empty() {
            return Err(format!("no .jack files found under {}", path.display()));
        }
        files.sort();
        Ok(files)
    } else if path.is_file() && path.extension() == Some(OsStr::new("jack")) {
        Ok(vec![path.to_path_buf()])
    } else {
        Err(format!(
            "{} is not a .jack file or a directory",
            path.display()
        ))
    }
}

fn collect_jack_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_jack_files(&path, files)?;
        } else if path.extension() == Some(OsStr::new("jack")) {
            files.push(path);
        }
    }
    Ok(())
}

fn compile_file(source_path: &Path) -> Result<(), ()> {
    let source = fs::read_to_string(source_path).map_err(|err| {
        error!("reading {}: {}", source_path.display(), err);
    })?;

    let vm_code = jack::compile(&source).map_err(|err| {
        error!("{}", render_error(source_path, &source, &err));
    })?;

    // The VM code is accumulated in memory and written in one shot, so a
    // failed compilation leaves no partial output file behind.
    let output_path = source_path.with_extension("vm");
    fs::write(&output_path, vm_code).map_err(|err| {
        error!("writing {}: {}", output_path.display(), err);
    })?;

    info!(
        "compiled {} -> {}",
        source_path.display(),
        output_path.display()
    );
    Ok(())
}

/// Formats a compile error with the offending source line and a caret
/// marker under the error span.
fn render_error(path: &Path, source: &str, err: &SpanError) -> String {
    let map = SourceMap::new(source);
    let loc = map.location(err.span.start);
    let line = map.line_text(loc.line).trim_end();

    let lineno = format!("{:3}", loc.line);
    let margin = " ".repeat(lineno.len());
    let indent = " ".repeat(loc.column - 1);

    // The marker stops at the end of the line even when the span (say, an
    // unterminated block comment) runs past it
    let available = line.chars().count().saturating_sub(loc.column - 1).max(1);
    let span_chars = source[err.span.start..err.span.end].chars().count();
    let marker = "^".repeat(span_chars.clamp(1, available));

    format!(
        "{}: line {}, char {}: {}\n{} |\n{} | {}\n{} | {}{}",
        path.display(),
        loc.line,
        loc.column,
        err.msg,
        margin,
        lineno,
        line,
        margin,
        indent,
        marker
    )
}
