#![allow(clippy::uninlined_format_args)]

mod logger;

use anyhow::Context;
use rematch::{backends, CompileOptions, DfaMatchOptions, Regex, SubstituteOptions};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "rematch-tool")]
struct Opt {
    /// The regular expression.
    pattern: String,

    /// The flags of the regular expression, like "imsx".
    #[structopt(long, short, parse(from_str = CompileOptions::from))]
    flags: Option<CompileOptions>,

    /// Skip the IR optimization passes.
    #[structopt(long)]
    no_optimize: bool,

    /// Dump the IR before and after optimization to stdout.
    #[structopt(long)]
    dump_ir: bool,

    /// Dump the bytecode to stdout.
    #[structopt(long)]
    dump_bytecode: bool,

    /// Report every match at the first matching position, using the
    /// all-matches scanner.
    #[structopt(long, conflicts_with = "replace")]
    dfa: bool,

    /// Substitute matches with this replacement template.
    #[structopt(long, short)]
    replace: Option<String>,

    /// With --replace, substitute every match.
    #[structopt(long, short)]
    global: bool,

    /// With --replace, enable extended replacement syntax.
    #[structopt(long)]
    extended: bool,

    /// The input values to match against.
    #[structopt(conflicts_with_all = &["bench", "file"])]
    inputs: Vec<String>,

    /// Match against the contents of a specified file.
    #[structopt(long, conflicts_with_all = &["bench", "inputs"])]
    file: Option<PathBuf>,

    /// Benchmark the matches of the specified file.
    #[structopt(long, conflicts_with_all = &["file", "inputs"])]
    bench: Option<PathBuf>,
}

fn format_match(r: &rematch::Match, input: &str) -> String {
    let text = |range: std::ops::Range<usize>| {
        input
            .get(range.clone())
            .map_or_else(|| format!("{:?}", &input.as_bytes()[range]), str::to_string)
    };
    let mut result = format!("\"{}\" ({}..{})", text(r.range()), r.start(), r.end());

    // Show capture groups if any exist
    if !r.captures.is_empty() {
        result.push_str(", captures: [");
        for (i, cg) in r.captures.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            match cg {
                Some(range) => result.push_str(&format!(
                    "\"{}\" ({}..{})",
                    text(range.clone()),
                    range.start,
                    range.end
                )),
                None => result.push_str("None"),
            }
        }
        result.push(']');
    }
    if let Some(mark) = r.mark() {
        result.push_str(&format!(", mark: {}", mark));
    }
    result
}

/// How each input is processed.
enum Action {
    Find,
    Dfa,
    Replace {
        template: String,
        options: SubstituteOptions,
    },
}

fn run_on_string(re: &Regex, action: &Action, input: &str) -> anyhow::Result<()> {
    match action {
        Action::Find => {
            let mut matches = re.find_iter(input);
            if let Some(res) = matches.next() {
                let count = 1 + matches.count();
                println!("Match: {}, total: {}", format_match(&res, input), count);
            } else {
                println!("No match");
            }
        }
        Action::Dfa => {
            let result = re.dfa_match(input.as_bytes(), 0, &DfaMatchOptions::default(), None)?;
            if result.is_match() {
                let ends: Vec<String> = result
                    .offsets()
                    .iter()
                    .flatten()
                    .map(|(start, end)| format!("{}..{}", start, end))
                    .collect();
                println!(
                    "Matches: {}{}",
                    ends.join(", "),
                    if result.truncated() { " (truncated)" } else { "" }
                );
            } else {
                println!("No match");
            }
        }
        Action::Replace { template, options } => {
            let sub = re
                .substituter(template)
                .options(*options)
                .run(input)
                .context("substitution failed")?;
            println!(
                "{} ({} replaced)",
                String::from_utf8_lossy(sub.output()),
                sub.count()
            );
        }
    }
    Ok(())
}

fn bench_re_on_path(re: &Regex, path: &Path) -> anyhow::Result<()> {
    let contents = fs::read_to_string(path).with_context(|| path.display().to_string())?;
    let input = contents.as_str();
    // Warmup
    re.find_iter(input).count();
    let start = Instant::now();
    for _ in 0..25 {
        re.find_iter(input).count();
    }
    let duration = start.elapsed();
    println!("{} ms", duration.as_millis());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    logger::Logger::init().context("failed to install logger")?;
    let args = Opt::from_args();

    let options = args
        .flags
        .clone()
        .unwrap_or_default()
        .no_optimize(args.no_optimize);

    if args.dump_ir || args.dump_bytecode {
        let mut ire = backends::try_parse(&args.pattern, &options)?;
        let measured = backends::Measurements::of(&ire);
        if args.dump_ir {
            println!("Unoptimized IR:\n{}", ire);
        }
        if !options.no_optimize {
            backends::optimize(&mut ire);
            if args.dump_ir {
                println!("Optimized IR:\n{}", ire);
            }
        }
        if args.dump_bytecode {
            let cr = backends::emit(&ire, &options, measured)?;
            println!("Bytecode:\n{:#?}", cr);
        }
    }

    let re = Regex::with_options(&args.pattern, options)
        .with_context(|| format!("failed to compile {:?}", args.pattern))?;

    let action = if args.dfa {
        if let Some(reason) = re.dfa_unsupported_reason() {
            anyhow::bail!("pattern cannot be scanned for all matches: {}", reason);
        }
        Action::Dfa
    } else if let Some(template) = args.replace {
        let options = SubstituteOptions::default()
            .global(args.global)
            .extended(args.extended);
        Action::Replace { template, options }
    } else {
        Action::Find
    };

    if let Some(ref path) = args.file {
        let contents = fs::read_to_string(path).with_context(|| path.display().to_string())?;
        run_on_string(&re, &action, contents.as_str())?;
    } else if let Some(ref path) = args.bench {
        bench_re_on_path(&re, path)?;
    } else {
        for input in &args.inputs {
            run_on_string(&re, &action, input)?;
        }
    }
    Ok(())
}
