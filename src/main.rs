use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;

use qpath::output::to_json_string;
use qpath::{QueryOptions, Value};

#[derive(Parser)]
#[command(
    name = "qpath",
    about = "qpath - evaluate SQL/JSON path expressions against JSON documents",
    version,
    after_help = "Example:\n\n\t$ echo '{\"a\": [1, 2, 3]}' | qpath '$.a[*] ? (@ > 1)'\n\t2\n\t3"
)]
struct Cli {
    /// jsonpath expression, e.g. '$.a[*] ? (@ > $min)'
    path: String,

    /// Input file; defaults to stdin
    file: Option<String>,

    /// Bind $NAME to a JSON value (unparseable values are taken as strings)
    #[arg(long = "arg", num_args = 2, value_names = ["NAME", "VALUE"], action = clap::ArgAction::Append)]
    args: Vec<String>,

    /// Print only the first selected item
    #[arg(long)]
    first: bool,

    /// Print whether the path selects anything: true, false, or null
    #[arg(long)]
    exists: bool,

    /// Print the predicate outcome: true, false, or null
    #[arg(long = "match")]
    match_mode: bool,

    /// Suppress suppressible evaluation errors
    #[arg(long)]
    silent: bool,

    /// Allow datetime conversions that require a time zone
    #[arg(long)]
    tz: bool,
}

fn main() {
    let cli = Cli::parse();

    let path = match qpath::parse(&cli.path) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("qpath: {err:#}");
            std::process::exit(2);
        }
    };
    let (input, opts) = match prepare(&cli) {
        Ok(ready) => ready,
        Err(err) => {
            eprintln!("qpath: {err:#}");
            std::process::exit(2);
        }
    };

    std::process::exit(evaluate(&cli, &path, &input, &opts));
}

fn prepare(cli: &Cli) -> Result<(Value, QueryOptions)> {
    let raw = match &cli.file {
        Some(file) => {
            std::fs::read_to_string(file).with_context(|| format!("cannot read {file}"))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read stdin")?;
            buf
        }
    };
    let input: serde_json::Value =
        serde_json::from_str(&raw).context("input is not valid JSON")?;

    let mut opts = QueryOptions::new();
    for pair in cli.args.chunks(2) {
        let [name, raw] = pair else { continue };
        let value = serde_json::from_str::<serde_json::Value>(raw)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.clone()));
        opts = opts.with_var(name.clone(), value);
    }
    if cli.silent {
        opts = opts.silent();
    }
    if cli.tz {
        opts = opts.with_tz();
    }
    Ok((Value::from(input), opts))
}

fn evaluate(cli: &Cli, path: &qpath::Path, input: &Value, opts: &QueryOptions) -> i32 {
    if cli.exists || cli.match_mode {
        let result = if cli.exists {
            path.exists(input, opts)
        } else {
            path.matches(input, opts)
        };
        return match result {
            Ok(Some(b)) => {
                println!("{b}");
                0
            }
            Ok(None) => {
                println!("null");
                0
            }
            Err(err) => {
                eprintln!("qpath: {err}");
                1
            }
        };
    }

    if cli.first {
        return match path.first(input, opts) {
            Ok(Some(item)) => {
                println!("{}", to_json_string(&item));
                0
            }
            Ok(None) => 0,
            Err(err) => {
                eprintln!("qpath: {err}");
                1
            }
        };
    }

    match path.query(input, opts) {
        Ok(items) => {
            for item in &items {
                println!("{}", to_json_string(item));
            }
            0
        }
        Err(err) => {
            eprintln!("qpath: {err}");
            1
        }
    }
}
