// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for hubdump.
//!
//! This binary provides the `hubdump` command with two subcommands:
//! `discussions` saves a repository's discussions as Markdown files, and
//! `releases` prints or saves release information as a table, JSON, or CSV.

use hubdump::{export, github, markdown, version};
use lexopt::prelude::*;
use snafu::{OptionExt, prelude::*};
use std::path::PathBuf;

struct DiscussionsCmd {
    owner: String,
    repo: String,
    category: Option<String>,
    limit: usize,
    output_dir: PathBuf,
    include_comments: bool,
    force: bool,
    quiet: bool,
}

#[allow(clippy::struct_excessive_bools)]
struct ReleasesCmd {
    owner: String,
    repo: String,
    limit: usize,
    all: bool,
    major_only: bool,
    format: export::Format,
    output: Option<PathBuf>,
    force: bool,
    quiet: bool,
}

enum Command {
    Discussions(DiscussionsCmd),
    Releases(ReleasesCmd),
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("missing command: expected `discussions` or `releases`"))]
    MissingCommand,

    #[snafu(display("unknown command {command:?}: expected `discussions` or `releases`"))]
    UnknownCommand { command: String },

    #[snafu(display("--owner and --repo are required"))]
    MissingRepository,

    #[snafu(display("invalid --format {value:?}: expected table, json, or csv"))]
    InvalidFormat { value: String },

    #[snafu(display("GITHUB_TOKEN is not set; export it or add it to a .env file"))]
    MissingToken,

    #[snafu(display("failed to fetch from GitHub: {source}"))]
    Fetch { source: github::FetchError },

    #[snafu(display("failed to group releases: {source}"))]
    Group { source: version::VersionError },

    #[snafu(display("failed to export releases: {source}"))]
    Export { source: export::OutputError },

    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write discussion file: {source}"))]
    WriteDiscussion { source: export::OutputError },
}

fn print_help() {
    println!(
        "\
{name} {version}
Export GitHub discussions and releases to Markdown, JSON, or CSV

Usage: {name} <COMMAND> --owner <OWNER> --repo <REPO> [OPTIONS]

Commands:
  discussions  Save discussions as Markdown files
  releases     Print or save release information

Common options:
      --owner <OWNER>       Repository owner (user or organization)
      --repo <REPO>         Repository name
      --limit <N>           Maximum number of items to fetch (default: 10)
  -f, --force               Overwrite existing output files
  -q, --quiet               Suppress progress messages
  -h, --help                Print help
  -V, --version             Print version

Discussions options:
      --category <ID>       Filter by discussion category ID
  -o, --output-dir <DIR>    Directory for Markdown files (default: discussions)
      --include-comments    Include comments in the output

Releases options:
      --all                 Fetch every release (ignores --limit)
      --major-only          Keep only the earliest release per major.minor line
      --format <FORMAT>     table, json, or csv (default: table)
  -o, --output <FILE>       Output file for json/csv
                            (default: <owner>_<repo>_releases.<ext>)

Authentication: set GITHUB_TOKEN in the environment or in a .env file.",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Command, Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut parser = lexopt::Parser::from_env();
    loop {
        match parser.next().context(ParseArgsSnafu)? {
            Some(Short('h') | Long("help")) => {
                print_help();
                std::process::exit(0);
            }
            Some(Short('V') | Long("version")) => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Some(Value(command)) => {
                let command = command.string().context(ParseArgsSnafu)?;
                return match command.as_str() {
                    "discussions" => parse_discussions(parser),
                    "releases" => parse_releases(parser),
                    _ => UnknownCommandSnafu { command }.fail(),
                };
            }
            Some(arg) => {
                return Err(Error::ParseArgs {
                    source: arg.unexpected(),
                });
            }
            None => return MissingCommandSnafu.fail(),
        }
    }
}

fn parse_discussions(mut parser: lexopt::Parser) -> Result<Command, Error> {
    let mut owner = None;
    let mut repo = None;
    let mut category = None;
    let mut limit: usize = 10;
    let mut output_dir = PathBuf::from("discussions");
    let mut include_comments = false;
    let mut force = false;
    let mut quiet = false;

    while let Some(arg) = parser.next().context(ParseArgsSnafu)? {
        match arg {
            Long("owner") => owner = Some(string_value(&mut parser)?),
            Long("repo") => repo = Some(string_value(&mut parser)?),
            Long("category") => category = Some(string_value(&mut parser)?),
            Long("limit") => limit = parsed_value(&mut parser)?,
            Short('o') | Long("output-dir") => {
                output_dir = parser.value().context(ParseArgsSnafu)?.into();
            }
            Long("include-comments") => include_comments = true,
            Short('f') | Long("force") => force = true,
            Short('q') | Long("quiet") => quiet = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                return Err(Error::ParseArgs {
                    source: arg.unexpected(),
                });
            }
        }
    }

    Ok(Command::Discussions(DiscussionsCmd {
        owner: owner.context(MissingRepositorySnafu)?,
        repo: repo.context(MissingRepositorySnafu)?,
        category,
        limit,
        output_dir,
        include_comments,
        force,
        quiet,
    }))
}

fn parse_releases(mut parser: lexopt::Parser) -> Result<Command, Error> {
    let mut owner = None;
    let mut repo = None;
    let mut limit: usize = 10;
    let mut all = false;
    let mut major_only = false;
    let mut format = export::Format::Table;
    let mut output = None;
    let mut force = false;
    let mut quiet = false;

    while let Some(arg) = parser.next().context(ParseArgsSnafu)? {
        match arg {
            Long("owner") => owner = Some(string_value(&mut parser)?),
            Long("repo") => repo = Some(string_value(&mut parser)?),
            Long("limit") => limit = parsed_value(&mut parser)?,
            Long("all") => all = true,
            Long("major-only") => major_only = true,
            Long("format") => {
                let value = string_value(&mut parser)?;
                format = export::Format::from_arg(&value).context(InvalidFormatSnafu { value })?;
            }
            Short('o') | Long("output") => {
                output = Some(parser.value().context(ParseArgsSnafu)?.into());
            }
            Short('f') | Long("force") => force = true,
            Short('q') | Long("quiet") => quiet = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                return Err(Error::ParseArgs {
                    source: arg.unexpected(),
                });
            }
        }
    }

    Ok(Command::Releases(ReleasesCmd {
        owner: owner.context(MissingRepositorySnafu)?,
        repo: repo.context(MissingRepositorySnafu)?,
        limit,
        all,
        major_only,
        format,
        output,
        force,
        quiet,
    }))
}

fn string_value(parser: &mut lexopt::Parser) -> Result<String, Error> {
    parser
        .value()
        .context(ParseArgsSnafu)?
        .string()
        .context(ParseArgsSnafu)
}

fn parsed_value(parser: &mut lexopt::Parser) -> Result<usize, Error> {
    parser
        .value()
        .context(ParseArgsSnafu)?
        .parse()
        .context(ParseArgsSnafu)
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let command = parse_args()?;

    // Pick up GITHUB_TOKEN from a .env file when present.
    dotenvy::dotenv().ok();

    match command {
        Command::Discussions(cmd) => run_discussions(&cmd),
        Command::Releases(cmd) => run_releases(&cmd),
    }
}

fn github_token() -> Result<String, Error> {
    std::env::var("GITHUB_TOKEN")
        .ok()
        .filter(|token| !token.is_empty())
        .context(MissingTokenSnafu)
}

fn run_discussions(cmd: &DiscussionsCmd) -> Result<(), Error> {
    let token = github_token()?;
    let client = github::Client::new(&token).context(FetchSnafu)?;

    if !cmd.quiet {
        eprintln!(
            "Fetching up to {} discussions from {}/{}...",
            cmd.limit, cmd.owner, cmd.repo
        );
    }

    let request = github::DiscussionRequest {
        owner: &cmd.owner,
        repo: &cmd.repo,
        category_id: cmd.category.as_deref(),
        include_comments: cmd.include_comments,
        limit: Some(cmd.limit),
    };
    let discussions = client.fetch_discussions(&request).context(FetchSnafu)?;

    if !cmd.quiet {
        eprintln!("Found {} discussion(s)", discussions.len());
    }

    std::fs::create_dir_all(&cmd.output_dir).context(CreateOutputDirSnafu {
        path: &cmd.output_dir,
    })?;

    for discussion in &discussions {
        let path = cmd.output_dir.join(markdown::discussion_filename(discussion));
        let document = markdown::render_discussion(discussion, cmd.include_comments);
        export::write_output(&path, &document, cmd.force).context(WriteDiscussionSnafu)?;

        if !cmd.quiet {
            eprintln!("Wrote {}", path.display());
        }
    }

    Ok(())
}

fn run_releases(cmd: &ReleasesCmd) -> Result<(), Error> {
    let token = github_token()?;
    let client = github::Client::new(&token).context(FetchSnafu)?;

    if !cmd.quiet {
        let count = if cmd.all {
            "all".to_owned()
        } else {
            cmd.limit.to_string()
        };
        eprintln!(
            "Fetching {count} releases from {}/{}...",
            cmd.owner, cmd.repo
        );
    }

    let limit = if cmd.all { None } else { Some(cmd.limit) };
    let releases = client
        .fetch_releases(&cmd.owner, &cmd.repo, limit)
        .context(FetchSnafu)?;

    let releases = if cmd.major_only {
        version::group_major_minor(releases).context(GroupSnafu)?
    } else {
        releases
    };

    if !cmd.quiet {
        eprintln!("Found {} release(s)", releases.len());
    }

    match cmd.format {
        export::Format::Table => print!("{}", export::render_table(&releases)),
        export::Format::Json | export::Format::Csv => {
            let contents = match cmd.format {
                export::Format::Json => export::render_json(&releases).context(ExportSnafu)?,
                _ => export::render_csv(&releases),
            };
            let path = cmd.output.clone().unwrap_or_else(|| {
                PathBuf::from(format!(
                    "{}_{}_releases.{}",
                    cmd.owner,
                    cmd.repo,
                    cmd.format.extension()
                ))
            });
            export::write_output(&path, &contents, cmd.force).context(ExportSnafu)?;
            if !cmd.quiet {
                eprintln!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}
