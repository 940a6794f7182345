//! Command line parsing: the clap App, rc-file merging, the `--TYPE`
//! shortcut rewriting, and the translation into a [`Config`].

use clap::{crate_version, value_t, App, AppSettings, Arg, ArgMatches, ErrorKind};
use std::env;
use std::path::PathBuf;
use std::process;

use crate::config::{Config, ConfigBuilder};
use crate::error::{Error, Result};
use crate::rcfile;
use crate::types::{FilterAtom, Types};

const USAGE: &str = "ucgrep [OPTION...] PATTERN [FILES OR DIRECTORIES]";

pub fn get_args() -> Result<(Config, log::LevelFilter)> {
    get_args_impl(None::<&[String]>)
}

pub fn get_args_from<I, T>(from: I) -> Result<(Config, log::LevelFilter)>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    get_args_impl(Some(from))
}

fn app() -> App<'static, 'static> {
    App::new("ucgrep")
        .version(crate_version!())
        .usage(USAGE)
        .about("Recursively search source code for PATTERN.")
        .after_help(
            "Exit status is 0 if any matches were found, 1 if no matches, \
             2 or greater on error.",
        )
        .help_short("?")
        .setting(AppSettings::DeriveDisplayOrder)
        .arg(Arg::with_name("pattern")
                 .help("Pattern to search for"))
        .arg(Arg::with_name("paths")
                 .help("Files and directories to search")
                 .multiple(true))
        .arg(Arg::with_name("ignore-case")
                 .help("Ignore case distinctions in PATTERN")
                 .short("i")
                 .long("ignore-case")
                 .multiple(true))
        .arg(Arg::with_name("smart-case")
                 .help("Ignore case if PATTERN is all lowercase (default: enabled)")
                 .long("smart-case")
                 .multiple(true))
        .arg(Arg::with_name("no-smart-case")
                 .long("no-smart-case")
                 .alias("nosmart-case")
                 .multiple(true)
                 .hidden(true))
        .arg(Arg::with_name("word-regexp")
                 .help("PATTERN must match a complete word")
                 .short("w")
                 .long("word-regexp"))
        .arg(Arg::with_name("literal")
                 .help("Treat all characters in PATTERN as literal")
                 .short("Q")
                 .long("literal"))
        .arg(Arg::with_name("column")
                 .help("Print column of first match after line number")
                 .long("column")
                 .multiple(true))
        .arg(Arg::with_name("nocolumn")
                 .help("Don't print column of first match (default)")
                 .long("nocolumn")
                 .alias("no-column")
                 .multiple(true))
        .arg(Arg::with_name("color")
                 .help("Render the output with ANSI color codes")
                 .long("color")
                 .alias("colour")
                 .multiple(true))
        .arg(Arg::with_name("nocolor")
                 .help("Render the output without ANSI color codes")
                 .long("nocolor")
                 .aliases(&["nocolour", "no-color", "no-colour"])
                 .multiple(true))
        .arg(Arg::with_name("null")
                 .help("Print a null character instead of ':' after the file name")
                 .long("null"))
        .arg(Arg::with_name("ignore-dir")
                 .help("Exclude directories with NAME")
                 .long("ignore-dir")
                 .alias("ignore-directory")
                 .value_name("NAME")
                 .number_of_values(1)
                 .multiple(true)
                 .takes_value(true))
        .arg(Arg::with_name("noignore-dir")
                 .help("Do not exclude directories with NAME")
                 .long("noignore-dir")
                 .aliases(&["noignore-directory", "no-ignore-dir", "no-ignore-directory"])
                 .value_name("NAME")
                 .number_of_values(1)
                 .multiple(true)
                 .takes_value(true))
        .arg(Arg::with_name("include")
                 .help("Only files matching GLOB will be searched")
                 .long("include")
                 .value_name("GLOB")
                 .number_of_values(1)
                 .multiple(true)
                 .takes_value(true))
        .arg(Arg::with_name("exclude")
                 .help("Files matching GLOB will be ignored")
                 .long("exclude")
                 .alias("ignore")
                 .value_name("GLOB")
                 .number_of_values(1)
                 .multiple(true)
                 .takes_value(true))
        .arg(Arg::with_name("ignore-file")
                 .help("Files matching FILTER:FILTERARGS (e.g. ext:txt,cpp) will be ignored")
                 .long("ignore-file")
                 .value_name("FILTER:FILTERARGS")
                 .number_of_values(1)
                 .multiple(true)
                 .takes_value(true))
        .arg(Arg::with_name("recurse")
                 .help("Recurse into subdirectories (default: on)")
                 .short("r")
                 .long("recurse")
                 .multiple(true))
        .arg(Arg::with_name("recurse-upper")
                 .short("R")
                 .multiple(true)
                 .hidden(true))
        .arg(Arg::with_name("no-recurse")
                 .help("Do not recurse into subdirectories")
                 .short("n")
                 .long("no-recurse")
                 .multiple(true))
        .arg(Arg::with_name("follow")
                 .help("Follow symlinks (default: nofollow)")
                 .long("follow")
                 .multiple(true))
        .arg(Arg::with_name("nofollow")
                 .long("nofollow")
                 .alias("no-follow")
                 .multiple(true)
                 .hidden(true))
        .arg(Arg::with_name("known-types")
                 .help("Only search in files of recognized types (default: on)")
                 .short("k")
                 .long("known-types"))
        .arg(Arg::with_name("type")
                 .help("Include only [exclude all] TYPE files. Types may also be specified as --[no]TYPE")
                 .long("type")
                 .value_name("[no]TYPE")
                 .number_of_values(1)
                 .multiple(true)
                 .takes_value(true))
        .arg(Arg::with_name("type-set")
                 .help("Files FILTERed with the given FILTERARGS are treated as belonging to type TYPE. Any existing definition of type TYPE is replaced")
                 .long("type-set")
                 .value_name("TYPE:FILTER:FILTERARGS")
                 .number_of_values(1)
                 .multiple(true)
                 .takes_value(true))
        .arg(Arg::with_name("type-add")
                 .help("Files FILTERed with the given FILTERARGS are treated as belonging to type TYPE. Any existing definition of type TYPE is appended to")
                 .long("type-add")
                 .value_name("TYPE:FILTER:FILTERARGS")
                 .number_of_values(1)
                 .multiple(true)
                 .takes_value(true))
        .arg(Arg::with_name("type-del")
                 .help("Remove any existing definition of type TYPE")
                 .long("type-del")
                 .value_name("TYPE")
                 .number_of_values(1)
                 .multiple(true)
                 .takes_value(true))
        .arg(Arg::with_name("dirjobs")
                 .help("Number of directory traversal jobs (threads) to use")
                 .long("dirjobs")
                 .value_name("NUM_JOBS")
                 .takes_value(true)
                 .validator(positive_int))
        .arg(Arg::with_name("jobs")
                 .help("Number of scanner jobs (threads) to use")
                 .short("j")
                 .long("jobs")
                 .value_name("NUM_JOBS")
                 .takes_value(true)
                 .validator(positive_int))
        .arg(Arg::with_name("noenv")
                 .help("Ignore .ucgrc configuration files")
                 .long("noenv"))
        .arg(Arg::with_name("help-types")
                 .help("Print list of supported file types")
                 .long("help-types")
                 .alias("list-file-types"))
        .arg(Arg::with_name("usage")
                 .help("Give a short usage message")
                 .long("usage"))
        .arg(Arg::with_name("test-log-all").long("test-log-all").hidden(true))
        .arg(Arg::with_name("test-noenv-user").long("test-noenv-user").hidden(true))
}

fn positive_int(v: String) -> ::std::result::Result<(), String> {
    match v.parse::<usize>() {
        Ok(n) if n > 0 => Ok(()),
        _ => Err(format!("'{}' is not an integer greater than 0", v)),
    }
}

/// Applies the file-type administration options and rewrites `--TYPE` and
/// `--noTYPE` shortcuts into `--type=` forms clap can digest. Runs over the
/// combined rc-file + command-line argument vector, in order, before the
/// regular parse.
fn apply_type_args(args: &mut Vec<String>, types: &mut Types) -> Result<()> {
    for arg in args.iter_mut().skip(1) {
        if arg.as_str() == "--" {
            break;
        }

        if arg.len() < 3 || !arg.starts_with("--") {
            continue;
        }

        let text = arg[2..].to_string();

        // A known type name (or unambiguous prefix of one) as a long
        // option selects that type.
        let names = types.matching_names(&text);
        if names.len() == 1 {
            *arg = format!("--type={}", names[0]);
            continue;
        } else if names.len() > 1 {
            return Err(Error::Usage(format!(
                "option '--{}' is ambiguous; possibilities: '--{}'",
                text,
                names.join("' '--")
            )));
        }

        if let Some(rest) = text.strip_prefix("no") {
            let names = types.matching_names(rest);
            if names.len() == 1 {
                *arg = format!("--type=no{}", names[0]);
                continue;
            } else if names.len() > 1 {
                return Err(Error::Usage(format!(
                    "option '--{}' is ambiguous; possibilities: '--no{}'",
                    text,
                    names.join("' '--no")
                )));
            }
        }

        // Type definition options mutate the registry up front so that
        // later --TYPE shortcuts can refer to freshly defined types.
        if let Some(eq) = text.find('=') {
            let (key, value) = (&text[..eq], &text[eq + 1..]);
            let applied = match key {
                "type-add" => types.add_from_spec(false, value),
                "type-set" => types.add_from_spec(true, value),
                "type-del" => {
                    types.delete(value);
                    Ok(())
                }
                "ignore-file" => types.add_ignore_spec(value),
                "exclude" | "ignore" => types.add_exclude_glob(value),
                "include" => types.add_include_glob(value),
                _ => continue,
            };

            if let Err(err) = applied {
                return Err(Error::Usage(format!(
                    "{} while parsing option '{}'",
                    err, arg
                )));
            }
        }
    }

    Ok(())
}

fn last_index(matches: &ArgMatches, name: &str) -> Option<usize> {
    matches.indices_of(name).and_then(|ix| ix.last())
}

/// Resolves a --opt/--noopt pair: whichever appeared last wins.
fn flag_pair(matches: &ArgMatches, yes: Option<usize>, no: &str, default: bool) -> bool {
    match (yes, last_index(matches, no)) {
        (None, None) => default,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (Some(y), Some(n)) => y > n,
    }
}

fn get_args_impl<I, T>(from: Option<I>) -> Result<(Config, log::LevelFilter)>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut argv: Vec<String> = match from {
        None => env::args().collect(),
        Some(iter) => iter.into_iter().map(Into::into).collect(),
    };

    let program = if argv.is_empty() {
        "ucgrep".to_string()
    } else {
        argv.remove(0)
    };

    // --noenv is honored wherever it appears before a "--", because the rc
    // files have to be skipped before anything is parsed.
    let noenv = argv
        .iter()
        .take_while(|a| a.as_str() != "--")
        .any(|a| a == "--noenv");
    let noenv_user = argv
        .iter()
        .take_while(|a| a.as_str() != "--")
        .any(|a| a == "--test-noenv-user");

    let mut combined = vec![program];
    if !noenv {
        combined.extend(rcfile::rc_arguments(noenv_user)?);
    }
    combined.extend(argv);

    let mut types = Types::new();
    apply_type_args(&mut combined, &mut types)?;

    let matches = match app().get_matches_from_safe(&combined) {
        Ok(matches) => matches,
        Err(err) => match err.kind {
            // -? and -V print and quit successfully.
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => err.exit(),
            _ => {
                return Err(Error::Usage(format!(
                    "{}\nTry 'ucgrep --help' or 'ucgrep --usage' for more information.",
                    err.message
                )));
            }
        },
    };

    if matches.is_present("help-types") {
        print_help_types(&types);
        process::exit(0);
    }

    if matches.is_present("usage") {
        println!("Usage: {}", USAGE);
        process::exit(0);
    }

    let pattern = match matches.value_of("pattern") {
        Some(pattern) => pattern.to_string(),
        None => {
            return Err(Error::Usage(format!(
                "missing PATTERN\nUsage: {}",
                USAGE
            )));
        }
    };

    // The three case options interact: replay them in command-line order
    // and let the last one decide.
    let mut ignore_case = false;
    let mut smart_case = true;
    let mut case_events: Vec<(usize, u8)> = Vec::new();
    for &(name, kind) in &[("ignore-case", 0u8), ("smart-case", 1), ("no-smart-case", 2)] {
        if let Some(indices) = matches.indices_of(name) {
            case_events.extend(indices.map(|i| (i, kind)));
        }
    }
    case_events.sort_unstable();
    for (_, kind) in case_events {
        match kind {
            0 => {
                ignore_case = true;
                smart_case = false;
            }
            1 => {
                smart_case = true;
                ignore_case = false;
            }
            _ => smart_case = false,
        }
    }

    // --ignore-dir/--noignore-dir operations, in order of appearance.
    let mut dir_ops: Vec<(usize, String, bool)> = Vec::new();
    for &(name, add) in &[("ignore-dir", true), ("noignore-dir", false)] {
        if let (Some(values), Some(indices)) = (matches.values_of(name), matches.indices_of(name)) {
            for (value, index) in values.zip(indices) {
                dir_ops.push((index, value.to_string(), add));
            }
        }
    }
    dir_ops.sort_by_key(|(index, _, _)| *index);
    let ignore_dirs: Vec<(String, bool)> = dir_ops
        .into_iter()
        .map(|(_, name, add)| (name, add))
        .collect();

    // --type=TYPE and --type=noTYPE selections, in order of appearance.
    if let Some(values) = matches.values_of("type") {
        for value in values {
            if let Some(name) = value.strip_prefix("no") {
                if !types.deselect(name) {
                    return Err(Error::Usage(format!("Unknown type '{}'", name)));
                }
            } else if !types.select(value) {
                return Err(Error::Usage(format!("Unknown type '{}'", value)));
            }
        }
    }

    let recurse_yes = ::std::cmp::max(
        last_index(&matches, "recurse"),
        last_index(&matches, "recurse-upper"),
    );

    let mut builder = ConfigBuilder::default();
    builder
        .pattern(pattern)
        .ignore_case(ignore_case)
        .smart_case(smart_case)
        .word_regexp(matches.is_present("word-regexp"))
        .literal(matches.is_present("literal"))
        .column(flag_pair(&matches, last_index(&matches, "column"), "nocolumn", false))
        .null_sep(matches.is_present("null"))
        .recurse(flag_pair(&matches, recurse_yes, "no-recurse", true))
        .follow_symlinks(flag_pair(&matches, last_index(&matches, "follow"), "nofollow", false))
        .types(types)
        .ignore_dirs(ignore_dirs);

    if matches.is_present("color") || matches.is_present("nocolor") {
        builder.color(flag_pair(&matches, last_index(&matches, "color"), "nocolor", false));
    }

    if let Some(paths) = matches.values_of("paths") {
        builder.paths(paths.map(PathBuf::from).collect::<Vec<_>>());
    }

    if matches.is_present("jobs") {
        builder.jobs(value_t!(matches, "jobs", usize).unwrap_or_else(|e| e.exit()));
    }

    if matches.is_present("dirjobs") {
        builder.dirjobs(value_t!(matches, "dirjobs", usize).unwrap_or_else(|e| e.exit()));
    }

    let config = builder.build().map_err(Error::Usage)?;

    let level = if matches.is_present("test-log-all") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    Ok((config, level))
}

fn print_help_types(types: &Types) {
    println!("ucgrep recognizes the following file types:");
    println!();

    for (name, atoms) in types.describe() {
        let mut extensions = Vec::new();
        let mut literals = Vec::new();
        for atom in atoms {
            match atom {
                FilterAtom::Ext(ext) => extensions.push(ext.as_str()),
                FilterAtom::Literal(lit) => literals.push(lit.as_str()),
                FilterAtom::IncludeGlob(_) | FilterAtom::FirstLine(_) => {}
            }
        }

        let mut line = format!("  {:<15}{}", name, extensions.join(" "));
        if !extensions.is_empty() && !literals.is_empty() {
            line.push_str("; ");
        }
        line.push_str(&literals.join(" "));
        println!("{}", line);
    }

    println!();
}
