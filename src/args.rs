use std::env;

use crate::vision::{MatchOptions, RegionOfInterest};

/// Operation selected on the command line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    WaitAppear(String),
    WaitDisappear(String),
    Count(String),
    Exists(String),
    CountMultiple(Vec<String>),
    MultipleExist(Vec<String>),
    WaitOneOf(Vec<String>),
    WaitAll(Vec<String>),
}

#[derive(Debug)]
pub struct Args {
    pub command: Command,
    pub screens: Vec<String>,
    pub options: MatchOptions,
    pub overrides: Vec<(String, String)>,
    pub json: bool,
    pub debug_mode: bool,
}

/// Why parsing stopped without producing [`Args`]
#[derive(Debug, PartialEq)]
pub enum ParseOutcome {
    /// Help or version was printed
    Exit,
    Invalid(String),
}

impl Args {
    pub fn parse() -> Result<Self, ParseOutcome> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::parse_from(&args)
    }

    pub fn parse_from(args: &[String]) -> Result<Self, ParseOutcome> {
        let mut command: Option<Command> = None;
        let mut screens = Vec::new();
        let mut options = MatchOptions::new();
        let mut overrides = Vec::new();
        let mut json = false;
        let mut debug_mode = false;

        for arg in args {
            if arg == "--help" || arg == "-h" {
                print_help();
                return Err(ParseOutcome::Exit);
            } else if arg == "--version" || arg == "-v" {
                println!("Screen Vision Run v{}", env!("CARGO_PKG_VERSION"));
                return Err(ParseOutcome::Exit);
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--json" {
                json = true;
            } else if let Some(path) = arg.strip_prefix("--screen=") {
                screens.push(path.to_string());
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                options.timeout = Some(parse_number("timeout", val)?);
            } else if let Some(val) = arg.strip_prefix("--similarity=") {
                options.similarity = Some(parse_number("similarity", val)?);
            } else if let Some(val) = arg.strip_prefix("--roi=") {
                options.roi = Some(RegionOfInterest::parse(val));
            } else if let Some(pair) = arg.strip_prefix("--set=") {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    ParseOutcome::Invalid(format!("Expected --set=key=value, got '{}'", arg))
                })?;
                overrides.push((key.to_string(), value.to_string()));
            } else if let Some(selected) = parse_command(arg)? {
                if command.is_some() {
                    return Err(ParseOutcome::Invalid(
                        "Only one operation flag may be given".to_string(),
                    ));
                }
                command = Some(selected);
            } else {
                return Err(ParseOutcome::Invalid(format!("Unknown argument: {}", arg)));
            }
        }

        let command = command.ok_or_else(|| {
            ParseOutcome::Invalid("No operation given (try --help)".to_string())
        })?;
        if screens.is_empty() {
            return Err(ParseOutcome::Invalid(
                "At least one --screen=<png> is required".to_string(),
            ));
        }

        Ok(Args {
            command,
            screens,
            options,
            overrides,
            json,
            debug_mode,
        })
    }
}

fn parse_command(arg: &str) -> Result<Option<Command>, ParseOutcome> {
    let Some((flag, value)) = arg.split_once('=') else {
        return Ok(None);
    };
    let single = || value.to_string();
    let list = || split_list(value);

    let command = match flag {
        "--wait-appear" => Command::WaitAppear(single()),
        "--wait-disappear" => Command::WaitDisappear(single()),
        "--count" => Command::Count(single()),
        "--exists" => Command::Exists(single()),
        "--count-multiple" => Command::CountMultiple(list()),
        "--multiple-exists" => Command::MultipleExist(list()),
        "--wait-one-of" => Command::WaitOneOf(list()),
        "--wait-all" => Command::WaitAll(list()),
        _ => return Ok(None),
    };

    if value.trim().is_empty() {
        return Err(ParseOutcome::Invalid(format!("{} needs an image", flag)));
    }
    Ok(Some(command))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(name: &str, val: &str) -> Result<f64, ParseOutcome> {
    val.parse::<f64>()
        .map_err(|_| ParseOutcome::Invalid(format!("Invalid {} value: {}", name, val)))
}

fn print_help() {
    println!("🔎 Screen Vision Run");
    println!();
    println!("USAGE:");
    println!("    screen-vision-run --screen=<png> <OPERATION> [OPTIONS]");
    println!();
    println!("OPERATIONS:");
    println!("    --wait-appear=IMG        Wait until IMG is visible");
    println!("    --wait-disappear=IMG     Wait until IMG is gone");
    println!("    --count=IMG              Count occurrences (fails if IMG never appears)");
    println!("    --exists=IMG             Report whether IMG appears before the timeout");
    println!("    --count-multiple=A,B     Count every image");
    println!("    --multiple-exists=A,B    Report which images appear");
    println!("    --wait-one-of=A,B        Wait for the first image to appear");
    println!("    --wait-all=A,B           Wait until every image is visible");
    println!();
    println!("OPTIONS:");
    println!("    --screen=<png>           Screenshot file for a screen (repeatable)");
    println!("    --timeout=S              Timeout in seconds");
    println!("    --similarity=F           Minimum similarity (0.0 - 1.0)");
    println!("    --roi=IMG|x,y,w,h        Restrict the search area");
    println!("    --set=key=value          Config override (similarity, timeout, highlight,");
    println!("                             highlight_time, screen_id)");
    println!("    --json                   Print the result as JSON");
    println!("    --debug                  Enable debug logging");
    println!("    --help, -h               Show this help message");
    println!("    --version, -v            Show version information");
    println!();
    println!("ENVIRONMENT:");
    println!("    SCREEN_VISION_<KEY>      Config value, overrides --set");
    println!();
    println!("EXAMPLES:");
    println!("    screen-vision-run --screen=shot.png --count=coin.png");
    println!("    screen-vision-run --screen=shot.png --multiple-exists=ok.png,cancel.png --json");
    println!("    screen-vision-run --screen=shot.png --wait-appear=ok.png --roi=dialog.png");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(list: &[&str]) -> Result<Args, ParseOutcome> {
        let args: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        Args::parse_from(&args)
    }

    #[test]
    fn test_parse_single_operation() {
        let args = parse(&[
            "--screen=shot.png",
            "--count=coin.png",
            "--timeout=2.5",
            "--json",
        ])
        .unwrap();

        assert_eq!(args.command, Command::Count("coin.png".to_string()));
        assert_eq!(args.screens, vec!["shot.png".to_string()]);
        assert_eq!(args.options.timeout, Some(2.5));
        assert!(args.json);
        assert!(!args.debug_mode);
    }

    #[test]
    fn test_parse_batch_and_roi() {
        let args = parse(&[
            "--screen=a.png",
            "--screen=b.png",
            "--wait-all=ok.png, cancel.png,",
            "--roi=10,20,30,40",
            "--set=highlight=false",
        ])
        .unwrap();

        assert_eq!(
            args.command,
            Command::WaitAll(vec!["ok.png".to_string(), "cancel.png".to_string()])
        );
        assert_eq!(args.screens.len(), 2);
        assert!(matches!(args.options.roi, Some(RegionOfInterest::Area(_))));
        assert_eq!(
            args.overrides,
            vec![("highlight".to_string(), "false".to_string())]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse(&["--screen=a.png"]),
            Err(ParseOutcome::Invalid(_))
        ));
        assert!(matches!(
            parse(&["--exists=a.png"]),
            Err(ParseOutcome::Invalid(_))
        ));
        assert!(matches!(
            parse(&["--screen=a.png", "--exists=a.png", "--count=b.png"]),
            Err(ParseOutcome::Invalid(_))
        ));
        assert!(matches!(
            parse(&["--screen=a.png", "--exists=a.png", "--timeout=soon"]),
            Err(ParseOutcome::Invalid(_))
        ));
        assert!(matches!(
            parse(&["--screen=a.png", "--exists="]),
            Err(ParseOutcome::Invalid(_))
        ));
        assert!(matches!(
            parse(&["--screen=a.png", "--bogus"]),
            Err(ParseOutcome::Invalid(_))
        ));
    }
}
