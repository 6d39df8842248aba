use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use oapi_merger_core::OutputFormat;
use pico_args::Arguments;

pub(crate) const HELP: &str = "\
Merge a multi-file OpenAPI 3.x document into a single file.

USAGE:
  oapi-merger -i <FILE> [-o <FILE>] [-f <FORMAT>]

OPTIONS:
  -i, --input <FILE>     Root OpenAPI document (YAML or JSON)
  -o, --output <FILE>    Output file, standard output when omitted
  -f, --format <FORMAT>  Output format: yaml or json [default: yaml]
  -v, --verbose          Log each loaded file and hoisted component
  -h, --help             Print this help
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Merge(CliArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliArgs {
    pub(crate) input: PathBuf,
    pub(crate) output: Option<PathBuf>,
    pub(crate) format: OutputFormat,
    pub(crate) verbose: bool,
}

impl Command {
    /// Parses the arguments, returning the command and the arguments left unused.
    pub(crate) fn parse(mut pargs: Arguments) -> Result<(Self, Vec<OsString>)> {
        if pargs.contains(["-h", "--help"]) {
            return Ok((Self::Help, pargs.finish()));
        }

        let verbose = pargs.contains(["-v", "--verbose"]);

        let format = pargs
            .opt_value_from_str(["-f", "--format"])
            .context("parsing format argument")?;

        let output = pargs
            .opt_value_from_os_str(["-o", "--output"], |value| {
                Ok::<_, std::convert::Infallible>(PathBuf::from(value))
            })
            .context("parsing output argument")?;

        let input = pargs
            .opt_value_from_os_str(["-i", "--input"], |value| {
                Ok::<_, std::convert::Infallible>(PathBuf::from(value))
            })
            .context("parsing input argument")?
            .context("missing required argument -i/--input")?;

        let args = CliArgs {
            input,
            output,
            format: format.unwrap_or_default(),
            verbose,
        };
        Ok((Self::Merge(args), pargs.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Result<(Command, Vec<OsString>)> {
        Command::parse(Arguments::from_vec(args.iter().map(OsString::from).collect()))
    }

    #[test]
    fn should_parse_all_options() {
        let (command, remaining) =
            parse(&["-i", "api/openapi.yaml", "-o", "out.json", "-f", "json", "-v"])
                .expect("should parse");

        assert_eq!(
            command,
            Command::Merge(CliArgs {
                input: PathBuf::from("api/openapi.yaml"),
                output: Some(PathBuf::from("out.json")),
                format: OutputFormat::Json,
                verbose: true,
            })
        );
        assert!(remaining.is_empty());
    }

    #[test]
    fn should_default_to_yaml_on_stdout() {
        let (command, _) = parse(&["--input", "openapi.yaml"]).expect("should parse");

        let Command::Merge(args) = command else {
            panic!("expected a merge command, got {command:?}");
        };
        assert_eq!(args.format, OutputFormat::Yaml);
        assert_eq!(args.output, None);
        assert!(!args.verbose);
    }

    #[rstest]
    #[case(&["-h"])]
    #[case(&["--help", "-i", "openapi.yaml"])]
    fn should_parse_help(#[case] args: &[&str]) {
        let (command, _) = parse(args).expect("should parse");

        assert_eq!(command, Command::Help);
    }

    #[test]
    fn should_require_input() {
        let error = parse(&["-f", "json"]).expect_err("should fail");

        assert_eq!(error.to_string(), "missing required argument -i/--input");
    }

    #[test]
    fn should_reject_unknown_format() {
        let error = parse(&["-i", "openapi.yaml", "-f", "xml"]).expect_err("should fail");

        assert_eq!(error.to_string(), "parsing format argument");
    }

    #[test]
    fn should_return_unused_arguments() {
        let (_, remaining) = parse(&["-i", "openapi.yaml", "extra"]).expect("should parse");

        assert_eq!(remaining, vec![OsString::from("extra")]);
    }
}
