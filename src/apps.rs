use std::path::PathBuf;

use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{DuplicatePolicy, PipelineConfig, SamplerConfig};
use crate::constants::cli::{DEFAULT_LOG_DIRECTIVE, DEFAULT_OUTPUT_FILE};
use crate::constants::scan::DEFAULT_RECORD_TAG;
use crate::convert::TableConverter;
use crate::errors::PipelineError;
use crate::output::{ParquetTableWriter, TableWriter};
use crate::pipeline::{PipelineSources, SamplePipeline};
use crate::source::{RecordSource, XmlFileSource};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DuplicateArg {
    Warn,
    Dedupe,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(value: DuplicateArg) -> Self {
        match value {
            DuplicateArg::Warn => DuplicatePolicy::Warn,
            DuplicateArg::Dedupe => DuplicatePolicy::Deduplicate,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "sample_join",
    disable_help_subcommand = true,
    about = "Sample questions and join their comments, votes and users into one table",
    long_about = "Reservoir-sample question posts from a StackExchange-style dump, extract every comment, vote and user that references the sample, and write one denormalized Parquet table.",
    after_help = "Set RUST_LOG to control log verbosity (default: info)."
)]
struct SampleJoinCli {
    #[arg(value_name = "POSTS", help = "Posts XML file (sampled)")]
    posts: PathBuf,
    #[arg(value_name = "COMMENTS", help = "Comments XML file (grouped per post)")]
    comments: PathBuf,
    #[arg(value_name = "USERS", help = "Users XML file (joined through owner ids)")]
    users: PathBuf,
    #[arg(value_name = "VOTES", help = "Votes XML file (counted per post)")]
    votes: PathBuf,
    #[arg(
        value_name = "SAMPLE_SIZE",
        value_parser = parse_positive_usize,
        help = "Number of question posts to sample"
    )]
    sample_size: usize,
    #[arg(long, help = "Optional deterministic seed for the sampler")]
    seed: Option<u64>,
    #[arg(
        long,
        short,
        value_name = "PATH",
        default_value = DEFAULT_OUTPUT_FILE,
        help = "Destination Parquet file"
    )]
    output: PathBuf,
    #[arg(
        long,
        value_enum,
        default_value_t = DuplicateArg::Warn,
        help = "How duplicate post ids in the joined table are handled"
    )]
    duplicates: DuplicateArg,
    #[arg(
        long = "record-tag",
        default_value = DEFAULT_RECORD_TAG,
        help = "Local element name of one record in every input"
    )]
    record_tag: String,
}

#[derive(Debug, Parser)]
#[command(
    name = "xml_to_table",
    disable_help_subcommand = true,
    about = "Convert the first records of an XML file into a Parquet table",
    long_about = "Read up to NUMBER_OF_RECORDS elements named RECORD_TAG, using their attributes and the text of their direct children as columns, and write them as one Parquet table."
)]
struct XmlToTableCli {
    #[arg(value_name = "INPUT", help = "Source XML file")]
    input: PathBuf,
    #[arg(value_name = "OUTPUT", help = "Destination Parquet file")]
    output: PathBuf,
    #[arg(
        value_name = "NUMBER_OF_RECORDS",
        value_parser = parse_positive_usize,
        help = "Maximum number of records to convert"
    )]
    number_of_records: usize,
    #[arg(value_name = "RECORD_TAG", help = "Local element name of one record")]
    record_tag: String,
}

/// Run the `sample_join` command line.
pub fn run_sample_join<I>(args_iter: I) -> Result<(), PipelineError>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) =
        parse_cli::<SampleJoinCli, _>(std::iter::once("sample_join".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let mut config = PipelineConfig {
        record_tag: cli.record_tag,
        sampler: SamplerConfig {
            sample_size: cli.sample_size,
            seed: cli.seed,
            ..SamplerConfig::default()
        },
        output_path: cli.output,
        ..PipelineConfig::default()
    };
    config.denormalize.duplicate_policy = cli.duplicates.into();

    let pipeline = SamplePipeline::new(config)?;
    let posts = XmlFileSource::new("posts", cli.posts);
    let comments = XmlFileSource::new("comments", cli.comments);
    let votes = XmlFileSource::new("votes", cli.votes);
    let users = XmlFileSource::new("users", cli.users);
    for source in [&posts, &comments, &votes, &users] {
        if let Some(bytes) = source.size_hint() {
            info!(source = source.id(), bytes, "input file");
        }
    }
    let sources = PipelineSources {
        primary: &posts,
        grouped: &comments,
        flat: &votes,
        reference: &users,
    };
    let writer = ParquetTableWriter::new(&pipeline.config().output_path);
    let output = pipeline.run_to(&sources, &writer)?;

    println!(
        "Sampled {} of {} question posts",
        output.sampled, output.qualifying
    );
    for pass in &output.passes {
        println!(
            "  {:<10} scanned={:<10} matched={:<8} elapsed={:.2?}",
            pass.source, pass.scanned, pass.matched, pass.elapsed
        );
    }
    if let Some(warning) = output.integrity.warning() {
        println!("Warning: {warning}");
    }
    println!(
        "Wrote {} rows to {}",
        output.table.len(),
        writer.path().display()
    );
    Ok(())
}

/// Run the `xml_to_table` command line.
pub fn run_xml_to_table<I>(args_iter: I) -> Result<(), PipelineError>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) =
        parse_cli::<XmlToTableCli, _>(std::iter::once("xml_to_table".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let converter = TableConverter::new(cli.number_of_records)?;
    let source = XmlFileSource::from_path(cli.input).with_child_text(true);
    let table = converter.convert(&source, &cli.record_tag)?;
    let writer = ParquetTableWriter::new(cli.output);
    writer.write(&table)?;

    println!(
        "Wrote {} '{}' records to {}",
        table.len(),
        cli.record_tag,
        writer.path().display()
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, PipelineError>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(PipelineError::Usage(err.render().to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> impl Iterator<Item = String> {
        raw.iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn positional_arguments_follow_posts_comments_users_votes_order() {
        let cli = parse_cli::<SampleJoinCli, _>([
            "sample_join",
            "Posts.xml",
            "Comments.xml",
            "Users.xml",
            "Votes.xml",
            "25",
            "--seed",
            "7",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(cli.posts, PathBuf::from("Posts.xml"));
        assert_eq!(cli.users, PathBuf::from("Users.xml"));
        assert_eq!(cli.votes, PathBuf::from("Votes.xml"));
        assert_eq!(cli.sample_size, 25);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.output, PathBuf::from(DEFAULT_OUTPUT_FILE));
        assert_eq!(cli.record_tag, DEFAULT_RECORD_TAG);
    }

    #[test]
    fn help_is_not_an_error() {
        let parsed = parse_cli::<XmlToTableCli, _>(["xml_to_table", "--help"]).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn bad_arguments_are_usage_errors() {
        let err = run_sample_join(args(&["Posts.xml", "Comments.xml"])).unwrap_err();
        assert!(matches!(err, PipelineError::Usage(_)));
        assert_eq!(err.exit_code(), 2);

        let err = run_xml_to_table(args(&["in.xml", "out.parquet", "0", "row"])).unwrap_err();
        assert!(matches!(err, PipelineError::Usage(_)));
    }

    #[test]
    fn positive_integer_parser_rejects_zero_and_text() {
        assert_eq!(parse_positive_usize("3"), Ok(3));
        assert!(parse_positive_usize("0").is_err());
        assert!(parse_positive_usize("many").is_err());
    }
}
