use std::fs;
use std::path::Path;

use oscprims_chunk::{trim_title, ChunkedSender};
use oscprims_transport::OscSender;

use crate::cmd::SendFloatsArgs;
use crate::exit::{
    io_error, transport_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS, USAGE,
};
use crate::output::{print_chunk_report, OutputFormat};

pub fn run(args: SendFloatsArgs, format: OutputFormat) -> CliResult<i32> {
    if trim_title(&args.title).is_empty() {
        return Err(CliError::new(USAGE, "title must not be empty"));
    }
    if args.max_per_chunk == 0 {
        return Err(CliError::new(USAGE, "--max-per-chunk must be greater than zero"));
    }

    let values = match (&args.values, &args.file) {
        (Some(values), _) => values.clone(),
        (None, Some(path)) => read_floats(path)?,
        (None, None) => return Err(CliError::new(USAGE, "either --values or --file is required")),
    };

    let sender = OscSender::connect_to(args.target.host.as_str(), args.target.port)
        .map_err(|err| transport_error("connect failed", err))?;
    let report = ChunkedSender::new(&sender).send(&values, &args.title, args.max_per_chunk);

    let target = sender.config().target();
    print_chunk_report(&target, trim_title(&args.title), values.len(), &report, format);

    if report.is_complete() {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

fn read_floats(path: &Path) -> CliResult<Vec<f32>> {
    let text = fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    parse_floats(&text)
}

fn parse_floats(text: &str) -> CliResult<Vec<f32>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| CliError::new(DATA_INVALID, format!("invalid float: {token}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_floats_accepts_mixed_separators() {
        let values = parse_floats("1, 2.5\n-3\t4e-1,,\n").expect("floats should parse");
        assert_eq!(values, vec![1.0, 2.5, -3.0, 0.4]);
    }

    #[test]
    fn parse_floats_rejects_garbage() {
        assert_eq!(parse_floats("1 two 3").unwrap_err().code, DATA_INVALID);
    }

    #[test]
    fn empty_input_is_empty_array() {
        assert!(parse_floats("  \n").expect("blank input should parse").is_empty());
    }
}
