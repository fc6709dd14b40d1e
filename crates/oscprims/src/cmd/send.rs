use oscprims_transport::OscSender;
use oscprims_wire::{Argument, Message};

use crate::cmd::SendArgs;
use crate::exit::{transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat, SendOutput};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let message = build_message(&args.address, &args.args)?;

    let sender = OscSender::connect_to(args.target.host.as_str(), args.target.port)
        .map_err(|err| transport_error("connect failed", err))?;
    let bytes = sender
        .send(&message)
        .map_err(|err| transport_error("send failed", err))?;

    let target = sender.config().target();
    print_sent(&SendOutput::new(&target, &message.address, bytes), format);
    Ok(SUCCESS)
}

fn build_message(address: &str, literals: &[String]) -> CliResult<Message> {
    if !address.starts_with('/') {
        return Err(CliError::new(
            USAGE,
            format!("address must start with '/': {address}"),
        ));
    }

    let args = literals
        .iter()
        .map(|literal| parse_argument(literal))
        .collect::<CliResult<Vec<_>>>()?;
    Ok(Message::with_args(address, args))
}

/// Parse `i:`/`f:`/`s:` prefixed literals, or infer int, then float, then string.
fn parse_argument(literal: &str) -> CliResult<Argument> {
    let invalid = |kind: &str| CliError::new(USAGE, format!("invalid {kind} argument: {literal}"));

    if let Some(value) = literal.strip_prefix("i:") {
        return value.parse().map(Argument::Int).map_err(|_| invalid("int"));
    }
    if let Some(value) = literal.strip_prefix("f:") {
        return value.parse().map(Argument::Float).map_err(|_| invalid("float"));
    }
    if let Some(value) = literal.strip_prefix("s:") {
        return Ok(Argument::from(value));
    }

    if let Ok(value) = literal.parse::<i32>() {
        return Ok(Argument::Int(value));
    }
    if let Ok(value) = literal.parse::<f32>() {
        if value.is_finite() {
            return Ok(Argument::Float(value));
        }
    }
    Ok(Argument::from(literal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_literals() {
        assert_eq!(parse_argument("i:7").unwrap(), Argument::Int(7));
        assert_eq!(parse_argument("f:1").unwrap(), Argument::Float(1.0));
        assert_eq!(parse_argument("s:42").unwrap(), Argument::from("42"));
        assert_eq!(parse_argument("i:x").unwrap_err().code, USAGE);
    }

    #[test]
    fn untyped_literals_are_inferred() {
        assert_eq!(parse_argument("-3").unwrap(), Argument::Int(-3));
        assert_eq!(parse_argument("0.25").unwrap(), Argument::Float(0.25));
        assert_eq!(parse_argument("hello").unwrap(), Argument::from("hello"));
        assert_eq!(parse_argument("inf").unwrap(), Argument::from("inf"));
    }

    #[test]
    fn address_must_be_rooted() {
        assert_eq!(build_message("synth", &[]).unwrap_err().code, USAGE);
        let message = build_message("/synth", &["1".to_string(), "x".to_string()]).unwrap();
        assert_eq!(message.type_tags(), ",is");
    }
}
