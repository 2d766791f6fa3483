//! Read a delimited file and print each record
//!
//! Usage: cargo run --example read_fields -- data.csv [delimiter]

use fieldstream::{FieldError, ParserOptions, TextFieldParser};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("data.csv");
    let delimiter = args.get(2).map(String::as_str).unwrap_or(",");

    let options = ParserOptions::new()
        .delimiters([delimiter])
        .comment_tokens(["#"]);
    let mut parser = TextFieldParser::open_with_options(path, options)?;

    let mut records = 0;
    let mut malformed = 0;
    loop {
        match parser.read_fields() {
            Ok(Some(fields)) => {
                records += 1;
                println!("{:>6}: {:?}", records, fields);
            }
            Ok(None) => break,
            Err(FieldError::MalformedLine { line_number, line }) => {
                malformed += 1;
                eprintln!("Skipping line {}: {:?}", line_number, line);
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("\n✅ {} records, {} malformed lines", records, malformed);
    Ok(())
}
