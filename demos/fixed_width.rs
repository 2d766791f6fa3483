//! Parse an in-memory fixed-width report

use fieldstream::{ParserOptions, TextFieldParser};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let report = "\
* inventory snapshot
SKU     ITEM          QTY
0001    Widget        12
0002    Gadget        7

0003    Doohickey     140
";

    let options = ParserOptions::fixed_width([8, 14, -1]).comment_tokens(["*"]);
    let mut parser = TextFieldParser::with_options(report.as_bytes(), options)?;

    if let Some(header) = parser.read_fields()? {
        println!("Columns: {:?}", header);
    }
    for record in parser.records() {
        let fields = record?;
        println!("{:<6} {:<12} {:>5}", fields[0], fields[1], fields[2]);
    }
    Ok(())
}
