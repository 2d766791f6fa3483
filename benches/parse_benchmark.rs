use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fieldstream::{ParserOptions, TextFieldParser};

fn make_csv(rows: usize) -> String {
    let mut text = String::from("# exported\nid,name,note,value\n");
    for i in 0..rows {
        text.push_str(&format!(
            "{},Name_{},\"quoted, with \"\"escapes\"\"\",{}\n",
            i,
            i,
            i * 100
        ));
    }
    text
}

fn make_fixed(rows: usize) -> String {
    let mut text = String::new();
    for i in 0..rows {
        text.push_str(&format!("{:08}{:<12}{}\n", i, format!("Name_{}", i), i * 100));
    }
    text
}

fn benchmark_delimited(c: &mut Criterion) {
    let mut group = c.benchmark_group("delimited");

    for size in [1_000, 10_000, 100_000].iter() {
        let text = make_csv(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| {
                let options = ParserOptions::csv().comment_tokens(["#"]);
                let mut parser = TextFieldParser::with_options(text.as_bytes(), options).unwrap();
                let mut count = 0;
                while let Some(fields) = parser.read_fields().unwrap() {
                    count += fields.len();
                }
                black_box(count);
            });
        });
    }

    group.finish();
}

fn benchmark_fixed_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixed_width");

    for size in [1_000, 10_000, 100_000].iter() {
        let text = make_fixed(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| {
                let options = ParserOptions::fixed_width([8, 12, 0]);
                let mut parser = TextFieldParser::with_options(text.as_bytes(), options).unwrap();
                let mut count = 0;
                while let Some(fields) = parser.read_fields().unwrap() {
                    count += fields.len();
                }
                black_box(count);
            });
        });
    }

    group.finish();
}

fn benchmark_peek(c: &mut Criterion) {
    let text = make_csv(10_000);
    c.bench_function("end_of_data_between_reads", |b| {
        b.iter(|| {
            let mut parser =
                TextFieldParser::with_options(text.as_bytes(), ParserOptions::csv()).unwrap();
            while !parser.end_of_data().unwrap() {
                black_box(parser.read_fields().unwrap());
            }
        });
    });
}

criterion_group!(benches, benchmark_delimited, benchmark_fixed_width, benchmark_peek);
criterion_main!(benches);
