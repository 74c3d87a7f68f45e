use anyhow::Context;
use mobi::MobiReader;
use std::fs::File;
use std::io::BufReader;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args().nth(1).context("usage: read <book.mobi>")?;
    let mut book = MobiReader::new(BufReader::new(File::open(&path)?))?;

    eprintln!("{:#?}", book.palmdoc_header());
    eprintln!("{:#?}", book.header());
    println!("Title: {}", book.title());

    if let Some(exth) = book.exth() {
        for record in &exth.records {
            println!("EXTH {}: {:?}", record.record_type, record.value());
        }
    }

    for entry in book.table_of_contents()? {
        let indent = "  ".repeat(entry.depth as usize);
        println!("{indent}{} @ {} (+{})", entry.title, entry.offset, entry.len);
    }

    let text = book.text()?;
    println!("{} bytes of text", text.len());

    Ok(())
}
