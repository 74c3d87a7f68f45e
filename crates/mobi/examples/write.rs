use mobi::{CompressionStrategy, ExthType, MobiWriter};
use std::fs::File;
use std::io::BufWriter;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let output = std::env::args().nth(1).unwrap_or_else(|| "output.mobi".to_owned());

    let mut writer = MobiWriter::new("Perfect World");
    writer
        .stylesheet("h1 { text-align: center; }")
        .strategy(CompressionStrategy::Fast)
        .add_exth(ExthType::Author, "Anonymous")
        .add_exth(ExthType::Language, "en");

    writer.new_chapter("Prologue", "<p>It begins.</p>");
    let part = writer.new_chapter("Part One", "<p>The first part.</p>");
    for i in 1..=3 {
        let body = format!("<p>{}</p>", "Chapter text. ".repeat(200 * i));
        part.add_sub_chapter(format!("Chapter {i}"), body);
    }

    let file = BufWriter::new(File::create(&output)?);
    let written = writer.write_to(file)?;
    eprintln!("Wrote {written} bytes to {output}");

    Ok(())
}
