use std::env;
use std::fs::File;
use std::io::BufReader;

use dmr::{DmrError, DmrParser, ParserOptions};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let mut paths = env::args().skip(1).peekable();
    if paths.peek().is_none() {
        println!("usage: check_dmr <FILE>...");
        return Ok(());
    }

    let parser = DmrParser::new(ParserOptions::default());
    for path in paths {
        let input = BufReader::new(File::open(&path)?);
        let mut doc = dmr::Dmr::default();
        match parser.intern(input, &mut doc) {
            Ok(()) => {
                info!(%path, dataset = %doc.name(), "accepted");
                println!(
                    "{path}: {} ({} variables, {} groups)",
                    doc.name(),
                    doc.root().variables().len(),
                    doc.root().groups().len()
                );
            }
            Err(DmrError::Parse(msg)) => println!("{path}: rejected\n{msg}"),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
