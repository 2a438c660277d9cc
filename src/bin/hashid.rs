//! Convert HashIds between their decimal and hex encodings.

use clap::Parser;
use mubingraph::normalize;

#[derive(Parser, Debug)]
#[command(name = "hashid")]
#[command(about = "Print the decimal and hex encodings of HashIds")]
struct Args {
    /// Values in either encoding, e.g. 1234 or 0x000004d2
    #[arg(required = true)]
    values: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let mut failed = 0;

    for value in &args.values {
        match normalize(value) {
            Ok(id) => println!("{}\t{}\t{}", value, id.to_decimal(), id.to_hex()),
            Err(e) => {
                failed += 1;
                eprintln!("{}\t{}", value, e);
            }
        }
    }

    if failed > 0 {
        log::warn!("{} of {} value(s) were not valid HashIds", failed, args.values.len());
    }

    Ok(())
}
