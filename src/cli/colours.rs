//! Colours command implementation.

use clap::Args;
use serde::Serialize;

use crate::colours::{generate_pair, ColourPair, ContrastStrategy};
use crate::error::Result;
use crate::output::{print_json, Printer};

/// Generate a text and background colour pair
#[derive(Args, Debug)]
pub struct ColoursArgs {
    /// Seed text; the same seed always gives the same colours
    #[arg(long)]
    pub seed: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ColoursReport {
    seed: String,
    text: String,
    text_decimal: u32,
    background: String,
    background_decimal: u32,
    strategy: ContrastStrategy,
}

impl ColoursReport {
    fn new(seed: String, pair: &ColourPair) -> Self {
        Self {
            seed,
            text: pair.text.to_hex(),
            text_decimal: pair.text_decimal(),
            background: pair.background.to_hex(),
            background_decimal: pair.background_decimal(),
            strategy: pair.strategy,
        }
    }
}

pub fn run(args: ColoursArgs, printer: &Printer) -> Result<()> {
    let seed = args
        .seed
        .unwrap_or_else(|| chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default().to_string());
    let pair = generate_pair(&seed);

    printer.status(
        "Generated",
        &format!("{} on {} ({})", pair.text, pair.background, pair.strategy),
    );
    print_json(&ColoursReport::new(seed, &pair))
}
