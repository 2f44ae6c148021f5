//! Print the Microsoft-compatible deal for a game number.

use clap::Parser;

use freehaven::deal_ms;

#[derive(Parser, Debug)]
#[command(name = "msdeal", about = "Deal Microsoft Freecell / Seahaven boards")]
struct Args {
    /// Deal onto 10 Seahaven piles instead of 8 Freecell piles
    #[arg(short = 's')]
    seahaven: bool,

    /// The game number
    game: u64,
}

fn main() {
    let args = Args::parse();
    let nwpiles = if args.seahaven { 10 } else { 8 };
    print!("{}", deal_ms(args.game, nwpiles));
}
