//! # bakeplan demo application
//!
//! A small `bake`-style CLI that resolves bake files and prints the result.
//! It exists to demonstrate and manually verify bakeplan's features.
//!
//! ## Running
//!
//! ```sh
//! cd demos/bake_demo/files
//! cargo run --example bake_demo
//! cargo run --example bake_demo -- --list
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                    | How to exercise it                                              |
//! |----------------------------|-----------------------------------------------------------------|
//! | Default file discovery     | run with no `-f` inside `files/`                                |
//! | Groups                     | `cargo run --example bake_demo -- default`                      |
//! | Inheritance                | `cargo run --example bake_demo -- api`                          |
//! | Override on a target       | `... -- --set api.args.VERSION=2 api`                           |
//! | Override on an ancestor    | `... -- --set base.args.GO_VERSION=1.23 api`                    |
//! | Glob override              | `... -- --set '*.platforms=linux/arm64'`                        |
//! | Env-sourced build arg      | `TOKEN=abc cargo run --example bake_demo -- --set api.args.TOKEN api` |
//! | Tolerate unmatched pattern | `... -- --allow-unmatched --set 'nope*.tags=x'`                 |
//! | Logging                    | `RUST_LOG=bakeplan=debug cargo run --example bake_demo`         |

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bakeplan::{Bake, BakeArgs};

/// bakeplan demo: resolve bake files and print the definition.
#[derive(Parser, Debug)]
#[command(name = "bake-demo")]
struct Cli {
    /// Allow unknown keys in bake files.
    #[arg(long)]
    lenient: bool,

    #[command(flatten)]
    bake: BakeArgs,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let action = cli.bake.action();
    let builder = cli.bake.apply(Bake::builder().strict(!cli.lenient));

    builder.handle_and_print(&action).unwrap_or_else(|e| {
        eprintln!("Bake error:\n{e}");
        std::process::exit(1);
    });
}
