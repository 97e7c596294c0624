use crate::cli::args::{Cli, Command};

mod eval;
mod exec;
mod fetch;
mod metadata;
mod preview;
mod run;

pub const CONFIG_ERROR: i32 = 2;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Fetch(args) => fetch::execute(args).await,
        Command::Preview(args) => preview::execute(args),
        Command::Metadata(args) => metadata::execute(args),
        Command::Exec(args) => exec::execute(args).await,
        Command::Run(args) => run::execute(args).await,
        Command::Eval(args) => eval::execute(args).await,
        Command::Version => {
            println!("floodsql {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}
