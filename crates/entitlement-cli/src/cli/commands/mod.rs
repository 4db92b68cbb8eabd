use super::args::*;
use crate::exit_codes::EXIT_SUCCESS;

pub mod bench;
pub mod bootstrap;
pub mod bulk;
pub mod check;
pub mod health;
pub(crate) mod output;
pub mod stream;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.config.as_deref();
    match cli.cmd {
        Command::Check(args) => check::run(args, config).await,
        Command::Bulk(args) => bulk::run(args, config).await,
        Command::Bench(args) => bench::run(args, config).await,
        Command::Stream(args) => stream::run(args, config).await,
        Command::Health(args) => health::run(args, config),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(EXIT_SUCCESS)
        }
    }
}
