use anyhow::Context;
use chronomap::RunOptions;

fn main() -> anyhow::Result<()> {
    let mut options = RunOptions::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--offline" => options.offline = true,
            "-h" | "--help" => {
                println!("usage: chronomap [--offline]");
                return Ok(());
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    chronomap::run(options).context("chronomap exited with an error")
}
