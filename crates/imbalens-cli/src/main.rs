mod command;
mod latex;
mod plot;
mod report;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
