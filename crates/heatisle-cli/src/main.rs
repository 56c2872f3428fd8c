mod command;
mod session;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
