#[macro_use]
extern crate log;

mod options;
mod render;
mod scene;

use clap::Parser;
use options::Options;

fn main() {
    // Initialize `env_logger`.
    env_logger::init();

    let options = Options::parse();
    if let Err(e) = render::render(&options) {
        error!("{e}");
        std::process::exit(1);
    }
}
