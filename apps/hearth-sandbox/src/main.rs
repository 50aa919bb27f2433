//! Hearth sandbox
//!
//! Opens a window and draws a spinning quad through the full frame loop.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p hearth-sandbox
//! ```
//!
//! Expects compiled shaders at `./resources/vert.spv` and
//! `./resources/frag.spv` (see `resources/shaders`). Set `RUST_LOG` to
//! change log verbosity.

use std::process::ExitCode;

use hearth_app::{run_app, AppConfig, Application, BufferStrategy, Environment, Residency};

const NAME: &str = "Hearth Sandbox";
const VERSION: (u32, u32, u32) = (0, 1, 0);

fn main() -> ExitCode {
    let config = AppConfig::new(NAME)
        .with_size(1280, 720)
        .with_vsync(true)
        .with_buffering(BufferStrategy::Double);

    let app = Application::new(Environment::new(), NAME, VERSION, Residency::Exclusive)
        .with_config(config);

    match run_app(app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{NAME} failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
