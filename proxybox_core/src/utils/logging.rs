use log::LevelFilter;

/// Initialize logging using env_logger.
///
/// `RUST_LOG` is honoured as usual (e.g. `RUST_LOG=proxybox_core=debug`);
/// a non-zero `verbosity` overrides it: 1 → info, 2 and up → debug.
/// Without either, only warnings and errors are shown.
pub fn init_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );
    match verbosity {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        _ => {
            builder.filter_level(LevelFilter::Debug);
        }
    }
    builder.init();
}
