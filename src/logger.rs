use chrono::Local;
use env_logger::Builder;
use std::io::Write;

/// Install the global logger. `RUST_LOG` overrides the default `info` filter.
pub fn init_logger() {
    let _ = Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args(),
            )
        })
        .try_init();
}
