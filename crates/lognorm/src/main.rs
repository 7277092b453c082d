use lognorm::runtime::{boot, pipe};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let (registry, config) = boot::boot()?;
    let log_type = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.default_log_type.clone());
    pipe::run(&registry, &config, &log_type)?;
    Ok(())
}
