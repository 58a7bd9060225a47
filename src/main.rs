use anyhow::Context;
use daemon_config::{cli, logging, DaemonContext, Error};

fn main() -> anyhow::Result<()> {
    let (args, registry) = match cli::parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(Error::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    logging::init(registry.config().debug);
    tracing::debug!(
        flags = ?registry.changed_options().collect::<Vec<_>>(),
        "parsed command line"
    );

    let mut builder = DaemonContext::builder(registry).strict(args.strict_config);
    if let Some(path) = &args.config_file {
        builder = builder.with_file(path);
    }
    let ctx = builder.build().with_context(|| match &args.config_file {
        Some(path) => format!("unable to configure the daemon with file {}", path.display()),
        None => "unable to configure the daemon".to_string(),
    })?;

    let rendered =
        serde_json::to_string_pretty(ctx.config()).context("failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}
