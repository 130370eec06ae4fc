// serve.rs: Start the HTTP API.
//
// Same server as grcd, reachable as `grc serve` without knowing the daemon
// binary name.

use grc_daemon::GrcConfig;

pub fn execute(mut config: GrcConfig, bind: Option<String>) -> anyhow::Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(grc_daemon::serve(&config))
}
