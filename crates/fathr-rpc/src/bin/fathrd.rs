use fathr_rpc::{init_tracing, ScoringServer, ServerConfig};

fn main() -> std::io::Result<()> {
    let config = ServerConfig::from_env();
    init_tracing(&config.log_filter);

    let server = ScoringServer::new(config).map_err(std::io::Error::other)?;
    server.serve_stdio()
}
