fn main() -> anyhow::Result<()> {
    // Handlers only wait on upstream I/O, so one thread serves every request.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(api_server::run_server())
}
