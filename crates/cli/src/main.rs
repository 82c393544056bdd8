fn main() {
    if let Err(error) = bindery_cli::run() {
        // Tracing is initialized inside run() after argument parsing.
        tracing::error!(%error, "CLI execution failed");
        std::process::exit(1);
    }
}
