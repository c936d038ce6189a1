use memoria_app::app::{run, AppConfig};

fn main() {
    tracing_subscriber::fmt::init();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to start Memoria: {err}");
            return;
        }
    };
    if let Err(err) = run(config) {
        eprintln!("Memoria exited with an error: {err}");
    }
}
