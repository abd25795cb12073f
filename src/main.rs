//! Orbit command line launcher.

fn main() {
    if let Err(e) = orbit::cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
