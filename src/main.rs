//! oasguard CLI binary
//!
//! Minimal entrypoint: all logic is in the library; main only maps the run
//! outcome to a process exit code.

fn main() {
    match oasguard::cli::run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("oasguard: {err:#}");
            std::process::exit(1);
        }
    }
}
