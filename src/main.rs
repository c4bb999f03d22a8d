//! `sharpc` entry point.

fn main() {
    match sharpscript::cli::run_cli() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
