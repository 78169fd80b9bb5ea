fn main() {
    if let Err(e) = greenpulse_lib::run() {
        eprintln!("greenpulse: {e}");
        std::process::exit(1);
    }
}
