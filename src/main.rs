fn main() {
    if let Err(err) = ghost_lib::run() {
        eprintln!("ghost: {err:#}");
        std::process::exit(1);
    }
}
