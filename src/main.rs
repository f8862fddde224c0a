fn main() {
    if let Err(err) = mindmap_wizard::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
