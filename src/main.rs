fn main() {
    if let Err(err) = sales_lens::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
