fn main() {
    let code = backsync_cli::run_from_env();
    std::process::exit(code);
}
