fn main() {
    std::process::exit(isochron_cli::run_from_env());
}
