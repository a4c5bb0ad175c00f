fn main() {
    std::process::exit(modshell::app::startup::startup());
}
