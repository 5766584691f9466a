fn main() {
    infoset_cli::cli::run();
}
