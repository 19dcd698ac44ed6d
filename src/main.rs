fn main() {
    stylemate::run_cli();
}
