mod studio;

fn main() {
    studio::app::run();
}
