fn main() {
    // Compile the window into Rust code.
    slint_build::compile("ui/app-window.slint").expect("Slint build failed");
}
