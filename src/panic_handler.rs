use std::io::{self, Write};
use std::panic;

use log::error;

pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("Panic: {panic_info}");
        log::logger().flush();

        let _ = io::stdout().flush();
        default_hook(panic_info);

        std::process::exit(1);
    }));
}
